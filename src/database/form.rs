use std::str::FromStr;

use potion::Error;

use super::error::TypeError;

pub type FormData = Vec<(String, String)>;

/// Query string parameters in request order. Keys may repeat.
#[derive(Debug, Clone, Default)]
pub struct Form {
    inner: FormData,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.inner
            .iter()
            .filter(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Parses an optional numeric parameter. Empty values count as missing.
    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, Error>
    where
        T: FromStr,
    {
        match self.get_str(key) {
            Some(value) if !value.is_empty() => value.parse().map(Some).map_err(|_e| {
                TypeError::new(&format!("Invalid value for '{key}': expected a number")).into()
            }),
            _ => Ok(None),
        }
    }

    /// Parameters with `key` set to `value`, keeping everything else in order.
    pub fn with_value(&self, key: &str, value: &str) -> FormData {
        let mut data = self.without(key);
        data.push((key.to_string(), value.to_string()));
        data
    }

    pub fn without(&self, key: &str) -> FormData {
        self.inner
            .iter()
            .filter(|(k, _)| k != key)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> Form {
        Form::from_data(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn repeated_keys_are_collected() {
        let form = form(&[("tags", "breakfast"), ("author", "2"), ("tags", "lunch")]);

        assert_eq!(form.get_all("tags"), vec!["breakfast", "lunch"]);
        assert_eq!(form.get_str("tags"), Some("breakfast"));
        assert_eq!(form.get_str("missing"), None);
    }

    #[test]
    fn numbers_are_parsed_or_rejected() {
        let form = form(&[("page", "3"), ("limit", "abc"), ("offset", "")]);

        assert_eq!(form.get_number::<i64>("page").unwrap(), Some(3));
        assert_eq!(form.get_number::<i64>("offset").unwrap(), None);
        assert_eq!(form.get_number::<i64>("missing").unwrap(), None);

        let error = form.get_number::<i64>("limit").unwrap_err();
        assert_eq!(error.code as u16, 400);
    }

    #[test]
    fn with_value_replaces_existing_key() {
        let form = form(&[("page", "1"), ("tags", "lunch")]);

        assert_eq!(
            form.with_value("page", "2"),
            vec![
                ("tags".to_string(), "lunch".to_string()),
                ("page".to_string(), "2".to_string())
            ]
        );
        assert_eq!(
            form.without("tags"),
            vec![("page".to_string(), "1".to_string())]
        );
    }
}
