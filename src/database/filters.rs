use std::collections::HashSet;

use potion::Error;

use super::{error::ValidationError, form::Form, schema::Id};

/// Recipe list filters: `tags` (repeatable slug), `author`, `is_favorited`, `is_in_shopping_cart`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeFilter {
    pub tags: Vec<String>,
    pub author: Option<Id>,
    pub is_favorited: Option<bool>,
    pub is_in_shopping_cart: Option<bool>,
}

impl RecipeFilter {
    pub fn from_form(form: &Form) -> Result<Self, Error> {
        Ok(Self {
            tags: form.get_all("tags").into_iter().map(String::from).collect(),
            author: form.get_number::<Id>("author")?,
            is_favorited: form.get_number::<i64>("is_favorited")?.map(|v| v != 0),
            is_in_shopping_cart: form
                .get_number::<i64>("is_in_shopping_cart")?
                .map(|v| v != 0),
        })
    }

    /// Rejects slugs missing from `known`, one message per unknown slug.
    pub fn check_tags(&self, known: &HashSet<String>) -> Result<(), Error> {
        let mut error = ValidationError::new();
        for slug in self.tags.iter().filter(|slug| !known.contains(*slug)) {
            error.add(
                "tags",
                &format!("Select a valid choice. {slug} is not one of the available choices."),
            );
        }
        error.into_result()
    }

    /// Filters that only make sense for a known caller.
    pub fn needs_session(&self) -> bool {
        self.is_favorited.is_some() || self.is_in_shopping_cart.is_some()
    }
}

/// Ingredient search: case-insensitive name prefix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngredientFilter {
    pub name: Option<String>,
}

impl IngredientFilter {
    pub fn from_form(form: &Form) -> Self {
        Self {
            name: form
                .get_str("name")
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from),
        }
    }

    /// `LIKE` pattern with wildcards in the prefix escaped.
    pub fn prefix_pattern(&self) -> Option<String> {
        self.name.as_ref().map(|name| {
            let escaped = name
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("{}%", escaped.to_lowercase())
        })
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
    fn recipe_filter_reads_all_parameters() {
        let filter = RecipeFilter::from_form(&form(&[
            ("tags", "breakfast"),
            ("tags", "dinner"),
            ("author", "7"),
            ("is_favorited", "1"),
            ("is_in_shopping_cart", "0"),
        ]))
        .unwrap();

        assert_eq!(filter.tags, vec!["breakfast", "dinner"]);
        assert_eq!(filter.author, Some(7));
        assert_eq!(filter.is_favorited, Some(true));
        assert_eq!(filter.is_in_shopping_cart, Some(false));
        assert!(filter.needs_session());
    }

    #[test]
    fn empty_recipe_filter() {
        let filter = RecipeFilter::from_form(&form(&[])).unwrap();

        assert_eq!(filter, RecipeFilter::default());
        assert!(!filter.needs_session());
    }

    #[test]
    fn malformed_author_is_rejected() {
        let error = RecipeFilter::from_form(&form(&[("author", "me")])).unwrap_err();
        assert_eq!(error.code as u16, 400);
    }

    #[test]
    fn unknown_tag_slugs_are_rejected() {
        let filter =
            RecipeFilter::from_form(&form(&[("tags", "lunch"), ("tags", "brunch")])).unwrap();
        let known: HashSet<String> = ["lunch".to_string()].into();

        let error = filter.check_tags(&known).unwrap_err();
        assert_eq!(error.code as u16, 400);
        let body: serde_json::Value =
            serde_json::from_str(error.info.as_deref().unwrap_or_default()).unwrap();
        assert_eq!(
            body["tags"][0],
            "Select a valid choice. brunch is not one of the available choices."
        );

        let known: HashSet<String> = ["lunch".to_string(), "brunch".to_string()].into();
        assert!(filter.check_tags(&known).is_ok());
    }

    #[test]
    fn ingredient_prefix_is_escaped() {
        let filter = IngredientFilter::from_form(&form(&[("name", " Sug")]));
        assert_eq!(filter.prefix_pattern().as_deref(), Some("sug%"));

        let filter = IngredientFilter::from_form(&form(&[("name", "100%_")]));
        assert_eq!(filter.prefix_pattern().as_deref(), Some("100\\%\\_%"));

        let filter = IngredientFilter::from_form(&form(&[("name", "")]));
        assert_eq!(filter.prefix_pattern(), None);
    }
}
