use serde::Deserialize;

use crate::{
    constants::{
        INGREDIENT_NAME_MAX_LENGTH, MEASUREMENT_UNIT_MAX_LENGTH, TAG_NAME_MAX_LENGTH,
        TAG_SLUG_MAX_LENGTH,
    },
    error::ValidationError,
};

use super::users::required_text;

/// `#RGB` or `#RRGGBB`.
fn is_valid_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(hex) => {
            (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

fn is_valid_slug(slug: &str) -> bool {
    slug.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[derive(Deserialize, Debug, Default)]
pub struct TagPayload {
    pub name: Option<String>,
    pub color: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTag {
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl TagPayload {
    pub fn validate(self) -> Result<NewTag, ValidationError> {
        let mut errors = ValidationError::new();

        let name = required_text(&mut errors, "name", self.name, TAG_NAME_MAX_LENGTH);
        let color = required_text(&mut errors, "color", self.color, 7);
        if !color.is_empty() && !is_valid_color(&color) {
            errors.add("color", "Enter a valid HEX color, such as #E26C2D.");
        }
        let slug = required_text(&mut errors, "slug", self.slug, TAG_SLUG_MAX_LENGTH);
        if !slug.is_empty() && !is_valid_slug(&slug) {
            errors.add(
                "slug",
                "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
            );
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(NewTag {
            name,
            color: color.to_uppercase(),
            slug,
        })
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct IngredientPayload {
    pub name: Option<String>,
    pub measurement_unit: Option<String>,
}

impl IngredientPayload {
    /// Returns `(name, measurement_unit)`.
    pub fn validate(self) -> Result<(String, String), ValidationError> {
        let mut errors = ValidationError::new();
        let name = required_text(&mut errors, "name", self.name, INGREDIENT_NAME_MAX_LENGTH);
        let unit = required_text(
            &mut errors,
            "measurement_unit",
            self.measurement_unit,
            MEASUREMENT_UNIT_MAX_LENGTH,
        );

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok((name, unit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors() {
        assert!(is_valid_color("#E26C2D"));
        assert!(is_valid_color("#fff"));
        assert!(!is_valid_color("E26C2D"));
        assert!(!is_valid_color("#E26C2"));
        assert!(!is_valid_color("#GGGGGG"));
    }

    #[test]
    fn tag_is_normalized() {
        let tag = TagPayload {
            name: Some(" Breakfast ".to_string()),
            color: Some("#e26c2d".to_string()),
            slug: Some("breakfast".to_string()),
        }
        .validate()
        .unwrap();

        assert_eq!(tag.name, "Breakfast");
        assert_eq!(tag.color, "#E26C2D");
    }

    #[test]
    fn tag_formats_are_checked() {
        let errors = TagPayload {
            name: Some("Lunch".to_string()),
            color: Some("red".to_string()),
            slug: Some("lunch time".to_string()),
        }
        .validate()
        .unwrap_err();

        assert_eq!(errors.messages("color").len(), 1);
        assert_eq!(errors.messages("slug").len(), 1);
        assert!(errors.messages("name").is_empty());
    }

    #[test]
    fn ingredient_needs_both_fields() {
        let errors = IngredientPayload {
            name: Some("Salt".to_string()),
            measurement_unit: Some("  ".to_string()),
        }
        .validate()
        .unwrap_err();

        assert_eq!(errors.messages("measurement_unit").len(), 1);
    }
}
