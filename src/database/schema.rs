use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Id = i32;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Anonymous,
    User,
    Admin,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub role: UserRole,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct UserRow {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub role: UserRole,

    pub count: i64,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            password: row.password,
            role: row.role,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Id,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Recipe {
    pub id: Id,
    pub author_id: Id,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub created: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipeRow {
    pub id: Id,
    pub author_id: Id,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub created: DateTime<Utc>,

    pub count: i64,
}

impl From<RecipeRow> for Recipe {
    fn from(row: RecipeRow) -> Self {
        Self {
            id: row.id,
            author_id: row.author_id,
            name: row.name,
            image: row.image,
            text: row.text,
            cooking_time: row.cooking_time,
            created: row.created,
        }
    }
}

/// One ingredient line of a recipe, denormalized with the ingredient's name and unit.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct RecipeIngredient {
    pub recipe_id: Id,
    pub ingredient_id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct LinkedRecipeTag {
    pub recipe_id: Id,
    pub id: Id,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl From<LinkedRecipeTag> for Tag {
    fn from(link: LinkedRecipeTag) -> Self {
        Self {
            id: link.id,
            name: link.name,
            color: link.color,
            slug: link.slug,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct ShoppingListEntry {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

/// The two (user, recipe) join tables with identical add/remove semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engagement {
    Favorite,
    ShoppingCart,
}

impl Engagement {
    pub fn table(&self) -> &'static str {
        match self {
            Engagement::Favorite => "favorites",
            Engagement::ShoppingCart => "shopping_cart",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Engagement::Favorite => "favorites",
            Engagement::ShoppingCart => "the shopping cart",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first_name: &str, last_name: &str) -> User {
        User {
            id: 1,
            email: "cook@example.com".to_string(),
            username: "cook".to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            password: String::new(),
            role: UserRole::User,
        }
    }

    #[test]
    fn full_name_joins_and_trims() {
        assert_eq!(user("Ada", "Lovelace").full_name(), "Ada Lovelace");
        assert_eq!(user("Ada", "").full_name(), "Ada");
        assert_eq!(user("", "").full_name(), "");
    }

    #[test]
    fn engagement_tables_are_distinct() {
        assert_ne!(
            Engagement::Favorite.table(),
            Engagement::ShoppingCart.table()
        );
    }
}
