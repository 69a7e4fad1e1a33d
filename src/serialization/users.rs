use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    actions::{fetch_author_recipes, subscribed_author_ids},
    constants::{
        EMAIL_MAX_LENGTH, PASSWORD_MAX_LENGTH, PASSWORD_MIN_LENGTH, PERSON_NAME_MAX_LENGTH,
        USERNAME_MAX_LENGTH, USERNAME_SYMBOLS,
    },
    context::Context,
    error::{HtmlError, ValidationError},
    jwt::SessionData,
    schema::{Id, User},
};

use super::recipes::RecipeShort;

pub(super) const REQUIRED: &str = "This field is required.";
pub(super) const BLANK: &str = "This field may not be blank.";

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UserRead {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserRead {
    pub fn new(user: &User, is_subscribed: bool) -> Self {
        Self {
            email: user.email.to_owned(),
            id: user.id,
            username: user.username.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
            is_subscribed,
        }
    }
}

/// Reply to a registration; never carries the password.
#[derive(Serialize, Debug, Clone)]
pub struct CreatedUser {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for CreatedUser {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.to_owned(),
            id: user.id,
            username: user.username.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct SubscriptionRead {
    #[serde(flatten)]
    pub user: UserRead,
    pub recipes: Vec<RecipeShort>,
    pub recipes_count: usize,
}

/// Read representations of `users` as seen by the caller.
pub async fn represent_users(
    users: &[User],
    session: Option<&SessionData>,
    ctx: &Context,
) -> Result<Vec<UserRead>, potion::Error> {
    let ids: Vec<Id> = users.iter().map(|user| user.id).collect();
    let subscribed = match session {
        Some(session) => subscribed_author_ids(session.user_id, &ids, &ctx.pool).await?,
        None => Default::default(),
    };

    Ok(users
        .iter()
        .map(|user| UserRead::new(user, subscribed.contains(&user.id)))
        .collect())
}

pub async fn represent_user(
    user: &User,
    session: Option<&SessionData>,
    ctx: &Context,
) -> Result<UserRead, potion::Error> {
    represent_users(std::slice::from_ref(user), session, ctx)
        .await?
        .pop()
        .ok_or_else(|| HtmlError::InternalServerError.default())
}

/// Followed authors with their recipes, newest first, cut to `recipes_limit` when given.
pub async fn represent_subscriptions(
    authors: &[User],
    recipes_limit: Option<usize>,
    session: &SessionData,
    ctx: &Context,
) -> Result<Vec<SubscriptionRead>, potion::Error> {
    let users = represent_users(authors, Some(session), ctx).await?;
    let ids: Vec<Id> = authors.iter().map(|author| author.id).collect();

    let mut recipes: HashMap<Id, Vec<RecipeShort>> = HashMap::new();
    for recipe in fetch_author_recipes(&ids, &ctx.pool).await? {
        recipes
            .entry(recipe.author_id)
            .or_default()
            .push(RecipeShort::from_recipe(&recipe, &ctx.config));
    }

    Ok(users
        .into_iter()
        .map(|user| {
            let mut recipes = recipes.remove(&user.id).unwrap_or_default();
            let recipes_count = recipes.len();
            if let Some(limit) = recipes_limit {
                recipes.truncate(limit);
            }
            SubscriptionRead {
                user,
                recipes,
                recipes_count,
            }
        })
        .collect())
}

pub(super) fn required_text(
    errors: &mut ValidationError,
    field: &str,
    value: Option<String>,
    max_length: usize,
) -> String {
    let value = match value {
        Some(value) => value.trim().to_string(),
        None => {
            errors.add(field, REQUIRED);
            return String::new();
        }
    };

    if value.is_empty() {
        errors.add(field, BLANK);
    } else if value.chars().count() > max_length {
        errors.add(
            field,
            &format!("Ensure this field has no more than {max_length} characters."),
        );
    }
    value
}

fn is_valid_email(email: &str) -> bool {
    let (local, domain) = match email.rsplit_once('@') {
        Some(parts) => parts,
        None => return false,
    };

    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !domain.contains('@')
}

fn is_valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || USERNAME_SYMBOLS.contains(&c))
}

fn check_password(errors: &mut ValidationError, field: &str, password: &str) {
    let length = password.chars().count();
    if length < PASSWORD_MIN_LENGTH {
        errors.add(
            field,
            &format!("This password is too short. It must contain at least {PASSWORD_MIN_LENGTH} characters."),
        );
    }
    if length > PASSWORD_MAX_LENGTH {
        errors.add(
            field,
            &format!("Ensure this field has no more than {PASSWORD_MAX_LENGTH} characters."),
        );
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        errors.add(field, "This password is entirely numeric.");
    }
}

fn required_password(errors: &mut ValidationError, field: &str, value: Option<String>) -> String {
    match value {
        Some(password) if password.is_empty() => {
            errors.add(field, BLANK);
            password
        }
        Some(password) => password,
        None => {
            errors.add(field, REQUIRED);
            String::new()
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct RegisterPayload {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl RegisterPayload {
    pub fn validate(self) -> Result<NewUser, ValidationError> {
        let mut errors = ValidationError::new();

        let email = required_text(&mut errors, "email", self.email, EMAIL_MAX_LENGTH);
        if !email.is_empty() && !is_valid_email(&email) {
            errors.add("email", "Enter a valid email address.");
        }

        let username = required_text(&mut errors, "username", self.username, USERNAME_MAX_LENGTH);
        if !username.is_empty() && !is_valid_username(&username) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }

        let first_name = required_text(
            &mut errors,
            "first_name",
            self.first_name,
            PERSON_NAME_MAX_LENGTH,
        );
        let last_name = required_text(
            &mut errors,
            "last_name",
            self.last_name,
            PERSON_NAME_MAX_LENGTH,
        );

        let password = required_password(&mut errors, "password", self.password);
        if !password.is_empty() {
            check_password(&mut errors, "password", &password);
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(NewUser {
            email,
            username,
            first_name,
            last_name,
            password,
        })
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct LoginPayload {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginPayload {
    pub fn validate(self) -> Result<(String, String), ValidationError> {
        let mut errors = ValidationError::new();
        let email = required_text(&mut errors, "email", self.email, EMAIL_MAX_LENGTH);
        let password = required_password(&mut errors, "password", self.password);

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok((email, password))
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct SetPasswordPayload {
    pub new_password: Option<String>,
    pub current_password: Option<String>,
}

impl SetPasswordPayload {
    /// Returns `(current_password, new_password)`.
    pub fn validate(self) -> Result<(String, String), ValidationError> {
        let mut errors = ValidationError::new();
        let current = required_password(&mut errors, "current_password", self.current_password);
        let new = required_password(&mut errors, "new_password", self.new_password);
        if !new.is_empty() {
            check_password(&mut errors, "new_password", &new);
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok((current, new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> RegisterPayload {
        RegisterPayload {
            email: Some("vivi@example.com".to_string()),
            username: Some("vivi.k".to_string()),
            first_name: Some("Vivi".to_string()),
            last_name: Some("Kallio".to_string()),
            password: Some("paprika-42".to_string()),
        }
    }

    #[test]
    fn valid_registration() {
        let user = payload().validate().unwrap();

        assert_eq!(user.username, "vivi.k");
        assert_eq!(user.password, "paprika-42");
    }

    #[test]
    fn missing_fields_are_required() {
        let errors = RegisterPayload::default().validate().unwrap_err();

        for field in ["email", "username", "first_name", "last_name", "password"] {
            assert_eq!(errors.messages(field), [REQUIRED], "{field}");
        }
    }

    #[test]
    fn malformed_email_and_username() {
        let mut data = payload();
        data.email = Some("vivi.example.com".to_string());
        data.username = Some("vivi kallio".to_string());
        let errors = data.validate().unwrap_err();

        assert_eq!(errors.messages("email"), ["Enter a valid email address."]);
        assert_eq!(errors.messages("username").len(), 1);
        assert!(errors.messages("password").is_empty());
    }

    #[test]
    fn weak_passwords_are_rejected() {
        let mut data = payload();
        data.password = Some("1234".to_string());
        let errors = data.validate().unwrap_err();

        assert_eq!(errors.messages("password").len(), 2);
    }

    #[test]
    fn username_symbols() {
        assert!(is_valid_username("a.b@c+d-e_f"));
        assert!(is_valid_username("kokki"));
        assert!(!is_valid_username("kok/ki"));
    }

    #[test]
    fn set_password_checks_new_password() {
        let payload = SetPasswordPayload {
            new_password: Some("short".to_string()),
            current_password: None,
        };
        let errors = payload.validate().unwrap_err();

        assert_eq!(errors.messages("current_password"), [REQUIRED]);
        assert_eq!(errors.messages("new_password").len(), 1);
    }
}
