use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use potion::Error;
use warp::reject::{Reject, Rejection};

pub use potion::HtmlError;

pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";

/// Statuses `HtmlError` has no variant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    PermissionDenied,
    NotFound,
}

impl ApiError {
    pub fn new(self, info: &str) -> Error {
        let code = match self {
            ApiError::PermissionDenied => 403,
            ApiError::NotFound => 404,
        };

        Error {
            code,
            info: Some(info.to_string()),
            redirect: None,
        }
    }

    pub fn default(self) -> Error {
        match self {
            ApiError::PermissionDenied => {
                self.new("You do not have permission to perform this action.")
            }
            ApiError::NotFound => self.new("Not found."),
        }
    }
}

/// Carries a `potion::Error` through warp's rejection chain.
#[derive(Debug)]
pub struct ApiRejection(pub Error);

impl Reject for ApiRejection {}

pub fn reject(error: Error) -> Rejection {
    warp::reject::custom(ApiRejection(error))
}

pub struct QueryError {
    kind: HtmlError,
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            kind: HtmlError::InternalServerError,
            info,
        }
    }

    fn invalid(info: &str) -> Self {
        Self {
            kind: HtmlError::InvalidRequest,
            info: info.to_string(),
        }
    }
}

fn unique_violation_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_email_key") | Some("users_email_lower_idx") => {
            "A user with this email already exists."
        }
        Some("users_username_key") => "A user with this username already exists.",
        Some("recipes_name_key") => "A recipe with this name already exists.",
        Some("tags_name_key") => "A tag with this name already exists.",
        Some("tags_color_key") => "A tag with this color already exists.",
        Some("tags_slug_key") | Some("unique_tag") => "A tag with this slug already exists.",
        Some("unique_follow") => "You are already subscribed to this author.",
        Some("unique_favorite") => "Recipe is already in favorites.",
        Some("unique_shopping_cart") => "Recipe is already in the shopping cart.",
        Some("unique_recipe_ingredient") => "Ingredients must not repeat.",
        Some("unique_recipe_tag") => "Tags must not repeat.",
        _ => "Object already exists.",
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) if e.is_unique_violation() => {
                Self::invalid(unique_violation_message(e.constraint()))
            }
            sqlx::Error::Database(e) if e.is_foreign_key_violation() => {
                Self::invalid("Referenced object does not exist.")
            }
            sqlx::Error::Database(e) if e.is_check_violation() => {
                Self::invalid("Value is out of the allowed range.")
            }
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(format!("{e}")),
            sqlx::Error::RowNotFound => Self::new(format!("RowNotFound")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("{e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new(format!("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(format!("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(format!("Worker crashed")),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            _ => Self::new(format!("Unknown error")),
        }
    }
}

impl Into<Error> for QueryError {
    fn into(self) -> Error {
        if matches!(self.kind, HtmlError::InternalServerError) {
            log::error!("Query failed: {}", self.info);
        }
        self.kind.new(&self.info)
    }
}

pub struct CacheError {
    info: String,
}

impl From<redis::RedisError> for CacheError {
    fn from(value: redis::RedisError) -> Self {
        Self {
            info: format!("{:?} - {:?}", value.code(), value.detail()),
        }
    }
}

impl Into<Error> for CacheError {
    fn into(self) -> Error {
        HtmlError::InternalServerError.new(&self.info)
    }
}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl Into<Error> for TypeError {
    fn into(self) -> Error {
        HtmlError::InvalidRequest.new(&self.info)
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

/// Field-level validation messages, rendered as `{"field": ["message"]}`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationError {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(field: &str, message: &str) -> Self {
        let mut error = Self::new();
        error.add(field, message);
        error
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn merge(&mut self, other: ValidationError) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.fields.get(field).map(|m| m.as_slice()).unwrap_or(&[])
    }

    pub fn into_result(self) -> Result<(), Error> {
        if self.is_empty() {
            return Ok(());
        }
        Err(self.into())
    }
}

impl Into<Error> for ValidationError {
    fn into(self) -> Error {
        HtmlError::InvalidRequest.new(&serde_json::to_string(&self.fields).unwrap_or_default())
    }
}
