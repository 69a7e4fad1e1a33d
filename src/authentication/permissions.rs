use warp::http::Method;

use crate::{
    error::{HtmlError, NOT_AUTHENTICATED},
    jwt::SessionData,
    schema::{Id, UserRole},
};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (UserRole::Anonymous, &[ActionType::ReadContent]),
    (
        UserRole::User,
        &[
            ActionType::ReadContent,
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnEngagements,
            ActionType::ManageOwnSubscriptions,
            ActionType::ManageOwnAccount,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::ReadContent,
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnEngagements,
            ActionType::ManageOwnSubscriptions,
            ActionType::ManageOwnAccount,
            ActionType::ManageAllRecipes,
            ActionType::ManageCatalog,
        ],
    ),
];

#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum ActionType {
    ReadContent,
    CreateRecipes,

    ManageOwnRecipes,
    ManageOwnEngagements,
    ManageOwnSubscriptions,
    ManageOwnAccount,

    ManageAllRecipes,
    ManageCatalog,
}

impl ActionType {
    pub fn authenticate(self, role: &UserRole) -> bool {
        ACTION_TABLE
            .iter()
            .find_map(|(uid, actions)| {
                if role != uid {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}

pub fn is_safe_method(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD || method == Method::OPTIONS
}

/// Reads are open to everyone, writes need an authenticated caller.
pub fn has_permission(method: &Method, session: Option<&SessionData>) -> Result<(), potion::Error> {
    if is_safe_method(method) || session.is_some() {
        return Ok(());
    }
    Err(HtmlError::Unauthorized.new(NOT_AUTHENTICATED))
}

/// Mutating an owned object needs its author or an admin.
pub fn has_object_permission(
    method: &Method,
    session: Option<&SessionData>,
    author_id: Id,
) -> Result<(), potion::Error> {
    if is_safe_method(method) {
        return Ok(());
    }

    match session {
        None => Err(HtmlError::Unauthorized.new(NOT_AUTHENTICATED)),
        Some(session) if session.user_id == author_id => {
            session.authenticate(ActionType::ManageOwnRecipes)
        }
        Some(session) => session.authenticate(ActionType::ManageAllRecipes),
    }
}

/// Catalog resources: reads are open, writes are for admins only.
pub fn has_admin_permission(
    method: &Method,
    session: Option<&SessionData>,
) -> Result<(), potion::Error> {
    if is_safe_method(method) {
        return Ok(());
    }

    match session {
        None => Err(HtmlError::Unauthorized.new(NOT_AUTHENTICATED)),
        Some(session) => session.authenticate(ActionType::ManageCatalog),
    }
}
