mod database {
    pub mod actions;
    pub mod error;
    pub mod filters;
    pub mod form;
    pub mod pagination;
    pub mod schema;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod cache {
    pub mod cache;
}
pub mod serialization {
    pub mod catalog;
    pub mod image;
    pub mod recipes;
    pub mod users;
}
mod api {
    pub mod auth;
    pub mod catalog;
    pub mod recipes;
    pub mod rejection;
    pub mod routes;
    pub mod users;
}
pub mod config;
pub mod constants;
pub mod context;
pub mod shopping_list;

pub use api::routes::routes;
pub use authentication::*;
pub use cache::cache::*;
pub use config::*;
pub use context::*;
pub use database::*;
