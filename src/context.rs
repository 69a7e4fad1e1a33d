use std::{convert::Infallible, sync::Arc};

use sqlx::{Pool, Postgres};
use warp::Filter;

use crate::{serialization::image::ImageStore, Cache, Config};

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct Context {
    pub pool: Pool<Postgres>,
    pub cache: Arc<Cache>,
    pub config: Arc<Config>,
}

impl Context {
    pub fn new(pool: Pool<Postgres>, cache: Cache, config: Config) -> Self {
        Self {
            pool,
            cache: Arc::new(cache),
            config: Arc::new(config),
        }
    }

    pub fn images(&self) -> ImageStore {
        ImageStore::new(self.config.media_root.clone())
    }
}

pub fn with_context(ctx: Context) -> impl Filter<Extract = (Context,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}
