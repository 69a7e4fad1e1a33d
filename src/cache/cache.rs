use std::future::Future;

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::{
    constants::{INGREDIENT_CACHE_BIND, TAG_CACHE_BIND},
    error::{CacheError, HtmlError},
};

/// Redis client whose multiplexed connection is opened on first use.
pub struct Cache {
    client: redis::Client,
    connection: OnceCell<MultiplexedConnection>,
}

impl Cache {
    pub fn open(url: &str) -> Result<Self, potion::Error> {
        let client = redis::Client::open(url).map_err(|e| CacheError::from(e).into())?;

        Ok(Self {
            client,
            connection: OnceCell::new(),
        })
    }

    pub async fn connection(&self) -> Result<MultiplexedConnection, potion::Error> {
        let connection = self
            .connection
            .get_or_try_init(|| async {
                self.client
                    .get_multiplexed_async_connection()
                    .await
                    .map_err(|e| -> potion::Error { CacheError::from(e).into() })
            })
            .await?;

        Ok(connection.clone())
    }
}

// Caching - keys

#[derive(Serialize, Clone, Debug)]
pub struct CacheKey<T: ToString + Serialize> {
    _value: T,
    _type: CacheKeyType,
}

impl<T: ToString + Serialize> CacheKey<T> {
    pub fn from(r#type: CacheKeyType, key: T) -> Self {
        Self {
            _value: key,
            _type: r#type,
        }
    }

    pub fn to_string(&self) -> String {
        self.into()
    }
}

impl<T: ToString + Serialize> Into<String> for &CacheKey<T> {
    fn into(self) -> String {
        match self._type {
            CacheKeyType::Tags => format!("tags-{}", self._value.to_string()),
            CacheKeyType::Ingredients => format!("ingredients-{}", self._value.to_string()),
        }
    }
}

/// Catalog a cached list belongs to.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheKeyType {
    Tags,
    Ingredients,
}

impl CacheKeyType {
    pub fn new<T: ToString + Serialize>(self, key: T) -> CacheKey<T> {
        CacheKey::from(self, key)
    }
}

impl<T: ToString + Serialize> Into<CacheLifetime> for CacheKey<T> {
    fn into(self) -> CacheLifetime {
        match self._type {
            CacheKeyType::Tags => CacheLifetime::BindTagCache,
            CacheKeyType::Ingredients => CacheLifetime::BindIngredientCache,
        }
    }
}

// Cache - wrappers

/// Cached values stay valid while their bind key holds the value they were stored under.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheLifetime {
    BindTagCache,
    BindIngredientCache,
}

impl CacheLifetime {
    fn bind_key(&self) -> &'static str {
        match self {
            CacheLifetime::BindTagCache => TAG_CACHE_BIND,
            CacheLifetime::BindIngredientCache => INGREDIENT_CACHE_BIND,
        }
    }

    pub async fn get_cache_bind(
        &self,
        cache: &mut MultiplexedConnection,
    ) -> Result<Option<String>, potion::Error> {
        get_cache_value::<&str, String>(self.bind_key(), cache).await
    }

    /// Rotates the bind so every value stored under it stops validating.
    pub async fn invalidate(&self, cache: &mut MultiplexedConnection) -> Result<(), potion::Error> {
        log::debug!("> Rotating {}", self.bind_key());
        set_cache_value(self.bind_key(), uuid::Uuid::new_v4().to_string(), cache).await
    }

    pub async fn validate_cache_bind(
        &self,
        bind: &Option<String>,
        lifetime: Self,
        cache: &mut MultiplexedConnection,
    ) -> Result<bool, potion::Error> {
        if *self != lifetime {
            log::error!("Found conflicting bindings");
            return Err(HtmlError::InternalServerError.new("Conflicting cache bindings"));
        }
        Ok(bind == &self.get_cache_bind(cache).await?)
    }
}

#[derive(Serialize, serde::Deserialize, FromRedisValue, ToRedisArgs, Clone)]
pub struct RedisValue<T: serde::Serialize + Send + Sync + Clone> {
    pub value: T,
    _lifetime: CacheLifetime,
    _bind: Option<String>,
}

impl<T: serde::Serialize + Send + Sync + Clone + for<'a> Deserialize<'a>> RedisValue<T> {
    async fn new(
        value: T,
        lifetime: CacheLifetime,
        cache: &mut MultiplexedConnection,
    ) -> Result<Self, potion::Error> {
        let bind = lifetime.get_cache_bind(cache).await?;

        Ok(Self {
            value,
            _lifetime: lifetime,
            _bind: bind,
        })
    }

    async fn validate<K: ToString + Serialize>(
        &self,
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
    ) -> Result<bool, potion::Error> {
        self._lifetime
            .validate_cache_bind(&self._bind, key.into(), cache)
            .await
    }

    /// Returns the cached list under `key`, or stores and returns what `callback` fetches.
    pub async fn get_or_list<'a, F, Fut, K>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<RedisValue<Vec<T>>, potion::Error>
    where
        Vec<T>: serde::Serialize + Send + Sync,
        K: ToString + Serialize + Clone + Send + Sync,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<T>, potion::Error>> + Send + 'a,
    {
        let value = get_cache_value::<String, RedisValue<Vec<T>>>((&key).into(), cache)
            .await
            .unwrap_or_else(|_| {
                let mut c = cache.clone();
                let k = key.to_string();
                tokio::spawn(async move {
                    log::error!("> Failed to deserialize cached value. Deleting {}", &k);
                    if let Err(e) = delete_cache_value(k, &mut c).await {
                        log::error!("> Failed to delete cached value! {e:?}");
                    }
                });
                None
            });
        // * Cannot use .map(|| {...}) due to async closures
        let value = match value {
            Some(value) => {
                log::trace!("> Found {:?}", key.to_string());
                match value.validate(key.to_owned(), cache).await? {
                    true => Some(value),
                    false => {
                        log::trace!("> Invalidated {:?}", key.to_string());
                        None
                    }
                }
            }
            None => None,
        };

        match value {
            Some(value) => Ok(value),
            None => {
                log::trace!("> Fetching {:?}", key.to_string());
                let value = callback().await?;
                let lifetime: CacheLifetime = key.to_owned().into();
                let value = RedisValue::new(value, lifetime, cache).await?;

                if let Err(e) = set_cache_value::<String, RedisValue<Vec<T>>>(
                    (&key).into(),
                    value.clone(),
                    cache,
                )
                .await
                {
                    log::error!("{e:?}");
                }

                Ok(value)
            }
        }
    }
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), potion::Error> {
    let _: () = cache
        .set(key, value)
        .await
        .map_err(|e| CacheError::from(e).into())?;

    Ok(())
}

pub async fn set_expiring_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    seconds: u64,
    cache: &mut MultiplexedConnection,
) -> Result<(), potion::Error> {
    let _: () = cache
        .set_ex(key, value, seconds)
        .await
        .map_err(|e| CacheError::from(e).into())?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), potion::Error> {
    let _: () = cache
        .del(key)
        .await
        .map_err(|e| CacheError::from(e).into())?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, potion::Error> {
    let value: Option<V> = cache
        .get(key)
        .await
        .map_err(|e| CacheError::from(e).into())?;

    Ok(value)
}

pub async fn cache_value_exists<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<bool, potion::Error> {
    let exists: bool = cache
        .exists(key)
        .await
        .map_err(|e| CacheError::from(e).into())?;

    Ok(exists)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_type() {
        assert_eq!(CacheKeyType::Tags.new("all").to_string(), "tags-all");
        assert_eq!(CacheKeyType::Ingredients.new("sug").to_string(), "ingredients-sug");
        assert_eq!(CacheKeyType::Ingredients.new("").to_string(), "ingredients-");
    }

    #[test]
    fn keys_bind_to_their_catalog() {
        let lifetime: CacheLifetime = CacheKeyType::Tags.new("all").into();
        assert_eq!(lifetime, CacheLifetime::BindTagCache);
        assert_eq!(lifetime.bind_key(), TAG_CACHE_BIND);

        let lifetime: CacheLifetime = CacheKeyType::Ingredients.new("").into();
        assert_eq!(lifetime.bind_key(), INGREDIENT_CACHE_BIND);
    }

    #[test]
    fn opening_a_client_does_not_connect() {
        assert!(Cache::open("redis://127.0.0.1:1/").is_ok());
        assert!(Cache::open("not a url").is_err());
    }
}
