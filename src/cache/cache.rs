use std::{
    fmt::{self, Debug, Display},
    future::Future,
};

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    actions::{get_ingredient, list_tags},
    error::{CacheError, CoreError},
    schema::{Id, Ingredient, Tag},
};

const TAG_CACHE_KEY: &str = "tag-cache-key";
const INGREDIENT_CACHE_KEY: &str = "ingredient-cache-key";

// Caching - keys

#[derive(Clone, Debug)]
pub struct CacheKey<T: ToString> {
    value: T,
    r#type: CacheKeyType,
}

impl<T: ToString> CacheKey<T> {
    pub fn from(r#type: CacheKeyType, key: T) -> Self {
        Self { value: key, r#type }
    }

    pub fn lifetime(&self) -> CacheLifetime {
        match &self.r#type {
            CacheKeyType::Tags => CacheLifetime::BindTagCache,
            CacheKeyType::Ingredient => CacheLifetime::BindIngredientCache,
            CacheKeyType::Custom(value) => CacheLifetime::Custom(value.to_owned()),
        }
    }
}

impl<T: ToString> Display for CacheKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.r#type {
            CacheKeyType::Tags => write!(f, "tags-{}", self.value.to_string()),
            CacheKeyType::Ingredient => write!(f, "ingredient-{}", self.value.to_string()),
            CacheKeyType::Custom(_) => write!(f, "{}", self.value.to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum CacheKeyType {
    Tags,
    Ingredient,
    Custom(String),
}

impl CacheKeyType {
    pub fn new<T: ToString>(self, key: T) -> CacheKey<T> {
        CacheKey::from(self, key)
    }
}

// Cache - wrappers

/// What a cached value is bound to. Rotating a bind key invalidates every
/// value stored under the old one.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum CacheLifetime {
    Infinite,
    Custom(String),
    BindTagCache,
    BindIngredientCache,
}

impl CacheLifetime {
    fn bind_key(&self) -> Option<&'static str> {
        match self {
            CacheLifetime::BindTagCache => Some(TAG_CACHE_KEY),
            CacheLifetime::BindIngredientCache => Some(INGREDIENT_CACHE_KEY),
            CacheLifetime::Infinite | CacheLifetime::Custom(_) => None,
        }
    }

    pub async fn get_cache_bind(
        &self,
        cache: &mut MultiplexedConnection,
    ) -> Result<Option<String>, CoreError> {
        match (self, self.bind_key()) {
            (CacheLifetime::Custom(value), _) => Ok(Some(value.to_owned())),
            (_, Some(key)) => get_cache_value::<&str, String>(key, cache).await,
            (_, None) => Ok(None),
        }
    }

    pub async fn validate_cache_bind(
        &self,
        bind: &Option<String>,
        lifetime: &Self,
        cache: &mut MultiplexedConnection,
    ) -> Result<bool, CoreError> {
        match (self, lifetime) {
            (CacheLifetime::Custom(value), CacheLifetime::Custom(expected)) => Ok(value == expected),
            (CacheLifetime::Custom(_), _) | (_, CacheLifetime::Custom(_)) => {
                log::error!("Found conflicting bindings");
                Err(CacheError::new("Conflicting cache bindings".to_owned()).into())
            }
            _ => Ok(bind == &self.get_cache_bind(cache).await?),
        }
    }

    /// Points the bind key at a fresh value.
    pub async fn rotate(&self, cache: &mut MultiplexedConnection) -> Result<(), CoreError> {
        match self.bind_key() {
            Some(key) => set_cache_value(key, Uuid::new_v4().to_string(), cache).await,
            None => Ok(()),
        }
    }
}

#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone)]
pub struct RedisValue<T: Serialize + Send + Sync + Clone> {
    pub value: T,
    lifetime: CacheLifetime,
    bind: Option<String>,
}

impl<T> RedisValue<T>
where
    T: Serialize + Send + Sync + Clone + for<'a> Deserialize<'a>,
{
    async fn new(
        value: T,
        lifetime: CacheLifetime,
        cache: &mut MultiplexedConnection,
    ) -> Result<Self, CoreError> {
        let bind = lifetime.get_cache_bind(cache).await?;

        Ok(Self {
            value,
            lifetime,
            bind,
        })
    }

    async fn validate<K: ToString>(
        &self,
        key: &CacheKey<K>,
        cache: &mut MultiplexedConnection,
    ) -> Result<bool, CoreError> {
        self.lifetime
            .validate_cache_bind(&self.bind, &key.lifetime(), cache)
            .await
    }

    /// A stored value that fails to decode is deleted in the background and
    /// treated as a miss.
    async fn lookup<K: ToString>(
        key: &CacheKey<K>,
        cache: &mut MultiplexedConnection,
    ) -> Result<Option<Self>, CoreError> {
        let value = get_cache_value::<String, RedisValue<T>>(key.to_string(), cache)
            .await
            .unwrap_or_else(|_| {
                let mut c = cache.clone();
                let k = key.to_string();
                tokio::spawn(async move {
                    log::error!("> Failed to deserialize cached value. Deleting {}", &k);
                    if let Err(e) = delete_cache_value(k, &mut c).await {
                        log::error!("> Failed to delete cached value! {e}");
                    }
                });
                None
            });

        // * Cannot use .map(|| {...}) due to async closures
        match value {
            Some(value) => {
                log::trace!("> Found {}", key);
                match value.validate(key, cache).await? {
                    true => Ok(Some(value)),
                    false => {
                        log::trace!("> Invalidated {}", key);
                        Ok(None)
                    }
                }
            }
            None => Ok(None),
        }
    }

    pub async fn get_or_optional<F, Fut, K>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<Option<RedisValue<T>>, CoreError>
    where
        K: ToString,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, CoreError>>,
    {
        if let Some(value) = Self::lookup(&key, cache).await? {
            return Ok(Some(value));
        }

        log::trace!("> Fetching {}", key);
        match callback().await? {
            Some(value) => {
                let value = RedisValue::new(value, key.lifetime(), cache).await?;

                // A failed write only costs the next lookup a refetch
                if let Err(e) = set_cache_value(key.to_string(), value.clone(), cache).await {
                    log::error!("{e:?}");
                }

                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub async fn get_or<F, Fut, K>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<RedisValue<T>, CoreError>
    where
        K: ToString,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        if let Some(value) = Self::lookup(&key, cache).await? {
            return Ok(value);
        }

        log::trace!("> Fetching {}", key);
        let value = callback().await?;
        let value = RedisValue::new(value, key.lifetime(), cache).await?;

        set_cache_value(key.to_string(), value.clone(), cache).await?;

        Ok(value)
    }
}

// Cache - domain helpers

pub async fn cached_tags(
    cache: &mut MultiplexedConnection,
    pool: &Pool<Postgres>,
) -> Result<Vec<Tag>, CoreError> {
    let value =
        RedisValue::get_or(CacheKeyType::Tags.new("all"), cache, || list_tags(pool)).await?;

    Ok(value.value)
}

pub async fn cached_ingredient(
    id: Id,
    cache: &mut MultiplexedConnection,
    pool: &Pool<Postgres>,
) -> Result<Option<Ingredient>, CoreError> {
    let value = RedisValue::get_or_optional(CacheKeyType::Ingredient.new(id), cache, || {
        get_ingredient(id, pool)
    })
    .await?;

    Ok(value.map(|v| v.value))
}

/// Call after any write to the tags table.
pub async fn invalidate_tags(cache: &mut MultiplexedConnection) -> Result<(), CoreError> {
    CacheLifetime::BindTagCache.rotate(cache).await
}

/// Call after any write to the ingredients table.
pub async fn invalidate_ingredients(cache: &mut MultiplexedConnection) -> Result<(), CoreError> {
    CacheLifetime::BindIngredientCache.rotate(cache).await
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), CoreError> {
    let _: () = cache.set(key, value).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), CoreError> {
    let _: () = cache.del(key).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, CoreError> {
    let value: Option<V> = cache.get(key).await.map_err(CacheError::from)?;

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names() {
        assert_eq!(CacheKeyType::Tags.new("all").to_string(), "tags-all");
        assert_eq!(CacheKeyType::Ingredient.new(12).to_string(), "ingredient-12");
        assert_eq!(
            CacheKeyType::Custom("v1".to_owned())
                .new("session-7")
                .to_string(),
            "session-7"
        );
    }

    #[test]
    fn keys_bind_to_their_table() {
        assert_eq!(
            CacheKeyType::Tags.new("all").lifetime(),
            CacheLifetime::BindTagCache
        );
        assert_eq!(
            CacheKeyType::Ingredient.new(1).lifetime(),
            CacheLifetime::BindIngredientCache
        );
        assert_eq!(
            CacheKeyType::Custom("v1".to_owned()).new("x").lifetime(),
            CacheLifetime::Custom("v1".to_owned())
        );
    }
}
