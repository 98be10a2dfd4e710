use std::{fmt::Debug, future::Future};

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{Deserialize, Serialize};

use crate::error::FoodgramError;

const CATALOG_CACHE_KEY: &str = "catalog-cache-key";

// Caching - keys

#[derive(Clone, Debug, PartialEq)]
pub struct CacheKey {
    _value: String,
    _type: CacheKeyType,
}

impl CacheKey {
    pub fn to_string(&self) -> String {
        self.into()
    }
}

impl From<&CacheKey> for String {
    fn from(key: &CacheKey) -> Self {
        match &key._type {
            CacheKeyType::Tags => format!("tags-{}", key._value),
            CacheKeyType::Ingredients => format!("ingredients-{}", key._value),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum CacheKeyType {
    Tags,
    Ingredients,
}

impl CacheKeyType {
    pub fn new<T: ToString>(self, key: T) -> CacheKey {
        CacheKey {
            _value: key.to_string(),
            _type: self,
        }
    }
}

// Cache - wrappers

/// Catalog values are bound to a generation key; rotating the key with
/// [`invalidate_catalog_cache`] orphans every value stored under the old one.
#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone, Debug)]
pub struct RedisValue<T: Serialize + Send + Sync + Clone> {
    pub value: T,
    _bind: Option<String>,
}

impl<T> RedisValue<T>
where
    T: Serialize + Send + Sync + Clone + for<'a> Deserialize<'a>,
{
    async fn new(value: T, cache: &mut MultiplexedConnection) -> Result<Self, FoodgramError> {
        let bind = get_cache_value::<&str, String>(CATALOG_CACHE_KEY, cache).await?;

        Ok(Self { value, _bind: bind })
    }

    async fn validate(&self, cache: &mut MultiplexedConnection) -> Result<bool, FoodgramError> {
        let bind = get_cache_value::<&str, String>(CATALOG_CACHE_KEY, cache).await?;

        Ok(bind == self._bind)
    }

    pub async fn get_or<F, Fut>(
        key: CacheKey,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<T, FoodgramError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, FoodgramError>> + Send,
    {
        let k = key.to_string();
        let value = get_cache_value::<&str, RedisValue<T>>(&k, cache)
            .await
            .unwrap_or_else(|e| {
                log::error!("> Failed to read cached value {k}: {e}");
                None
            });

        // * Cannot use .map(|| {...}) due to async closures
        let value = match value {
            Some(value) => {
                log::trace!("> Found {k}");
                match value.validate(cache).await? {
                    true => Some(value),
                    false => {
                        log::trace!("> Invalidated {k}");
                        None
                    }
                }
            }
            None => None,
        };

        match value {
            Some(value) => Ok(value.value),
            None => {
                log::trace!("> Fetching {k}");
                let value = callback().await?;
                let wrapped = RedisValue::new(value, cache).await?;

                if let Err(e) = set_cache_value(&k, wrapped.clone(), cache).await {
                    log::error!("> Failed to store {k}: {e}");
                }

                Ok(wrapped.value)
            }
        }
    }
}

pub async fn invalidate_catalog_cache(
    cache: &mut MultiplexedConnection,
) -> Result<(), FoodgramError> {
    let generation = uuid::Uuid::new_v4().to_string();
    log::info!("> Rotating catalog cache generation to {generation}");

    set_cache_value(CATALOG_CACHE_KEY, generation, cache).await
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), FoodgramError> {
    let _: () = cache.set(key, value).await?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, FoodgramError> {
    let value: Option<V> = cache.get(key).await?;

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_type() {
        assert_eq!(CacheKeyType::Tags.new("all").to_string(), "tags-all");
        assert_eq!(
            CacheKeyType::Ingredients.new("мук").to_string(),
            "ingredients-мук"
        );
    }

    #[test]
    fn wrapped_values_round_trip_through_json() {
        let value = RedisValue {
            value: vec![String::from("flour")],
            _bind: Some(String::from("generation")),
        };
        let json = serde_json::to_string(&value).unwrap();
        let back: RedisValue<Vec<String>> = serde_json::from_str(&json).unwrap();

        assert_eq!(back.value, value.value);
        assert_eq!(back._bind, value._bind);
    }
}
