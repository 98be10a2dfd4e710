use redis::aio::MultiplexedConnection;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    cache::{CacheKeyType, RedisValue},
    catalog::IngredientRecord,
    error::FoodgramError,
    schema::{Ingredient, Uuid},
};

pub async fn get_ingredient(
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Option<Ingredient>, FoodgramError> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Case-insensitive prefix search, the whole catalog when `name` is empty.
pub async fn list_ingredients(
    name: &str,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, FoodgramError> {
    let rows: Vec<Ingredient> = sqlx::query_as(
        "SELECT * FROM ingredients WHERE name ILIKE $1 ESCAPE '\\' ORDER BY name, measurement_unit",
    )
    .bind(prefix_pattern(name))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Serves prefix searches from one cached copy of the whole catalog, so the
/// set of cache keys stays fixed whatever clients search for.
pub async fn list_ingredients_cached(
    name: &str,
    pool: &Pool<Postgres>,
    cache: Option<MultiplexedConnection>,
) -> Result<Vec<Ingredient>, FoodgramError> {
    let Some(mut cache) = cache else {
        return list_ingredients(name, pool).await;
    };

    let p = pool.clone();
    match RedisValue::get_or(
        CacheKeyType::Ingredients.new("all"),
        &mut cache,
        || async move { list_ingredients("", &p).await },
    )
    .await
    {
        Ok(rows) => Ok(filter_by_prefix(rows, name)),
        Err(e @ FoodgramError::Cache(_)) => {
            log::error!("> Ingredient cache unavailable: {e}");
            list_ingredients(name, pool).await
        }
        Err(e) => Err(e),
    }
}

/// In-memory counterpart of the `ILIKE 'prefix%'` search.
fn filter_by_prefix(rows: Vec<Ingredient>, name: &str) -> Vec<Ingredient> {
    let prefix = name.trim().to_lowercase();
    if prefix.is_empty() {
        return rows;
    }

    rows.into_iter()
        .filter(|row| row.name.to_lowercase().starts_with(&prefix))
        .collect()
}

/// Returns the ids from `ids` that have no ingredient row.
pub async fn missing_ingredients(
    ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<Vec<Uuid>, FoodgramError> {
    let found: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await?;

    Ok(ids
        .iter()
        .filter(|id| !found.iter().any(|(found,)| found == *id))
        .copied()
        .collect())
}

pub async fn insert_ingredients(
    records: &[IngredientRecord],
    pool: &Pool<Postgres>,
) -> Result<u64, FoodgramError> {
    let mut inserted = 0;

    for chunk in records.chunks(65535 / 2) {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO ingredients (name, measurement_unit) ");

        query_builder.push_values(chunk, |mut b, ingredient| {
            b.push_bind(&ingredient.name)
                .push_bind(&ingredient.measurement_unit);
        });
        query_builder.push(" ON CONFLICT DO NOTHING");

        inserted += query_builder.build().execute(pool).await?.rows_affected();
    }

    Ok(inserted)
}

fn prefix_pattern(name: &str) -> String {
    let mut pattern = String::with_capacity(name.len() + 1);
    for c in name.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
