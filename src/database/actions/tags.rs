use crate::{
    cache::{CacheKeyType, RedisValue},
    catalog::TagRecord,
    error::FoodgramError,
    schema::{Tag, Uuid},
};

use redis::aio::MultiplexedConnection;
use sqlx::{Pool, Postgres, QueryBuilder};

pub async fn get_tag(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Tag>, FoodgramError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, FoodgramError> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await?;

    Ok(list)
}

/// Serves the tag list from Redis when a cache is available.
pub async fn list_tags_cached(
    pool: &Pool<Postgres>,
    cache: Option<MultiplexedConnection>,
) -> Result<Vec<Tag>, FoodgramError> {
    let Some(mut cache) = cache else {
        return list_tags(pool).await;
    };

    let p = pool.clone();
    match RedisValue::get_or(CacheKeyType::Tags.new("all"), &mut cache, || async move {
        list_tags(&p).await
    })
    .await
    {
        Ok(tags) => Ok(tags),
        Err(e @ FoodgramError::Cache(_)) => {
            log::error!("> Tag cache unavailable: {e}");
            list_tags(pool).await
        }
        Err(e) => Err(e),
    }
}

pub async fn list_recipe_tags(
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<Vec<(Uuid, Tag)>, FoodgramError> {
    let rows: Vec<(Uuid, Uuid, String, String, String)> = sqlx::query_as(
        "
        SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(recipe_id, id, name, color, slug)| {
            (
                recipe_id,
                Tag {
                    id,
                    name,
                    color,
                    slug,
                },
            )
        })
        .collect())
}

/// Returns the ids from `ids` that have no tag row.
pub async fn missing_tags(ids: &[Uuid], pool: &Pool<Postgres>) -> Result<Vec<Uuid>, FoodgramError> {
    let found: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await?;

    Ok(ids
        .iter()
        .filter(|id| !found.iter().any(|(found,)| found == *id))
        .copied()
        .collect())
}

pub async fn insert_tags(records: &[TagRecord], pool: &Pool<Postgres>) -> Result<u64, FoodgramError> {
    let mut inserted = 0;

    for chunk in records.chunks(65535 / 3) {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO tags (name, color, slug) ");

        query_builder.push_values(chunk, |mut b, tag| {
            b.push_bind(&tag.name)
                .push_bind(&tag.color)
                .push_bind(&tag.slug);
        });
        query_builder.push(" ON CONFLICT DO NOTHING");

        inserted += query_builder.build().execute(pool).await?.rows_affected();
    }

    Ok(inserted)
}
