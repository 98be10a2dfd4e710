use crate::{
    error::FoodgramError,
    schema::{ShortRecipe, Subscription, User, UserProfile, Uuid},
};

use sqlx::{Pool, Postgres};

pub async fn get_user_by_id(
    pool: &Pool<Postgres>,
    user_id: Uuid,
) -> Result<Option<User>, FoodgramError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Profile of `user_id` as seen by `viewer`. Anonymous viewers are never
/// subscribed.
pub async fn get_user_profile(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    viewer: Option<Uuid>,
) -> Result<Option<UserProfile>, FoodgramError> {
    let row: Option<UserProfile> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            EXISTS (
                SELECT 1 FROM subscriptions s
                WHERE s.follower_id = $2 AND s.following_id = u.id
            ) AS is_subscribed
        FROM users u
        WHERE u.id = $1
    ",
    )
    .bind(user_id)
    .bind(viewer)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn list_user_profiles(
    pool: &Pool<Postgres>,
    user_ids: &[Uuid],
    viewer: Option<Uuid>,
) -> Result<Vec<UserProfile>, FoodgramError> {
    let rows: Vec<UserProfile> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            EXISTS (
                SELECT 1 FROM subscriptions s
                WHERE s.follower_id = $2 AND s.following_id = u.id
            ) AS is_subscribed
        FROM users u
        WHERE u.id = ANY($1)
    ",
    )
    .bind(user_ids)
    .bind(viewer)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Followed user with their newest recipes, `recipes_limit` of them when set.
pub async fn get_subscription(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    viewer: Uuid,
    recipes_limit: Option<i64>,
) -> Result<Subscription, FoodgramError> {
    let user = get_user_profile(pool, user_id, Some(viewer))
        .await?
        .ok_or_else(|| FoodgramError::not_found("User doesn't exist"))?;

    let recipes: Vec<ShortRecipe> = sqlx::query_as(
        "
        SELECT id, name, image, cooking_time
        FROM recipes
        WHERE author_id = $1
        ORDER BY pub_date DESC, id DESC
        LIMIT $2
    ",
    )
    .bind(user_id)
    .bind(recipes_limit.map(|limit| limit.max(0)))
    .fetch_all(pool)
    .await?;

    let recipes_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok(Subscription {
        user,
        recipes,
        recipes_count: recipes_count.0,
    })
}

pub async fn list_subscriptions(
    pool: &Pool<Postgres>,
    viewer: Uuid,
    recipes_limit: Option<i64>,
) -> Result<Vec<Subscription>, FoodgramError> {
    let followed: Vec<(Uuid,)> = sqlx::query_as(
        "
        SELECT s.following_id
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.following_id
        WHERE s.follower_id = $1
        ORDER BY u.username
    ",
    )
    .bind(viewer)
    .fetch_all(pool)
    .await?;

    let mut subscriptions = Vec::with_capacity(followed.len());
    for (user_id,) in followed {
        subscriptions.push(get_subscription(pool, user_id, viewer, recipes_limit).await?);
    }

    Ok(subscriptions)
}
