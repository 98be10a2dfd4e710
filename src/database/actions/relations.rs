use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    error::FoodgramError,
    jwt::SessionData,
    membership::{Membership, RecipeRelation, RelationKind},
    schema::{ShortRecipe, Subscription, Uuid},
};

use super::{get_subscription, get_user_by_id};

/// Adds `recipe_id` to the session user's favorites or shopping cart.
///
/// Insert and read-back run as one statement, so two concurrent requests for
/// the same pair produce exactly one edge and one `AlreadyExists`.
pub async fn add_recipe_relation(
    relation: RecipeRelation,
    recipe_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<ShortRecipe, FoodgramError> {
    let kind = RelationKind::from(relation);
    session.authenticate(ActionType::ManageOwnMemberships)?;
    let membership = Membership::new(kind, session.user_id, recipe_id)?;

    let query = format!(
        "
        WITH inserted AS ({} RETURNING {})
        SELECT r.id, r.name, r.image, r.cooking_time
        FROM recipes r
        INNER JOIN inserted i ON i.recipe_id = r.id
    ",
        membership.insert_sql(),
        kind.target_column()
    );

    let row: Option<ShortRecipe> = sqlx::query_as(&query)
        .bind(membership.user_id())
        .bind(membership.target_id())
        .fetch_optional(pool)
        .await
        .map_err(|e| match membership.translate(e) {
            FoodgramError::NotFound(_) => FoodgramError::not_found("Recipe doesn't exist"),
            e => e,
        })?;

    let recipe = row.ok_or_else(|| membership.already_exists())?;
    log::info!(
        "> User {} added recipe {} to {}",
        session.user_id,
        recipe_id,
        kind.table()
    );

    Ok(recipe)
}

pub async fn remove_recipe_relation(
    relation: RecipeRelation,
    recipe_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), FoodgramError> {
    let kind = RelationKind::from(relation);
    session.authenticate(ActionType::ManageOwnMemberships)?;
    let membership = Membership::new(kind, session.user_id, recipe_id)?;

    let result = sqlx::query(&membership.delete_sql())
        .bind(membership.user_id())
        .bind(membership.target_id())
        .execute(pool)
        .await
        .map_err(|e| membership.translate(e))?;

    membership.deleted(result.rows_affected())
}

pub async fn subscribe(
    user_id: Uuid,
    session: &SessionData,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Subscription, FoodgramError> {
    session.authenticate(ActionType::ManageOwnMemberships)?;
    let membership = Membership::new(RelationKind::Subscription, session.user_id, user_id)?;

    if get_user_by_id(pool, user_id).await?.is_none() {
        return Err(FoodgramError::not_found("User doesn't exist"));
    }

    let result = sqlx::query(&membership.insert_sql())
        .bind(membership.user_id())
        .bind(membership.target_id())
        .execute(pool)
        .await
        .map_err(|e| membership.translate(e))?;

    membership.inserted(result.rows_affected())?;
    log::info!("> User {} subscribed to {}", session.user_id, user_id);

    get_subscription(pool, user_id, session.user_id, recipes_limit).await
}

pub async fn unsubscribe(
    user_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), FoodgramError> {
    session.authenticate(ActionType::ManageOwnMemberships)?;
    let membership = Membership::new(RelationKind::Subscription, session.user_id, user_id)?;

    if get_user_by_id(pool, user_id).await?.is_none() {
        return Err(FoodgramError::not_found("User doesn't exist"));
    }

    let result = sqlx::query(&membership.delete_sql())
        .bind(membership.user_id())
        .bind(membership.target_id())
        .execute(pool)
        .await
        .map_err(|e| membership.translate(e))?;

    membership.deleted(result.rows_affected())
}
