use sqlx::{Pool, Postgres};

use crate::{
    error::FoodgramError,
    schema::Uuid,
    shopping::{CartPart, ShoppingList},
};

/// Composition edges of every recipe currently in the user's cart.
pub async fn list_cart_parts(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<CartPart>, FoodgramError> {
    let rows: Vec<CartPart> = sqlx::query_as(
        "
        SELECT ri.recipe_id, ri.ingredient_id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id IN (SELECT c.recipe_id FROM shopping_cart c WHERE c.user_id = $1)
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn build_shopping_list(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<ShoppingList, FoodgramError> {
    let parts = list_cart_parts(user_id, pool).await?;
    log::trace!("> Aggregating {} cart rows for user {user_id}", parts.len());

    Ok(ShoppingList::aggregate(parts))
}
