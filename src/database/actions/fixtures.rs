use sqlx::{Pool, Postgres};

use crate::{
    form::{IngredientAmount, ValidRecipe},
    jwt::SessionData,
    schema::{UserRole, Uuid},
};

use super::create_recipe;

pub async fn user(pool: &Pool<Postgres>, username: &str) -> SessionData {
    let (id,): (Uuid,) = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name)
        VALUES ($1, $2, 'Anna', 'Cook')
        RETURNING id
    ",
    )
    .bind(format!("{username}@foodgram.test"))
    .bind(username)
    .fetch_one(pool)
    .await
    .unwrap();

    SessionData {
        user_id: id,
        username: username.to_string(),
        user_uid: UserRole::User,
    }
}

pub async fn ingredient(pool: &Pool<Postgres>, name: &str, measurement_unit: &str) -> Uuid {
    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(measurement_unit)
    .fetch_one(pool)
    .await
    .unwrap();

    id
}

pub async fn tag(pool: &Pool<Postgres>, slug: &str) -> Uuid {
    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, '#E26C2D', $1) RETURNING id",
    )
    .bind(slug)
    .fetch_one(pool)
    .await
    .unwrap();

    id
}

pub fn composition(ingredients: &[(Uuid, i32)], tags: &[Uuid]) -> ValidRecipe {
    ValidRecipe {
        ingredients: ingredients
            .iter()
            .map(|&(id, amount)| IngredientAmount { id, amount })
            .collect(),
        tags: tags.to_vec(),
        image: None,
        name: Some(String::from("Soup")),
        text: Some(String::from("Boil")),
        cooking_time: Some(10),
    }
}

pub async fn recipe(
    pool: &Pool<Postgres>,
    author: &SessionData,
    ingredients: &[(Uuid, i32)],
    tags: &[Uuid],
) -> Uuid {
    create_recipe(
        &composition(ingredients, tags),
        "recipes/soup.png",
        author,
        pool,
    )
    .await
    .unwrap()
}
