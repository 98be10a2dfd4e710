use std::{convert::Infallible, sync::Arc};

use serde::Deserialize;
use serde_json::json;
use warp::{http::StatusCode, reject::Rejection, Reply};

use crate::{
    actions,
    constants::SHOPPING_LIST_FILENAME,
    error::FoodgramError,
    form::{RecipeFilter, RecipeForm},
    jwt::SessionData,
    media::{remove_image, save_image},
    membership::RecipeRelation,
    schema::Uuid,
    state::State,
};

#[derive(Deserialize, Debug, Default)]
pub struct IngredientQuery {
    pub name: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct SubscriptionQuery {
    pub recipes_limit: Option<i64>,
}

impl SubscriptionQuery {
    fn recipes_limit(&self) -> Result<Option<i64>, FoodgramError> {
        match self.recipes_limit {
            Some(limit) if limit < 0 => Err(FoodgramError::validation(
                "recipes_limit",
                "Must be a non-negative integer",
            )),
            limit => Ok(limit),
        }
    }
}

fn no_content() -> impl Reply {
    warp::reply::with_status(warp::reply(), StatusCode::NO_CONTENT)
}

// Catalog

pub async fn list_tags(state: Arc<State>) -> Result<impl Reply, Rejection> {
    let tags = actions::list_tags_cached(&state.pool, state.cache.clone()).await?;
    Ok(warp::reply::json(&tags))
}

pub async fn get_tag(id: Uuid, state: Arc<State>) -> Result<impl Reply, Rejection> {
    let tag = actions::get_tag(id, &state.pool)
        .await?
        .ok_or_else(|| FoodgramError::not_found("Tag doesn't exist"))?;
    Ok(warp::reply::json(&tag))
}

pub async fn list_ingredients(
    query: IngredientQuery,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    let name = query.name.unwrap_or_default();
    let ingredients =
        actions::list_ingredients_cached(&name, &state.pool, state.cache.clone()).await?;
    Ok(warp::reply::json(&ingredients))
}

pub async fn get_ingredient(id: Uuid, state: Arc<State>) -> Result<impl Reply, Rejection> {
    let ingredient = actions::get_ingredient(id, &state.pool)
        .await?
        .ok_or_else(|| FoodgramError::not_found("Ingredient doesn't exist"))?;
    Ok(warp::reply::json(&ingredient))
}

// Recipes

pub async fn list_recipes(
    query: Vec<(String, String)>,
    session: Option<SessionData>,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    let viewer = session.map(|s| s.user_id);
    let filter = RecipeFilter::from_query(query)?.for_viewer(viewer);

    let recipes = actions::fetch_recipes(&filter, viewer, &state.pool).await?;
    Ok(warp::reply::json(&recipes))
}

pub async fn get_recipe(
    id: Uuid,
    session: Option<SessionData>,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    let recipe = actions::get_recipe_detail(id, session.map(|s| s.user_id), &state.pool)
        .await?
        .ok_or_else(|| FoodgramError::not_found("No recipe exists with specified id"))?;
    Ok(warp::reply::json(&recipe))
}

pub async fn create_recipe(
    session: SessionData,
    form: RecipeForm,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    let recipe = form.validate_create()?;
    actions::check_references(&recipe, &state.pool).await?;

    let image_data = recipe
        .image
        .as_deref()
        .ok_or_else(|| FoodgramError::validation("image", "This field is required"))?;
    let image = save_image(image_data, &state.config.media_root).await?;

    let id = match actions::create_recipe(&recipe, &image, &session, &state.pool).await {
        Ok(id) => id,
        Err(e) => {
            remove_image(&image, &state.config.media_root).await;
            return Err(e.into());
        }
    };

    let detail = actions::get_recipe_detail(id, Some(session.user_id), &state.pool)
        .await?
        .ok_or_else(|| FoodgramError::not_found("No recipe exists with specified id"))?;

    Ok(warp::reply::with_status(
        warp::reply::json(&detail),
        StatusCode::CREATED,
    ))
}

pub async fn update_recipe(
    id: Uuid,
    session: SessionData,
    form: RecipeForm,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    let existing = actions::get_recipe_mut(id, &session, &state.pool).await?;
    let recipe = form.validate_update()?;
    actions::check_references(&recipe, &state.pool).await?;

    let image = match recipe.image.as_deref() {
        Some(data) => Some(save_image(data, &state.config.media_root).await?),
        None => None,
    };

    if let Err(e) =
        actions::update_recipe(id, &recipe, image.as_deref(), &session, &state.pool).await
    {
        if let Some(image) = &image {
            remove_image(image, &state.config.media_root).await;
        }
        return Err(e.into());
    }

    if image.is_some() {
        remove_image(&existing.image, &state.config.media_root).await;
    }

    let detail = actions::get_recipe_detail(id, Some(session.user_id), &state.pool)
        .await?
        .ok_or_else(|| FoodgramError::not_found("No recipe exists with specified id"))?;

    Ok(warp::reply::json(&detail))
}

pub async fn delete_recipe(
    id: Uuid,
    session: SessionData,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    let image = actions::delete_recipe(id, &session, &state.pool).await?;
    remove_image(&image, &state.config.media_root).await;

    Ok(no_content())
}

pub async fn add_recipe_relation(
    id: Uuid,
    kind: RecipeRelation,
    session: SessionData,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    let recipe = actions::add_recipe_relation(kind, id, &session, &state.pool).await?;

    Ok(warp::reply::with_status(
        warp::reply::json(&recipe),
        StatusCode::CREATED,
    ))
}

pub async fn remove_recipe_relation(
    id: Uuid,
    kind: RecipeRelation,
    session: SessionData,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    actions::remove_recipe_relation(kind, id, &session, &state.pool).await?;

    Ok(no_content())
}

pub async fn download_shopping_cart(
    session: SessionData,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    let user = actions::get_user_by_id(&state.pool, session.user_id)
        .await?
        .ok_or(FoodgramError::Unauthenticated)?;

    let list = actions::build_shopping_list(user.id, &state.pool).await?;
    log::info!(
        "> User {} downloaded a shopping list with {} lines",
        user.id,
        list.lines().len()
    );

    let reply = warp::reply::with_header(
        list.render(&user),
        "content-type",
        "text/plain; charset=utf-8",
    );
    Ok(warp::reply::with_header(
        reply,
        "content-disposition",
        format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
    ))
}

// Users

pub async fn get_user(
    id: Uuid,
    session: Option<SessionData>,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    let profile = actions::get_user_profile(&state.pool, id, session.map(|s| s.user_id))
        .await?
        .ok_or_else(|| FoodgramError::not_found("User doesn't exist"))?;
    Ok(warp::reply::json(&profile))
}

/// Profile of the session user.
pub async fn get_me(session: SessionData, state: Arc<State>) -> Result<impl Reply, Rejection> {
    let profile = actions::get_user_profile(&state.pool, session.user_id, Some(session.user_id))
        .await?
        .ok_or(FoodgramError::Unauthenticated)?;
    Ok(warp::reply::json(&profile))
}

pub async fn subscribe(
    id: Uuid,
    query: SubscriptionQuery,
    session: SessionData,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    let subscription =
        actions::subscribe(id, &session, query.recipes_limit()?, &state.pool).await?;

    Ok(warp::reply::with_status(
        warp::reply::json(&subscription),
        StatusCode::CREATED,
    ))
}

pub async fn unsubscribe(
    id: Uuid,
    session: SessionData,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    actions::unsubscribe(id, &session, &state.pool).await?;

    Ok(no_content())
}

pub async fn list_subscriptions(
    query: SubscriptionQuery,
    session: SessionData,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    let subscriptions =
        actions::list_subscriptions(&state.pool, session.user_id, query.recipes_limit()?).await?;
    Ok(warp::reply::json(&subscriptions))
}

// Errors

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, body) = if let Some(e) = err.find::<FoodgramError>() {
        if e.status().is_server_error() {
            log::error!("{e}");
        }
        (e.status(), e.body())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, json!({ "errors": "Not found" }))
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, json!({ "errors": e.to_string() }))
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, json!({ "errors": e.to_string() }))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            json!({ "errors": "Payload too large" }),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            json!({ "errors": "Method not allowed" }),
        )
    } else {
        log::error!("Unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "errors": "Internal server error" }),
        )
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}
