use std::{convert::Infallible, sync::Arc};

use warp::{reject::Rejection, Filter, Reply};

use crate::{
    membership::RecipeRelation,
    middleware::{with_possible_session, with_session},
    schema::Uuid,
    state::State,
};

use super::handlers::{self, IngredientQuery, SubscriptionQuery};

const MAX_BODY_SIZE: u64 = 10 * 1024 * 1024;

fn with_state(
    state: Arc<State>,
) -> impl Filter<Extract = (Arc<State>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn with_kind(
    kind: RecipeRelation,
) -> impl Filter<Extract = (RecipeRelation,), Error = Infallible> + Clone {
    warp::any().map(move || kind)
}

/// Every `/api` route with error recovery and request logging applied.
pub fn routes(
    state: Arc<State>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    catalog_routes(state.clone())
        .or(recipe_routes(state.clone()))
        .or(membership_routes(state.clone()))
        .or(user_routes(state))
        .recover(handlers::handle_rejection)
        .with(warp::log("foodgram::api"))
}

fn catalog_routes(
    state: Arc<State>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list_tags = warp::path!("api" / "tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::list_tags);

    let get_tag = warp::path!("api" / "tags" / Uuid)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::get_tag);

    let list_ingredients = warp::path!("api" / "ingredients")
        .and(warp::get())
        .and(warp::query::<IngredientQuery>())
        .and(with_state(state.clone()))
        .and_then(handlers::list_ingredients);

    let get_ingredient = warp::path!("api" / "ingredients" / Uuid)
        .and(warp::get())
        .and(with_state(state))
        .and_then(handlers::get_ingredient);

    list_tags
        .or(get_tag)
        .or(list_ingredients)
        .or(get_ingredient)
}

fn recipe_routes(
    state: Arc<State>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let secret = state.session_secret.clone();

    let download = warp::path!("api" / "recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::download_shopping_cart);

    let list = warp::path!("api" / "recipes")
        .and(warp::get())
        .and(warp::query::<Vec<(String, String)>>())
        .and(with_possible_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::list_recipes);

    let get = warp::path!("api" / "recipes" / Uuid)
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::get_recipe);

    let create = warp::path!("api" / "recipes")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(warp::body::content_length_limit(MAX_BODY_SIZE))
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(handlers::create_recipe);

    let update = warp::path!("api" / "recipes" / Uuid)
        .and(warp::patch())
        .and(with_session(secret.clone()))
        .and(warp::body::content_length_limit(MAX_BODY_SIZE))
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(handlers::update_recipe);

    let delete = warp::path!("api" / "recipes" / Uuid)
        .and(warp::delete())
        .and(with_session(secret))
        .and(with_state(state))
        .and_then(handlers::delete_recipe);

    download
        .or(list)
        .or(get)
        .or(create)
        .or(update)
        .or(delete)
}

fn membership_routes(
    state: Arc<State>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let secret = state.session_secret.clone();

    let recipe_relation = warp::path!("api" / "recipes" / Uuid / "favorite")
        .and(with_kind(RecipeRelation::Favorite))
        .or(warp::path!("api" / "recipes" / Uuid / "shopping_cart")
            .and(with_kind(RecipeRelation::ShoppingCart)))
        .unify();

    let add = recipe_relation
        .clone()
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::add_recipe_relation);

    let remove = recipe_relation
        .and(warp::delete())
        .and(with_session(secret))
        .and(with_state(state))
        .and_then(handlers::remove_recipe_relation);

    add.or(remove)
}

fn user_routes(
    state: Arc<State>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let secret = state.session_secret.clone();

    let subscriptions = warp::path!("api" / "users" / "subscriptions")
        .and(warp::get())
        .and(warp::query::<SubscriptionQuery>())
        .and(with_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::list_subscriptions);

    let me = warp::path!("api" / "users" / "me")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::get_me);

    let get = warp::path!("api" / "users" / Uuid)
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::get_user);

    let subscribe = warp::path!("api" / "users" / Uuid / "subscribe")
        .and(warp::post())
        .and(warp::query::<SubscriptionQuery>())
        .and(with_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(handlers::subscribe);

    let unsubscribe = warp::path!("api" / "users" / Uuid / "subscribe")
        .and(warp::delete())
        .and(with_session(secret))
        .and(with_state(state))
        .and_then(handlers::unsubscribe);

    subscriptions
        .or(me)
        .or(get)
        .or(subscribe)
        .or(unsubscribe)
}
