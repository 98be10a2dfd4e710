use std::collections::HashMap;

use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use crate::{
    authentication::permissions::ActionType,
    error::FoodgramError,
    form::{IngredientAmount, RecipeFilter, ValidRecipe},
    jwt::SessionData,
    schema::{Recipe, RecipeDetail, RecipePart, RecipeRow, Tag, UserProfile, Uuid},
};

use super::{list_recipe_tags, list_user_profiles, missing_ingredients, missing_tags};

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeDetail>, FoodgramError> {
    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT r.*, EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ",
    );
    query_builder.push_bind(viewer);
    query_builder.push(
        ") AS is_favorited, EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ",
    );
    query_builder.push_bind(viewer);
    query_builder.push(") AS is_in_shopping_cart FROM recipes r WHERE TRUE");

    if let Some(author) = filter.author {
        query_builder.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tags.is_empty() {
        query_builder
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }

    if let Some(viewer) = viewer {
        if filter.is_favorited {
            query_builder
                .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(viewer)
                .push(")");
        }
        if filter.is_in_shopping_cart {
            query_builder
                .push(" AND EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ")
                .push_bind(viewer)
                .push(")");
        }
    }

    query_builder.push(" ORDER BY r.pub_date DESC, r.id DESC");

    let rows: Vec<RecipeRow> = query_builder.build_query_as().fetch_all(pool).await?;

    attach_relations(rows, viewer, pool).await
}

pub async fn get_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Recipe>, FoodgramError> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_recipe_detail(
    id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeDetail>, FoodgramError> {
    let row: Option<RecipeRow> = sqlx::query_as(
        "
        SELECT r.*,
            EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = $2) AS is_favorited,
            EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = $2) AS is_in_shopping_cart
        FROM recipes r
        WHERE r.id = $1
    ",
    )
    .bind(id)
    .bind(viewer)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(attach_relations(vec![row], viewer, pool).await?.pop()),
        None => Ok(None),
    }
}

/// Recipe the session user may modify.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, FoodgramError> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| FoodgramError::not_found("No recipe exists with specified id"))?;

    session.authorize_author(recipe.author_id)?;

    Ok(recipe)
}

pub async fn list_recipe_parts(
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipePart>, FoodgramError> {
    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ri.recipe_id, ri.ingredient_id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY i.name
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Rejects ingredient and tag ids that are not in the catalog.
pub async fn check_references(
    recipe: &ValidRecipe,
    pool: &Pool<Postgres>,
) -> Result<(), FoodgramError> {
    let ids: Vec<Uuid> = recipe.ingredients.iter().map(|i| i.id).collect();
    if let Some(id) = missing_ingredients(&ids, pool).await?.first() {
        return Err(FoodgramError::validation(
            "ingredients",
            format!("Ingredient {id} doesn't exist"),
        ));
    }

    if let Some(id) = missing_tags(&recipe.tags, pool).await?.first() {
        return Err(FoodgramError::validation("tags", format!("Tag {id} doesn't exist")));
    }

    Ok(())
}

/// Creates the recipe with its composition and tags in one transaction.
/// `recipe` must come from `RecipeForm::validate_create`.
pub async fn create_recipe(
    recipe: &ValidRecipe,
    image: &str,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Uuid, FoodgramError> {
    session.authenticate(ActionType::CreateRecipes)?;

    let (Some(name), Some(text), Some(cooking_time)) =
        (&recipe.name, &recipe.text, recipe.cooking_time)
    else {
        return Err(FoodgramError::validation(
            "non_field_errors",
            "Name, text and cooking time are required",
        ));
    };

    let mut tr = pool.begin().await?;

    let id: (Uuid,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(session.user_id)
    .bind(name)
    .bind(image)
    .bind(text)
    .bind(cooking_time)
    .fetch_one(&mut *tr)
    .await?;

    insert_composition(id.0, &recipe.ingredients, &mut tr).await?;
    insert_tags_for(id.0, &recipe.tags, &mut tr).await?;

    tr.commit().await?;
    log::info!("> User {} created recipe {}", session.user_id, id.0);

    Ok(id.0)
}

/// Updates the recipe and swaps its whole composition and tag list inside
/// one transaction. Readers see either the old set or the new one.
pub async fn update_recipe(
    id: Uuid,
    recipe: &ValidRecipe,
    image: Option<&str>,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), FoodgramError> {
    get_recipe_mut(id, session, pool).await?;

    let mut tr = pool.begin().await?;

    sqlx::query(
        "
        UPDATE recipes SET
            name = COALESCE($1, name),
            text = COALESCE($2, text),
            cooking_time = COALESCE($3, cooking_time),
            image = COALESCE($4, image)
        WHERE id = $5
    ",
    )
    .bind(&recipe.name)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .bind(image)
    .bind(id)
    .execute(&mut *tr)
    .await?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;
    insert_composition(id, &recipe.ingredients, &mut tr).await?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;
    insert_tags_for(id, &recipe.tags, &mut tr).await?;

    tr.commit().await?;
    log::info!("> User {} updated recipe {}", session.user_id, id);

    Ok(())
}

/// Deletes the recipe; composition, tags and memberships cascade.
/// Returns the stored image path so the caller can remove the file.
pub async fn delete_recipe(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<String, FoodgramError> {
    let recipe = get_recipe_mut(id, session, pool).await?;

    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(FoodgramError::not_found("No recipe exists with specified id"));
    }

    log::info!("> User {} deleted recipe {}", session.user_id, id);
    Ok(recipe.image)
}

async fn insert_composition(
    recipe_id: Uuid,
    ingredients: &[IngredientAmount],
    tr: &mut Transaction<'_, Postgres>,
) -> Result<(), FoodgramError> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");

    query_builder.push_values(ingredients, |mut b, ingredient| {
        b.push_bind(recipe_id)
            .push_bind(ingredient.id)
            .push_bind(ingredient.amount);
    });

    query_builder.build().execute(&mut **tr).await?;

    Ok(())
}

async fn insert_tags_for(
    recipe_id: Uuid,
    tags: &[Uuid],
    tr: &mut Transaction<'_, Postgres>,
) -> Result<(), FoodgramError> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");

    query_builder.push_values(tags, |mut b, tag| {
        b.push_bind(recipe_id).push_bind(*tag);
    });

    query_builder.build().execute(&mut **tr).await?;

    Ok(())
}

async fn attach_relations(
    rows: Vec<RecipeRow>,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeDetail>, FoodgramError> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let mut author_ids: Vec<Uuid> = rows.iter().filter_map(|row| row.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let mut tags: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for (recipe_id, tag) in list_recipe_tags(&ids, pool).await? {
        tags.entry(recipe_id).or_default().push(tag);
    }

    let mut parts: HashMap<Uuid, Vec<RecipePart>> = HashMap::new();
    for part in list_recipe_parts(&ids, pool).await? {
        parts.entry(part.recipe_id).or_default().push(part);
    }

    let authors: HashMap<Uuid, UserProfile> = list_user_profiles(pool, &author_ids, viewer)
        .await?
        .into_iter()
        .map(|profile| (profile.id, profile))
        .collect();

    Ok(rows
        .into_iter()
        .map(|row| RecipeDetail {
            id: row.id,
            tags: tags.remove(&row.id).unwrap_or_default(),
            author: row.author_id.and_then(|id| authors.get(&id).cloned()),
            ingredients: parts.remove(&row.id).unwrap_or_default(),
            is_favorited: row.is_favorited,
            is_in_shopping_cart: row.is_in_shopping_cart,
            name: row.name,
            image: row.image,
            text: row.text,
            cooking_time: row.cooking_time,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use super::*;
    use crate::{
        actions::{add_recipe_relation, fixtures},
        form::RecipeForm,
        membership::RecipeRelation,
    };

    fn stored(parts: &[RecipePart]) -> Vec<(Uuid, i32)> {
        let mut parts: Vec<(Uuid, i32)> = parts
            .iter()
            .map(|part| (part.ingredient_id, part.amount))
            .collect();
        parts.sort_unstable();
        parts
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn update_replaces_the_whole_composition(pool: PgPool) {
        let anna = fixtures::user(&pool, "anna").await;
        let flour = fixtures::ingredient(&pool, "flour", "g").await;
        let egg = fixtures::ingredient(&pool, "egg", "pcs").await;
        let milk = fixtures::ingredient(&pool, "milk", "ml").await;
        let breakfast = fixtures::tag(&pool, "breakfast").await;
        let dinner = fixtures::tag(&pool, "dinner").await;
        let id = fixtures::recipe(&pool, &anna, &[(flour, 200), (egg, 2)], &[breakfast]).await;

        let mut update = fixtures::composition(&[(milk, 300), (egg, 3)], &[dinner]);
        update.name = Some(String::from("Omelette"));
        update_recipe(id, &update, None, &anna, &pool).await.unwrap();

        let detail = get_recipe_detail(id, None, &pool).await.unwrap().unwrap();
        assert_eq!(detail.name, "Omelette");
        assert_eq!(detail.image, "recipes/soup.png");
        assert_eq!(stored(&detail.ingredients), {
            let mut expected = vec![(milk, 300), (egg, 3)];
            expected.sort_unstable();
            expected
        });
        assert_eq!(
            detail.tags.iter().map(|tag| tag.id).collect::<Vec<_>>(),
            vec![dinner]
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn rejected_update_keeps_stored_composition(pool: PgPool) {
        let anna = fixtures::user(&pool, "anna").await;
        let flour = fixtures::ingredient(&pool, "flour", "g").await;
        let egg = fixtures::ingredient(&pool, "egg", "pcs").await;
        let breakfast = fixtures::tag(&pool, "breakfast").await;
        let id = fixtures::recipe(&pool, &anna, &[(flour, 200), (egg, 2)], &[breakfast]).await;
        let before = stored(&list_recipe_parts(&[id], &pool).await.unwrap());

        let duplicate = RecipeForm {
            ingredients: Some(vec![
                IngredientAmount { id: flour, amount: 1 },
                IngredientAmount { id: flour, amount: 2 },
            ]),
            tags: Some(vec![breakfast]),
            ..Default::default()
        };
        assert!(matches!(
            duplicate.validate_update(),
            Err(FoodgramError::Validation { .. })
        ));

        let unknown = fixtures::composition(&[(egg, 9), (flour + egg + 100, 1)], &[breakfast]);
        assert!(matches!(
            check_references(&unknown, &pool).await,
            Err(FoodgramError::Validation { .. })
        ));

        // Fails inside the transaction, after the old rows were deleted.
        let mut renamed = unknown.clone();
        renamed.name = Some(String::from("Broken"));
        assert!(update_recipe(id, &renamed, None, &anna, &pool).await.is_err());

        assert_eq!(stored(&list_recipe_parts(&[id], &pool).await.unwrap()), before);
        assert_eq!(get_recipe(id, &pool).await.unwrap().unwrap().name, "Soup");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn only_the_author_may_change_a_recipe(pool: PgPool) {
        let anna = fixtures::user(&pool, "anna").await;
        let boris = fixtures::user(&pool, "boris").await;
        let salt = fixtures::ingredient(&pool, "salt", "g").await;
        let lunch = fixtures::tag(&pool, "lunch").await;
        let id = fixtures::recipe(&pool, &anna, &[(salt, 5)], &[lunch]).await;

        let update = fixtures::composition(&[(salt, 10)], &[lunch]);
        assert!(matches!(
            update_recipe(id, &update, None, &boris, &pool).await,
            Err(FoodgramError::Forbidden)
        ));
        assert!(matches!(
            delete_recipe(id, &boris, &pool).await,
            Err(FoodgramError::Forbidden)
        ));

        assert_eq!(delete_recipe(id, &anna, &pool).await.unwrap(), "recipes/soup.png");
        assert!(matches!(
            delete_recipe(id, &anna, &pool).await,
            Err(FoodgramError::NotFound(_))
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn listing_applies_filters(pool: PgPool) {
        let anna = fixtures::user(&pool, "anna").await;
        let boris = fixtures::user(&pool, "boris").await;
        let salt = fixtures::ingredient(&pool, "salt", "g").await;
        let lunch = fixtures::tag(&pool, "lunch").await;
        let dinner = fixtures::tag(&pool, "dinner").await;

        let soup = fixtures::recipe(&pool, &anna, &[(salt, 5)], &[lunch]).await;
        let stew = fixtures::recipe(&pool, &boris, &[(salt, 7)], &[dinner]).await;
        add_recipe_relation(RecipeRelation::ShoppingCart, stew, &anna, &pool)
            .await
            .unwrap();

        let ids = |recipes: Vec<RecipeDetail>| -> Vec<Uuid> {
            recipes.into_iter().map(|recipe| recipe.id).collect()
        };

        let all = fetch_recipes(&RecipeFilter::default(), None, &pool).await.unwrap();
        assert_eq!(ids(all), vec![stew, soup]);

        let by_tag = RecipeFilter {
            tags: vec![String::from("lunch")],
            ..Default::default()
        };
        assert_eq!(ids(fetch_recipes(&by_tag, None, &pool).await.unwrap()), vec![soup]);

        let by_author = RecipeFilter {
            author: Some(boris.user_id),
            ..Default::default()
        };
        assert_eq!(
            ids(fetch_recipes(&by_author, None, &pool).await.unwrap()),
            vec![stew]
        );

        let in_cart = RecipeFilter {
            is_in_shopping_cart: true,
            ..Default::default()
        };
        let found = fetch_recipes(&in_cart, Some(anna.user_id), &pool).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, stew);
        assert!(found[0].is_in_shopping_cart);
        assert!(!found[0].is_favorited);
        assert_eq!(
            found[0].author.as_ref().map(|author| author.id),
            Some(boris.user_id)
        );
    }
}
