use std::collections::HashSet;

use serde::Deserialize;

use crate::{
    constants::{
        MAX_AMOUNT, MAX_COOKING_TIME, MIN_AMOUNT, MIN_COOKING_TIME, RECIPE_NAME_MAX_LENGTH,
    },
    error::FoodgramError,
    schema::Uuid,
};

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub amount: i32,
}

/// Recipe payload as received from the client. Every field is optional here;
/// `validate_create` and `validate_update` decide what is required.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RecipeForm {
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub tags: Option<Vec<Uuid>>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidRecipe {
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Uuid>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
}

impl RecipeForm {
    pub fn validate_create(self) -> Result<ValidRecipe, FoodgramError> {
        for (field, present) in [
            ("image", self.image.is_some()),
            ("name", self.name.is_some()),
            ("text", self.text.is_some()),
            ("cooking_time", self.cooking_time.is_some()),
        ] {
            if !present {
                return Err(FoodgramError::validation(field, "This field is required"));
            }
        }

        self.validate_update()
    }

    /// Composition and tags are always replaced whole, so both are required
    /// on update too.
    pub fn validate_update(self) -> Result<ValidRecipe, FoodgramError> {
        let ingredients = self
            .ingredients
            .ok_or_else(|| FoodgramError::validation("ingredients", "This field is required"))?;
        let tags = self
            .tags
            .ok_or_else(|| FoodgramError::validation("tags", "This field is required"))?;

        validate_ingredients(&ingredients)?;
        validate_tags(&tags)?;

        if let Some(name) = &self.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(FoodgramError::validation("name", "Name must not be empty"));
            }
            if name.chars().count() > RECIPE_NAME_MAX_LENGTH {
                return Err(FoodgramError::validation(
                    "name",
                    format!("Name must be at most {RECIPE_NAME_MAX_LENGTH} characters"),
                ));
            }
        }

        if let Some(text) = &self.text {
            if text.trim().is_empty() {
                return Err(FoodgramError::validation("text", "Text must not be empty"));
            }
        }

        if let Some(image) = &self.image {
            if image.trim().is_empty() {
                return Err(FoodgramError::validation("image", "Image must not be empty"));
            }
        }

        if let Some(cooking_time) = self.cooking_time {
            if !(MIN_COOKING_TIME..=MAX_COOKING_TIME).contains(&cooking_time) {
                return Err(FoodgramError::validation(
                    "cooking_time",
                    format!(
                        "Cooking time must be between {MIN_COOKING_TIME} and {MAX_COOKING_TIME}"
                    ),
                ));
            }
        }

        Ok(ValidRecipe {
            ingredients,
            tags,
            image: self.image,
            name: self.name.map(|name| name.trim().to_string()),
            text: self.text,
            cooking_time: self.cooking_time,
        })
    }
}

pub fn validate_ingredients(ingredients: &[IngredientAmount]) -> Result<(), FoodgramError> {
    if ingredients.is_empty() {
        return Err(FoodgramError::validation(
            "ingredients",
            "Ingredients must not be empty",
        ));
    }

    let mut seen = HashSet::new();
    for ingredient in ingredients {
        if !seen.insert(ingredient.id) {
            return Err(FoodgramError::validation(
                "ingredients",
                format!("Ingredient {} is listed more than once", ingredient.id),
            ));
        }

        if !(MIN_AMOUNT..=MAX_AMOUNT).contains(&ingredient.amount) {
            return Err(FoodgramError::validation(
                "ingredients",
                format!("Amount must be between {MIN_AMOUNT} and {MAX_AMOUNT}"),
            ));
        }
    }

    Ok(())
}

pub fn validate_tags(tags: &[Uuid]) -> Result<(), FoodgramError> {
    if tags.is_empty() {
        return Err(FoodgramError::validation("tags", "Tags must not be empty"));
    }

    let mut seen = HashSet::new();
    if tags.iter().any(|tag| !seen.insert(*tag)) {
        return Err(FoodgramError::validation("tags", "Tags must be unique"));
    }

    Ok(())
}

/// Listing filters. `tags` matches any of the given slugs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeFilter {
    pub tags: Vec<String>,
    pub author: Option<Uuid>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeFilter {
    /// Builds a filter from raw query pairs; `tags` may repeat.
    pub fn from_query(pairs: Vec<(String, String)>) -> Result<Self, FoodgramError> {
        let mut filter = Self::default();

        for (key, value) in pairs {
            match key.as_str() {
                "tags" if !value.is_empty() => filter.tags.push(value),
                "author" if !value.is_empty() => {
                    let author = value
                        .parse()
                        .map_err(|_| FoodgramError::validation("author", "Invalid user id"))?;
                    filter.author = Some(author);
                }
                "is_favorited" => filter.is_favorited = parse_flag("is_favorited", &value)?,
                "is_in_shopping_cart" => {
                    filter.is_in_shopping_cart = parse_flag("is_in_shopping_cart", &value)?
                }
                _ => {}
            }
        }

        Ok(filter)
    }

    /// Membership filters only mean something for a signed-in viewer.
    pub fn for_viewer(mut self, viewer: Option<Uuid>) -> Self {
        if viewer.is_none() {
            self.is_favorited = false;
            self.is_in_shopping_cart = false;
        }
        self
    }
}

fn parse_flag(field: &str, value: &str) -> Result<bool, FoodgramError> {
    match value.to_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" | "" => Ok(false),
        _ => Err(FoodgramError::validation(field, "Expected 0 or 1")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(query: &[(&str, &str)]) -> Vec<(String, String)> {
        query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn filter_collects_repeated_tags() {
        let filter = RecipeFilter::from_query(pairs(&[
            ("tags", "breakfast"),
            ("tags", "lunch"),
            ("author", "3"),
            ("is_favorited", "1"),
            ("limit", "6"),
        ]))
        .unwrap();

        assert_eq!(filter.tags, vec!["breakfast", "lunch"]);
        assert_eq!(filter.author, Some(3));
        assert!(filter.is_favorited);
        assert!(!filter.is_in_shopping_cart);
    }

    #[test]
    fn filter_rejects_bad_values() {
        assert!(RecipeFilter::from_query(pairs(&[("author", "me")])).is_err());
        assert!(RecipeFilter::from_query(pairs(&[("is_in_shopping_cart", "yes")])).is_err());
    }

    #[test]
    fn anonymous_viewers_ignore_membership_filters() {
        let filter = RecipeFilter::from_query(pairs(&[
            ("is_favorited", "true"),
            ("is_in_shopping_cart", "1"),
        ]))
        .unwrap()
        .for_viewer(None);

        assert!(!filter.is_favorited);
        assert!(!filter.is_in_shopping_cart);
    }

    fn form() -> RecipeForm {
        RecipeForm {
            ingredients: Some(vec![
                IngredientAmount { id: 1, amount: 200 },
                IngredientAmount { id: 2, amount: 2 },
            ]),
            tags: Some(vec![1, 2]),
            image: Some(String::from("data:image/png;base64,iVBORw0KGgo=")),
            name: Some(String::from("  Pancakes ")),
            text: Some(String::from("Mix and fry")),
            cooking_time: Some(15),
        }
    }

    fn field_of(error: FoodgramError) -> String {
        match error {
            FoodgramError::Validation { field, .. } => field,
            e => panic!("expected a validation error, got {e:?}"),
        }
    }

    #[test]
    fn accepts_valid_recipe() {
        let recipe = form().validate_create().unwrap();
        assert_eq!(recipe.name.as_deref(), Some("Pancakes"));
        assert_eq!(recipe.ingredients.len(), 2);
    }

    #[test]
    fn rejects_empty_ingredients_and_tags() {
        let mut recipe = form();
        recipe.ingredients = Some(vec![]);
        assert_eq!(field_of(recipe.validate_create().unwrap_err()), "ingredients");

        let mut recipe = form();
        recipe.tags = Some(vec![]);
        assert_eq!(field_of(recipe.validate_create().unwrap_err()), "tags");
    }

    #[test]
    fn rejects_duplicate_ingredients() {
        let mut recipe = form();
        recipe.ingredients = Some(vec![
            IngredientAmount { id: 1, amount: 200 },
            IngredientAmount { id: 1, amount: 100 },
        ]);
        assert_eq!(field_of(recipe.validate_update().unwrap_err()), "ingredients");
    }

    #[test]
    fn rejects_duplicate_tags() {
        let mut recipe = form();
        recipe.tags = Some(vec![3, 3]);
        assert_eq!(field_of(recipe.validate_update().unwrap_err()), "tags");
    }

    #[test]
    fn amounts_must_be_in_range() {
        for amount in [0, -5, MAX_AMOUNT + 1] {
            let mut recipe = form();
            recipe.ingredients = Some(vec![IngredientAmount { id: 1, amount }]);
            assert_eq!(field_of(recipe.validate_create().unwrap_err()), "ingredients");
        }

        let mut recipe = form();
        recipe.ingredients = Some(vec![IngredientAmount {
            id: 1,
            amount: MAX_AMOUNT,
        }]);
        assert!(recipe.validate_create().is_ok());
    }

    #[test]
    fn cooking_time_must_be_positive() {
        let mut recipe = form();
        recipe.cooking_time = Some(0);
        assert_eq!(field_of(recipe.validate_create().unwrap_err()), "cooking_time");
    }

    #[test]
    fn create_requires_image() {
        let mut recipe = form();
        recipe.image = None;
        assert_eq!(field_of(recipe.validate_create().unwrap_err()), "image");
    }

    #[test]
    fn update_allows_partial_fields_but_not_missing_composition() {
        let recipe = RecipeForm {
            ingredients: Some(vec![IngredientAmount { id: 4, amount: 1 }]),
            tags: Some(vec![1]),
            ..Default::default()
        };
        assert!(recipe.validate_update().is_ok());

        let recipe = RecipeForm {
            tags: Some(vec![1]),
            name: Some(String::from("Soup")),
            ..Default::default()
        };
        assert_eq!(field_of(recipe.validate_update().unwrap_err()), "ingredients");
    }

    #[test]
    fn parses_client_payload() {
        let form: RecipeForm = serde_json::from_str(
            r#"{
                "ingredients": [{"id": 1123, "amount": 10}],
                "tags": [1, 2],
                "image": "data:image/png;base64,AAAA",
                "name": "Soup",
                "text": "Boil",
                "cooking_time": 1
            }"#,
        )
        .unwrap();

        assert_eq!(
            form.ingredients,
            Some(vec![IngredientAmount { id: 1123, amount: 10 }])
        );
        assert!(form.validate_create().is_ok());
    }
}
