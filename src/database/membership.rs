use crate::{error::FoodgramError, schema::Uuid};

/// Relations a user can toggle on and off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    Favorite,
    ShoppingCart,
    Subscription,
}

impl RelationKind {
    pub fn table(&self) -> &'static str {
        match self {
            RelationKind::Favorite => "favorites",
            RelationKind::ShoppingCart => "shopping_cart",
            RelationKind::Subscription => "subscriptions",
        }
    }

    pub fn owner_column(&self) -> &'static str {
        match self {
            RelationKind::Favorite | RelationKind::ShoppingCart => "user_id",
            RelationKind::Subscription => "follower_id",
        }
    }

    pub fn target_column(&self) -> &'static str {
        match self {
            RelationKind::Favorite | RelationKind::ShoppingCart => "recipe_id",
            RelationKind::Subscription => "following_id",
        }
    }

    fn already_exists(&self) -> FoodgramError {
        FoodgramError::already_exists(match self {
            RelationKind::Favorite => "Recipe is already in favorites",
            RelationKind::ShoppingCart => "Recipe is already in the shopping cart",
            RelationKind::Subscription => "You are already subscribed to this user",
        })
    }

    fn not_found(&self) -> FoodgramError {
        FoodgramError::not_found(match self {
            RelationKind::Favorite => "Recipe is not in favorites",
            RelationKind::ShoppingCart => "Recipe is not in the shopping cart",
            RelationKind::Subscription => "You are not subscribed to this user",
        })
    }
}

/// Relations whose target is a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipeRelation {
    Favorite,
    ShoppingCart,
}

impl From<RecipeRelation> for RelationKind {
    fn from(value: RecipeRelation) -> Self {
        match value {
            RecipeRelation::Favorite => RelationKind::Favorite,
            RecipeRelation::ShoppingCart => RelationKind::ShoppingCart,
        }
    }
}

/// An edge between a user and the recipe or user they point at.
///
/// Construction rejects self subscriptions, so every `Membership` that
/// reaches the store already satisfies follower != following.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership {
    kind: RelationKind,
    user_id: Uuid,
    target_id: Uuid,
}

impl Membership {
    pub fn new(kind: RelationKind, user_id: Uuid, target_id: Uuid) -> Result<Self, FoodgramError> {
        if kind == RelationKind::Subscription && user_id == target_id {
            return Err(FoodgramError::InvalidSelfReference);
        }

        Ok(Self {
            kind,
            user_id,
            target_id,
        })
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn target_id(&self) -> Uuid {
        self.target_id
    }

    pub fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} ({}, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            self.kind.table(),
            self.kind.owner_column(),
            self.kind.target_column()
        )
    }

    pub fn delete_sql(&self) -> String {
        format!(
            "DELETE FROM {} WHERE {} = $1 AND {} = $2",
            self.kind.table(),
            self.kind.owner_column(),
            self.kind.target_column()
        )
    }

    pub fn already_exists(&self) -> FoodgramError {
        self.kind.already_exists()
    }

    /// Maps the affected row count of an insert to its outcome.
    pub fn inserted(&self, rows_affected: u64) -> Result<(), FoodgramError> {
        match rows_affected {
            0 => Err(self.already_exists()),
            _ => Ok(()),
        }
    }

    /// Maps the affected row count of a delete to its outcome.
    pub fn deleted(&self, rows_affected: u64) -> Result<(), FoodgramError> {
        match rows_affected {
            0 => Err(self.kind.not_found()),
            _ => Ok(()),
        }
    }

    /// Translates store errors so a duplicate that slipped past
    /// `ON CONFLICT` still reads as `AlreadyExists`.
    pub fn translate(&self, error: sqlx::Error) -> FoodgramError {
        match FoodgramError::from(error) {
            FoodgramError::AlreadyExists(_) => self.kind.already_exists(),
            e => e,
        }
    }
}
