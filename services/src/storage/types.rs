//! Storage-level types: the error taxonomy of the backing store, recipe
//! listing predicates and the relation rows kept by the ledger.

use crate::model::{Recipe, RecipeId, User, UserId};
use std::collections::BTreeSet;

/// Errors raised by a storage backend.
///
/// Constraint violations are kept apart from generic failures so that the
/// relation ledger can turn them into `AlreadyExists` / `NotFound` outcomes.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Referenced row does not exist: {message}")]
    ForeignKeyViolation {
        reference: Reference,
        message: String,
    },

    #[error("Check constraint violated: {0}")]
    CheckViolation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => {
                let message = e.message().to_owned();
                match e.kind() {
                    sqlx::error::ErrorKind::UniqueViolation => Self::UniqueViolation(message),
                    sqlx::error::ErrorKind::ForeignKeyViolation => Self::ForeignKeyViolation {
                        reference: e
                            .constraint()
                            .map(Reference::from_constraint)
                            .unwrap_or(Reference::Unknown),
                        message,
                    },
                    sqlx::error::ErrorKind::CheckViolation => Self::CheckViolation(message),
                    _ => Self::Backend(message),
                }
            }
            other => Self::Backend(other.to_string()),
        }
    }
}

/// The referencing column of a violated foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    /// `user_id` of a favorite or cart entry.
    User,
    Follower,
    /// `author_id` of a subscription or a recipe.
    Author,
    Recipe,
    Tag,
    Ingredient,
    Unknown,
}

impl Reference {
    /// Maps Postgres' default constraint names (`<table>_<column>_fkey`).
    pub fn from_constraint(name: &str) -> Self {
        let Some(column) = name.strip_suffix("_id_fkey") else {
            return Self::Unknown;
        };
        if column.ends_with("_follower") {
            Self::Follower
        } else if column.ends_with("_author") {
            Self::Author
        } else if column.ends_with("_user") {
            Self::User
        } else if column.ends_with("_recipe") {
            Self::Recipe
        } else if column.ends_with("_tag") {
            Self::Tag
        } else if column.ends_with("_ingredient") {
            Self::Ingredient
        } else {
            Self::Unknown
        }
    }
}

impl StoreError {
    pub fn missing(reference: Reference, message: impl Into<String>) -> Self {
        Self::ForeignKeyViolation {
            reference,
            message: message.into(),
        }
    }
}

/// Predicates for a recipe listing. Every `Some` narrows the result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeQuery {
    /// Recipe matches when it carries at least one of these slugs.
    pub tag_slugs: Option<BTreeSet<String>>,
    pub author: Option<UserId>,
    pub favorited_by: Option<UserId>,
    pub in_cart_of: Option<UserId>,
    pub offset: u64,
    pub limit: u64,
}

impl Default for RecipeQuery {
    fn default() -> Self {
        Self {
            tag_slugs: None,
            author: None,
            favorited_by: None,
            in_cart_of: None,
            offset: 0,
            limit: u64::from(u32::MAX),
        }
    }
}

/// One page of recipes plus the number of recipes matching the predicates.
#[derive(Debug, Clone, Default)]
pub struct RecipeSlice {
    pub recipes: Vec<Recipe>,
    pub total: u64,
}

#[derive(Debug, Clone, Default)]
pub struct UserSlice {
    pub users: Vec<User>,
    pub total: u64,
}

/// The two user-to-recipe relation sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipeRelation {
    Favorite,
    Cart,
}

impl RecipeRelation {
    pub fn table(self) -> &'static str {
        match self {
            Self::Favorite => "favorites",
            Self::Cart => "cart_entries",
        }
    }
}

/// A single relation row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Recipe {
        kind: RecipeRelation,
        user: UserId,
        recipe: RecipeId,
    },
    Subscription {
        follower: UserId,
        author: UserId,
    },
}

impl Relation {
    pub fn favorite(user: UserId, recipe: RecipeId) -> Self {
        Self::Recipe {
            kind: RecipeRelation::Favorite,
            user,
            recipe,
        }
    }

    pub fn cart(user: UserId, recipe: RecipeId) -> Self {
        Self::Recipe {
            kind: RecipeRelation::Cart,
            user,
            recipe,
        }
    }

    pub fn subscription(follower: UserId, author: UserId) -> Self {
        Self::Subscription { follower, author }
    }
}
