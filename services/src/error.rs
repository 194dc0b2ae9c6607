use crate::storage::StoreError;
use std::fmt;

/// Kinds of entity a lookup can miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Recipe,
    Tag,
    Ingredient,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::User => "user",
            Entity::Recipe => "recipe",
            Entity::Tag => "tag",
            Entity::Ingredient => "ingredient",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the ledger, the query engine and the aggregators.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: String },

    #[error("{0}")]
    InvalidOperation(String),

    #[error("shopping list total for {name} ({unit}) overflowed")]
    AmountOverflow { name: String, unit: String },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ServiceError {
    pub fn not_found(entity: Entity, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
