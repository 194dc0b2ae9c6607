//! Persistence layer.
//!
//! The catalog (users, tags, ingredients, recipes) and the relation rows
//! (favorites, cart entries, subscriptions) are reached through two traits so
//! that handlers, the ledger and the aggregators stay generic over the
//! backend. [`PgStorage`] is the production implementation; [`MockStorage`]
//! keeps everything in memory.

mod mock;
mod postgres;
mod traits;
mod types;

pub use mock::MockStorage;
pub use postgres::PgStorage;
pub use traits::{CatalogStorage, RelationStorage};
pub use types::{
    RecipeQuery, RecipeRelation, RecipeSlice, Reference, Relation, StoreError, UserSlice,
};

/// Everything the HTTP layer needs from a backend.
pub trait Storage: CatalogStorage + RelationStorage {}

impl<T: CatalogStorage + RelationStorage> Storage for T {}
