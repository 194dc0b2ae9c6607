//! Favorites, cart entries and subscriptions.
//!
//! Every mutation is a single insert-if-absent or delete-if-present against
//! the store. The store's uniqueness constraint decides duplicates; nothing
//! here reads before it writes.

use crate::error::{Entity, ServiceError, ServiceResult};
use crate::model::{RecipeId, UserId};
use crate::storage::{RecipeRelation, Reference, Relation, RelationStorage, StoreError};
use std::collections::HashSet;
use tracing::debug;

/// Result of an idempotent create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Created,
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

#[derive(Clone)]
pub struct RelationLedger<S> {
    storage: S,
}

impl<S: RelationStorage> RelationLedger<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub async fn add_favorite(&self, user: UserId, recipe: RecipeId) -> ServiceResult<AddOutcome> {
        self.add(Relation::favorite(user, recipe)).await
    }

    pub async fn remove_favorite(
        &self,
        user: UserId,
        recipe: RecipeId,
    ) -> ServiceResult<RemoveOutcome> {
        self.remove(Relation::favorite(user, recipe)).await
    }

    pub async fn add_to_cart(&self, user: UserId, recipe: RecipeId) -> ServiceResult<AddOutcome> {
        self.add(Relation::cart(user, recipe)).await
    }

    pub async fn remove_from_cart(
        &self,
        user: UserId,
        recipe: RecipeId,
    ) -> ServiceResult<RemoveOutcome> {
        self.remove(Relation::cart(user, recipe)).await
    }

    /// Empties the user's cart, returning the number of removed entries.
    pub async fn clear_cart(&self, user: UserId) -> ServiceResult<u64> {
        let removed = self
            .storage
            .clear_recipe_relation(RecipeRelation::Cart, user)
            .await?;
        debug!(user = %user, removed, "Cleared cart");
        Ok(removed)
    }

    pub async fn subscribe(&self, follower: UserId, author: UserId) -> ServiceResult<AddOutcome> {
        if follower == author {
            return Err(ServiceError::invalid("users cannot subscribe to themselves"));
        }
        self.add(Relation::subscription(follower, author)).await
    }

    pub async fn unsubscribe(
        &self,
        follower: UserId,
        author: UserId,
    ) -> ServiceResult<RemoveOutcome> {
        self.remove(Relation::subscription(follower, author)).await
    }

    pub async fn is_favorited(&self, user: UserId, recipe: RecipeId) -> ServiceResult<bool> {
        Ok(self
            .storage
            .relation_exists(Relation::favorite(user, recipe))
            .await?)
    }

    pub async fn is_in_cart(&self, user: UserId, recipe: RecipeId) -> ServiceResult<bool> {
        Ok(self
            .storage
            .relation_exists(Relation::cart(user, recipe))
            .await?)
    }

    pub async fn is_subscribed(&self, follower: UserId, author: UserId) -> ServiceResult<bool> {
        Ok(self
            .storage
            .relation_exists(Relation::subscription(follower, author))
            .await?)
    }

    pub async fn favorited_among(
        &self,
        user: UserId,
        recipes: &[RecipeId],
    ) -> ServiceResult<HashSet<RecipeId>> {
        Ok(self
            .storage
            .recipe_relation_among(RecipeRelation::Favorite, user, recipes)
            .await?)
    }

    pub async fn in_cart_among(
        &self,
        user: UserId,
        recipes: &[RecipeId],
    ) -> ServiceResult<HashSet<RecipeId>> {
        Ok(self
            .storage
            .recipe_relation_among(RecipeRelation::Cart, user, recipes)
            .await?)
    }

    pub async fn subscribed_among(
        &self,
        follower: UserId,
        authors: &[UserId],
    ) -> ServiceResult<HashSet<UserId>> {
        Ok(self.storage.subscribed_among(follower, authors).await?)
    }

    async fn add(&self, relation: Relation) -> ServiceResult<AddOutcome> {
        match self.storage.insert_relation(relation).await {
            Ok(()) => {
                debug!(?relation, "Relation created");
                Ok(AddOutcome::Created)
            }
            Err(StoreError::UniqueViolation(_)) => Ok(AddOutcome::AlreadyExists),
            Err(StoreError::ForeignKeyViolation { reference, .. }) => {
                Err(missing_reference(relation, reference))
            }
            Err(StoreError::CheckViolation(message)) => Err(ServiceError::invalid(message)),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, relation: Relation) -> ServiceResult<RemoveOutcome> {
        if self.storage.delete_relation(relation).await? {
            debug!(?relation, "Relation removed");
            Ok(RemoveOutcome::Removed)
        } else {
            Ok(RemoveOutcome::NotFound)
        }
    }
}

/// Names the row a failed insert pointed at. The acting user can be the
/// missing one when their account was deleted after the token was issued.
fn missing_reference(relation: Relation, reference: Reference) -> ServiceError {
    match (relation, reference) {
        (Relation::Recipe { user, .. }, Reference::User) => {
            ServiceError::not_found(Entity::User, user)
        }
        (Relation::Recipe { recipe, .. }, _) => ServiceError::not_found(Entity::Recipe, recipe),
        (Relation::Subscription { follower, .. }, Reference::Follower) => {
            ServiceError::not_found(Entity::User, follower)
        }
        (Relation::Subscription { author, .. }, _) => ServiceError::not_found(Entity::User, author),
    }
}
