//! Shared test utilities for integration tests.
//!
//! Provides a seeded `MockStorage`, session tokens for the seeded users and a
//! ready `TestServer`.

use axum_test::TestServer;
use recipebook_services::{
    auth::sign_session_token,
    config::Config,
    model::{Amount, IngredientId, NewRecipe, NewUser, RecipeId, TagId, UserId},
    routes,
    storage::{CatalogStorage, MockStorage},
};

/// Ids of everything `seed` creates.
#[allow(dead_code)]
pub struct Fixture {
    pub alice: UserId,
    pub bob: UserId,
    pub admin: UserId,
    pub breakfast: TagId,
    pub lunch: TagId,
    pub flour: IngredientId,
    pub egg: IngredientId,
    /// Alice, breakfast: flour 200 g, egg 2 pcs.
    pub pancakes: RecipeId,
    /// Alice, lunch: flour 300 g.
    pub bread: RecipeId,
    /// Bob, breakfast: egg 3 pcs.
    pub omelette: RecipeId,
}

fn amount(value: u32) -> Amount {
    Amount::new(value).unwrap()
}

async fn recipe(
    storage: &MockStorage,
    author: UserId,
    name: &str,
    tags: Vec<TagId>,
    ingredients: Vec<(IngredientId, Amount)>,
) -> RecipeId {
    storage
        .insert_recipe(NewRecipe {
            author_id: author,
            name: name.to_owned(),
            text: format!("How to make {name}."),
            cooking_time: 20,
            tag_ids: tags,
            ingredients,
        })
        .await
        .unwrap()
        .id
}

/// Populates `storage` with three users, two tags and three recipes.
pub async fn seed(storage: &MockStorage) -> Fixture {
    let alice = storage.insert_user(NewUser::regular("alice")).await.unwrap();
    let bob = storage.insert_user(NewUser::regular("bob")).await.unwrap();
    let mut admin = NewUser::regular("admin");
    admin.is_admin = true;
    let admin = storage.insert_user(admin).await.unwrap();

    let breakfast = storage.insert_tag("Breakfast", "breakfast").await.unwrap();
    let lunch = storage.insert_tag("Lunch", "lunch").await.unwrap();

    let flour = storage.insert_ingredient("flour", "g").await.unwrap();
    let egg = storage.insert_ingredient("egg", "pcs").await.unwrap();

    let pancakes = recipe(
        storage,
        alice.id,
        "Pancakes",
        vec![breakfast.id],
        vec![(flour.id, amount(200)), (egg.id, amount(2))],
    )
    .await;
    let bread = recipe(
        storage,
        alice.id,
        "Bread",
        vec![lunch.id],
        vec![(flour.id, amount(300))],
    )
    .await;
    let omelette = recipe(
        storage,
        bob.id,
        "Omelette",
        vec![breakfast.id],
        vec![(egg.id, amount(3))],
    )
    .await;

    Fixture {
        alice: alice.id,
        bob: bob.id,
        admin: admin.id,
        breakfast: breakfast.id,
        lunch: lunch.id,
        flour: flour.id,
        egg: egg.id,
        pancakes,
        bread,
        omelette,
    }
}

/// Signs a session token for `user` with the test secret.
pub fn token_for(user: UserId) -> String {
    let config = Config::new_for_test();
    sign_session_token(user, config.jwt_secret(), 3600).unwrap()
}

/// Creates a test server over a freshly seeded storage.
///
/// The storage handle is returned too; it shares state with the server.
pub async fn seeded_server() -> (TestServer, MockStorage, Fixture) {
    let storage = MockStorage::new();
    let fixture = seed(&storage).await;
    let app = routes(storage.clone(), Config::new_for_test());
    let server = TestServer::new(app).unwrap();
    (server, storage, fixture)
}
