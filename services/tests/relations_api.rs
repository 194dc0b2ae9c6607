mod common;

use axum::http::StatusCode;
use common::{seeded_server, token_for};
use recipebook_services::storage::CatalogStorage;
use serde_json::Value;

#[tokio::test]
async fn test_favorite_lifecycle() {
    let (server, _storage, fx) = seeded_server().await;
    let token = token_for(fx.bob);
    let path = format!("/api/recipes/{}/favorite", fx.pancakes);

    let response = server.post(&path).authorization_bearer(&token).await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["id"], fx.pancakes.0);
    assert_eq!(body["name"], "Pancakes");

    // Second add is idempotent and reports the existing row.
    let response = server.post(&path).authorization_bearer(&token).await;
    response.assert_status(StatusCode::OK);
    let again: Value = response.json();
    assert_eq!(again, body);

    let detail: Value = server
        .get(&format!("/api/recipes/{}", fx.pancakes))
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(detail["is_favorited"], true);
    assert_eq!(detail["is_in_shopping_cart"], false);

    server
        .delete(&path)
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let response = server.delete(&path).authorization_bearer(&token).await;
    response.assert_status(StatusCode::NOT_FOUND);
    let error: Value = response.json();
    assert_eq!(error["error"], "not_found");
}

#[tokio::test]
async fn test_favorite_unknown_recipe_is_not_found() {
    let (server, storage, fx) = seeded_server().await;
    let before = storage.relation_count();

    server
        .post("/api/recipes/9999/favorite")
        .authorization_bearer(&token_for(fx.alice))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    assert_eq!(storage.relation_count(), before);
}

#[tokio::test]
async fn test_relation_endpoints_require_token() {
    let (server, _storage, fx) = seeded_server().await;

    server
        .post(&format!("/api/recipes/{}/favorite", fx.pancakes))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .post(&format!("/api/users/{}/subscribe", fx.bob))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .get("/api/users/subscriptions")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_token_is_rejected_even_on_public_routes() {
    let (server, _storage, _fx) = seeded_server().await;

    server
        .get("/api/recipes")
        .authorization_bearer("not-a-jwt")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_subscribe_to_self_is_rejected() {
    let (server, storage, fx) = seeded_server().await;
    let before = storage.relation_count();

    let response = server
        .post(&format!("/api/users/{}/subscribe", fx.alice))
        .authorization_bearer(&token_for(fx.alice))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let error: Value = response.json();
    assert_eq!(error["error"], "bad_request");

    assert_eq!(storage.relation_count(), before);
}

#[tokio::test]
async fn test_subscription_lifecycle() {
    let (server, _storage, fx) = seeded_server().await;
    let token = token_for(fx.bob);
    let path = format!("/api/users/{}/subscribe", fx.alice);

    let response = server.post(&path).authorization_bearer(&token).await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["username"], "alice");
    assert_eq!(body["is_subscribed"], true);
    assert_eq!(body["recipes_count"], 2);
    assert_eq!(body["recipes"].as_array().map(Vec::len), Some(2));

    server
        .post(&path)
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::OK);

    let profile: Value = server
        .get(&format!("/api/users/{}", fx.alice))
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(profile["is_subscribed"], true);

    let anonymous: Value = server
        .get(&format!("/api/users/{}", fx.alice))
        .await
        .json();
    assert_eq!(anonymous["is_subscribed"], false);

    let page: Value = server
        .get("/api/users/subscriptions?recipes_limit=1")
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(page["count"], 1);
    assert_eq!(page["next"], Value::Null);
    assert_eq!(page["results"][0]["username"], "alice");
    assert_eq!(page["results"][0]["recipes"].as_array().map(Vec::len), Some(1));
    assert_eq!(page["results"][0]["recipes_count"], 2);

    server
        .delete(&path)
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .delete(&path)
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_subscribe_to_unknown_user_is_not_found() {
    let (server, _storage, fx) = seeded_server().await;

    server
        .post("/api/users/9999/subscribe")
        .authorization_bearer(&token_for(fx.bob))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recipe_delete_requires_author_or_admin() {
    let (server, storage, fx) = seeded_server().await;
    let path = format!("/api/recipes/{}", fx.pancakes);

    for user in [fx.alice, fx.bob] {
        server
            .post(&format!("/api/recipes/{}/favorite", fx.pancakes))
            .authorization_bearer(&token_for(user))
            .await
            .assert_status(StatusCode::CREATED);
    }
    server
        .post(&format!("/api/recipes/{}/shopping_cart", fx.pancakes))
        .authorization_bearer(&token_for(fx.bob))
        .await
        .assert_status(StatusCode::CREATED);
    assert_eq!(storage.relation_count(), 3);

    let response = server
        .delete(&path)
        .authorization_bearer(&token_for(fx.bob))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(storage.relation_count(), 3);

    server
        .delete(&path)
        .authorization_bearer(&token_for(fx.admin))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    // Favorites and cart entries go with the recipe.
    assert_eq!(storage.relation_count(), 0);
    server.get(&path).await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_current_user_profile() {
    let (server, _storage, fx) = seeded_server().await;

    let response = server
        .get("/api/users/me")
        .authorization_bearer(&token_for(fx.bob))
        .await;
    response.assert_status(StatusCode::OK);
    let me: Value = response.json();
    assert_eq!(me["id"], fx.bob.0);
    assert_eq!(me["username"], "bob");
    assert_eq!(me["is_subscribed"], false);

    server
        .get("/api/users/me")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_of_deleted_user_blames_the_user() {
    let (server, storage, fx) = seeded_server().await;
    let token = token_for(fx.bob);
    assert!(storage.delete_user(fx.bob).await.unwrap());

    let response = server
        .post(&format!("/api/recipes/{}/favorite", fx.pancakes))
        .authorization_bearer(&token)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let error: Value = response.json();
    assert_eq!(error["message"], format!("user {} not found", fx.bob));

    server
        .get("/api/users/me")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
