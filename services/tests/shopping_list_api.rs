mod common;

use axum::http::{StatusCode, header};
use common::{seeded_server, token_for};
use recipebook_services::{
    model::{Amount, NewRecipe},
    storage::CatalogStorage,
};
use serde_json::{Value, json};

#[tokio::test]
async fn test_shopping_list_consolidates_cart() {
    let (server, _storage, fx) = seeded_server().await;
    let token = token_for(fx.bob);

    for recipe in [fx.pancakes, fx.omelette, fx.bread] {
        server
            .post(&format!("/api/recipes/{recipe}/shopping_cart"))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::CREATED);
    }

    let response = server
        .get("/api/recipes/shopping_cart")
        .authorization_bearer(&token)
        .await;
    response.assert_status(StatusCode::OK);
    let list: Value = response.json();

    assert_eq!(
        list,
        json!({
            "items": [
                {
                    "name": "egg",
                    "unit": "pcs",
                    "total_amount": 5,
                    "recipes": ["Omelette", "Pancakes"],
                },
                {
                    "name": "flour",
                    "unit": "g",
                    "total_amount": 500,
                    "recipes": ["Bread", "Pancakes"],
                },
            ],
            "unit_conflicts": [],
        })
    );
}

#[tokio::test]
async fn test_download_is_plain_text_attachment() {
    let (server, _storage, fx) = seeded_server().await;
    let token = token_for(fx.alice);

    for recipe in [fx.pancakes, fx.omelette] {
        server
            .post(&format!("/api/recipes/{recipe}/shopping_cart"))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::CREATED);
    }

    let response = server
        .get("/api/recipes/download_shopping_cart")
        .authorization_bearer(&token)
        .await;
    response.assert_status(StatusCode::OK);

    let content_type = response.header(header::CONTENT_TYPE);
    assert_eq!(content_type, "text/plain; charset=utf-8");
    let disposition = response.header(header::CONTENT_DISPOSITION);
    assert_eq!(disposition, "attachment; filename=\"shopping_list.txt\"");

    assert_eq!(response.text(), "- egg (pcs): 5\n- flour (g): 200\n");

    // Reading the list leaves the cart untouched.
    let again = server
        .get("/api/recipes/download_shopping_cart")
        .authorization_bearer(&token)
        .await;
    assert_eq!(again.text(), "- egg (pcs): 5\n- flour (g): 200\n");
}

#[tokio::test]
async fn test_empty_cart() {
    let (server, _storage, fx) = seeded_server().await;
    let token = token_for(fx.bob);

    let list: Value = server
        .get("/api/recipes/shopping_cart")
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(list["items"], json!([]));

    let response = server
        .get("/api/recipes/download_shopping_cart")
        .authorization_bearer(&token)
        .await;
    response.assert_status(StatusCode::OK);
    assert_eq!(response.text(), "Shopping list is empty\n");
}

#[tokio::test]
async fn test_clear_cart_only_touches_caller() {
    let (server, storage, fx) = seeded_server().await;
    let bob = token_for(fx.bob);
    let alice = token_for(fx.alice);

    for recipe in [fx.pancakes, fx.bread] {
        server
            .post(&format!("/api/recipes/{recipe}/shopping_cart"))
            .authorization_bearer(&bob)
            .await
            .assert_status(StatusCode::CREATED);
    }
    server
        .post(&format!("/api/recipes/{}/shopping_cart", fx.omelette))
        .authorization_bearer(&alice)
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .delete("/api/recipes/shopping_cart")
        .authorization_bearer(&bob)
        .await;
    response.assert_status(StatusCode::OK);
    let cleared: Value = response.json();
    assert_eq!(cleared["removed"], 2);
    assert_eq!(storage.relation_count(), 1);

    let text = server
        .get("/api/recipes/download_shopping_cart")
        .authorization_bearer(&alice)
        .await
        .text();
    assert_eq!(text, "- egg (pcs): 3\n");
}

#[tokio::test]
async fn test_unit_mismatch_is_reported() {
    let (server, storage, fx) = seeded_server().await;
    let token = token_for(fx.bob);

    let flour_kg = storage.insert_ingredient("flour", "kg").await.unwrap();
    let loaf = storage
        .insert_recipe(NewRecipe {
            author_id: fx.bob,
            name: "Big Loaf".to_owned(),
            text: "Knead.".to_owned(),
            cooking_time: 90,
            tag_ids: vec![fx.lunch],
            ingredients: vec![(flour_kg.id, Amount::new(1).unwrap())],
        })
        .await
        .unwrap();

    for recipe in [fx.bread, loaf.id] {
        server
            .post(&format!("/api/recipes/{recipe}/shopping_cart"))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::CREATED);
    }

    let list: Value = server
        .get("/api/recipes/shopping_cart")
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(list["unit_conflicts"], json!(["flour"]));
    assert_eq!(list["items"][0]["unit"], "g");
    assert_eq!(list["items"][0]["total_amount"], 300);
    assert_eq!(list["items"][1]["unit"], "kg");
    assert_eq!(list["items"][1]["total_amount"], 1);
}

#[tokio::test]
async fn test_shopping_list_requires_token() {
    let (server, _storage, _fx) = seeded_server().await;

    server
        .get("/api/recipes/shopping_cart")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .delete("/api/recipes/shopping_cart")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}
