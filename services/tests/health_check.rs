use axum::http::StatusCode;
use axum_test::TestServer;
use recipebook_services::{config::Config, routes, storage::MockStorage};

#[tokio::test]
async fn test_health_check_integration() {
    // Case 1: Connected
    let storage_connected = MockStorage::new();
    let app_connected = routes(storage_connected, Config::new_for_test());
    let server_connected = TestServer::new(app_connected).unwrap();

    let response = server_connected.get("/is-health").await;
    response.assert_status(StatusCode::OK);

    // Case 2: Disconnected
    let storage_disconnected = MockStorage::new();
    storage_disconnected.set_connected(false);
    let app_disconnected = routes(storage_disconnected, Config::new_for_test());
    let server_disconnected = TestServer::new(app_disconnected).unwrap();

    let response = server_disconnected.get("/is-health").await;
    response.assert_status(StatusCode::BAD_GATEWAY);
}
