//! Claim assignment through the admin API and its effect on the storefront.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::json;

use emporium_core::backend::{IdentityProvider, PRODUCTS};
use emporium_core::Email;
use emporium_integration_tests::{PASSWORD, TestApp};

#[tokio::test]
async fn test_promoted_user_manages_products_after_next_sign_in() {
    let app = TestApp::new();
    let boss = app.create_user("szef@example.com", true).await;

    let mut browser = app.browser();
    let user = browser.sign_up_and_in("ala@example.com").await;
    let uid = user["uid"].as_str().unwrap().to_string();

    let product = json!({"name": "Wazon", "price": 49.9, "stock": 3, "category": "dom"});
    let (status, _) = browser.post("/api/admin/products", product.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .admin_call(
            Method::POST,
            "/api/admin",
            Some(&boss.id_token),
            Some(json!({"action": "promote", "uid": uid})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User promoted");

    browser.post("/api/auth/logout", json!({})).await;
    let user = browser.sign_in("ala@example.com").await;
    assert_eq!(user["admin"], true);

    let (status, created) = browser.post("/api/admin/products", product).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (_, listed) = browser.get("/api/admin/products").await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, detail) = browser.get(&format!("/api/products/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["product"]["name"], "Wazon");
    assert!(detail["product"]["createdAt"].is_string());

    let (status, _) = browser.delete(&format!("/api/admin/products/{id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.backend.count(PRODUCTS).await, 0);
}

#[tokio::test]
async fn test_demoted_admin_is_refused_with_old_token() {
    let app = TestApp::new();
    let boss = app.create_user("szef@example.com", true).await;
    let deputy = app.create_user("zastepca@example.com", true).await;

    let (status, body) = app
        .admin_call(
            Method::POST,
            "/api/admin",
            Some(&boss.id_token),
            Some(json!({"action": "demote", "uid": deputy.identity.uid.as_str()})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User demoted");

    let (status, _) = app
        .admin_call(
            Method::POST,
            "/api/products",
            Some(&deputy.id_token),
            Some(json!({"name": "Kubek", "price": 19, "category": "kuchnia"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.backend.count(PRODUCTS).await, 0);
}

#[tokio::test]
async fn test_admin_api_product_appears_in_catalog() {
    let app = TestApp::new();
    let boss = app.create_user("szef@example.com", true).await;

    let (status, created) = app
        .admin_call(
            Method::POST,
            "/api/products",
            Some(&boss.id_token),
            Some(json!({
                "name": "Kubek",
                "description": "Ceramiczny",
                "price": 19,
                "stock": 12,
                "imageURL": "https://example.com/kubek.jpg",
                "category": "kuchnia"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_str().unwrap();

    let mut browser = app.browser();
    let (_, products) = browser.get("/api/products?category=kuchnia").await;
    let products = products.as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["id"], id);
    assert_eq!(products[0]["imageURL"], "https://example.com/kubek.jpg");
}

#[tokio::test]
async fn test_admin_api_rejects_bad_requests() {
    let app = TestApp::new();
    let boss = app.create_user("szef@example.com", true).await;

    let (status, body) = app
        .admin_call(Method::POST, "/api/admin", None, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, body) = app
        .admin_call(
            Method::POST,
            "/api/admin",
            Some(&boss.id_token),
            Some(json!({"uid": ""})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing params");

    let (status, body) = app
        .admin_call(Method::PUT, "/api/products", Some(&boss.id_token), None)
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "Method not allowed");
}

#[tokio::test]
async fn test_storefront_login_token_works_for_admin_api() {
    let app = TestApp::new();
    app.create_user("szef@example.com", true).await;

    let session = app
        .backend
        .sign_in(&Email::parse("szef@example.com").unwrap(), PASSWORD)
        .await
        .unwrap();
    let (status, _) = app
        .admin_call(
            Method::POST,
            "/api/products",
            Some(&session.id_token),
            Some(json!({"name": "Lampa", "price": 120, "category": "dom"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}
