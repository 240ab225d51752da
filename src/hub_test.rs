//! Tests for the development hub's HTTP contract, driven over a real socket.

use super::*;
use serde_json::{json, Value};
use tokio::net::TcpListener;

// ============================================================================
// Helpers
// ============================================================================

async fn spawn_hub(max_notebook_bytes: usize) -> String {
    let config = HubConfig {
        max_notebook_bytes,
        ..HubConfig::default()
    };
    let state = Arc::new(HubState::new(LocalStore::temporary().unwrap(), config));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });

    format!("http://{}/api/v1", addr)
}

async fn issue(http: &reqwest::Client, base: &str) -> String {
    let body: Value = http
        .post(format!("{}/auth/issue", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["token"].as_str().unwrap().to_string()
}

fn notebook_json(source: &str) -> Value {
    json!({
        "cells": [{ "cell_type": "code", "source": source, "metadata": {}, "outputs": [] }],
        "metadata": {},
        "nbformat": 4,
        "nbformat_minor": 5
    })
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_create_requires_token() {
    let base = spawn_hub(4096).await;
    let http = reqwest::Client::new();

    let response = http
        .post(format!("{}/notebooks", base))
        .json(&json!({ "content": notebook_json("x = 1") }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_then_fetch_by_id_and_alias() {
    let base = spawn_hub(4096).await;
    let http = reqwest::Client::new();
    let token = issue(&http, &base).await;

    let created: Value = http
        .post(format!("{}/notebooks", base))
        .bearer_auth(&token)
        .json(&json!({ "content": notebook_json("x = 1") }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let id = created["notebook"]["id"].as_str().unwrap();
    let alias = created["notebook"]["readable_id"].as_str().unwrap();

    for key in [id, alias] {
        let fetched: Value = http
            .get(format!("{}/notebooks/{}", base, key))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(fetched["id"], id);
        assert_eq!(fetched["domain_id"], "local");
        assert_eq!(fetched["content"]["cells"][0]["source"], "x = 1");
    }
}

#[tokio::test]
async fn test_update_unknown_notebook_is_not_found() {
    let base = spawn_hub(4096).await;
    let http = reqwest::Client::new();
    let token = issue(&http, &base).await;

    let response = http
        .patch(format!("{}/notebooks/missing-id", base))
        .bearer_auth(&token)
        .json(&json!({ "content": notebook_json("x = 1") }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oversized_notebook_is_413() {
    let base = spawn_hub(256).await;
    let http = reqwest::Client::new();
    let token = issue(&http, &base).await;

    let response = http
        .post(format!("{}/notebooks", base))
        .bearer_auth(&token)
        .json(&json!({ "content": notebook_json(&"a".repeat(1024)) }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::PAYLOAD_TOO_LARGE);
}
