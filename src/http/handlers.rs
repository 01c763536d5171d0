//! Demonstration endpoints over the users table.

use super::AppState;
use super::response::{ApiError, ApiResult, success};
use crate::error::DbError;
use crate::models::Row;
use crate::params;
use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::time::Duration;

const SELECT_USER: &str = "SELECT * FROM users WHERE id = :id";
const SELECT_USER_NAME: &str = "SELECT name FROM users WHERE id = :id";
const UPDATE_USER_NAME: &str = "UPDATE users SET name = :name WHERE id = :id";
const INSERT_USER: &str = "INSERT INTO users (name, age) VALUES (:name, :age)";
const SELECT_USERS_PAGE: &str = "SELECT * FROM users LIMIT :limit OFFSET :offset";

const DEMO_USER_ID: i64 = 98;
const PAGE_SIZE: i64 = 5;

/// GET /test1
pub async fn list_user(State(state): State<AppState>) -> ApiResult<Vec<Row>> {
    let params = params! { "id" => DEMO_USER_ID };
    let rows = state
        .facade
        .query(SELECT_USER, &params)
        .await
        .map_err(ApiError::query)?;
    Ok(success(rows))
}

/// GET /test2
pub async fn get_user(State(state): State<AppState>) -> ApiResult<Option<Row>> {
    let params = params! { "id" => DEMO_USER_ID };
    let row = state
        .facade
        .get_row(SELECT_USER, &params)
        .await
        .map_err(ApiError::query)?;
    Ok(success(row))
}

/// GET /test3
pub async fn get_user_name(State(state): State<AppState>) -> ApiResult<JsonValue> {
    let params = params! { "id" => DEMO_USER_ID };
    let name = state
        .facade
        .get_var(SELECT_USER_NAME, &params)
        .await
        .map_err(ApiError::query)?;
    Ok(success(json!({ "name": name })))
}

/// GET /test4
pub async fn rename_user(State(state): State<AppState>) -> ApiResult<JsonValue> {
    let params = params! { "id" => DEMO_USER_ID, "name" => "test" };
    let count = state
        .facade
        .execute(UPDATE_USER_NAME, &params)
        .await
        .map_err(ApiError::execution)?;
    Ok(success(json!({ "count": count })))
}

/// GET /test5
pub async fn insert_users(State(state): State<AppState>) -> ApiResult<JsonValue> {
    let rows = [
        params! { "name" => "test1111", "age" => 18 },
        params! { "name" => "test2222", "age" => 17 },
    ];
    let count = state
        .facade
        .executemany(INSERT_USER, &rows)
        .await
        .map_err(ApiError::execution)?;
    Ok(success(json!({ "count": count })))
}

/// GET /test6
pub async fn insert_user(State(state): State<AppState>) -> ApiResult<JsonValue> {
    let params = params! { "name" => "test3333", "age" => 16 };
    let id = state
        .facade
        .insert_id(INSERT_USER, &params)
        .await
        .map_err(ApiError::execution)?;
    Ok(success(json!({ "id": id })))
}

/// GET /test7/{page}
pub async fn page_users(
    State(state): State<AppState>,
    Path(page): Path<i64>,
) -> ApiResult<Vec<Row>> {
    let page_spec = state
        .facade
        .page_and_size(page, PAGE_SIZE)
        .map_err(ApiError::execution)?;
    let rows = state
        .facade
        .query(SELECT_USERS_PAGE, &page_spec.params())
        .await
        .map_err(ApiError::execution)?;
    Ok(success(rows))
}

#[derive(Debug, Deserialize)]
pub struct CacheWrite {
    pub value: String,
    #[serde(default)]
    pub expire_secs: Option<u64>,
}

fn cache_disabled() -> DbError {
    DbError::cache("No Redis URL configured")
}

/// GET /cache/{key}
pub async fn cache_get(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<JsonValue> {
    let cache = state
        .cache
        .as_ref()
        .ok_or_else(|| ApiError::query(cache_disabled()))?;
    let value = cache.get(&key).await.map_err(ApiError::query)?;
    Ok(success(json!({ "key": key, "value": value })))
}

/// PUT /cache/{key}
pub async fn cache_put(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<CacheWrite>,
) -> ApiResult<JsonValue> {
    let cache = state
        .cache
        .as_ref()
        .ok_or_else(|| ApiError::execution(cache_disabled()))?;
    cache
        .set(&key, &body.value, body.expire_secs.map(Duration::from_secs))
        .await
        .map_err(ApiError::execution)?;
    Ok(success(json!({ "key": key })))
}
