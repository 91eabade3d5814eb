use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::cache::{CacheKey, ResponseCache};
use crate::error::{ProxyError, UpstreamError};
use crate::health;
use crate::metrics::Outcome;
use crate::models::{active_products, active_vendors, Product, Vendor};
use crate::response::{empty_ratings, ApiEnvelope, MessageResponse};
use crate::state::SharedState;
use crate::upstream::UpstreamClient;
use crate::validation::{RatingSubmission, RequestValidator};

/// Queue keys, one per upstream resource
mod resource {
    pub const VENDORS: &str = "vendors";
    pub const PRODUCTS: &str = "products";
    pub const CATEGORIES: &str = "categories";
    pub const SUB_CATEGORIES: &str = "sub-categories";
    pub const CATEGORIES_WITH_PRODUCTS: &str = "categories-with-products";
    pub const RATINGS: &str = "ratings";
}

#[derive(Debug, Deserialize)]
pub struct RatingsQuery {
    pub page: Option<String>,
}

impl RatingsQuery {
    /// Missing, non-numeric or zero pages fall back to the first page
    pub fn page(&self) -> u32 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(1)
    }
}

/// Cache lookup, then queued upstream fetch, then cache store.
///
/// Only successful fetches are stored; `fetch` returns the payload already
/// normalized for caching. The store runs inside the queued job, so a fetch
/// that completes after the caller disconnected is still cached.
async fn cached_fetch<F, Fut>(
    state: &SharedState,
    resource: &'static str,
    cache: &Arc<dyn ResponseCache>,
    key: CacheKey,
    fetch: F,
) -> Result<Value, UpstreamError>
where
    F: FnOnce(UpstreamClient) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Value, UpstreamError>> + Send + 'static,
{
    if let Some(hit) = cache.get(&key).await {
        debug!(key = %key, "Cache hit");
        state.metrics.record(resource, Outcome::CacheHit).await;
        return Ok(hit);
    }

    let upstream = state.upstream.clone();
    let metrics = state.metrics.clone();
    let cache = cache.clone();

    state
        .queue
        .enqueue(resource, move || async move {
            let result = fetch(upstream).await;
            match &result {
                Ok(data) => {
                    cache.set(&key, data.clone()).await;
                    metrics.record(resource, Outcome::Fetched).await;
                }
                Err(e) => {
                    warn!(resource, key = %key, error = %e, "Upstream fetch failed, serving empty result");
                    metrics.record(resource, Outcome::UpstreamFailure).await;
                }
            }
            result
        })
        .await
}

fn list_response(result: Result<Value, UpstreamError>) -> Json<ApiEnvelope> {
    match result {
        Ok(data) => Json(ApiEnvelope::ok(data)),
        Err(e) => Json(ApiEnvelope::empty_list(e.to_string())),
    }
}

fn passthrough(status: u16, body: Value) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, Json(body)).into_response()
}

/// Active vendors (served for both `/api/vendors` and `/api/users`)
#[instrument(skip(state))]
pub async fn list_vendors(State(state): State<SharedState>) -> Json<ApiEnvelope> {
    let cache = state.caches.vendors.clone();
    let result = cached_fetch(&state, resource::VENDORS, &cache, CacheKey::Vendors, |upstream| async move {
        let users: Vec<Vendor> = upstream.get_envelope("/users").await?;
        Ok::<_, UpstreamError>(serde_json::to_value(active_vendors(users))?)
    })
    .await;

    list_response(result)
}

#[instrument(skip(state))]
pub async fn list_products(State(state): State<SharedState>) -> Json<ApiEnvelope> {
    let cache = state.caches.products.clone();
    let result = cached_fetch(&state, resource::PRODUCTS, &cache, CacheKey::Products, |upstream| async move {
        let products: Vec<Product> = upstream.get_envelope("/products").await?;
        Ok::<_, UpstreamError>(serde_json::to_value(active_products(products))?)
    })
    .await;

    list_response(result)
}

#[instrument(skip(state))]
pub async fn list_categories(State(state): State<SharedState>) -> Json<ApiEnvelope> {
    let cache = state.caches.categories.clone();
    let result = cached_fetch(&state, resource::CATEGORIES, &cache, CacheKey::Categories, |upstream| async move {
        let categories: Vec<Value> = upstream.get_envelope("/categories").await?;
        Ok::<_, UpstreamError>(Value::Array(categories))
    })
    .await;

    list_response(result)
}

#[instrument(skip(state))]
pub async fn list_sub_categories(State(state): State<SharedState>) -> Json<ApiEnvelope> {
    let cache = state.caches.categories.clone();
    let result = cached_fetch(
        &state,
        resource::SUB_CATEGORIES,
        &cache,
        CacheKey::SubCategories,
        |upstream| async move {
            let sub_categories: Vec<Value> = upstream.get_envelope("/sub-categories").await?;
            Ok::<_, UpstreamError>(Value::Array(sub_categories))
        },
    )
    .await;

    list_response(result)
}

#[instrument(skip(state))]
pub async fn category_with_products(
    State(state): State<SharedState>,
    Path(category_id): Path<String>,
) -> Result<Json<ApiEnvelope>, ProxyError> {
    RequestValidator::validate_identifier("category id", &category_id)?;

    let cache = state.caches.categories.clone();
    let path = format!("/categories-with-products/{}", category_id);
    let result = cached_fetch(
        &state,
        resource::CATEGORIES_WITH_PRODUCTS,
        &cache,
        CacheKey::category_with_products(category_id),
        |upstream| async move {
            let category: Value = upstream.get_envelope(&path).await?;
            if category.is_null() {
                return Err(UpstreamError::MalformedEnvelope("missing data".to_string()));
            }
            Ok::<_, UpstreamError>(category)
        },
    )
    .await;

    Ok(Json(match result {
        Ok(category) => ApiEnvelope::ok(category),
        Err(e) => ApiEnvelope::empty_object(e.to_string()),
    }))
}

#[instrument(skip(state))]
pub async fn list_ratings(
    State(state): State<SharedState>,
    Path(product_id): Path<String>,
    Query(query): Query<RatingsQuery>,
) -> Result<Json<Value>, ProxyError> {
    RequestValidator::validate_identifier("product id", &product_id)?;

    let page = query.page();
    let cache = state.caches.ratings.clone();
    let path = format!("/products/{}/ratings?page={}", product_id, page);
    let result = cached_fetch(
        &state,
        resource::RATINGS,
        &cache,
        CacheKey::ratings(product_id, page),
        |upstream| async move {
            let body = upstream.get_json(&path, None).await?;
            let accepted = body.get("status") == Some(&Value::Bool(true))
                || body.get("success") == Some(&Value::Bool(true));
            if !accepted {
                return Err(UpstreamError::MalformedEnvelope(
                    "ratings response is not marked successful".to_string(),
                ));
            }
            Ok::<_, UpstreamError>(body)
        },
    )
    .await;

    Ok(Json(match result {
        Ok(body) => body,
        Err(e) => empty_ratings(e.to_string()),
    }))
}

#[instrument(skip(state, headers))]
pub async fn my_rating(
    State(state): State<SharedState>,
    Path(product_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ProxyError> {
    let token = RequestValidator::require_bearer(&headers)?.to_string();
    RequestValidator::validate_identifier("product id", &product_id)?;

    let upstream = state.upstream.clone();
    let path = format!("/products/{}/my-rating", product_id);
    let result = state
        .queue
        .enqueue(resource::RATINGS, move || async move {
            upstream.get_json(&path, Some(&token)).await
        })
        .await;

    match result {
        Ok(body) => Ok(Json(body)),
        Err(e) => {
            warn!(error = %e, "Failed to fetch own rating");
            let fallback = serde_json::to_value(ApiEnvelope::empty_object(e.to_string()))
                .map_err(|e| ProxyError::Internal(e.to_string()))?;
            Ok(Json(fallback))
        }
    }
}

#[instrument(skip(state, headers, payload))]
pub async fn submit_rating(
    State(state): State<SharedState>,
    Path(product_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<RatingSubmission>, JsonRejection>,
) -> Result<Response, ProxyError> {
    let Json(submission) = payload.map_err(|e| ProxyError::Validation(e.body_text()))?;
    let token = RequestValidator::bearer_token(&headers).map(str::to_string);
    RequestValidator::validate_rating_submission(&submission, token.is_some())?;
    RequestValidator::validate_identifier("product id", &product_id)?;

    let body = serde_json::to_value(&submission).map_err(|e| ProxyError::Internal(e.to_string()))?;
    let upstream = state.upstream.clone();
    let path = format!("/products/{}/ratings", product_id);

    let (status, reply) = state
        .queue
        .enqueue(resource::RATINGS, move || async move {
            upstream
                .send(Method::POST, &path, token.as_deref(), Some(&body))
                .await
        })
        .await?;

    Ok(passthrough(status, reply))
}

#[instrument(skip(state, headers))]
pub async fn delete_rating(
    State(state): State<SharedState>,
    Path(rating_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ProxyError> {
    let token = RequestValidator::require_bearer(&headers)?.to_string();
    RequestValidator::validate_identifier("rating id", &rating_id)?;

    let upstream = state.upstream.clone();
    let path = format!("/ratings/{}", rating_id);
    let (status, reply) = state
        .queue
        .enqueue(resource::RATINGS, move || async move {
            upstream.send(Method::DELETE, &path, Some(&token), None).await
        })
        .await?;

    if !(200..300).contains(&status) {
        return Ok(passthrough(status, reply));
    }

    let message = reply
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("Rating deleted successfully");
    Ok(Json(MessageResponse::success(message)).into_response())
}

/// Health check endpoint
pub async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    Json(health::check_health(&state).await)
}

/// Readiness check endpoint
pub async fn readiness_check(State(state): State<SharedState>) -> impl IntoResponse {
    if state.redis.is_some() {
        (StatusCode::OK, Json(json!({
            "status": "ready",
            "cache": "shared"
        })))
    } else {
        (StatusCode::OK, Json(json!({
            "status": "ready",
            "cache": "local",
            "note": "Caches are per instance"
        })))
    }
}

pub async fn metrics(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "resources": state.metrics.get_all_metrics().await,
        "global": state.metrics.get_global_metrics().await,
        "queue": {
            "pending": state.queue.pending(),
            "processed": state.queue.processed(),
            "delayed": state.queue.delayed(),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratings_page_parsing() {
        let page = |raw: Option<&str>| RatingsQuery {
            page: raw.map(str::to_string),
        }
        .page();

        assert_eq!(page(None), 1);
        assert_eq!(page(Some("3")), 3);
        assert_eq!(page(Some("0")), 1);
        assert_eq!(page(Some("abc")), 1);
    }

    #[test]
    fn test_list_response_fails_soft() {
        let Json(envelope) = list_response(Err(UpstreamError::Status(500)));
        assert!(!envelope.status);
        assert_eq!(envelope.data, json!([]));
        assert_eq!(envelope.error.as_deref(), Some("Upstream returned status 500"));
    }

    #[test]
    fn test_passthrough_keeps_upstream_status() {
        let response = passthrough(403, json!({"status": false}));
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
