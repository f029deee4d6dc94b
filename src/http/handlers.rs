//! Request handlers.

use super::session::SessionUser;
use super::{ApiError, AppState, run_blocking};
use crate::Error;
use crate::catalog::CatalogEntry;
use crate::models::{
    BehaviorAction, BehaviorRecord, Complexity, DEFAULT_LIMIT, ItemDetails, ItemType,
    NewBehavior, PreferenceSnapshot, SuggestionRequest, TemplateSuggestion,
};
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Default page size for `GET /api/behavior`.
const DEFAULT_HISTORY_LIMIT: usize = 20;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionQuery {
    limit: Option<usize>,
    include_complexity: Option<bool>,
    include_categories: Option<bool>,
    include_tags: Option<bool>,
}

pub async fn get_suggestions(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Query(query): Query<SuggestionQuery>,
) -> ApiResult<Json<Vec<TemplateSuggestion>>> {
    let settings = &state.engine.config().suggestions;
    let request = SuggestionRequest {
        limit: query.limit.unwrap_or(settings.default_limit),
        include_complexity: query.include_complexity.unwrap_or(true),
        include_categories: query.include_categories.unwrap_or(true),
        include_tags: query.include_tags.unwrap_or(true),
    }
    .clamped(settings.max_limit);

    let engine = state.engine.clone();
    let suggestions =
        run_blocking(move || engine.composer().get_suggestions(user_id, &request)).await?;
    Ok(Json(suggestions))
}

pub async fn get_preferences(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
) -> ApiResult<Json<PreferenceSnapshot>> {
    let engine = state.engine.clone();
    let snapshot = run_blocking(move || engine.stores().preferences.get(user_id)).await??;
    snapshot
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("preferences for user {user_id}")).into())
}

pub async fn recompute_preferences(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
) -> ApiResult<Json<PreferenceSnapshot>> {
    let engine = state.engine.clone();
    let snapshot =
        run_blocking(move || engine.aggregator().recompute_preferences(user_id)).await?;
    snapshot
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("behavior history for user {user_id}")).into())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorPayload {
    action: String,
    item_type: String,
    item_id: String,
    #[serde(default)]
    item_details: Option<Value>,
}

pub async fn record_behavior(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Json(payload): Json<BehaviorPayload>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let action = BehaviorAction::parse(&payload.action)
        .ok_or_else(|| Error::InvalidInput(format!("unknown action '{}'", payload.action)))?;
    let item_type = ItemType::parse(&payload.item_type).ok_or_else(|| {
        Error::InvalidInput(format!("unknown item type '{}'", payload.item_type))
    })?;
    if payload.item_id.trim().is_empty() {
        return Err(Error::InvalidInput("itemId cannot be empty".to_string()).into());
    }

    let behavior = NewBehavior {
        user_id,
        action,
        item_type,
        item_id: payload.item_id,
        item_details: payload.item_details.map(ItemDetails::from).unwrap_or_default(),
    };
    let engine = state.engine.clone();
    let recorded = run_blocking(move || engine.recorder().record(&behavior)).await?;

    let status = if recorded {
        StatusCode::CREATED
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(json!({ "recorded": recorded }))))
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    limit: Option<usize>,
}

pub async fn list_behavior(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<BehaviorRecord>>> {
    let window = state.engine.config().suggestions.history_window.max(1);
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, window);

    let engine = state.engine.clone();
    let records = run_blocking(move || engine.stores().behavior.recent(user_id, limit)).await??;
    Ok(Json(records))
}

#[derive(Debug, Default, Deserialize)]
pub struct TemplateQuery {
    complexity: Option<String>,
    category: Option<String>,
}

pub async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<TemplateQuery>,
) -> ApiResult<Json<Vec<CatalogEntry>>> {
    let catalog = state.engine.catalog();

    if let Some(category) = query.category.filter(|c| !c.trim().is_empty()) {
        return Ok(Json(catalog.by_category(&category, DEFAULT_LIMIT)));
    }

    let entries = match query.complexity.filter(|c| !c.trim().is_empty()) {
        Some(raw) => {
            let level = Complexity::parse(&raw)
                .ok_or_else(|| Error::InvalidInput(format!("unknown complexity '{raw}'")))?;
            catalog.by_complexity(level)
        },
        None => catalog.all(),
    };
    Ok(Json(entries))
}

fn acknowledge(body: &Value, status: &str) -> ApiResult<(StatusCode, Json<Value>)> {
    let template_id = body
        .get("templateId")
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| Error::InvalidInput("templateId is required".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "templateId": template_id, "status": status })),
    ))
}

pub async fn implement_template(Json(body): Json<Value>) -> ApiResult<(StatusCode, Json<Value>)> {
    acknowledge(&body, "implemented")
}

pub async fn favorite_template(Json(body): Json<Value>) -> ApiResult<(StatusCode, Json<Value>)> {
    acknowledge(&body, "favorited")
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
}

pub async fn search_templates(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<CatalogEntry>> {
    let Some(term) = query
        .q
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty())
    else {
        return Json(Vec::new());
    };

    let catalog = state.engine.catalog();
    Json(
        catalog
            .all()
            .into_iter()
            .filter(|entry| entry.template_id.contains(&term))
            .collect(),
    )
}
