//! Behavior capture at the HTTP boundary.
//!
//! [`capture_middleware`] watches the template-builder routes. After a
//! successful response for a signed-in user it derives a [`NewBehavior`]
//! from the request and records it on a background task; the response is
//! returned unchanged and never waits on storage.

use super::AppState;
use super::session::SessionUser;
use crate::config::CaptureRoutes;
use crate::models::{BehaviorAction, ItemDetails, ItemType, NewBehavior, UserId};
use crate::observability::{RequestContext, current_request_id, enter_request_context};
use crate::services::BehaviorRecorder;
use crate::{Error, Result};
use axum::body::{Body, HttpBody};
use axum::extract::{Query, State};
use axum::http::{Method, Request, Uri};
use axum::middleware::Next;
use axum::response::Response;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Default item id for template-list views without a `templateId`.
pub const TEMPLATE_LIST_ID: &str = "template-list";

/// A watched route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureRoute {
    /// Template listing (`GET`).
    TemplatesList,
    /// Template implementation (`POST`).
    Implement,
    /// Search (`GET`).
    Search,
    /// Favorite (`POST`).
    Favorite,
}

impl CaptureRoute {
    /// Whether classification reads the JSON body.
    #[must_use]
    pub const fn reads_body(self) -> bool {
        matches!(self, Self::Implement | Self::Favorite)
    }

    const fn method(self) -> Method {
        match self {
            Self::TemplatesList | Self::Search => Method::GET,
            Self::Implement | Self::Favorite => Method::POST,
        }
    }
}

/// Compiled capture patterns, tried in declaration order.
#[derive(Debug, Clone)]
pub struct CaptureRules {
    rules: Vec<(CaptureRoute, Regex)>,
    max_body_bytes: usize,
}

impl CaptureRules {
    /// Compiles the configured route patterns.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a pattern is not a valid regex.
    pub fn compile(routes: &CaptureRoutes, max_body_bytes: usize) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| Error::InvalidInput(format!("capture pattern '{pattern}': {e}")))
        };

        Ok(Self {
            rules: vec![
                (CaptureRoute::TemplatesList, compile(&routes.templates_list)?),
                (CaptureRoute::Implement, compile(&routes.implement)?),
                (CaptureRoute::Search, compile(&routes.search)?),
                (CaptureRoute::Favorite, compile(&routes.favorite)?),
            ],
            max_body_bytes,
        })
    }

    /// Returns the first route whose method and pattern match.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<CaptureRoute> {
        self.rules
            .iter()
            .find(|(route, pattern)| route.method() == *method && pattern.is_match(path))
            .map(|(route, _)| *route)
    }
}

/// Derives the behavior for a matched request, or `None` to skip.
#[must_use]
pub fn classify(
    route: CaptureRoute,
    user_id: UserId,
    uri: &Uri,
    body: Option<&Value>,
) -> Option<NewBehavior> {
    let behavior = |action, item_type, item_id: String, item_details| NewBehavior {
        user_id,
        action,
        item_type,
        item_id,
        item_details,
    };

    match route {
        CaptureRoute::TemplatesList => {
            let query = query_params(uri);
            let item_id = query
                .get("templateId")
                .filter(|id| !id.is_empty())
                .cloned()
                .unwrap_or_else(|| TEMPLATE_LIST_ID.to_string());
            Some(behavior(
                BehaviorAction::View,
                ItemType::Template,
                item_id,
                details_from_query(&query),
            ))
        },
        CaptureRoute::Search => {
            let query = query_params(uri);
            let term = query
                .get("q")
                .cloned()
                .or_else(|| uri.query().map(str::to_string))
                .filter(|q| !q.trim().is_empty())?;
            Some(behavior(
                BehaviorAction::Search,
                ItemType::File,
                term,
                ItemDetails::default(),
            ))
        },
        CaptureRoute::Implement => {
            let body = body?.as_object()?;
            let item_id = template_id(body)?;
            let mut picked = Map::new();
            for key in ["category", "complexity", "tags"] {
                if let Some(value) = body.get(key) {
                    picked.insert(key.to_string(), value.clone());
                }
            }
            Some(behavior(
                BehaviorAction::Implement,
                ItemType::Template,
                item_id,
                ItemDetails::from(Value::Object(picked)),
            ))
        },
        CaptureRoute::Favorite => {
            let object = body?.as_object()?;
            let item_id = template_id(object)?;
            Some(behavior(
                BehaviorAction::Favorite,
                ItemType::Template,
                item_id,
                ItemDetails::from(Value::Object(object.clone())),
            ))
        },
    }
}

fn template_id(body: &Map<String, Value>) -> Option<String> {
    body.get("templateId")
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
        .map(str::to_string)
}

fn query_params(uri: &Uri) -> HashMap<String, String> {
    Query::<HashMap<String, String>>::try_from_uri(uri)
        .map(|Query(params)| params)
        .unwrap_or_default()
}

fn details_from_query(query: &HashMap<String, String>) -> ItemDetails {
    let non_empty = |key: &str| query.get(key).filter(|v| !v.is_empty());
    ItemDetails {
        category: non_empty("category").cloned(),
        complexity: non_empty("complexity").cloned(),
        tags: non_empty("tags").map(|tags| {
            tags.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        }),
        extra: Map::new(),
    }
}

/// Buffers a small body so it can be read here and by the handler.
///
/// Only bodies with an exact size within `max` are read; anything else,
/// including chunked bodies, is passed through untouched.
async fn sniff_body(request: Request<Body>, max: usize) -> (Request<Body>, Option<Value>) {
    let within_limit = request
        .body()
        .size_hint()
        .exact()
        .is_some_and(|exact| usize::try_from(exact).is_ok_and(|n| n <= max));
    if !within_limit {
        skipped("body_size");
        return (request, None);
    }

    let (parts, body) = request.into_parts();
    match axum::body::to_bytes(body, max).await {
        Ok(bytes) => {
            let json = serde_json::from_slice(&bytes).ok();
            (Request::from_parts(parts, Body::from(bytes)), json)
        },
        Err(e) => {
            // Exact-size bodies fail here only on transport errors.
            tracing::warn!(error = %e, "Failed to buffer request body for capture");
            skipped("body_read");
            (Request::from_parts(parts, Body::empty()), None)
        },
    }
}

fn skipped(reason: &'static str) {
    metrics::counter!("stencil_capture_skipped_total", "reason" => reason).increment(1);
}

/// Records template-builder interactions after successful responses.
pub async fn capture_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(rules) = state.capture.as_deref() else {
        return next.run(request).await;
    };
    let Some(route) = rules.match_route(request.method(), request.uri().path()) else {
        return next.run(request).await;
    };

    let user = request.extensions().get::<SessionUser>().copied();
    let uri = request.uri().clone();
    let (request, body) = if route.reads_body() {
        sniff_body(request, rules.max_body_bytes).await
    } else {
        (request, None)
    };

    let response = next.run(request).await;

    if !response.status().is_success() {
        skipped("status");
        return response;
    }
    let Some(SessionUser(user_id)) = user else {
        skipped("anonymous");
        return response;
    };
    let Some(behavior) = classify(route, user_id, &uri, body.as_ref()) else {
        skipped("unclassified");
        return response;
    };

    spawn_record(state.engine.recorder().clone(), behavior);
    response
}

/// Records on a blocking task; failures are logged only.
fn spawn_record(recorder: BehaviorRecorder, behavior: NewBehavior) {
    let context = current_request_id().map(RequestContext::from_id);
    tokio::spawn(async move {
        let outcome = tokio::task::spawn_blocking(move || {
            let _guard = context.map(enter_request_context);
            recorder.record(&behavior)
        })
        .await;
        match outcome {
            Ok(true) => {},
            Ok(false) => tracing::debug!("Captured behavior was not recorded"),
            Err(e) => tracing::warn!(error = %e, "Behavior capture task failed"),
        }
    });
}
