//! HTTP routes.
//!
//! One route per catalogue endpoint, plus `GET /healthz`. Every response
//! body is the `{status, message, data}` envelope with the envelope's HTTP
//! status.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::Instant,
};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        Path, Query, State,
        rejection::{BytesRejection, PathRejection},
    },
    handler::Handler,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{MethodRouter, get, post, put},
};
use paygate_bridge::{
    Gateway, GatewayError, NormalizedResponse,
    provider::{self, Endpoint},
    transport::HttpMethod,
};
use serde_json::{Map, Value};

use crate::observability::{HealthReport, HealthStatus};

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    gateway: Arc<Gateway>,
    started: Instant,
}

impl AppState {
    /// Wraps a ready gateway.
    #[must_use]
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway: Arc::new(gateway), started: Instant::now() }
    }
}

/// Envelope with its status code.
struct Envelope(NormalizedResponse);

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0)).into_response()
    }
}

/// Builds the router from the provider catalogue.
pub fn router(state: AppState) -> Router {
    let mut routes: BTreeMap<&'static str, MethodRouter<AppState>> = BTreeMap::new();
    for endpoint in provider::catalogue() {
        let method_router = endpoint_route(endpoint);
        let merged = match routes.remove(endpoint.route) {
            Some(existing) => existing.merge(method_router),
            None => method_router,
        };
        routes.insert(endpoint.route, merged);
    }

    routes
        .into_iter()
        .fold(Router::new().route("/healthz", get(health_check)), |router, (path, methods)| {
            router.route(path, methods)
        })
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .with_state(state)
}

fn endpoint_route(endpoint: &'static Endpoint) -> MethodRouter<AppState> {
    if endpoint.route.contains('{') {
        on(
            endpoint.method,
            move |State(state): State<AppState>,
                  params: Result<Path<HashMap<String, String>>, PathRejection>,
                  uri: Uri,
                  body: Result<Bytes, BytesRejection>| async move {
                let params = match params {
                    Ok(Path(params)) => params,
                    Err(rejection) => return rejected(rejection.status(), rejection.body_text()),
                };
                dispatch(&state, endpoint, params, &uri, body).await
            },
        )
    } else {
        on(
            endpoint.method,
            move |State(state): State<AppState>, uri: Uri, body: Result<Bytes, BytesRejection>| async move {
                dispatch(&state, endpoint, HashMap::new(), &uri, body).await
            },
        )
    }
}

fn on<H, T>(method: HttpMethod, handler: H) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    match method {
        HttpMethod::Get => get(handler),
        HttpMethod::Post => post(handler),
        HttpMethod::Put => put(handler),
    }
}

async fn dispatch(
    state: &AppState,
    endpoint: &'static Endpoint,
    params: HashMap<String, String>,
    uri: &Uri,
    body: Result<Bytes, BytesRejection>,
) -> Envelope {
    let inbound = match endpoint.method {
        HttpMethod::Get => match Query::<HashMap<String, String>>::try_from_uri(uri) {
            Ok(Query(query)) => Value::Object(
                query.into_iter().map(|(k, v)| (k, Value::String(v))).collect::<Map<_, _>>(),
            ),
            Err(rejection) => return rejected(rejection.status(), rejection.body_text()),
        },
        HttpMethod::Post | HttpMethod::Put => {
            let body = match body {
                Ok(body) => body,
                Err(rejection) => return rejected(rejection.status(), rejection.body_text()),
            };
            match parse_body(&body) {
                Ok(value) => value,
                Err(error) => return Envelope(error.into()),
            }
        }
    };
    Envelope(state.gateway.handle(endpoint, inbound, &params).await)
}

/// Extractor rejection as an envelope.
fn rejected(status: StatusCode, message: String) -> Envelope {
    Envelope(NormalizedResponse::failure(status.as_u16(), message, Value::Null))
}

/// Parses a JSON body; an empty body is `null`.
fn parse_body(body: &[u8]) -> Result<Value, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body)
        .map_err(|e| GatewayError::Validation(format!("Invalid JSON body: {e}")))
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let report = HealthReport::for_gateway(&state.gateway, state.started.elapsed().as_secs());
    let status = if report.status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(report))
}

async fn not_found() -> Envelope {
    Envelope(NormalizedResponse::failure(404, "Route not found", Value::Null))
}

async fn method_not_allowed() -> Envelope {
    Envelope(NormalizedResponse::failure(405, "Method not allowed", Value::Null))
}
