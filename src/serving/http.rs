//! The web front-end: one form page, its POST route, a JSON mirror and a
//! health endpoint.
//!
//! Malformed numbers and missing fields come back as 422 with the
//! validation message; anything else that fails a request is a 500. Server
//! state is just the shared predictor handle.

use crate::artifact::ARTIFACT_FORMAT_VERSION;
use crate::error::{PipelineError, Result};
use crate::serving::{PredictionRequest, PredictorService, PriceEstimate};
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Bind configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Build the application router around a shared predictor.
pub fn router(service: Arc<PredictorService>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict_form))
        .route("/api/predict", post(predict_json))
        .route("/health", get(health))
        .with_state(service)
}

/// Bind and serve until the process is stopped.
pub async fn serve(service: PredictorService, config: &ServerConfig) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, model = service.model_name(), "serving predictions");
    axum::serve(listener, router(Arc::new(service)))
        .await
        .map_err(PipelineError::Io)
}

/// Raw form fields. Everything arrives as text so that empty inputs and
/// unparseable numbers can produce proper validation errors instead of a
/// deserializer rejection.
#[derive(Debug, Default, Deserialize)]
struct PredictFormInput {
    location: Option<String>,
    property_type: Option<String>,
    bedrooms: Option<String>,
    bathrooms: Option<String>,
    receptions: Option<String>,
    floor_area: Option<String>,
}

impl PredictFormInput {
    fn into_request(self) -> Result<PredictionRequest> {
        Ok(PredictionRequest {
            location: non_empty(self.location),
            property_type: non_empty(self.property_type),
            bedrooms: parse_field(self.bedrooms, "bedrooms")?,
            bathrooms: parse_field(self.bathrooms, "bathrooms")?,
            receptions: parse_field(self.receptions, "receptions")?,
            floor_area: parse_field(self.floor_area, "floor_area")?,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_field<T: std::str::FromStr>(value: Option<String>, name: &str) -> Result<Option<T>> {
    match non_empty(value) {
        None => Ok(None),
        Some(s) => s.parse::<T>().map(Some).map_err(|_| {
            PipelineError::Validation(format!("{name} must be a number, got {s:?}"))
        }),
    }
}

async fn index() -> Html<&'static str> {
    Html(FORM_PAGE)
}

async fn predict_form(
    State(service): State<Arc<PredictorService>>,
    Form(input): Form<PredictFormInput>,
) -> Response {
    match input.into_request().and_then(|req| service.predict(req)) {
        Ok(estimate) => Html(render_result(&estimate)).into_response(),
        Err(err) => {
            let status = status_of(&err);
            (status, Html(render_error(&err))).into_response()
        }
    }
}

async fn predict_json(
    State(service): State<Arc<PredictorService>>,
    Json(request): Json<PredictionRequest>,
) -> Response {
    match service.predict(request) {
        Ok(estimate) => Json(estimate).into_response(),
        Err(err) => {
            let status = status_of(&err);
            (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
        }
    }
}

async fn health(State(service): State<Arc<PredictorService>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "model": service.model_name(),
        "artifact_format_version": ARTIFACT_FORMAT_VERSION,
        "validation_rmse": service.artifact().validation.rmse,
    }))
}

fn status_of(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn render_result(estimate: &PriceEstimate) -> String {
    let caveat = if estimate.low_confidence {
        format!(
            "<p class=\"caveat\">Low confidence: no training data for {}.</p>",
            estimate.fallback_fields.join(", ")
        )
    } else {
        String::new()
    };
    format!(
        "<!doctype html><html><body>\
         <h1>Estimated price: &pound;{:.0}</h1>{caveat}\
         <p>Model: {}</p><p><a href=\"/\">Estimate another property</a></p>\
         </body></html>",
        estimate.price, estimate.model
    )
}

fn render_error(err: &PipelineError) -> String {
    format!(
        "<!doctype html><html><body><h1>Request rejected</h1><p>{err}</p>\
         <p><a href=\"/\">Back to the form</a></p></body></html>"
    )
}

const FORM_PAGE: &str = r#"<!doctype html>
<html>
<head><title>homeworth</title></head>
<body>
<h1>Property price estimate</h1>
<form method="post" action="/predict">
  <label>Location (outcode) <input name="location" placeholder="SW1"></label><br>
  <label>Property type <input name="property_type" placeholder="flat"></label><br>
  <label>Bedrooms <input name="bedrooms" inputmode="numeric"></label><br>
  <label>Bathrooms <input name="bathrooms" inputmode="numeric"></label><br>
  <label>Receptions <input name="receptions" inputmode="numeric"></label><br>
  <label>Floor area (sq m) <input name="floor_area" inputmode="decimal"></label><br>
  <button type="submit">Estimate</button>
</form>
</body>
</html>
"#;
