//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs lengths and basic result info, never keys.

use std::sync::Arc;
use axum::{extract::State, http::StatusCode, response::{IntoResponse, Response}, Json};
use tracing::{info, instrument};

use crate::generation::GenerationError;
use crate::protocol::*;
use crate::state::AppState;
use crate::logic::*;

/// Generation failures as HTTP responses: 401 without a credential, 502 otherwise.
pub struct ApiError(GenerationError);

impl From<GenerationError> for ApiError {
  fn from(e: GenerationError) -> Self { ApiError(e) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self.0 {
      GenerationError::MissingCredential => StatusCode::UNAUTHORIZED,
      GenerationError::Upstream(_) => StatusCode::BAD_GATEWAY,
    };
    tracing::warn!(target: "madrasa_backend", %status, error = %self.0, "Generation request failed");
    (status, Json(ErrorOut { error: self.0.to_string() })).into_response()
  }
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_domains(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(domains_overview(&state.corpus))
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len()))]
pub async fn http_post_explain(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ExplainIn>,
) -> Result<Json<TextOut>, ApiError> {
  let text = state.generator.explain(&state.prompts, &body.text, body.api_key.as_deref()).await?;
  info!(target: "madrasa_backend", reply_len = text.len(), "HTTP explain served");
  Ok(Json(TextOut { text }))
}

#[instrument(level = "info", skip(state, body), fields(message_len = body.message.len()))]
pub async fn http_post_chat(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ChatIn>,
) -> Result<Json<TextOut>, ApiError> {
  let text = state.generator.mentor_chat(&state.prompts, &body.message, body.api_key.as_deref()).await?;
  Ok(Json(TextOut { text }))
}

#[instrument(level = "info", skip(state, body), fields(topic_len = body.topic.len()))]
pub async fn http_post_dua(
  State(state): State<Arc<AppState>>,
  Json(body): Json<DuaIn>,
) -> Result<impl IntoResponse, ApiError> {
  let dua = state.generator.generate_dua(&state.prompts, &body.topic, body.api_key.as_deref()).await?;
  Ok(Json(dua))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_plan(
  State(state): State<Arc<AppState>>,
  body: Option<Json<PlanIn>>,
) -> impl IntoResponse {
  let body = body.map(|Json(b)| b).unwrap_or_default();
  let (items, origin) = do_study_plan(&state, body.api_key.as_deref()).await;
  info!(target: "madrasa_backend", items = items.len(), %origin, "HTTP study plan served");
  Json(PlanOut { items, origin })
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len()))]
pub async fn http_post_speech(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SpeechIn>,
) -> Result<Json<SpeechOut>, ApiError> {
  let buffer = state.generator.speak(&body.text, body.api_key.as_deref()).await?;
  Ok(Json(speech_out(&buffer)))
}
