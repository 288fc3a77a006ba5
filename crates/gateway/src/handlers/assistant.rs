//! Search assistant chat handler

use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::instrument;
use validator::Validate;

use super::not_blank;
use crate::extractors::ValidJson;
use crate::AppState;
use gazette_common::{assistant::ChatReply, errors::Result};

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 1000), custom(function = "not_blank"))]
    pub message: String,
}

/// Answer a natural-language question about the registry
#[instrument(skip(state, request))]
pub async fn chat(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<ChatRequest>,
) -> Result<Json<ChatReply>> {
    let reply = state.assistant.chat(request.message.trim()).await?;
    Ok(Json(reply))
}
