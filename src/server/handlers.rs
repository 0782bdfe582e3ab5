//! # Server Handlers
//!
//! HTTP route handlers. The completions handler owns the stream /
//! non-stream / fallback split; the analysis handlers are thin non-streaming
//! gateway users.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json as JsonResponse, Response},
    Json,
};
use tracing::{info, warn};

use super::AppState;
use crate::{
    analysis::{
        code_analysis_messages, image_analysis_messages, AnalysisKind, DEFAULT_IMAGE_PROMPT,
    },
    error::RelayError,
    gateway::extract_message_content,
    relay::relay_stream,
    schemas::{
        CodeAnalysisRequest, CompletionRequest, ImageAnalysisRequest, ImageGenerationRequest,
    },
};

/// AI completion endpoint. Streaming requests are relayed as SSE; if opening
/// the upstream stream fails, one non-streaming fallback call is made and
/// its JSON body returned whole.
pub async fn completions(
    State(state): State<AppState>,
    Json(request): Json<CompletionRequest>,
) -> Result<Response, RelayError> {
    let gateway = state.gateway();

    if request.wants_stream() && state.config().streaming_enabled {
        match gateway.open_stream(&request).await {
            Ok(upstream) => Ok(relay_stream(gateway.clone(), request, upstream).into_response()),
            Err(err) if err.is_fallback_eligible() => {
                warn!(error = %err, "streaming failed, falling back to non-streaming");
                let mut fallback = request;
                fallback.stream = Some(false);
                let body = gateway.complete(&fallback).await?;
                Ok(Json(body).into_response())
            }
            Err(err) => Err(err),
        }
    } else {
        let mut request = request;
        request.stream = Some(false);
        let body = gateway.complete(&request).await?;
        Ok(Json(body).into_response())
    }
}

/// Image generation endpoint.
pub async fn generate_image(
    State(state): State<AppState>,
    Json(request): Json<ImageGenerationRequest>,
) -> Result<Response, RelayError> {
    if request.prompt.is_empty() || request.prompt.len() > 4000 {
        return Err(RelayError::BadRequest(
            "prompt must be between 1 and 4000 characters".to_string(),
        ));
    }
    let n = request.n.unwrap_or(1);
    if !(1..=4).contains(&n) {
        return Err(RelayError::BadRequest("n must be between 1 and 4".to_string()));
    }
    let response_format = request.response_format.as_deref().unwrap_or("url");
    if !["url", "b64_json"].contains(&response_format) {
        return Err(RelayError::BadRequest(
            "response_format must be 'url' or 'b64_json'".to_string(),
        ));
    }

    let body = state
        .gateway()
        .generate_image(&request.prompt, n, response_format)
        .await?;

    let data = body.get("data").cloned().unwrap_or_default();
    let image_url = data
        .as_array()
        .and_then(|entries| entries.first())
        .and_then(|entry| {
            entry
                .get("url")
                .or_else(|| entry.get("b64_json"))
                .and_then(|v| v.as_str())
        })
        .unwrap_or_default()
        .to_string();

    info!("image generation successful");

    Ok(Json(serde_json::json!({
        "imageUrl": image_url,
        "prompt": request.prompt,
        "n": n,
        "response_format": response_format,
        "created": chrono::Utc::now().timestamp(),
        "data": data,
    }))
    .into_response())
}

/// Code analysis endpoint.
pub async fn analyze_code(
    State(state): State<AppState>,
    Json(request): Json<CodeAnalysisRequest>,
) -> Result<Response, RelayError> {
    if request.code.is_empty() {
        return Err(RelayError::BadRequest("code must not be empty".to_string()));
    }
    let kind = AnalysisKind::parse(request.analysis_type.as_deref()).ok_or_else(|| {
        RelayError::BadRequest(format!(
            "invalid analysisType '{}'",
            request.analysis_type.as_deref().unwrap_or("")
        ))
    })?;

    info!(language = %request.language, kind = kind.as_str(), "starting code analysis");

    let completion = CompletionRequest {
        messages: code_analysis_messages(
            kind,
            &request.code,
            &request.language,
            request.context.as_deref().unwrap_or(""),
        ),
        temperature: Some(0.3),
        max_tokens: Some(8000),
        stream: Some(false),
    };

    let body = state.gateway().complete(&completion).await?;
    let analysis = extract_message_content(&body).unwrap_or_default();

    Ok(Json(serde_json::json!({
        "analysis": analysis,
        "analysisType": kind.as_str(),
        "language": request.language,
    }))
    .into_response())
}

/// Image analysis endpoint. The image part routes to the vision model.
pub async fn analyze_image(
    State(state): State<AppState>,
    Json(request): Json<ImageAnalysisRequest>,
) -> Result<Response, RelayError> {
    if request.image_data.is_empty() {
        return Err(RelayError::BadRequest(
            "imageData must not be empty".to_string(),
        ));
    }
    let prompt = request.prompt.as_deref().unwrap_or(DEFAULT_IMAGE_PROMPT);

    info!("processing image analysis request");

    let completion = CompletionRequest {
        messages: image_analysis_messages(&request.image_data, prompt),
        temperature: Some(0.7),
        max_tokens: Some(2000),
        stream: Some(false),
    };

    let body = state.gateway().complete(&completion).await?;
    let analysis = extract_message_content(&body).unwrap_or_default();

    Ok(Json(serde_json::json!({
        "analysis": analysis,
        "prompt": prompt,
    }))
    .into_response())
}

/// Health check handler. Reports whether the upstream credential is present
/// without revealing it.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let status = serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "grok-relay",
        "version": env!("CARGO_PKG_VERSION"),
        "features": {
            "aiCompletion": state.config().api_key.is_some(),
            "imageGeneration": state.config().api_key.is_some(),
            "streaming": state.config().streaming_enabled,
        }
    });

    (StatusCode::OK, JsonResponse(status))
}
