//! Recipe listing, preview and processing routes.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use clipforged_av::StoredPath;
use serde::{Deserialize, Serialize};

use super::error::AppError;
use super::AppContext;
use crate::engine::{Engine, JobRequest};

/// Multipart file fields and the slots they fill.
const FILE_FIELDS: &[(&str, &str)] = &[
    ("file1", "in1"),
    ("file2", "in2"),
    ("file3", "in3"),
    ("image", "image"),
];

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/recipes", get(list_recipes))
        .route("/preview", post(preview))
        .route("/process", post(process))
        .route("/tools", get(get_tools))
}

async fn list_recipes(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(ctx.engine.registry().infos())
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub recipe: String,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub ok: bool,
    pub argv: Vec<String>,
    pub command: String,
}

async fn preview(
    State(ctx): State<AppContext>,
    Json(payload): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>, AppError> {
    let parameters = payload
        .parameters
        .into_iter()
        .filter_map(|(k, v)| scalar_to_string(v).map(|v| (k, v)))
        .collect();
    let command = ctx.engine.preview(&payload.recipe, &parameters)?;

    Ok(Json(PreviewResponse {
        ok: true,
        argv: command.argv(),
        command: command.to_display_string(),
    }))
}

/// JSON scalars become parameter strings; nulls, arrays and objects are
/// dropped.
fn scalar_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub status: &'static str,
    pub output: String,
    pub download: String,
}

async fn process(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>, AppError> {
    let mut request = JobRequest::default();
    let mut recipe = None;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if let Some(&(_, slot)) = FILE_FIELDS.iter().find(|(f, _)| *f == name) {
            let filename = field.file_name().unwrap_or_default().to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read {}: {}", name, e)))?;
            if filename.is_empty() && data.is_empty() {
                continue;
            }
            files.push((slot, filename, data));
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read {}: {}", name, e)))?;
        match name.as_str() {
            "recipe" => recipe = Some(value),
            "outname" => request.outname = Some(value),
            _ => {
                request.parameters.insert(name, value);
            }
        }
    }

    request.recipe = recipe
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::from(clipforged_av::Error::missing("recipe")))?;
    ctx.engine.registry().lookup(&request.recipe)?;

    // Nothing is written until the recipe is known; a request that fails
    // before running leaves no uploads behind.
    for (slot, filename, data) in files {
        match stage(ctx.engine.clone(), slot, filename, data).await {
            Ok(stored) => {
                request.uploads.insert(slot.to_string(), stored);
            }
            Err(e) => {
                ctx.engine.discard_uploads(&request.uploads);
                return Err(e);
            }
        }
    }

    let report = match ctx.engine.process(&request).await {
        Ok(report) => report,
        Err(e) => {
            ctx.engine.discard_uploads(&request.uploads);
            return Err(e.into());
        }
    };
    if !report.outcome().is_success() {
        return Err(AppError::execution(report.outcome(), report.diagnostic_id));
    }

    Ok(Json(ProcessResponse {
        status: "ok",
        download: format!("/downloads/{}", report.output_name),
        output: report.output_name,
    }))
}

async fn stage(
    engine: Arc<Engine>,
    slot: &'static str,
    filename: String,
    data: Bytes,
) -> Result<StoredPath, AppError> {
    tokio::task::spawn_blocking(move || engine.stage_upload(slot, &filename, &mut data.as_ref()))
        .await
        .map_err(|e| AppError::Internal(format!("Upload task failed: {}", e)))?
        .map_err(AppError::from)
}

async fn get_tools(State(ctx): State<AppContext>) -> impl IntoResponse {
    let program = ctx.config.engine.ffmpeg();
    let tools = tokio::task::spawn_blocking(move || clipforged_av::check_tools(&program))
        .await
        .unwrap_or_default();
    Json(tools)
}
