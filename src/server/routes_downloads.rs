//! Output downloads.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use clipforged_common::paths::sanitize_filename;
use tokio_util::io::ReaderStream;

use super::error::AppError;
use super::AppContext;

pub fn download_routes() -> Router<AppContext> {
    Router::new().route("/downloads/:filename", get(download))
}

/// Stream a finished output as an attachment.
async fn download(
    State(ctx): State<AppContext>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let name = sanitize_filename(&filename)
        .ok_or_else(|| AppError::BadRequest("Invalid file name".to_string()))?;
    let path = ctx.engine.output_dir().join(name);

    let file = match tokio::fs::File::open(&path).await {
        Ok(f) => f,
        Err(_) => return Err(AppError::NotFound(format!("No such output: {}", name))),
    };
    if !file.metadata().await.map(|m| m.is_file()).unwrap_or(false) {
        return Err(AppError::NotFound(format!("No such output: {}", name)));
    }

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        name.replace(['"', '\\'], "_")
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
