use crate::auth::Principal;
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use futures::TryStreamExt;
use std::io;
use std::sync::Arc;
use tokio_util::io::StreamReader;
use tubely_core::constants::VIDEO_FORM_FIELD;
use tubely_core::{AppError, VideoResponse};
use tubely_processing::UploadRequest;
use uuid::Uuid;

/// `POST /videos/{video_id}/upload`
///
/// Streams the `video` part of a multipart form through the ingest pipeline and
/// returns the updated video record. The part is never buffered in memory; it
/// is read only after ownership and content type have been checked.
#[tracing::instrument(skip(state, multipart), fields(user_id = %principal.user_id))]
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(video_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<VideoResponse>, HttpAppError> {
    let video_id =
        Uuid::parse_str(&video_id).map_err(|_| AppError::InvalidInput("Invalid ID".to_string()))?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(VIDEO_FORM_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let body = std::pin::pin!(StreamReader::new(field.map_err(io::Error::other)));

        let persisted = state
            .pipeline
            .ingest(UploadRequest {
                video_id,
                principal: principal.user_id,
                content_type,
                body,
            })
            .await?;

        return Ok(Json(persisted.video.into()));
    }

    Err(AppError::BadRequest(format!(
        "Unable to parse form file: missing '{}' field",
        VIDEO_FORM_FIELD
    ))
    .into())
}
