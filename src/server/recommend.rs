use super::state::GuardedPipeline;
use crate::emotion::image::{check_content_type, validate_upload, MAX_IMAGE_BYTES};
use crate::emotion::{ImageRejection, ImageUpload};
use crate::pipeline::{
    RecommendError, RecommendationRequest, RecommendationResponse, INVALID_MODE_MESSAGE,
};
use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{debug, info};

pub const TEXT_FIELD: &str = "text";
pub const FILE_FIELD: &str = "file";

fn multipart_error(err: MultipartError) -> RecommendError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        RecommendError::PayloadTooLarge(err.body_text())
    } else {
        RecommendError::InvalidRequest(err.body_text())
    }
}

/// What a `file` part turned out to be.
enum FilePart {
    /// Browsers send an empty unnamed part when no file was chosen.
    Missing,
    Accepted(ImageUpload),
    Rejected {
        filename: Option<String>,
        rejection: ImageRejection,
    },
}

/// Reads at most `max + 1` bytes, enough to tell an oversized upload apart.
async fn read_capped(field: &mut Field<'_>, max: usize) -> Result<Vec<u8>, RecommendError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        let room = max + 1 - bytes.len();
        bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if bytes.len() > max {
            break;
        }
    }
    Ok(bytes)
}

/// The declared content type is checked from the part headers, before any
/// of the body is read.
async fn read_file_part(mut field: Field<'_>) -> Result<FilePart, RecommendError> {
    let filename = field.file_name().map(str::to_string);
    let content_type = field.content_type().map(str::to_string);
    let named = filename.as_deref().is_some_and(|n| !n.is_empty());

    if named {
        if let Err(rejection) = check_content_type(content_type.as_deref()) {
            return Ok(FilePart::Rejected {
                filename,
                rejection,
            });
        }
    }

    let bytes = read_capped(&mut field, MAX_IMAGE_BYTES).await?;
    if !named && bytes.is_empty() {
        return Ok(FilePart::Missing);
    }

    let upload = ImageUpload {
        bytes,
        content_type,
        filename,
    };
    Ok(match validate_upload(&upload) {
        Ok(()) => FilePart::Accepted(upload),
        Err(rejection) => FilePart::Rejected {
            filename: upload.filename,
            rejection,
        },
    })
}

/// Collects the `text` and `file` parts. Unknown parts are skipped.
async fn read_form(mut multipart: Multipart) -> Result<RecommendationRequest, RecommendError> {
    let mut text: Option<String> = None;
    let mut image: Option<ImageUpload> = None;
    let mut rejected: Option<(Option<String>, ImageRejection)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            // Skipping the rest of a rejected upload may run into the body limit.
            Err(_) if rejected.is_some() => break,
            Err(err) => return Err(multipart_error(err)),
        };
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(TEXT_FIELD) => {
                text = Some(field.text().await.map_err(multipart_error)?);
            }
            Some(FILE_FIELD) => match read_file_part(field).await? {
                FilePart::Missing => {}
                FilePart::Accepted(upload) => image = Some(upload),
                FilePart::Rejected {
                    filename,
                    rejection,
                } => rejected = Some((filename, rejection)),
            },
            other => debug!("Ignoring form field {:?}", other),
        }
    }

    let has_text = text.as_deref().is_some_and(|t| !t.is_empty());
    let filename = match (&image, &rejected) {
        (Some(upload), _) => Some(upload.filename.as_deref()),
        (None, Some((filename, _))) => Some(filename.as_deref()),
        (None, None) => None,
    };
    info!(
        "Received: text={}, file={}",
        has_text,
        filename
            .map(|f| f.unwrap_or("<unnamed>"))
            .unwrap_or("None")
    );

    if let Some((_, rejection)) = rejected {
        // The one-mode rule is checked before the file itself.
        if has_text {
            return Err(RecommendError::InvalidRequest(
                INVALID_MODE_MESSAGE.to_string(),
            ));
        }
        return Err(rejection.into());
    }

    RecommendationRequest::from_parts(text, image)
}

pub async fn recommend(
    State(pipeline): State<GuardedPipeline>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<RecommendationResponse>, RecommendError> {
    let multipart =
        multipart.map_err(|rejection| RecommendError::InvalidRequest(rejection.body_text()))?;
    let request = read_form(multipart).await?;
    Ok(Json(pipeline.run(request).await?))
}
