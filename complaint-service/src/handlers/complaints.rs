use crate::dtos::{ComplaintResponse, ImageParams, SubmitComplaintForm, SubmitComplaintResponse};
use crate::models::PnrRecord;
use crate::services::storage::image_object_key;
use crate::startup::AppState;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use metrics::counter;
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::utils::signature::validate_url_signature;
use validator::Validate;

struct UploadedImage {
    file_name: String,
    content_type: String,
    data: Bytes,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(anyhow::anyhow!("Image exceeds the upload size limit"))
    } else {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
    }
}

pub async fn greeting() -> &'static str {
    "Hello World!"
}

pub async fn submit_complaint(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut form = SubmitComplaintForm::default();
    let mut image: Option<UploadedImage> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("pnr") => form.pnr = field.text().await.map_err(multipart_error)?,
            Some("subject") => form.subject = field.text().await.map_err(multipart_error)?,
            Some("image") => {
                let file_name = field.file_name().unwrap_or("unnamed").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await.map_err(multipart_error)?;

                // Browsers send an empty part when no file was chosen
                if !data.is_empty() {
                    image = Some(UploadedImage {
                        file_name,
                        content_type,
                        data,
                    });
                }
            }
            _ => {}
        }
    }

    let image = image.ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!("Failed to get image from request"))
    })?;
    form.validate()?;

    let storage_key = image_object_key(&image.file_name, Utc::now().timestamp_millis());

    tracing::info!(
        pnr = %form.pnr,
        storage_key = %storage_key,
        size = image.data.len(),
        "Complaint submission received"
    );

    // 1. Upload to storage
    state
        .storage
        .upload(&storage_key, image.data.to_vec(), &image.content_type)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upload image {} to storage: {}", storage_key, e);
            e
        })?;
    let image_url = state.storage.retrieval_url(&storage_key)?;

    // 2. Caption the raw bytes
    let query_generated = state.captioner.caption(&image.data).await.map_err(|e| {
        tracing::error!(pnr = %form.pnr, "Failed to generate image caption: {}", e);
        AppError::from(e)
    })?;

    // 3. Persist, replacing any earlier record under this PNR
    let record = PnrRecord::new(form.pnr, form.subject, image_url, query_generated);
    state.store.put_pnr(&record).await?;

    counter!("complaints_submitted_total").increment(1);
    tracing::info!(pnr = %record.pnr, "Complaint stored");

    Ok(Json(SubmitComplaintResponse::from(record)))
}

pub async fn get_complaint(
    State(state): State<AppState>,
    Path(pnr): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if pnr.trim().is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!("PNR is required")));
    }

    let record = state
        .store
        .get_pnr(&pnr)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("PNR not found")))?;

    Ok(Json(ComplaintResponse::from(record)))
}

/// Serve an image held by the local storage backend through its signed URL.
pub async fn fetch_image(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(params): Query<ImageParams>,
) -> Result<impl IntoResponse, AppError> {
    let object_key = format!("images/{}", key);

    validate_url_signature(
        state.config.storage.signing_secret.expose_secret(),
        &object_key,
        params.expires,
        &params.signature,
        Utc::now().timestamp(),
    )?;

    let object = state.storage.download(&object_key).await?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, object.content_type)],
        object.data,
    ))
}
