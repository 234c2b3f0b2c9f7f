use std::collections::BTreeMap;

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;

use crate::app_state::AppState;
use crate::models::api::BatchResponse;
use crate::models::batch::{Batch, BatchItem};
use crate::models::recognition::DocumentSide;
use crate::routes::ApiError;
use crate::services::naming::{batch_fallback_name, document_file_name, sanitize};
use crate::services::packager::entry_name;
use crate::services::pipeline::recognize_and_package;
use crate::services::renderer::RenderError;

/// File name used when neither the client nor recognition supplies one.
const DEFAULT_DOCUMENT_NAME: &str = "idcard";

const SYNTHETIC_HEADER: &str = "x-document-synthetic";

#[derive(Default)]
struct DocumentForm {
    front: Option<Vec<u8>>,
    front_name: String,
    back: Option<Vec<u8>>,
    file_name: String,
    recognize: Option<bool>,
}

/// POST /api/v1/document — Render a front/back pair into a single-page PDF.
pub async fn render_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut form = DocumentForm::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_upload)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "front" => {
                form.front_name = field.file_name().unwrap_or_default().to_string();
                form.front = Some(read_image(field).await?);
            }
            "back" => form.back = Some(read_image(field).await?),
            "file_name" => form.file_name = sanitize(&field.text().await.map_err(bad_upload)?),
            "recognize" => form.recognize = Some(parse_flag(&field.text().await.map_err(bad_upload)?)),
            _ => {}
        }
    }

    let front = form
        .front
        .ok_or(ApiError::Render(RenderError::MissingImage { side: "front" }))?;
    let back = form
        .back
        .ok_or(ApiError::Render(RenderError::MissingImage { side: "back" }))?;

    let pdf = state.renderer.render_async(front.clone(), back).await?;

    let mut synthetic = None;
    let file_name = if !form.file_name.is_empty() {
        form.file_name
    } else if form.recognize.unwrap_or(true) {
        let outcome = state
            .cascade
            .recognize_with_fallback(&front, DocumentSide::Front, &form.front_name)
            .await;
        synthetic = Some(outcome.is_synthetic);
        document_file_name(&outcome, DEFAULT_DOCUMENT_NAME)
    } else {
        DEFAULT_DOCUMENT_NAME.to_string()
    };

    let entry = entry_name(&file_name);
    tracing::info!(file_name = %entry, bytes = pdf.len(), "Serving rendered document");

    let mut response = ([(header::CONTENT_TYPE, "application/pdf")], pdf).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_DISPOSITION, content_disposition(&entry));
    if let Some(synthetic) = synthetic {
        headers.insert(
            SYNTHETIC_HEADER,
            HeaderValue::from_static(if synthetic { "true" } else { "false" }),
        );
    }

    Ok(response)
}

#[derive(Default)]
struct BatchSlot {
    front: Option<Vec<u8>>,
    back: Option<Vec<u8>>,
    name: String,
    source_name: String,
}

/// POST /api/v1/batch — Render indexed pairs (`front.N`, `back.N`, `name.N`)
/// into one ZIP archive.
pub async fn render_batch(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BatchResponse>, ApiError> {
    let mut slots: BTreeMap<usize, BatchSlot> = BTreeMap::new();
    let mut recognize = true;

    while let Some(field) = multipart.next_field().await.map_err(bad_upload)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "recognize" {
            recognize = parse_flag(&field.text().await.map_err(bad_upload)?);
            continue;
        }

        let Some((kind, index)) = name.split_once('.') else {
            continue;
        };
        let Ok(index) = index.parse::<usize>() else {
            continue;
        };

        let slot = slots.entry(index).or_default();
        match kind {
            "front" => {
                slot.source_name = field.file_name().unwrap_or_default().to_string();
                slot.front = Some(field.bytes().await.map_err(bad_upload)?.to_vec());
            }
            "back" => slot.back = Some(field.bytes().await.map_err(bad_upload)?.to_vec()),
            "name" => slot.name = sanitize(&field.text().await.map_err(bad_upload)?),
            _ => {}
        }
    }

    let mut batch = Batch::new();
    for slot in slots.into_values() {
        batch.push(
            BatchItem::new(slot.front.unwrap_or_default(), slot.back, slot.name)
                .with_source_name(slot.source_name),
        );
    }

    if batch.is_empty() {
        return Err(ApiError::InvalidImage("batch contains no items".to_string()));
    }

    tracing::info!(items = batch.len(), recognize, "Batch submitted");

    let packaged = if recognize {
        recognize_and_package(&state.cascade, &state.packager, batch).await?
    } else {
        for (index, item) in batch.items_mut().iter_mut().enumerate() {
            if item.target_file_name.is_empty() {
                item.target_file_name = batch_fallback_name(index);
            }
        }
        state.packager.run_batch(batch).await?
    };

    let archive_name = format!(
        "idcard_batch_{}.zip",
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    );

    Ok(Json(BatchResponse {
        result: packaged.result,
        archive_name,
        archive: base64::engine::general_purpose::STANDARD.encode(&packaged.archive),
    }))
}

/// Read an image part, rejecting formats the renderer cannot decode.
async fn read_image(field: Field<'_>) -> Result<Vec<u8>, ApiError> {
    let side = field.name().unwrap_or_default().to_string();
    let data = field.bytes().await.map_err(bad_upload)?;

    image::guess_format(&data)
        .map_err(|_| ApiError::InvalidImage(format!("unsupported {} image format", side)))?;

    Ok(data.to_vec())
}

fn bad_upload(err: MultipartError) -> ApiError {
    ApiError::InvalidImage(format!("malformed upload: {}", err))
}

/// Anything but an explicit "off" value counts as enabled.
fn parse_flag(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "no" | "off"
    )
}

/// `attachment` disposition with an ASCII fallback and the UTF-8 name.
fn content_disposition(file_name: &str) -> HeaderValue {
    let ascii: String = file_name
        .chars()
        .filter(|c| c.is_ascii_graphic() && *c != '"' && *c != '\\')
        .collect();
    let fallback = if ascii.trim_end_matches(".pdf").is_empty() {
        format!("{}.pdf", DEFAULT_DOCUMENT_NAME)
    } else {
        ascii
    };

    let value = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
