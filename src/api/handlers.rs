use std::collections::HashMap;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use futures::TryStreamExt;
use serde::Serialize;
use serde_json::{json, Value};
use tokio_util::io::StreamReader;

use super::{error::ApiError, AppState};
use crate::{
    files::RequestFiles,
    operation::{Operation, ProcessParams, PROCESS_FIELDS},
    service::{Service, SrvError},
    SERVICE_NAME,
};

const VIDEO_FIELD: &str = "video";

pub async fn index() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": env!("CARGO_APP_VERSION"),
        "endpoints": {
            "process": "POST /process",
            "convert": "POST /convert",
            "health": "GET /health",
        }
    }))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Crop, scale and re-encode without audio.
pub async fn process(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    run(
        &state.service,
        Operation::Process(ProcessParams::default()),
        multipart,
    )
    .await
}

/// Re-encode to H.264/AAC.
pub async fn convert(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    run(&state.service, Operation::Convert, multipart).await
}

async fn run(
    service: &Service,
    mut op: Operation,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let label = op.failure_label();
    let res = async {
        let mut multipart = multipart.map_err(|e| {
            tracing::warn!(error = %e, "not a multipart request");
            SrvError::NoUpload
        })?;
        let (files, fields) = receive(service, &op, &mut multipart).await?;
        if let Operation::Process(params) = &mut op {
            *params = ProcessParams::from_fields(&fields);
            tracing::info!(
                crop = format!(
                    "{}x{}+{}+{}",
                    params.crop_w, params.crop_h, params.crop_x, params.crop_y
                ),
                scale = format!("{}x{}", params.scale_w, params.scale_h),
                bitrate = %params.bitrate,
                "processing"
            );
        }
        service.transcode(&op, files).await
    }
    .await;

    match res {
        Ok(data) => video_response(data, &op.download_name()),
        Err(e) => ApiError::new(label, e).into_response(),
    }
}

/// Reads the form: the video file is streamed straight into its temp file,
/// the known text fields are collected, anything else is skipped. A `video`
/// part without a file name is not an upload.
async fn receive(
    service: &Service,
    op: &Operation,
    multipart: &mut Multipart,
) -> Result<(RequestFiles, HashMap<String, String>), SrvError> {
    let mut files: Option<RequestFiles> = None;
    let mut fields = HashMap::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        let is_upload = name == VIDEO_FIELD && field.file_name().is_some();
        if is_upload && files.is_none() {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let staged = service.request_files(op.output_prefix());
            let reader = StreamReader::new(field.map_err(std::io::Error::other));
            tokio::pin!(reader);
            let len = staged.stage(&mut reader).await.map_err(stage_error)?;
            tracing::info!(len, file_name, "video received");
            files = Some(staged);
        } else if PROCESS_FIELDS.contains(&name.as_str()) {
            let text = field.text().await.map_err(multipart_error)?;
            fields.insert(name, text);
        }
    }

    let files = files.ok_or(SrvError::NoUpload)?;
    Ok((files, fields))
}

fn multipart_error(e: MultipartError) -> SrvError {
    body_error(&e)
}

fn stage_error(e: std::io::Error) -> SrvError {
    if let Some(me) = e
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<MultipartError>())
    {
        return body_error(me);
    }
    SrvError::Other(anyhow::Error::new(e).context("can't save upload"))
}

fn body_error(e: &MultipartError) -> SrvError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        SrvError::PayloadTooLarge(e.body_text())
    } else {
        SrvError::BadRequest(e.body_text())
    }
}

fn video_response(data: Vec<u8>, file_name: &str) -> Response {
    let len = data.len();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (header::CONTENT_LENGTH, len.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        data,
    )
        .into_response()
}
