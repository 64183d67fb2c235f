use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, Result},
    services::upload_service::{self, UploadKind},
};

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(default, rename = "type")]
    pub kind: UploadKind,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    pub originalname: String,
    pub size: usize,
}

pub async fn upload_image(
    State(state): State<AppState>,
    Query(params): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Некорректные данные формы: {}", e)))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !upload_service::allowed_mime(&content_type) {
            return Err(AppError::BadRequest(
                "Недопустимый тип файла. Разрешены только изображения (JPEG, PNG, GIF, WEBP)"
                    .to_string(),
            ));
        }

        let originalname = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Ошибка чтения файла: {}", e)))?;

        if data.len() > state.uploads.max_file_size {
            return Err(AppError::BadRequest(format!(
                "Файл слишком большой. Максимальный размер: {}",
                upload_service::size_limit_label(state.uploads.max_file_size)
            )));
        }

        let filename = format!(
            "{}{}",
            Uuid::new_v4(),
            upload_service::extension_for(&content_type)
        );
        upload_service::save_file(&state.uploads.root, params.kind, &filename, &data).await?;

        let subdir = params.kind.subdir();
        let url = if subdir.is_empty() {
            format!("/uploads/{}", filename)
        } else {
            format!("/uploads/{}/{}", subdir, filename)
        };

        tracing::info!("File uploaded: {}", url);

        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                url,
                filename,
                originalname,
                size: data.len(),
            }),
        ));
    }

    Err(AppError::BadRequest("Файл не загружен".to_string()))
}

pub async fn delete_image(
    State(state): State<AppState>,
    Path((kind, filename)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>> {
    let kind = UploadKind::parse(&kind)
        .ok_or_else(|| AppError::BadRequest("Некорректный тип файла".to_string()))?;

    if !upload_service::is_safe_filename(&filename) {
        return Err(AppError::BadRequest("Некорректное имя файла".to_string()));
    }

    upload_service::delete_file(&state.uploads.root, kind, &filename).await?;

    Ok(Json(json!({ "message": "Файл успешно удален" })))
}
