use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::json;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{Category, CategoryQuery, CreateCategoryRequest, UpdateCategoryRequest},
    queries::category_queries,
};

pub async fn list_categories(
    State(state): State<AppState>,
    Query(params): Query<CategoryQuery>,
) -> Result<Json<Vec<Category>>> {
    let categories = category_queries::list_categories(&state.db, params).await?;

    Ok(Json(categories))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Category>> {
    let category = category_queries::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Категория не найдена".to_string()))?;

    Ok(Json(category))
}

pub async fn get_category_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Category>> {
    let category = category_queries::find_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Категория не найдена".to_string()))?;

    Ok(Json(category))
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    if payload.name.is_empty() {
        return Err(AppError::BadRequest(
            "Название категории обязательно".to_string(),
        ));
    }

    if payload.slug.is_empty() {
        return Err(AppError::BadRequest(
            "URL категории обязателен".to_string(),
        ));
    }

    let category = category_queries::create_category(&state.db, &payload).await?;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>> {
    let category = category_queries::update_category(&state.db, id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound("Категория не найдена".to_string()))?;

    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>> {
    if !category_queries::delete_category(&state.db, id).await? {
        return Err(AppError::NotFound("Категория не найдена".to_string()));
    }

    Ok(Json(json!({ "message": "Категория успешно удалена" })))
}
