use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{Product, ProductQuery, ProductResponse},
    queries::product_queries,
};

pub async fn search_products(
    State(state): State<AppState>,
    Query(params): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>> {
    let products = product_queries::search_products(&state.db, params).await?;

    Ok(Json(products))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn get_by_category(
    State(state): State<AppState>,
    Path(category_id): Path<i32>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<Product>>> {
    let products = product_queries::find_by_category(
        &state.db,
        category_id,
        page.limit.unwrap_or(100),
        page.offset.unwrap_or(0),
    )
    .await?;

    Ok(Json(products))
}

pub async fn get_product_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductResponse>> {
    let product = product_queries::find_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Товар не найден".to_string()))?;

    let detail = product_queries::load_detail(&state.db, product).await?;

    Ok(Json(detail))
}
