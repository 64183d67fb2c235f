use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{
        CreateProductRequest, CreateUserRequest, OrderFilter, OrderResponse, OrderStats,
        OrderStatus, Product, ProductResponse, UpdateOrderRequest, UpdateOrderStatusRequest,
        UpdateProductRequest, UpdateUserRequest, UserResponse,
    },
    queries::{order_queries, product_queries, user_queries},
    utils::{extractors::extract_user_id, jwt::Claims},
};

// USER ROUTES

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>> {
    let users = user_queries::list_users(&state.db).await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>> {
    let user = user_queries::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Пользователь не найден".to_string()))?;

    Ok(Json(user.into()))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest(
            "Имя пользователя и пароль обязательны".to_string(),
        ));
    }

    if user_queries::find_by_username(&state.db, &payload.username)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "Пользователь с таким именем уже существует".to_string(),
        ));
    }

    let password_hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))?;

    let user = user_queries::create_user(
        &state.db,
        &payload.username,
        &password_hash,
        payload.email.as_deref(),
        payload.role,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>> {
    let password_hash = match payload.password.as_deref() {
        Some(password) => Some(
            bcrypt::hash(password, bcrypt::DEFAULT_COST)
                .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))?,
        ),
        None => None,
    };

    let user = user_queries::update_user(
        &state.db,
        id,
        payload.username.as_deref(),
        password_hash.as_deref(),
        payload.email.as_deref(),
        payload.role,
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Пользователь не найден".to_string()))?;

    Ok(Json(user.into()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    if extract_user_id(&claims)? == id {
        return Err(AppError::BadRequest(
            "Вы не можете удалить собственный аккаунт".to_string(),
        ));
    }

    if !user_queries::delete_user(&state.db, id).await? {
        return Err(AppError::NotFound("Пользователь не найден".to_string()));
    }

    Ok(Json(json!({ "message": "Пользователь успешно удален" })))
}

// ORDER ROUTES

pub async fn list_orders(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Vec<OrderResponse>>> {
    let orders = order_queries::get_filtered_orders(&state.db, filter).await?;

    let order_ids: Vec<i32> = orders.iter().map(|o| o.id).collect();
    let all_items = order_queries::get_items_for_orders(&state.db, &order_ids).await?;

    let mut items_map: std::collections::HashMap<i32, Vec<_>> = std::collections::HashMap::new();
    for item in all_items {
        items_map.entry(item.order_id).or_default().push(item);
    }

    let response = orders
        .into_iter()
        .map(|order| {
            let items = items_map.remove(&order.id).unwrap_or_default();
            OrderResponse { order, items }
        })
        .collect();

    Ok(Json(response))
}

pub async fn order_stats(State(state): State<AppState>) -> Result<Json<OrderStats>> {
    let stats = order_queries::get_order_stats(&state.db).await?;

    Ok(Json(stats))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<OrderResponse>> {
    let order = order_queries::get_order_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Заказ не найден".to_string()))?;

    let items = order_queries::get_items_for_orders(&state.db, &[order.id]).await?;

    Ok(Json(OrderResponse { order, items }))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<Json<serde_json::Value>> {
    let status = OrderStatus::parse(&payload.status)
        .ok_or_else(|| AppError::BadRequest("Недопустимый статус заказа".to_string()))?;

    if !order_queries::update_order_status(&state.db, id, status).await? {
        return Err(AppError::NotFound("Заказ не найден".to_string()));
    }

    Ok(Json(json!({ "message": "Статус заказа обновлен" })))
}

pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateOrderRequest>,
) -> Result<Json<serde_json::Value>> {
    let status = match payload.status.as_deref() {
        Some(value) => Some(
            OrderStatus::parse(value)
                .ok_or_else(|| AppError::BadRequest("Недопустимый статус заказа".to_string()))?,
        ),
        None => None,
    };

    if order_queries::update_order(&state.db, id, &payload, status)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound("Заказ не найден".to_string()));
    }

    Ok(Json(json!({ "message": "Заказ обновлен" })))
}

pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>> {
    if !order_queries::delete_order(&state.db, id).await? {
        return Err(AppError::NotFound("Заказ не найден".to_string()));
    }

    Ok(Json(json!({ "message": "Заказ удален" })))
}

// PRODUCT ROUTES

#[derive(Debug, Deserialize)]
pub struct AdminPageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(page): Query<AdminPageQuery>,
) -> Result<Json<Vec<Product>>> {
    let products = product_queries::list_products(
        &state.db,
        page.limit.unwrap_or(100),
        page.offset.unwrap_or(0),
    )
    .await?;

    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ProductResponse>> {
    let product = product_queries::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Товар не найден".to_string()))?;

    let detail = product_queries::load_detail(&state.db, product).await?;

    Ok(Json(detail))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>)> {
    if payload.name.is_empty() || payload.slug.is_empty() || payload.category_ids.is_empty() {
        return Err(AppError::BadRequest(
            "Необходимо указать название, URL, цену и хотя бы одну категорию".to_string(),
        ));
    }

    let product = product_queries::create_product(&state.db, &payload).await?;
    let detail = product_queries::load_detail(&state.db, product).await?;

    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>> {
    let product = product_queries::update_product(&state.db, id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound("Товар не найден".to_string()))?;

    let detail = product_queries::load_detail(&state.db, product).await?;

    Ok(Json(detail))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>> {
    if !product_queries::delete_product(&state.db, id).await? {
        return Err(AppError::NotFound("Товар не найден".to_string()));
    }

    Ok(Json(json!({ "message": "Товар успешно удален" })))
}
