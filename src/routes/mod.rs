mod admin;
mod auth;
mod categories;
mod health;
mod orders;
mod products;
mod uploads;

use axum::{
    Router, middleware,
    routing::{delete, get, patch, post, put},
};
use tower_http::services::ServeDir;

use crate::{AppState, middleware as mw};

pub fn create_router(state: AppState) -> Router {
    let auth_layer = middleware::from_fn_with_state(state.auth.clone(), mw::auth_middleware);

    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register))
        .route("/api/categories", get(categories::list_categories))
        .route("/api/categories/id/{id}", get(categories::get_category))
        .route(
            "/api/categories/slug/{slug}",
            get(categories::get_category_by_slug),
        )
        .route("/api/products", get(products::search_products))
        .route(
            "/api/products/category/{category_id}",
            get(products::get_by_category),
        )
        .route("/api/products/{slug}", get(products::get_product_by_slug));

    // Anonymous checkout; a valid token just links the order to its account
    let checkout = Router::new()
        .route("/api/orders", post(orders::create_order))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            mw::optional_auth_middleware,
        ));

    let authenticated = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/orders/user", get(orders::get_user_orders))
        .route("/api/orders/{id}", get(orders::get_order))
        .route_layer(auth_layer.clone());

    let admin_only = Router::new()
        .route("/api/categories", post(categories::create_category))
        .route(
            "/api/categories/{id}",
            put(categories::update_category).delete(categories::delete_category),
        )
        .route(
            "/api/admin/users",
            get(admin::list_users).post(admin::create_user),
        )
        .route(
            "/api/admin/users/{id}",
            get(admin::get_user)
                .put(admin::update_user)
                .delete(admin::delete_user),
        )
        .route("/api/admin/orders", get(admin::list_orders))
        .route("/api/admin/orders/stats", get(admin::order_stats))
        .route(
            "/api/admin/orders/{id}",
            get(admin::get_order)
                .put(admin::update_order)
                .delete(admin::delete_order),
        )
        .route(
            "/api/admin/orders/{id}/status",
            patch(admin::update_order_status),
        )
        .route(
            "/api/admin/products",
            get(admin::list_products).post(admin::create_product),
        )
        .route(
            "/api/admin/products/{id}",
            get(admin::get_product)
                .put(admin::update_product)
                .delete(admin::delete_product),
        )
        .route("/api/uploads/image", post(uploads::upload_image))
        .route(
            "/api/uploads/{type}/{filename}",
            delete(uploads::delete_image),
        )
        .route_layer(middleware::from_fn(mw::admin_middleware))
        .route_layer(auth_layer);

    Router::new()
        .merge(public)
        .merge(checkout)
        .merge(authenticated)
        .merge(admin_only)
        .nest_service("/uploads", ServeDir::new(&state.uploads.root))
        .with_state(state)
}
