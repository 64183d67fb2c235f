use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
};

use crate::{config::AuthConfig, error::AppError, models::UserRole, utils::jwt};

/// Pulls the raw token out of the Authorization header. A `Bearer ` prefix
/// is accepted but not required; the SPA has been observed sending the
/// literal strings "undefined" and "null" when its stored token is gone.
fn extract_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Отсутствует токен аутентификации".to_string()))?;

    let token = auth_header.strip_prefix("Bearer ").unwrap_or(auth_header);

    if token.is_empty() || token == "undefined" || token == "null" {
        return Err(AppError::Unauthorized(
            "Некорректный токен аутентификации".to_string(),
        ));
    }

    Ok(token)
}

pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // CORS preflight carries no credentials and must pass through
    if req.method() == Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let token = extract_token(req.headers())?;
    let claims = jwt::verify_token(&auth, token)?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Layered after `auth_middleware`; reads the claims it attached rather
/// than re-parsing the token.
pub async fn admin_middleware(req: Request, next: Next) -> Result<Response, AppError> {
    if req.method() == Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let claims = req
        .extensions()
        .get::<jwt::Claims>()
        .ok_or_else(|| AppError::Unauthorized("Не аутентифицирован".to_string()))?;

    if claims.role != UserRole::Admin {
        return Err(AppError::Forbidden(
            "Доступ запрещен, требуются права администратора".to_string(),
        ));
    }

    Ok(next.run(req).await)
}

/// For routes open to anonymous callers that still want to know who the
/// caller is when a valid token happens to be present (checkout).
pub async fn optional_auth_middleware(
    State(auth): State<AuthConfig>,
    mut req: Request,
    next: Next,
) -> Response {
    if req.method() != Method::OPTIONS {
        if let Ok(token) = extract_token(req.headers()) {
            if let Ok(claims) = jwt::verify_token(&auth, token) {
                req.extensions_mut().insert(claims);
            }
        }
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Extension, Router,
        body::Body,
        http::{Request as HttpRequest, StatusCode, header},
        middleware as axum_middleware,
        routing::get,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    fn test_auth() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: 1,
        }
    }

    async fn ok_handler() -> &'static str {
        "ok"
    }

    async fn whoami(Extension(claims): Extension<jwt::Claims>) -> String {
        claims.sub
    }

    fn protected_router(auth: AuthConfig) -> Router {
        Router::new()
            .route("/protected", get(whoami).options(ok_handler))
            .route_layer(axum_middleware::from_fn_with_state(auth, auth_middleware))
    }

    fn admin_router(auth: AuthConfig) -> Router {
        Router::new()
            .route("/admin", get(ok_handler))
            .route_layer(axum_middleware::from_fn(admin_middleware))
            .route_layer(axum_middleware::from_fn_with_state(auth, auth_middleware))
    }

    fn get_with_token(uri: &str, token: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let app = protected_router(test_auth());
        let res = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/protected")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn literal_undefined_token_is_unauthorized() {
        let app = protected_router(test_auth());
        let res = app
            .oneshot(get_with_token("/protected", "undefined"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn tampered_token_is_unauthorized() {
        let auth = test_auth();
        let other = AuthConfig {
            jwt_secret: "other-secret".to_string(),
            token_ttl_hours: 1,
        };
        let token = jwt::generate_token(&other, Uuid::new_v4(), UserRole::Admin).unwrap();

        let app = protected_router(auth);
        let res = app
            .oneshot(get_with_token("/protected", &token))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_token_reaches_handler() {
        let auth = test_auth();
        let user_id = Uuid::new_v4();
        let token = jwt::generate_token(&auth, user_id, UserRole::User).unwrap();

        let app = protected_router(auth);
        let res = app
            .oneshot(get_with_token("/protected", &token))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn raw_token_without_bearer_prefix_is_accepted() {
        let auth = test_auth();
        let token = jwt::generate_token(&auth, Uuid::new_v4(), UserRole::User).unwrap();

        let app = protected_router(auth);
        let res = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/protected")
                    .header(header::AUTHORIZATION, token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn preflight_bypasses_auth() {
        let app = protected_router(test_auth());
        let res = app
            .oneshot(
                HttpRequest::builder()
                    .method(Method::OPTIONS)
                    .uri("/protected")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn non_admin_role_is_forbidden() {
        let auth = test_auth();
        let token = jwt::generate_token(&auth, Uuid::new_v4(), UserRole::User).unwrap();

        let app = admin_router(auth);
        let res = app.oneshot(get_with_token("/admin", &token)).await.unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_role_is_allowed() {
        let auth = test_auth();
        let token = jwt::generate_token(&auth, Uuid::new_v4(), UserRole::Admin).unwrap();

        let app = admin_router(auth);
        let res = app.oneshot(get_with_token("/admin", &token)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn admin_gate_without_claims_is_unauthorized() {
        // admin layer wired without the auth layer in front of it
        let app = Router::new()
            .route("/admin", get(ok_handler))
            .route_layer(axum_middleware::from_fn(admin_middleware));

        let res = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/admin")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn optional_auth_passes_anonymous_through() {
        let app = Router::new()
            .route("/open", get(ok_handler))
            .route_layer(axum_middleware::from_fn_with_state(
                test_auth(),
                optional_auth_middleware,
            ));

        let res = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/open")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn optional_auth_attaches_claims_when_token_is_valid() {
        let auth = test_auth();
        let user_id = Uuid::new_v4();
        let token = jwt::generate_token(&auth, user_id, UserRole::User).unwrap();

        async fn claimed(claims: Option<Extension<jwt::Claims>>) -> String {
            claims.map(|Extension(c)| c.sub).unwrap_or_default()
        }

        let app = Router::new()
            .route("/open", get(claimed))
            .route_layer(axum_middleware::from_fn_with_state(
                auth,
                optional_auth_middleware,
            ));

        let res = app.oneshot(get_with_token("/open", &token)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = http_body_util::BodyExt::collect(res.into_body())
            .await
            .unwrap()
            .to_bytes();
        assert_eq!(body, user_id.to_string().as_bytes());
    }
}
