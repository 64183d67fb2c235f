use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{CartItem, CreateOrderRequest, CreateOrderResponse, OrderResponse, Product, UserRole},
    queries::{order_queries, product_queries},
    utils::{extractors::extract_user_id, jwt::Claims},
};

fn validate_order(payload: &CreateOrderRequest) -> Result<()> {
    if payload.customer_name.is_empty()
        || payload.customer_email.is_empty()
        || payload.customer_phone.is_empty()
        || payload.items.is_empty()
    {
        return Err(AppError::BadRequest(
            "Не заполнены обязательные поля".to_string(),
        ));
    }

    if payload.items.iter().any(|item| item.quantity <= 0) {
        return Err(AppError::BadRequest(
            "Некорректные данные товара в заказе".to_string(),
        ));
    }

    Ok(())
}

fn price_line(item: &CartItem, product: Option<Product>) -> Result<(Decimal, i32)> {
    let product = product
        .ok_or_else(|| AppError::NotFound(format!("Товар с ID {} не найден", item.product_id)))?;

    Ok((product.price, item.quantity))
}

fn order_total(lines: &[(Decimal, i32)]) -> Decimal {
    lines
        .iter()
        .map(|(price, quantity)| price * Decimal::from(*quantity))
        .sum()
}

/// Checkout is open to anonymous callers; a valid token only links the
/// order to the account.
pub async fn create_order(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>)> {
    validate_order(&payload)?;

    // Items are priced one at a time against the live catalog; the first
    // missing product aborts the whole order.
    let mut lines = Vec::with_capacity(payload.items.len());
    for item in &payload.items {
        let product = product_queries::find_by_id(&state.db, item.product_id).await?;
        lines.push(price_line(item, product)?);
    }

    let total_amount = order_total(&lines);

    let user_id = match claims {
        Some(Extension(ref claims)) => Some(extract_user_id(claims)?),
        None => None,
    };

    let order_id =
        order_queries::create_order_with_items(&state.db, user_id, &payload, total_amount).await?;

    tracing::info!("Order {} created, total {}", order_id, total_amount);

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            message: "Заказ успешно создан".to_string(),
            order_id,
        }),
    ))
}

pub async fn get_user_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<OrderResponse>>> {
    let user_id = extract_user_id(&claims)?;
    let orders = order_queries::get_user_orders(&state.db, user_id).await?;

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

pub async fn get_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<Json<OrderResponse>> {
    let order = order_queries::get_order_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Заказ не найден".to_string()))?;

    let user_id = extract_user_id(&claims)?;
    if order.user_id != Some(user_id) && claims.role != UserRole::Admin {
        return Err(AppError::Forbidden("Доступ запрещен".to_string()));
    }

    let items = order_queries::get_items_for_orders(&state.db, &[order.id]).await?;

    Ok(Json(OrderResponse { order, items }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentMethod;
    use std::str::FromStr;

    fn catalog_product(id: i32, price: &str) -> Product {
        Product {
            id,
            name: format!("Потолок {}", id),
            description: None,
            slug: format!("potolok-{}", id),
            price: Decimal::from_str(price).unwrap(),
            image_url: None,
            stock: 10,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn valid_request() -> CreateOrderRequest {
        CreateOrderRequest {
            customer_name: "Иван Иванов".to_string(),
            customer_email: "ivan@example.com".to_string(),
            customer_phone: "+7 900 000-00-00".to_string(),
            address: None,
            notes: None,
            payment_method: PaymentMethod::Cash,
            items: vec![CartItem {
                product_id: 7,
                quantity: 2,
            }],
        }
    }

    #[test]
    fn accepts_valid_request() {
        assert!(validate_order(&valid_request()).is_ok());
    }

    #[test]
    fn rejects_missing_contact_fields() {
        let mut req = valid_request();
        req.customer_name = String::new();
        assert!(validate_order(&req).is_err());

        let mut req = valid_request();
        req.customer_email = String::new();
        assert!(validate_order(&req).is_err());

        let mut req = valid_request();
        req.customer_phone = String::new();
        assert!(validate_order(&req).is_err());
    }

    #[test]
    fn rejects_empty_cart() {
        let mut req = valid_request();
        req.items.clear();
        assert!(matches!(
            validate_order(&req),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let mut req = valid_request();
        req.items[0].quantity = 0;
        assert!(validate_order(&req).is_err());

        req.items[0].quantity = -3;
        assert!(validate_order(&req).is_err());
    }

    #[test]
    fn absent_contact_field_still_deserializes_and_fails_validation() {
        // the SPA may drop fields entirely instead of sending empty strings
        let json = r#"{
            "customer_name": "a", "customer_email": "b",
            "items": [{"product_id": 1, "quantity": 1}]
        }"#;
        let req: CreateOrderRequest = serde_json::from_str(json).unwrap();
        assert!(req.customer_phone.is_empty());
        assert!(matches!(
            validate_order(&req),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn absent_items_still_deserializes_and_fails_validation() {
        let json = r#"{"customer_name": "a", "customer_email": "b", "customer_phone": "c"}"#;
        let req: CreateOrderRequest = serde_json::from_str(json).unwrap();
        assert!(req.items.is_empty());
        assert!(validate_order(&req).is_err());
    }

    #[test]
    fn prices_line_from_catalog_row() {
        let item = CartItem {
            product_id: 7,
            quantity: 3,
        };
        let (price, quantity) = price_line(&item, Some(catalog_product(7, "149.90"))).unwrap();
        assert_eq!(price, Decimal::from_str("149.90").unwrap());
        assert_eq!(quantity, 3);
    }

    #[test]
    fn missing_product_aborts_with_its_id() {
        let item = CartItem {
            product_id: 42,
            quantity: 1,
        };
        match price_line(&item, None) {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, "Товар с ID 42 не найден"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn first_missing_product_stops_pricing() {
        let items = vec![
            CartItem {
                product_id: 1,
                quantity: 1,
            },
            CartItem {
                product_id: 2,
                quantity: 1,
            },
            CartItem {
                product_id: 3,
                quantity: 1,
            },
        ];
        let lookups = vec![Some(catalog_product(1, "500")), None, None];

        let mut lines = Vec::new();
        let mut error = None;
        for (item, product) in items.iter().zip(lookups) {
            match price_line(item, product) {
                Ok(line) => lines.push(line),
                Err(e) => {
                    error = Some(e);
                    break;
                }
            }
        }

        assert_eq!(lines.len(), 1);
        match error {
            Some(AppError::NotFound(msg)) => assert_eq!(msg, "Товар с ID 2 не найден"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn total_is_sum_of_price_times_quantity() {
        let lines = vec![
            (Decimal::from_str("500").unwrap(), 2),
            (Decimal::from_str("149.90").unwrap(), 3),
        ];
        assert_eq!(order_total(&lines), Decimal::from_str("1449.70").unwrap());
    }

    #[test]
    fn total_of_single_line() {
        let lines = vec![(Decimal::from_str("500").unwrap(), 2)];
        assert_eq!(order_total(&lines), Decimal::from_str("1000").unwrap());
    }

    #[test]
    fn client_cannot_smuggle_a_total() {
        // an extra total field in the body is simply not part of the request type
        let json = r#"{
            "customer_name": "a", "customer_email": "b", "customer_phone": "c",
            "total_amount": "0.01",
            "items": [{"product_id": 1, "quantity": 1}]
        }"#;
        let req: CreateOrderRequest = serde_json::from_str(json).unwrap();
        assert!(validate_order(&req).is_ok());
    }
}
