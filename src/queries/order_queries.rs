use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        CreateOrderRequest, Order, OrderFilter, OrderItem, OrderStats, OrderStatus, StatusCount,
        UpdateOrderRequest,
    },
};

const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 500;

/// Inserts the order header and all its lines in one transaction. The status
/// is always `pending` and the total is the server-computed value; nothing
/// client-supplied reaches either column.
pub async fn create_order_with_items(
    pool: &PgPool,
    user_id: Option<Uuid>,
    req: &CreateOrderRequest,
    total_amount: Decimal,
) -> Result<i32> {
    let mut tx = pool.begin().await?;

    let order_id: i32 = sqlx::query_scalar(
        "INSERT INTO orders (user_id, customer_name, customer_email, customer_phone,
                             address, status, total_amount, payment_method, notes)
         VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7, $8)
         RETURNING id",
    )
    .bind(user_id)
    .bind(&req.customer_name)
    .bind(&req.customer_email)
    .bind(&req.customer_phone)
    .bind(&req.address)
    .bind(total_amount)
    .bind(req.payment_method)
    .bind(&req.notes)
    .fetch_one(&mut *tx)
    .await?;

    let product_ids: Vec<i32> = req.items.iter().map(|i| i.product_id).collect();
    let quantities: Vec<i32> = req.items.iter().map(|i| i.quantity).collect();

    sqlx::query(
        "INSERT INTO order_items (order_id, product_id, quantity)
         SELECT $1, unnest($2::int[]), unnest($3::int[])",
    )
    .bind(order_id)
    .bind(&product_ids)
    .bind(&quantities)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(order_id)
}

pub async fn get_order_by_id(pool: &PgPool, id: i32) -> Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(order)
}

pub async fn get_user_orders(pool: &PgPool, user_id: Uuid) -> Result<Vec<Order>> {
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(orders)
}

/// Line items for a batch of orders; product name and price are joined from
/// the live catalog rather than stored on the line.
pub async fn get_items_for_orders(pool: &PgPool, order_ids: &[i32]) -> Result<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT oi.id, oi.order_id, oi.product_id, oi.quantity,
                p.name AS product_name, p.price AS product_price
         FROM order_items oi
         LEFT JOIN products p ON p.id = oi.product_id
         WHERE oi.order_id = ANY($1)
         ORDER BY oi.order_id, oi.id",
    )
    .bind(order_ids)
    .fetch_all(pool)
    .await?;

    Ok(items)
}

pub async fn get_filtered_orders(pool: &PgPool, filter: OrderFilter) -> Result<Vec<Order>> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM orders WHERE 1=1");

    if let Some(ref search) = filter.search {
        let pattern = format!("%{}%", search);
        query.push(" AND (customer_name ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR customer_email ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR customer_phone ILIKE ");
        query.push_bind(pattern);
        query.push(")");
    }

    if let Some(ref status) = filter.status {
        let status = OrderStatus::parse(status)
            .ok_or_else(|| AppError::BadRequest("Недопустимый статус заказа".to_string()))?;
        query.push(" AND status = ");
        query.push_bind(status);
    }

    if let Some(start_date) = filter.start_date {
        query.push(" AND created_at >= ");
        query.push_bind(start_date);
    }

    if let Some(end_date) = filter.end_date {
        query.push(" AND created_at <= ");
        query.push_bind(end_date);
    }

    query.push(" ORDER BY created_at DESC LIMIT ");
    query.push_bind(filter.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE));
    query.push(" OFFSET ");
    query.push_bind(filter.offset.unwrap_or(0));

    let orders = query.build_query_as::<Order>().fetch_all(pool).await?;

    Ok(orders)
}

pub async fn update_order_status(pool: &PgPool, id: i32, status: OrderStatus) -> Result<bool> {
    let result = sqlx::query("UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn update_order(
    pool: &PgPool,
    id: i32,
    req: &UpdateOrderRequest,
    status: Option<OrderStatus>,
) -> Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET
             customer_name = COALESCE($2, customer_name),
             customer_email = COALESCE($3, customer_email),
             customer_phone = COALESCE($4, customer_phone),
             address = COALESCE($5, address),
             status = COALESCE($6, status),
             payment_method = COALESCE($7, payment_method),
             notes = COALESCE($8, notes),
             updated_at = NOW()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&req.customer_name)
    .bind(&req.customer_email)
    .bind(&req.customer_phone)
    .bind(&req.address)
    .bind(status)
    .bind(req.payment_method)
    .bind(&req.notes)
    .fetch_optional(pool)
    .await?;

    Ok(order)
}

pub async fn delete_order(pool: &PgPool, id: i32) -> Result<bool> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM order_items WHERE order_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

pub async fn get_order_stats(pool: &PgPool) -> Result<OrderStats> {
    let total_orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(pool)
        .await?;

    let pending_orders: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status = 'pending'")
            .fetch_one(pool)
            .await?;

    let total_revenue: Decimal =
        sqlx::query_scalar("SELECT COALESCE(SUM(total_amount), 0) FROM orders")
            .fetch_one(pool)
            .await?;

    let status_counts = sqlx::query_as::<_, StatusCount>(
        "SELECT status::text AS status, COUNT(*) AS count FROM orders GROUP BY status",
    )
    .fetch_all(pool)
    .await?;

    Ok(OrderStats {
        total_orders,
        pending_orders,
        total_revenue,
        status_counts,
    })
}
