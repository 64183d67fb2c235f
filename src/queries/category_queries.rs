use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::Result,
    models::{Category, CategoryQuery, CreateCategoryRequest, UpdateCategoryRequest},
};

const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 500;

pub async fn list_categories(pool: &PgPool, params: CategoryQuery) -> Result<Vec<Category>> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM categories WHERE 1=1");

    if let Some(ref search) = params.search {
        query.push(" AND (name ILIKE ");
        query.push_bind(format!("%{}%", search));
        query.push(" OR description ILIKE ");
        query.push_bind(format!("%{}%", search));
        query.push(")");
    }

    query.push(" ORDER BY name LIMIT ");
    query.push_bind(params.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE));
    query.push(" OFFSET ");
    query.push_bind(params.offset.unwrap_or(0));

    let categories = query.build_query_as::<Category>().fetch_all(pool).await?;

    Ok(categories)
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(category)
}

pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    Ok(category)
}

pub async fn create_category(pool: &PgPool, req: &CreateCategoryRequest) -> Result<Category> {
    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (name, description, slug, image_url)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.slug)
    .bind(&req.image_url)
    .fetch_one(pool)
    .await?;

    Ok(category)
}

pub async fn update_category(
    pool: &PgPool,
    id: i32,
    req: &UpdateCategoryRequest,
) -> Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>(
        "UPDATE categories SET
             name = COALESCE($2, name),
             description = COALESCE($3, description),
             slug = COALESCE($4, slug),
             image_url = COALESCE($5, image_url),
             updated_at = NOW()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.slug)
    .bind(&req.image_url)
    .fetch_optional(pool)
    .await?;

    Ok(category)
}

pub async fn delete_category(pool: &PgPool, id: i32) -> Result<bool> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
