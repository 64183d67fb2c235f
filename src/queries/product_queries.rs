use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::Result,
    models::{
        CreateProductRequest, Product, ProductGalleryImage, ProductQuery, ProductResponse,
        ProductSpecification, UpdateProductRequest,
    },
};

const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 500;

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(product)
}

pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    Ok(product)
}

pub async fn search_products(pool: &PgPool, params: ProductQuery) -> Result<Vec<Product>> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM products WHERE 1=1");

    if let Some(ref search) = params.search {
        query.push(" AND (name ILIKE ");
        query.push_bind(format!("%{}%", search));
        query.push(" OR description ILIKE ");
        query.push_bind(format!("%{}%", search));
        query.push(")");
    }

    if let Some(category_id) = params.category {
        query.push(
            " AND EXISTS (SELECT 1 FROM product_categories
              WHERE product_id = products.id AND category_id = ",
        );
        query.push_bind(category_id);
        query.push(")");
    }

    if let Some(min_price) = params.min_price {
        query.push(" AND price >= ");
        query.push_bind(min_price);
    }

    if let Some(max_price) = params.max_price {
        query.push(" AND price <= ");
        query.push_bind(max_price);
    }

    query.push(" ORDER BY created_at DESC LIMIT ");
    query.push_bind(params.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE));
    query.push(" OFFSET ");
    query.push_bind(params.offset.unwrap_or(0));

    let products = query.build_query_as::<Product>().fetch_all(pool).await?;

    Ok(products)
}

pub async fn list_products(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(limit.min(MAX_PAGE_SIZE))
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(products)
}

pub async fn find_by_category(
    pool: &PgPool,
    category_id: i32,
    limit: i64,
    offset: i64,
) -> Result<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT p.* FROM products p
         JOIN product_categories pc ON pc.product_id = p.id
         WHERE pc.category_id = $1
         ORDER BY p.created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(category_id)
    .bind(limit.min(MAX_PAGE_SIZE))
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(products)
}

/// Assembles the full representation: category memberships, specifications
/// and the gallery, primary image first.
pub async fn load_detail(pool: &PgPool, product: Product) -> Result<ProductResponse> {
    let category_ids: Vec<i32> = sqlx::query_scalar(
        "SELECT category_id FROM product_categories WHERE product_id = $1 ORDER BY category_id",
    )
    .bind(product.id)
    .fetch_all(pool)
    .await?;

    let specifications = sqlx::query_as::<_, ProductSpecification>(
        "SELECT * FROM product_specifications WHERE product_id = $1 ORDER BY id",
    )
    .bind(product.id)
    .fetch_all(pool)
    .await?;

    let gallery_images = sqlx::query_as::<_, ProductGalleryImage>(
        "SELECT * FROM product_gallery WHERE product_id = $1 ORDER BY is_primary DESC, id",
    )
    .bind(product.id)
    .fetch_all(pool)
    .await?;

    Ok(ProductResponse {
        product,
        category_ids,
        specifications,
        gallery_images,
    })
}

pub async fn create_product(pool: &PgPool, req: &CreateProductRequest) -> Result<Product> {
    let mut tx = pool.begin().await?;

    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (name, description, slug, price, image_url, stock)
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.slug)
    .bind(req.price)
    .bind(&req.image_url)
    .bind(req.stock)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO product_categories (product_id, category_id)
         SELECT $1, unnest($2::int[])",
    )
    .bind(product.id)
    .bind(&req.category_ids)
    .execute(&mut *tx)
    .await?;

    insert_specifications(&mut tx, product.id, &req.specifications).await?;
    insert_gallery(&mut tx, product.id, &req.gallery_images).await?;

    tx.commit().await?;
    Ok(product)
}

pub async fn update_product(
    pool: &PgPool,
    id: i32,
    req: &UpdateProductRequest,
) -> Result<Option<Product>> {
    let mut tx = pool.begin().await?;

    let product = sqlx::query_as::<_, Product>(
        "UPDATE products SET
             name = COALESCE($2, name),
             description = COALESCE($3, description),
             slug = COALESCE($4, slug),
             price = COALESCE($5, price),
             image_url = COALESCE($6, image_url),
             stock = COALESCE($7, stock),
             updated_at = NOW()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.slug)
    .bind(req.price)
    .bind(&req.image_url)
    .bind(req.stock)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(product) = product else {
        tx.rollback().await?;
        return Ok(None);
    };

    if let Some(ref category_ids) = req.category_ids {
        sqlx::query("DELETE FROM product_categories WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO product_categories (product_id, category_id)
             SELECT $1, unnest($2::int[])",
        )
        .bind(id)
        .bind(category_ids)
        .execute(&mut *tx)
        .await?;
    }

    if let Some(ref specifications) = req.specifications {
        sqlx::query("DELETE FROM product_specifications WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_specifications(&mut tx, id, specifications).await?;
    }

    if let Some(ref gallery_images) = req.gallery_images {
        sqlx::query("DELETE FROM product_gallery WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_gallery(&mut tx, id, gallery_images).await?;
    }

    tx.commit().await?;
    Ok(Some(product))
}

pub async fn delete_product(pool: &PgPool, id: i32) -> Result<bool> {
    // specifications, gallery and category links go with it via ON DELETE CASCADE
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

async fn insert_specifications(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    product_id: i32,
    specifications: &[crate::models::SpecificationInput],
) -> Result<()> {
    if specifications.is_empty() {
        return Ok(());
    }

    let names: Vec<&str> = specifications.iter().map(|s| s.name.as_str()).collect();
    let values: Vec<&str> = specifications.iter().map(|s| s.value.as_str()).collect();

    sqlx::query(
        "INSERT INTO product_specifications (product_id, name, value)
         SELECT $1, unnest($2::varchar[]), unnest($3::text[])",
    )
    .bind(product_id)
    .bind(&names)
    .bind(&values)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn insert_gallery(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    product_id: i32,
    image_urls: &[String],
) -> Result<()> {
    if image_urls.is_empty() {
        return Ok(());
    }

    // first image is the primary one
    let primaries: Vec<bool> = (0..image_urls.len()).map(|i| i == 0).collect();

    sqlx::query(
        "INSERT INTO product_gallery (product_id, image_url, is_primary)
         SELECT $1, unnest($2::varchar[]), unnest($3::bool[])",
    )
    .bind(product_id)
    .bind(image_urls)
    .bind(&primaries)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
