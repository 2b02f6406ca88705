//! Catalog reads and staff-only catalog writes.
//!
//! Every product leaving this module has its stored image reference passed
//! through the normalizer; raw references never reach the API.

use media::ImageRef;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::{error::AppError, models::Category};

/// Cap on the featured-products listing.
pub const FEATURED_LIMIT: i64 = 12;

const PRODUCT_SELECT: &str = "SELECT p.id, p.name, p.description, p.price, p.stock, p.featured, p.image, \
     p.category_id, c.name AS category_name, c.description AS category_description, \
     c.display_order AS category_order \
     FROM products p JOIN categories c ON c.id = p.category_id";

/// One product joined with its owning category.
#[derive(Debug, FromRow)]
pub struct ProductRow {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub featured: bool,
    pub image: Option<String>,
    pub category_id: i32,
    pub category_name: String,
    pub category_description: Option<String>,
    pub category_order: i32,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: i32,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "orden")]
    pub display_order: i32,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
            display_order: category.display_order,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: i32,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "precio")]
    pub price: Decimal,
    pub stock: i32,
    #[serde(rename = "destacado")]
    pub featured: bool,
    #[serde(rename = "imagen")]
    pub image: Option<String>,
    #[serde(rename = "categoria")]
    pub category: CategoryResponse,
}

impl ProductResponse {
    pub fn from_row(row: ProductRow, cloud_name: &str) -> Self {
        let image = ImageRef::parse(row.image.as_deref()).resolve(cloud_name);

        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            stock: row.stock,
            featured: row.featured,
            image,
            category: CategoryResponse {
                id: row.category_id,
                name: row.category_name,
                description: row.category_description,
                display_order: row.category_order,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoryPayload {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(rename = "orden", default)]
    pub display_order: i32,
}

#[derive(Debug, Deserialize)]
pub struct ProductPayload {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(rename = "precio")]
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    #[serde(rename = "destacado", default)]
    pub featured: bool,
    #[serde(rename = "imagen", default)]
    pub image: Option<String>,
    #[serde(rename = "categoria_id")]
    pub category_id: i32,
}

pub async fn list_products(db: &PgPool) -> Result<Vec<ProductRow>, AppError> {
    let rows = sqlx::query_as(&format!("{PRODUCT_SELECT} ORDER BY p.featured DESC, p.name"))
        .fetch_all(db)
        .await?;

    Ok(rows)
}

pub async fn get_product(db: &PgPool, id: i32) -> Result<ProductRow, AppError> {
    sqlx::query_as(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound("Producto no encontrado."))
}

pub async fn featured_products(db: &PgPool) -> Result<Vec<ProductRow>, AppError> {
    let rows = sqlx::query_as(&format!(
        "{PRODUCT_SELECT} WHERE p.featured ORDER BY p.updated_at DESC LIMIT $1"
    ))
    .bind(FEATURED_LIMIT)
    .fetch_all(db)
    .await?;

    Ok(rows)
}

pub async fn products_by_category(db: &PgPool, category_id: i32) -> Result<Vec<ProductRow>, AppError> {
    category_exists(db, category_id)
        .await?
        .then_some(())
        .ok_or(AppError::NotFound("Categoría no encontrada."))?;

    let rows = sqlx::query_as(&format!(
        "{PRODUCT_SELECT} WHERE p.category_id = $1 ORDER BY p.featured DESC, p.name"
    ))
    .bind(category_id)
    .fetch_all(db)
    .await?;

    Ok(rows)
}

pub async fn list_categories(db: &PgPool) -> Result<Vec<Category>, AppError> {
    let categories = sqlx::query_as(
        "SELECT id, name, description, display_order, created_at FROM categories ORDER BY name",
    )
    .fetch_all(db)
    .await?;

    Ok(categories)
}

pub async fn create_category(db: &PgPool, payload: &CategoryPayload) -> Result<Category, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::MissingField("nombre"));
    }

    sqlx::query_as(
        "INSERT INTO categories (name, description, display_order) VALUES ($1, $2, $3) \
         RETURNING id, name, description, display_order, created_at",
    )
    .bind(payload.name.trim())
    .bind(&payload.description)
    .bind(payload.display_order)
    .fetch_one(db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Validation("La categoría ya existe.".into())
        } else {
            e.into()
        }
    })
}

pub async fn create_product(db: &PgPool, payload: &ProductPayload) -> Result<ProductRow, AppError> {
    validate_product(db, payload).await?;

    let (id,): (i32,) = sqlx::query_as(
        "INSERT INTO products (category_id, name, description, price, stock, featured, image) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
    )
    .bind(payload.category_id)
    .bind(payload.name.trim())
    .bind(&payload.description)
    .bind(payload.price)
    .bind(payload.stock)
    .bind(payload.featured)
    .bind(&payload.image)
    .fetch_one(db)
    .await?;

    get_product(db, id).await
}

pub async fn update_product(db: &PgPool, id: i32, payload: &ProductPayload) -> Result<ProductRow, AppError> {
    validate_product(db, payload).await?;

    let result = sqlx::query(
        "UPDATE products SET category_id = $1, name = $2, description = $3, price = $4, \
         stock = $5, featured = $6, image = $7, updated_at = now() WHERE id = $8",
    )
    .bind(payload.category_id)
    .bind(payload.name.trim())
    .bind(&payload.description)
    .bind(payload.price)
    .bind(payload.stock)
    .bind(payload.featured)
    .bind(&payload.image)
    .bind(id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Producto no encontrado."));
    }

    get_product(db, id).await
}

pub async fn delete_product(db: &PgPool, id: i32) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Producto no encontrado."));
    }

    Ok(())
}

async fn validate_product(db: &PgPool, payload: &ProductPayload) -> Result<(), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::MissingField("nombre"));
    }

    if payload.price < Decimal::ZERO {
        return Err(AppError::Validation("El precio no puede ser negativo.".into()));
    }

    if payload.stock < 0 {
        return Err(AppError::Validation("El stock no puede ser negativo.".into()));
    }

    if !category_exists(db, payload.category_id).await? {
        return Err(AppError::Validation("La categoría no existe.".into()));
    }

    Ok(())
}

async fn category_exists(db: &PgPool, id: i32) -> Result<bool, AppError> {
    let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
        .bind(id)
        .fetch_one(db)
        .await?;

    Ok(exists)
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}
