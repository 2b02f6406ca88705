use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    auth::{self, Identity, TokenKind},
    catalog::{self, CategoryPayload, CategoryResponse, ProductPayload, ProductResponse},
    error::AppError,
    orders::{self, CreateOrderRequest},
    state::AppState,
};

// ---- catalog reads ----

pub async fn list_products_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let rows = catalog::list_products(&state.db).await?;

    Ok(Json(to_responses(rows, &state)))
}

pub async fn get_product_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ProductResponse>, AppError> {
    let row = catalog::get_product(&state.db, id).await?;

    Ok(Json(ProductResponse::from_row(row, &state.config.cdn.cloud_name)))
}

pub async fn featured_products_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let rows = catalog::featured_products(&state.db).await?;

    Ok(Json(to_responses(rows, &state)))
}

pub async fn products_by_category_handler(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<i32>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let rows = catalog::products_by_category(&state.db, category_id).await?;

    Ok(Json(to_responses(rows, &state)))
}

pub async fn list_categories_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CategoryResponse>>, AppError> {
    let categories = catalog::list_categories(&state.db).await?;

    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

fn to_responses(rows: Vec<catalog::ProductRow>, state: &AppState) -> Vec<ProductResponse> {
    rows.into_iter()
        .map(|row| ProductResponse::from_row(row, &state.config.cdn.cloud_name))
        .collect()
}

// ---- catalog writes (staff only) ----

pub async fn create_category_handler(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(payload): Json<CategoryPayload>,
) -> Result<impl IntoResponse, AppError> {
    auth::require_staff(&identity)?;

    let category = catalog::create_category(&state.db, &payload).await?;
    info!("category {} created by {}", category.id, identity.username);

    Ok((StatusCode::CREATED, Json(CategoryResponse::from(category))))
}

pub async fn create_product_handler(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(payload): Json<ProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    auth::require_staff(&identity)?;

    let row = catalog::create_product(&state.db, &payload).await?;
    info!("product {} created by {}", row.id, identity.username);

    Ok((
        StatusCode::CREATED,
        Json(ProductResponse::from_row(row, &state.config.cdn.cloud_name)),
    ))
}

pub async fn update_product_handler(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<i32>,
    Json(payload): Json<ProductPayload>,
) -> Result<Json<ProductResponse>, AppError> {
    auth::require_staff(&identity)?;

    let row = catalog::update_product(&state.db, id, &payload).await?;

    Ok(Json(ProductResponse::from_row(row, &state.config.cdn.cloud_name)))
}

pub async fn delete_product_handler(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth::require_staff(&identity)?;

    catalog::delete_product(&state.db, id).await?;
    info!("product {id} deleted by {}", identity.username);

    Ok(StatusCode::NO_CONTENT)
}

// ---- checkout ----

pub async fn create_order_handler(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (order_id, total) = orders::create_order(&state.db, &identity, &request).await?;
    info!("order {order_id} created for user {}", identity.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Pedido creado correctamente",
            "pedido_id": order_id,
            "total": total,
        })),
    ))
}

// ---- auth ----

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let username = request.username.trim().to_string();
    let email = request.email.trim().to_lowercase();

    if username.is_empty() {
        return Err(AppError::MissingField("username"));
    }

    if !email.contains('@') {
        return Err(AppError::Validation("Email inválido.".into()));
    }

    if request.password.chars().count() < 8 {
        return Err(AppError::Validation(
            "La contraseña debe tener al menos 8 caracteres.".into(),
        ));
    }

    let (username_taken,): (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE lower(username) = lower($1))")
            .bind(&username)
            .fetch_one(&state.db)
            .await?;

    if username_taken {
        return Err(AppError::Validation("Este nombre de usuario ya existe.".into()));
    }

    let (email_taken,): (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE lower(email) = $1)")
            .bind(&email)
            .fetch_one(&state.db)
            .await?;

    if email_taken {
        return Err(AppError::Validation("El email ya está registrado.".into()));
    }

    let password_hash = auth::hash_password(&request.password)?;

    let (id,): (i32,) = sqlx::query_as(
        "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(&username)
    .bind(&email)
    .bind(&password_hash)
    .fetch_one(&state.db)
    .await?;

    info!("user {username} registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": id, "username": username, "email": email })),
    ))
}

pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user: Option<crate::models::User> = sqlx::query_as(
        "SELECT id, username, email, password_hash, is_staff FROM users WHERE username = $1",
    )
    .bind(&request.username)
    .fetch_optional(&state.db)
    .await?;

    let Some(user) = user else {
        return Err(AppError::InvalidCredentials);
    };

    if !auth::verify_password(&request.password, &user.password_hash) {
        return Err(AppError::InvalidCredentials);
    }

    let secret = &state.config.jwt_secret;
    let access = auth::issue_token(secret, user.id, &user.username, user.is_staff, TokenKind::Access)?;
    let refresh =
        auth::issue_token(secret, user.id, &user.username, user.is_staff, TokenKind::Refresh)?;

    Ok(Json(json!({ "access": access, "refresh": refresh })))
}

pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let secret = &state.config.jwt_secret;
    let claims = auth::verify_token(secret, &request.refresh, TokenKind::Refresh)?;

    let user_id: i32 = claims.sub.parse().map_err(|_| AppError::Unauthorized)?;
    let access = auth::issue_token(secret, user_id, &claims.username, claims.is_staff, TokenKind::Access)?;

    Ok(Json(json!({ "access": access })))
}

pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<serde_json::Value>, AppError> {
    let (email,): (String,) = sqlx::query_as("SELECT email FROM users WHERE id = $1")
        .bind(identity.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(json!({
        "id": identity.id,
        "username": identity.username,
        "email": email,
        "is_staff": identity.is_staff,
    })))
}
