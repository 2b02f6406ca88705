//! # PostgreSQL
//!
//! Relational store for the catalog, the user accounts and the order
//! aggregates. Each order creation only inserts fresh rows, so plain
//! transactional isolation is all the engine relies on.
//!
//! ## Reference schema
//!
//! Migrations are managed outside this repository; the tables are:
//!
//! ```sql
//! CREATE TABLE categories (
//!     id            SERIAL PRIMARY KEY,
//!     name          TEXT NOT NULL UNIQUE,
//!     description   TEXT,
//!     display_order INT NOT NULL DEFAULT 0,
//!     created_at    TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//!
//! CREATE TABLE products (
//!     id          SERIAL PRIMARY KEY,
//!     category_id INT NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
//!     name        TEXT NOT NULL,
//!     description TEXT,
//!     price       NUMERIC(10,2) NOT NULL CHECK (price >= 0),
//!     stock       INT NOT NULL DEFAULT 0 CHECK (stock >= 0),
//!     featured    BOOL NOT NULL DEFAULT false,
//!     image       TEXT,
//!     created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
//!     updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//!
//! CREATE TABLE users (
//!     id            SERIAL PRIMARY KEY,
//!     username      TEXT NOT NULL UNIQUE,
//!     email         TEXT NOT NULL UNIQUE,
//!     password_hash TEXT NOT NULL,
//!     is_staff      BOOL NOT NULL DEFAULT false,
//!     created_at    TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//!
//! CREATE TABLE orders (
//!     id             SERIAL PRIMARY KEY,
//!     user_id        INT NOT NULL REFERENCES users(id),
//!     customer_name  TEXT NOT NULL,
//!     email          TEXT NOT NULL,
//!     address        TEXT NOT NULL,
//!     payment_method TEXT NOT NULL,
//!     total          NUMERIC(10,2) NOT NULL,
//!     created_at     TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//!
//! CREATE TABLE order_lines (
//!     id         SERIAL PRIMARY KEY,
//!     order_id   INT NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
//!     product_id INT NOT NULL REFERENCES products(id),
//!     quantity   INT NOT NULL CHECK (quantity >= 1),
//!     unit_price NUMERIC(10,2) NOT NULL
//! );
//! ```
use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};

pub async fn init_pool(database_url: &str) -> PgPool {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .unwrap()
}
