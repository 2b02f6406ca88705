//! # Order checkout
//!
//! The cart arrives as product-id/quantity pairs plus customer data. The
//! total is always recomputed here from the catalog's current prices —
//! whatever total a client sends is ignored, so a tampered cart can never
//! buy at a made-up price. Unit prices are snapshotted onto each line, so
//! later catalog edits leave past orders untouched.
//!
//! All validation happens before the first write. The order row and every
//! line are inserted inside one transaction: a failure anywhere rolls the
//! whole order back.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;

use crate::{auth::Identity, error::AppError};

#[derive(Debug, Deserialize)]
pub struct CartItem {
    pub id: i32,
    pub cantidad: i64,
}

/// Checkout request. Unknown fields (notably any client-side `total`) are
/// dropped by deserialization.
#[derive(Debug, Deserialize, Default)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(rename = "nombre", default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "direccion", default)]
    pub address: Option<String>,
    #[serde(rename = "metodoPago", default)]
    pub payment_method: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub address: String,
    pub payment_method: String,
}

#[derive(Debug, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: i32,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Validates everything that needs no catalog access: cart non-empty,
/// customer fields present. Fields are checked in a fixed order so the
/// reported missing field is deterministic.
pub fn validate_request(request: &CreateOrderRequest) -> Result<CustomerInfo, AppError> {
    if request.items.is_empty() {
        return Err(AppError::EmptyCart);
    }

    Ok(CustomerInfo {
        name: required_field(&request.name, "nombre")?,
        email: required_field(&request.email, "email")?,
        address: required_field(&request.address, "direccion")?,
        payment_method: required_field(&request.payment_method, "metodoPago")?,
    })
}

fn required_field(value: &Option<String>, field: &'static str) -> Result<String, AppError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AppError::MissingField(field)),
    }
}

/// Quantities below 1 are lifted to 1 rather than rejected.
pub fn normalize_quantity(raw: i64) -> i32 {
    raw.clamp(1, i32::MAX as i64) as i32
}

/// Builds the snapshot lines and the exact decimal total. One line per cart
/// item, in cart order.
pub fn build_lines(
    items: &[CartItem],
    prices: &HashMap<i32, Decimal>,
) -> Result<(Vec<OrderLine>, Decimal), AppError> {
    let mut lines = Vec::with_capacity(items.len());
    let mut total = Decimal::ZERO;

    for item in items {
        let unit_price = *prices
            .get(&item.id)
            .ok_or(AppError::UnknownProduct(item.id))?;

        let quantity = normalize_quantity(item.cantidad);
        total += unit_price * Decimal::from(quantity);

        lines.push(OrderLine {
            product_id: item.id,
            quantity,
            unit_price,
        });
    }

    Ok((lines, total))
}

/// Runs the full checkout: validate, price, persist. Returns the new order
/// id and the server-computed total.
pub async fn create_order(
    db: &PgPool,
    identity: &Identity,
    request: &CreateOrderRequest,
) -> Result<(i32, Decimal), AppError> {
    let customer = validate_request(request)?;

    let mut prices = HashMap::new();
    for item in &request.items {
        if prices.contains_key(&item.id) {
            continue;
        }

        let price: Option<(Decimal,)> = sqlx::query_as("SELECT price FROM products WHERE id = $1")
            .bind(item.id)
            .fetch_optional(db)
            .await?;

        let (price,) = price.ok_or(AppError::UnknownProduct(item.id))?;
        prices.insert(item.id, price);
    }

    let (lines, total) = build_lines(&request.items, &prices)?;

    let mut tx = db.begin().await?;

    let (order_id,): (i32,) = sqlx::query_as(
        "INSERT INTO orders (user_id, customer_name, email, address, payment_method, total) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(identity.id)
    .bind(&customer.name)
    .bind(&customer.email)
    .bind(&customer.address)
    .bind(&customer.payment_method)
    .bind(total)
    .fetch_one(&mut *tx)
    .await?;

    for line in &lines {
        sqlx::query(
            "INSERT INTO order_lines (order_id, product_id, quantity, unit_price) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok((order_id, total))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rust_decimal::Decimal;

    use super::{CartItem, CreateOrderRequest, build_lines, normalize_quantity, validate_request};
    use crate::error::AppError;

    fn price(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn full_request() -> CreateOrderRequest {
        CreateOrderRequest {
            items: vec![CartItem { id: 1, cantidad: 2 }],
            name: Some("Ana".into()),
            email: Some("ana@example.com".into()),
            address: Some("Calle Falsa 123".into()),
            payment_method: Some("efectivo".into()),
        }
    }

    #[test]
    fn test_quantity_coercion() {
        assert_eq!(normalize_quantity(3), 3);
        assert_eq!(normalize_quantity(1), 1);
        assert_eq!(normalize_quantity(0), 1);
        assert_eq!(normalize_quantity(-5), 1);
    }

    #[test]
    fn test_empty_cart_rejected() {
        let request = CreateOrderRequest {
            items: vec![],
            ..full_request()
        };

        assert!(matches!(validate_request(&request), Err(AppError::EmptyCart)));
    }

    #[test]
    fn test_missing_fields_reported_in_order() {
        let mut request = CreateOrderRequest {
            items: vec![CartItem { id: 1, cantidad: 1 }],
            ..CreateOrderRequest::default()
        };

        assert!(matches!(
            validate_request(&request),
            Err(AppError::MissingField("nombre"))
        ));

        request.name = Some("Ana".into());
        assert!(matches!(
            validate_request(&request),
            Err(AppError::MissingField("email"))
        ));

        request.email = Some("ana@example.com".into());
        assert!(matches!(
            validate_request(&request),
            Err(AppError::MissingField("direccion"))
        ));

        request.address = Some("Calle Falsa 123".into());
        assert!(matches!(
            validate_request(&request),
            Err(AppError::MissingField("metodoPago"))
        ));
    }

    #[test]
    fn test_blank_field_counts_as_missing() {
        let request = CreateOrderRequest {
            email: Some("   ".into()),
            ..full_request()
        };

        assert!(matches!(
            validate_request(&request),
            Err(AppError::MissingField("email"))
        ));
    }

    #[test]
    fn test_total_is_exact() {
        let items = vec![CartItem { id: 1, cantidad: 2 }];
        let prices = HashMap::from([(1, price("150.00"))]);

        let (lines, total) = build_lines(&items, &prices).unwrap();

        assert_eq!(total, price("300.00"));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[0].unit_price, price("150.00"));
    }

    #[test]
    fn test_total_has_no_float_drift() {
        // 0.10 * 3 + 0.20 would drift under f64
        let items = vec![
            CartItem { id: 1, cantidad: 3 },
            CartItem { id: 2, cantidad: 1 },
        ];
        let prices = HashMap::from([(1, price("0.10")), (2, price("0.20"))]);

        let (_, total) = build_lines(&items, &prices).unwrap();

        assert_eq!(total, price("0.50"));
    }

    #[test]
    fn test_sub_one_quantity_becomes_one_line_of_one() {
        let items = vec![CartItem { id: 1, cantidad: 0 }];
        let prices = HashMap::from([(1, price("19.99"))]);

        let (lines, total) = build_lines(&items, &prices).unwrap();

        assert_eq!(lines[0].quantity, 1);
        assert_eq!(total, price("19.99"));
    }

    #[test]
    fn test_unknown_product_aborts_everything() {
        let items = vec![
            CartItem { id: 1, cantidad: 1 },
            CartItem { id: 99, cantidad: 1 },
        ];
        let prices = HashMap::from([(1, price("10.00"))]);

        assert!(matches!(
            build_lines(&items, &prices),
            Err(AppError::UnknownProduct(99))
        ));
    }

    #[test]
    fn test_duplicate_cart_items_keep_their_own_lines() {
        let items = vec![
            CartItem { id: 1, cantidad: 1 },
            CartItem { id: 1, cantidad: 2 },
        ];
        let prices = HashMap::from([(1, price("5.00"))]);

        let (lines, total) = build_lines(&items, &prices).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(total, price("15.00"));
    }
}
