//! Postgres store.
//!
//! Order transitions are single `UPDATE ... WHERE <precondition> RETURNING *` statements; when no row
//! comes back the current row is read to report why.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{query, query_as, query_scalar, FromRow, Row};
use uuid::Uuid;

use crate::domain::aggregates::{
    Cart, CartItem, DeliveryStatus, Order, OrderItem, PaymentResult, PaymentStatus, Product, Role, User,
};
use crate::domain::value_objects::{Money, PaymentMethod, Quantity, ShippingAddress, Slug};
use crate::store::{CartStore, OrderStore, ProductFilter, ProductStore, UserStore};
use crate::{Result, StorefrontError};

const PRODUCT_FILTER: &str =
    "($1::text IS NULL OR position(lower($1) in lower(name)) > 0) AND ($2::text IS NULL OR category = $2)";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    /// Connects and brings the schema up to date.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorefrontError::Storage(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool { &self.pool }

    async fn order_exists(&self, id: Uuid) -> Result<bool> {
        Ok(query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM orders WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?)
    }
}

fn decode_err(column: &str, source: impl Into<BoxDynError>) -> sqlx::Error {
    sqlx::Error::ColumnDecode { index: column.to_string(), source: source.into() }
}

fn try_get_u32(row: &PgRow, column: &str) -> sqlx::Result<u32> {
    let value: i32 = row.try_get(column)?;
    u32::try_from(value).map_err(|e| decode_err(column, e))
}

fn to_i32(value: u32, what: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| StorefrontError::Validation(format!("{what} is too large")))
}

fn to_i64(value: u64) -> i64 { i64::try_from(value).unwrap_or(i64::MAX) }

impl<'r> FromRow<'r, PgRow> for Product {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let currency: String = row.try_get("currency")?;
        let slug: String = row.try_get("slug")?;
        Ok(Self {
            id: row.try_get("id")?,
            slug: Slug::new(slug).map_err(|e| decode_err("slug", e))?,
            name: row.try_get("name")?,
            category: row.try_get("category")?,
            brand: row.try_get("brand")?,
            description: row.try_get("description")?,
            price: Money::new(row.try_get("price")?, &currency),
            stock: Quantity::new(try_get_u32(row, "stock")?),
            images: row.try_get("images")?,
            is_featured: row.try_get("is_featured")?,
            banner: row.try_get("banner")?,
            rating: row.try_get("rating")?,
            num_reviews: try_get_u32(row, "num_reviews")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for Cart {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let currency: String = row.try_get("currency")?;
        let Json(items): Json<Vec<CartItem>> = row.try_get("items")?;
        let totals: Vec<Money> = items.iter().map(CartItem::line_total).collect();
        let items_price = Money::sum(&currency, &totals).map_err(|e| decode_err("items", e))?;
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            items,
            items_price,
            currency,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for Order {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let currency: String = row.try_get("currency")?;
        let money = |column: &str| -> sqlx::Result<Money> { Ok(Money::new(row.try_get::<Decimal, _>(column)?, &currency)) };
        let method: String = row.try_get("payment_method")?;
        let Json(shipping_address): Json<ShippingAddress> = row.try_get("shipping_address")?;
        let Json(items): Json<Vec<OrderItem>> = row.try_get("items")?;
        let payment_result: Option<Json<PaymentResult>> = row.try_get("payment_result")?;
        let paid_at: Option<DateTime<Utc>> = row.try_get("paid_at")?;
        let delivered_at: Option<DateTime<Utc>> = row.try_get("delivered_at")?;
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            shipping_address,
            items,
            prices: crate::domain::pricing::PriceBreakdown {
                items_price: money("items_price")?,
                tax_price: money("tax_price")?,
                shipping_price: money("shipping_price")?,
                total_price: money("total_price")?,
            },
            payment_method: method.parse::<PaymentMethod>().map_err(|e| decode_err("payment_method", e))?,
            payment: paid_at.map_or(PaymentStatus::Unpaid, |paid_at| PaymentStatus::Paid { paid_at }),
            payment_result: payment_result.map(|Json(result)| result),
            delivery: delivered_at.map_or(DeliveryStatus::Pending, |delivered_at| DeliveryStatus::Delivered { delivered_at }),
            created_at: row.try_get("created_at")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for User {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let role: String = row.try_get("role")?;
        let method: Option<String> = row.try_get("payment_method")?;
        let address: Option<Json<ShippingAddress>> = row.try_get("address")?;
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            role: role.parse::<Role>().map_err(|e| decode_err("role", e))?,
            address: address.map(|Json(a)| a),
            payment_method: method
                .map(|m| m.parse::<PaymentMethod>())
                .transpose()
                .map_err(|e| decode_err("payment_method", e))?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl ProductStore for PgStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        query(
            "INSERT INTO products (id, slug, name, category, brand, description, price, currency, stock, images, \
             is_featured, banner, rating, num_reviews, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(product.id)
        .bind(product.slug.as_str())
        .bind(&product.name)
        .bind(&product.category)
        .bind(&product.brand)
        .bind(&product.description)
        .bind(product.price.amount())
        .bind(product.price.currency())
        .bind(to_i32(product.stock.value(), "Stock")?)
        .bind(&product.images)
        .bind(product.is_featured)
        .bind(&product.banner)
        .bind(product.rating)
        .bind(to_i32(product.num_reviews, "Review count")?)
        .bind(product.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<()> {
        let updated = query(
            "UPDATE products SET slug = $2, name = $3, category = $4, brand = $5, description = $6, price = $7, \
             stock = $8, images = $9, is_featured = $10, banner = $11 WHERE id = $1",
        )
        .bind(product.id)
        .bind(product.slug.as_str())
        .bind(&product.name)
        .bind(&product.category)
        .bind(&product.brand)
        .bind(&product.description)
        .bind(product.price.amount())
        .bind(to_i32(product.stock.value(), "Stock")?)
        .bind(&product.images)
        .bind(product.is_featured)
        .bind(&product.banner)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(StorefrontError::ProductNotFound);
        }
        Ok(())
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool> {
        let deleted = query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await?.rows_affected();
        Ok(deleted > 0)
    }

    async fn product_by_id(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(query_as::<_, Product>("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(&self.pool).await?)
    }

    async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        Ok(query_as::<_, Product>("SELECT * FROM products WHERE slug = $1").bind(slug).fetch_optional(&self.pool).await?)
    }

    async fn latest_products(&self, limit: u32) -> Result<Vec<Product>> {
        Ok(query_as::<_, Product>("SELECT * FROM products ORDER BY created_at DESC, id DESC LIMIT $1")
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_products(&self, filter: &ProductFilter, offset: u64, limit: u32) -> Result<(Vec<Product>, u64)> {
        let items = query_as::<_, Product>(&format!(
            "SELECT * FROM products WHERE {PRODUCT_FILTER} ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4"
        ))
        .bind(filter.query.as_deref())
        .bind(filter.category.as_deref())
        .bind(i64::from(limit))
        .bind(to_i64(offset))
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = query_scalar(&format!("SELECT COUNT(*) FROM products WHERE {PRODUCT_FILTER}"))
            .bind(filter.query.as_deref())
            .bind(filter.category.as_deref())
            .fetch_one(&self.pool)
            .await?;
        Ok((items, u64::try_from(total).unwrap_or_default()))
    }

    async fn release_stock(&self, id: Uuid, qty: u32) -> Result<()> {
        let updated = query("UPDATE products SET stock = GREATEST(stock - $2, 0) WHERE id = $1")
            .bind(id)
            .bind(i64::from(qty))
            .execute(&self.pool)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(StorefrontError::ProductNotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn cart_for_user(&self, user_id: Uuid) -> Result<Option<Cart>> {
        Ok(query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1").bind(user_id).fetch_optional(&self.pool).await?)
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        query(
            "INSERT INTO carts (id, user_id, currency, items, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (user_id) DO UPDATE SET items = EXCLUDED.items, currency = EXCLUDED.currency, \
             updated_at = EXCLUDED.updated_at",
        )
        .bind(cart.id)
        .bind(cart.user_id)
        .bind(&cart.currency)
        .bind(Json(&cart.items))
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn create_order_from_cart(&self, order: &Order, cart: &Cart) -> Result<()> {
        if !order.was_placed_from(cart) {
            return Err(StorefrontError::CartChanged);
        }
        let mut tx = self.pool.begin().await?;
        query(
            "INSERT INTO orders (id, user_id, shipping_address, items, currency, items_price, tax_price, \
             shipping_price, total_price, payment_method, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(Json(&order.shipping_address))
        .bind(Json(&order.items))
        .bind(order.prices.total_price.currency())
        .bind(order.prices.items_price.amount())
        .bind(order.prices.tax_price.amount())
        .bind(order.prices.shipping_price.amount())
        .bind(order.prices.total_price.amount())
        .bind(order.payment_method.as_str())
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;
        let cleared = query(
            "UPDATE carts SET items = '[]'::jsonb, updated_at = NOW() \
             WHERE user_id = $1 AND items = $2 AND items <> '[]'::jsonb",
        )
        .bind(order.user_id)
        .bind(Json(&cart.items))
        .execute(&mut *tx)
        .await?;
        if cleared.rows_affected() != 1 {
            tx.rollback().await?;
            return match self.cart_for_user(order.user_id).await? {
                Some(stored) if !stored.is_empty() => Err(StorefrontError::CartChanged),
                _ => Err(StorefrontError::EmptyCart),
            };
        }
        tx.commit().await?;
        Ok(())
    }

    async fn order_by_id(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(query_as::<_, Order>("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(&self.pool).await?)
    }

    async fn record_provider_order(&self, id: Uuid, provider_order_id: &str) -> Result<Order> {
        let updated = query_as::<_, Order>(
            "UPDATE orders SET payment_result = $2 WHERE id = $1 AND is_paid = FALSE RETURNING *",
        )
        .bind(id)
        .bind(Json(PaymentResult::pending(provider_order_id)))
        .fetch_optional(&self.pool)
        .await?;
        match updated {
            Some(order) => Ok(order),
            None if self.order_exists(id).await? => Err(StorefrontError::AlreadyPaid),
            None => Err(StorefrontError::OrderNotFound),
        }
    }

    async fn mark_order_paid(&self, id: Uuid, paid_at: DateTime<Utc>, result: Option<&PaymentResult>) -> Result<Order> {
        let updated = query_as::<_, Order>(
            "UPDATE orders SET is_paid = TRUE, paid_at = $2, payment_result = COALESCE($3, payment_result) \
             WHERE id = $1 AND is_paid = FALSE RETURNING *",
        )
        .bind(id)
        .bind(paid_at)
        .bind(result.map(Json))
        .fetch_optional(&self.pool)
        .await?;
        match updated {
            Some(order) => Ok(order),
            None if self.order_exists(id).await? => Err(StorefrontError::AlreadyPaid),
            None => Err(StorefrontError::OrderNotFound),
        }
    }

    async fn mark_order_delivered(&self, id: Uuid, delivered_at: DateTime<Utc>) -> Result<Order> {
        let updated = query_as::<_, Order>(
            "UPDATE orders SET is_delivered = TRUE, delivered_at = $2 \
             WHERE id = $1 AND is_paid = TRUE AND is_delivered = FALSE RETURNING *",
        )
        .bind(id)
        .bind(delivered_at)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(order) = updated {
            return Ok(order);
        }
        match self.order_by_id(id).await? {
            None => Err(StorefrontError::OrderNotFound),
            Some(order) if !order.is_paid() => Err(StorefrontError::OrderNotPaid),
            Some(_) => Err(StorefrontError::AlreadyDelivered),
        }
    }

    async fn list_orders(&self, user_id: Option<Uuid>, offset: u64, limit: u32) -> Result<(Vec<Order>, u64)> {
        let items = query_as::<_, Order>(
            "SELECT * FROM orders WHERE ($1::uuid IS NULL OR user_id = $1) \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(i64::from(limit))
        .bind(to_i64(offset))
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = query_scalar("SELECT COUNT(*) FROM orders WHERE ($1::uuid IS NULL OR user_id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok((items, u64::try_from(total).unwrap_or_default()))
    }

    async fn delete_order(&self, id: Uuid) -> Result<bool> {
        let deleted = query("DELETE FROM orders WHERE id = $1").bind(id).execute(&self.pool).await?.rows_affected();
        Ok(deleted > 0)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        query(
            "INSERT INTO users (id, name, email, role, address, payment_method, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.address.as_ref().map(Json))
        .bind(user.payment_method.map(|m| m.as_str()))
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(query_as::<_, User>("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(&self.pool).await?)
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let updated = query("UPDATE users SET name = $2, role = $3, address = $4, payment_method = $5 WHERE id = $1")
            .bind(user.id)
            .bind(&user.name)
            .bind(user.role.as_str())
            .bind(user.address.as_ref().map(Json))
            .bind(user.payment_method.map(|m| m.as_str()))
            .execute(&self.pool)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(StorefrontError::UserNotFound);
        }
        Ok(())
    }
}
