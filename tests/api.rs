use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use testresult::TestResult;
use tower::ServiceExt;
use uuid::Uuid;

use storefront::api::auth::{USER_ID_HEADER, USER_ROLE_HEADER};
use storefront::api::{router, AppState};
use storefront::config::ShopSettings;
use storefront::domain::aggregates::{Role, User};
use storefront::domain::pricing::PricingPolicy;
use storefront::domain::value_objects::Money;
use storefront::notify::{Notifiers, StockNotifier};
use storefront::payments::{CaptureOutcome, PaymentProvider, ProviderError, ProviderOrder};
use storefront::services::Services;
use storefront::store::{MemoryStore, SharedStore, UserStore};

/// Opens `PP-1` and reports every capture with a fixed status.
struct FakePayPal {
    capture_status: &'static str,
}

#[async_trait]
impl PaymentProvider for FakePayPal {
    async fn create_order(&self, _amount: &Money) -> Result<ProviderOrder, ProviderError> {
        Ok(ProviderOrder { id: "PP-1".into(), status: "CREATED".into() })
    }

    async fn capture_order(&self, provider_order_id: &str) -> Result<CaptureOutcome, ProviderError> {
        Ok(CaptureOutcome {
            id: provider_order_id.to_string(),
            status: self.capture_status.to_string(),
            email_address: "buyer@example.com".into(),
        })
    }
}

struct Shop {
    app: Router,
    store: SharedStore,
    admin: Uuid,
}

fn shop(capture_status: &'static str) -> Shop {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let settings = ShopSettings {
        pricing: PricingPolicy::flat(Decimal::new(10, 2), Decimal::new(500, 2)),
        page_size: 2,
        ..ShopSettings::default()
    };
    let notifiers = Notifiers::new().with(StockNotifier::new(Arc::clone(&store)));
    let services = Services::new(Arc::clone(&store), Arc::new(FakePayPal { capture_status }), notifiers, settings);
    Shop { app: router(AppState::new(services)), store, admin: Uuid::now_v7() }
}

impl Shop {
    async fn call(&self, method: &str, uri: &str, actor: Option<(Uuid, Role)>, body: Option<Value>) -> TestResult<(StatusCode, Value)> {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some((id, role)) = actor {
            request = request.header(USER_ID_HEADER, id.to_string()).header(USER_ROLE_HEADER, role.as_str());
        }
        let request = match body {
            Some(body) => request.header("content-type", "application/json").body(Body::from(body.to_string()))?,
            None => request.body(Body::empty())?,
        };
        let response = self.app.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&bytes)?))
    }

    async fn shopper(&self) -> TestResult<Uuid> { self.shopper_paying_by("CashOnDelivery").await }

    async fn shopper_paying_by(&self, method: &str) -> TestResult<Uuid> {
        let user = User::new("Jane Doe", format!("{}@example.com", Uuid::now_v7()), Role::User);
        self.store.insert_user(&user).await?;
        let me = Some((user.id(), Role::User));
        let address = json!({
            "full_name": "Jane Doe",
            "street_address": "1 Main St",
            "city": "Springfield",
            "postal_code": "12345",
            "country": "USA"
        });
        self.call("PUT", "/api/v1/profile/address", me, Some(address)).await?;
        self.call("PUT", "/api/v1/profile/payment-method", me, Some(json!({ "payment_method": method }))).await?;
        Ok(user.id())
    }

    async fn product(&self, slug: &str, price: &str, stock: u32) -> TestResult<Uuid> {
        let input = json!({
            "name": format!("Product {slug}"),
            "slug": slug,
            "category": "Shirts",
            "brand": "Polo",
            "description": "A fine shirt",
            "price": price,
            "stock": stock,
            "images": ["/images/p1.jpg"]
        });
        let (status, body) = self.call("POST", "/api/v1/admin/products", Some((self.admin, Role::Admin)), Some(input)).await?;
        assert_eq!(status, StatusCode::OK, "{body}");
        Ok(Uuid::parse_str(body["data"]["id"].as_str().unwrap_or_default())?)
    }

    /// Shopper with 10.00 x2 and 5.00 x1 in the cart, ordered.
    async fn placed_order(&self, method: &str) -> TestResult<(Uuid, Uuid)> {
        let user = self.shopper_paying_by(method).await?;
        let me = Some((user, Role::User));
        let shirt = self.product(&format!("shirt-{}", Uuid::now_v7().simple()), "10.00", 5).await?;
        let socks = self.product(&format!("socks-{}", Uuid::now_v7().simple()), "5.00", 5).await?;
        self.call("POST", "/api/v1/cart/items", me, Some(json!({ "product_id": shirt, "qty": 2 }))).await?;
        self.call("POST", "/api/v1/cart/items", me, Some(json!({ "product_id": socks }))).await?;
        let (status, body) = self.call("POST", "/api/v1/orders", me, None).await?;
        assert_eq!(status, StatusCode::OK, "{body}");
        Ok((user, Uuid::parse_str(body["data"]["order"]["id"].as_str().unwrap_or_default())?))
    }
}

fn amount(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap_or_default(),
        other => Decimal::from_str(&other.to_string()).unwrap_or_default(),
    }
}

#[tokio::test]
async fn checkout_prices_and_redirects() -> TestResult {
    let shop = shop("COMPLETED");
    let user = shop.shopper().await?;
    let me = Some((user, Role::User));
    let shirt = shop.product("shirt", "10.00", 5).await?;
    let socks = shop.product("socks", "5.00", 5).await?;

    let (_, added) = shop.call("POST", "/api/v1/cart/items", me, Some(json!({ "product_id": shirt, "qty": 2 }))).await?;
    assert_eq!(added["message"], "Product shirt added to cart");
    shop.call("POST", "/api/v1/cart/items", me, Some(json!({ "product_id": socks }))).await?;

    let (status, body) = shop.call("POST", "/api/v1/orders", me, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let order = &body["data"]["order"];
    assert_eq!(body["data"]["redirect_to"], format!("/order/{}", order["id"].as_str().unwrap_or_default()));
    assert_eq!(amount(&order["prices"]["items_price"]["amount"]), Decimal::new(2500, 2));
    assert_eq!(amount(&order["prices"]["tax_price"]["amount"]), Decimal::new(250, 2));
    assert_eq!(amount(&order["prices"]["shipping_price"]["amount"]), Decimal::new(500, 2));
    assert_eq!(amount(&order["prices"]["total_price"]["amount"]), Decimal::new(3250, 2));
    assert_eq!(order["payment"]["status"], "unpaid");

    let (_, cart) = shop.call("GET", "/api/v1/cart", me, None).await?;
    assert_eq!(cart["data"]["items"].as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn empty_cart_cannot_be_ordered() -> TestResult {
    let shop = shop("COMPLETED");
    let user = shop.shopper().await?;
    let (status, body) = shop.call("POST", "/api/v1/orders", Some((user, Role::User)), None).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({ "success": false, "message": "Your cart is empty" }));
    Ok(())
}

#[tokio::test]
async fn cash_payment_and_delivery_lifecycle() -> TestResult {
    let shop = shop("COMPLETED");
    let (user, order) = shop.placed_order("CashOnDelivery").await?;
    let admin = Some((shop.admin, Role::Admin));

    let (status, body) = shop.call("POST", &format!("/api/v1/admin/orders/{order}/deliver"), admin, None).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Order is not paid");

    let (status, body) = shop.call("POST", &format!("/api/v1/admin/orders/{order}/pay-cash"), Some((user, Role::User)), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "success": false, "message": "User is not authorized" }));

    let (_, paid) = shop.call("POST", &format!("/api/v1/admin/orders/{order}/pay-cash"), admin, None).await?;
    assert_eq!(paid["success"], true);
    let paid_at = paid["data"]["payment"]["paid_at"].clone();

    let (status, again) = shop.call("POST", &format!("/api/v1/admin/orders/{order}/pay-cash"), admin, None).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(again["message"], "Order is already paid");
    let (_, stored) = shop.call("GET", &format!("/api/v1/orders/{order}"), Some((user, Role::User)), None).await?;
    assert_eq!(stored["data"]["payment"]["paid_at"], paid_at);

    let (_, delivered) = shop.call("POST", &format!("/api/v1/admin/orders/{order}/deliver"), admin, None).await?;
    assert_eq!(delivered["success"], true);
    assert_eq!(delivered["data"]["delivery"]["status"], "delivered");
    Ok(())
}

#[tokio::test]
async fn paypal_completed_capture_pays_order() -> TestResult {
    let shop = shop("COMPLETED");
    let (user, order) = shop.placed_order("PayPal").await?;
    let me = Some((user, Role::User));

    let (_, opened) = shop.call("POST", &format!("/api/v1/orders/{order}/paypal"), me, None).await?;
    assert_eq!(opened["data"]["id"], "PP-1");

    let approve = format!("/api/v1/orders/{order}/paypal/approve");
    let (status, paid) = shop.call("POST", &approve, me, Some(json!({ "orderID": "PP-1" }))).await?;
    assert_eq!(status, StatusCode::OK, "{paid}");
    assert_eq!(paid["message"], "Your order has been paid");
    assert_eq!(paid["data"]["payment_result"]["email_address"], "buyer@example.com");
    Ok(())
}

#[tokio::test]
async fn paypal_pending_capture_leaves_order_unpaid() -> TestResult {
    let shop = shop("PENDING");
    let (user, order) = shop.placed_order("PayPal").await?;
    let me = Some((user, Role::User));
    shop.call("POST", &format!("/api/v1/orders/{order}/paypal"), me, None).await?;

    let approve = format!("/api/v1/orders/{order}/paypal/approve");
    let (_, body) = shop.call("POST", &approve, me, Some(json!({ "orderID": "PP-1" }))).await?;
    assert_eq!(body["success"], false);

    let (_, stored) = shop.call("GET", &format!("/api/v1/orders/{order}"), me, None).await?;
    assert_eq!(stored["data"]["payment"]["status"], "unpaid");
    Ok(())
}

#[tokio::test]
async fn approval_for_unopened_provider_order_is_refused() -> TestResult {
    let shop = shop("COMPLETED");
    let (user, order) = shop.placed_order("PayPal").await?;
    let me = Some((user, Role::User));
    shop.call("POST", &format!("/api/v1/orders/{order}/paypal"), me, None).await?;

    let approve = format!("/api/v1/orders/{order}/paypal/approve");
    let (status, body) = shop.call("POST", &approve, me, Some(json!({ "orderID": "PP-SOMEONE-ELSE" }))).await?;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    let (_, stored) = shop.call("GET", &format!("/api/v1/orders/{order}"), me, None).await?;
    assert_eq!(stored["data"]["payment"]["status"], "unpaid");
    Ok(())
}

#[tokio::test]
async fn payment_routes_follow_the_chosen_method() -> TestResult {
    let shop = shop("COMPLETED");
    let admin = Some((shop.admin, Role::Admin));

    let (user, cash_order) = shop.placed_order("CashOnDelivery").await?;
    let (status, body) = shop.call("POST", &format!("/api/v1/orders/{cash_order}/paypal"), Some((user, Role::User)), None).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Order is to be paid by CashOnDelivery");

    let (_, paypal_order) = shop.placed_order("PayPal").await?;
    let (status, body) = shop.call("POST", &format!("/api/v1/admin/orders/{paypal_order}/pay-cash"), admin, None).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Order is to be paid by PayPal");
    Ok(())
}

#[tokio::test]
async fn catalog_pages_past_the_end_are_empty() -> TestResult {
    let shop = shop("COMPLETED");
    for slug in ["alpha", "bravo", "charlie"] {
        shop.product(slug, "1.00", 1).await?;
    }
    let (_, first) = shop.call("GET", "/api/v1/catalog/products?page=1", None, None).await?;
    assert_eq!(first["data"]["total_pages"], 2);
    assert_eq!(first["data"]["items"][0]["slug"], "charlie");

    let (status, beyond) = shop.call("GET", "/api/v1/catalog/products?page=9", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(beyond["data"]["items"], json!([]));

    let (status, missing) = shop.call("GET", "/api/v1/catalog/products/nope", None, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["message"], "Product not found");
    Ok(())
}

#[tokio::test]
async fn requests_without_identity_are_rejected() -> TestResult {
    let shop = shop("COMPLETED");
    let (status, body) = shop.call("GET", "/api/v1/cart", None, None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn malformed_bodies_are_validation_failures() -> TestResult {
    let shop = shop("COMPLETED");
    let user = shop.shopper().await?;
    let short = json!({
        "full_name": "Jane Doe",
        "street_address": "1 Main St",
        "city": "NY",
        "postal_code": "12345",
        "country": "USA"
    });
    let (status, body) = shop.call("PUT", "/api/v1/profile/address", Some((user, Role::User)), Some(short)).await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "City must be at least 3 characters");

    let (status, body) = shop.call("POST", "/api/v1/cart/items", Some((user, Role::User)), Some(json!({ "qty": 1 }))).await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    Ok(())
}
