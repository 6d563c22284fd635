use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::AppState;
use crate::action::ActionResult;
use crate::domain::aggregates::{Order, Product, ProductInput, ProfileUpdate, User};
use crate::domain::value_objects::{PaymentMethod, ShippingAddress};
use crate::pagination::Page;
use crate::payments::ProviderOrder;
use crate::policy::Actor;
use crate::services::{ApprovalPayload, CartView, PlacedOrder};
use crate::store::ProductFilter;
use crate::{ErrorKind, Result, StorefrontError};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub query: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[serde(default = "one")]
    pub qty: u32,
}

fn one() -> u32 { 1 }

#[derive(Debug, Deserialize)]
pub struct PaymentMethodRequest {
    pub payment_method: PaymentMethod,
}

fn parse_id(raw: &str, missing: StorefrontError) -> Result<Uuid> { Uuid::parse_str(raw).map_err(|_| missing) }

fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload.map(|Json(value)| value).map_err(|rejection| StorefrontError::Validation(rejection.body_text()))
}

fn params(query: std::result::Result<Query<ListParams>, QueryRejection>) -> Result<ListParams> {
    query.map(|Query(params)| params).map_err(|rejection| StorefrontError::Validation(rejection.body_text()))
}

fn done(result: Result<()>, message: &str) -> ActionResult<()> {
    match result {
        Ok(()) => ActionResult::done(message),
        Err(e) => ActionResult::failed(&e),
    }
}

pub(super) async fn not_found() -> ActionResult<()> {
    ActionResult::Err { kind: ErrorKind::NotFound, message: "Route not found".into() }
}

// Catalog

pub(super) async fn latest_products(State(state): State<AppState>) -> ActionResult<Vec<Product>> {
    ActionResult::from_result(state.services.catalog.latest().await, "Latest products")
}

pub(super) async fn list_products(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListParams>, QueryRejection>,
) -> ActionResult<Page<Product>> {
    let result = async {
        let params = params(query)?;
        let filter = ProductFilter { query: params.query, category: params.category };
        state.services.catalog.paginate(params.page.unwrap_or(1), filter).await
    }
    .await;
    ActionResult::from_result(result, "Products")
}

pub(super) async fn product_by_slug(State(state): State<AppState>, Path(slug): Path<String>) -> ActionResult<Product> {
    ActionResult::from_result(state.services.catalog.by_slug(&slug).await, "Product")
}

pub(super) async fn create_product(
    State(state): State<AppState>,
    actor: Actor,
    payload: std::result::Result<Json<ProductInput>, JsonRejection>,
) -> ActionResult<Product> {
    let result = async { state.services.catalog.create_product(&actor, body(payload)?).await }.await;
    ActionResult::from_result(result, "Product created successfully")
}

pub(super) async fn update_product(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    payload: std::result::Result<Json<ProductInput>, JsonRejection>,
) -> ActionResult<Product> {
    let result = async {
        let id = parse_id(&id, StorefrontError::ProductNotFound)?;
        state.services.catalog.update_product(&actor, id, body(payload)?).await
    }
    .await;
    ActionResult::from_result(result, "Product updated successfully")
}

pub(super) async fn delete_product(State(state): State<AppState>, actor: Actor, Path(id): Path<String>) -> ActionResult<()> {
    let result = async {
        let id = parse_id(&id, StorefrontError::ProductNotFound)?;
        state.services.catalog.delete_product(&actor, id).await
    }
    .await;
    done(result, "Product deleted successfully")
}

// Cart

pub(super) async fn get_cart(State(state): State<AppState>, actor: Actor) -> ActionResult<CartView> {
    ActionResult::from_result(state.services.cart.cart(&actor).await, "Cart")
}

pub(super) async fn add_to_cart(
    State(state): State<AppState>,
    actor: Actor,
    payload: std::result::Result<Json<AddItemRequest>, JsonRejection>,
) -> ActionResult<CartView> {
    let result = async {
        let request = body(payload)?;
        let view = state.services.cart.add_item(&actor, request.product_id, request.qty).await?;
        let name = view.cart.items().iter().find(|i| i.product_id == request.product_id).map(|i| i.name.clone());
        Ok::<_, StorefrontError>((view, name.unwrap_or_default()))
    }
    .await;
    match result {
        Ok((view, name)) => ActionResult::ok(format!("{name} added to cart"), view),
        Err(e) => ActionResult::failed(&e),
    }
}

pub(super) async fn remove_from_cart(
    State(state): State<AppState>,
    actor: Actor,
    Path(product_id): Path<String>,
) -> ActionResult<CartView> {
    let result = async {
        let product_id = parse_id(&product_id, StorefrontError::CartItemNotFound)?;
        state.services.cart.remove_item(&actor, product_id).await
    }
    .await;
    ActionResult::from_result(result, "Item removed from cart")
}

// Orders

pub(super) async fn place_order(State(state): State<AppState>, actor: Actor) -> ActionResult<PlacedOrder> {
    ActionResult::from_result(state.services.checkout.place_order(&actor).await, "Order created")
}

pub(super) async fn my_orders(
    State(state): State<AppState>,
    actor: Actor,
    query: std::result::Result<Query<ListParams>, QueryRejection>,
) -> ActionResult<Page<Order>> {
    let result = async {
        let page = params(query)?.page.unwrap_or(1);
        state.services.orders.my_orders(&actor, page).await
    }
    .await;
    ActionResult::from_result(result, "Orders")
}

pub(super) async fn get_order(State(state): State<AppState>, actor: Actor, Path(id): Path<String>) -> ActionResult<Order> {
    let result = async {
        let id = parse_id(&id, StorefrontError::OrderNotFound)?;
        state.services.orders.order(id, &actor).await
    }
    .await;
    ActionResult::from_result(result, "Order")
}

pub(super) async fn create_paypal_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> ActionResult<ProviderOrder> {
    let result = async {
        let id = parse_id(&id, StorefrontError::OrderNotFound)?;
        state.services.payments.create_provider_order(id, &actor).await
    }
    .await;
    ActionResult::from_result(result, "PayPal order created successfully")
}

pub(super) async fn approve_paypal_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    payload: std::result::Result<Json<ApprovalPayload>, JsonRejection>,
) -> ActionResult<Order> {
    let result = async {
        let id = parse_id(&id, StorefrontError::OrderNotFound)?;
        state.services.payments.approve_provider_order(id, &actor, body(payload)?).await
    }
    .await;
    ActionResult::from_result(result, "Your order has been paid")
}

// Admin orders

pub(super) async fn list_orders(
    State(state): State<AppState>,
    actor: Actor,
    query: std::result::Result<Query<ListParams>, QueryRejection>,
) -> ActionResult<Page<Order>> {
    let result = async {
        let page = params(query)?.page.unwrap_or(1);
        state.services.orders.list_orders_page(&actor, page).await
    }
    .await;
    ActionResult::from_result(result, "Orders")
}

pub(super) async fn confirm_cash_payment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> ActionResult<Order> {
    let result = async {
        let id = parse_id(&id, StorefrontError::OrderNotFound)?;
        state.services.payments.confirm_cash_payment(id, &actor).await
    }
    .await;
    ActionResult::from_result(result, "Order marked as paid")
}

pub(super) async fn mark_delivered(State(state): State<AppState>, actor: Actor, Path(id): Path<String>) -> ActionResult<Order> {
    let result = async {
        let id = parse_id(&id, StorefrontError::OrderNotFound)?;
        state.services.fulfillment.mark_delivered(id, &actor).await
    }
    .await;
    ActionResult::from_result(result, "Order has been marked delivered")
}

pub(super) async fn delete_order(State(state): State<AppState>, actor: Actor, Path(id): Path<String>) -> ActionResult<()> {
    let result = async {
        let id = parse_id(&id, StorefrontError::OrderNotFound)?;
        state.services.orders.delete_order(id, &actor).await
    }
    .await;
    done(result, "Order deleted successfully")
}

// Profile

pub(super) async fn get_profile(State(state): State<AppState>, actor: Actor) -> ActionResult<User> {
    ActionResult::from_result(state.services.profile.profile(&actor).await, "Profile")
}

pub(super) async fn update_profile(
    State(state): State<AppState>,
    actor: Actor,
    payload: std::result::Result<Json<ProfileUpdate>, JsonRejection>,
) -> ActionResult<User> {
    let result = async { state.services.profile.update_profile(&actor, body(payload)?).await }.await;
    ActionResult::from_result(result, "User updated successfully")
}

pub(super) async fn update_address(
    State(state): State<AppState>,
    actor: Actor,
    payload: std::result::Result<Json<ShippingAddress>, JsonRejection>,
) -> ActionResult<User> {
    let result = async { state.services.profile.update_address(&actor, body(payload)?).await }.await;
    ActionResult::from_result(result, "User updated successfully")
}

pub(super) async fn update_payment_method(
    State(state): State<AppState>,
    actor: Actor,
    payload: std::result::Result<Json<PaymentMethodRequest>, JsonRejection>,
) -> ActionResult<User> {
    let result = async {
        let request = body(payload)?;
        state.services.profile.update_payment_method(&actor, request.payment_method).await
    }
    .await;
    ActionResult::from_result(result, "User updated successfully")
}
