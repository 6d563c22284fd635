//! Fixtures shared by unit tests.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::aggregates::product::tests::input;
use crate::domain::aggregates::{Cart, CartItem, Order, Product};
use crate::domain::pricing::PricingPolicy;
use crate::domain::value_objects::{PaymentMethod, ShippingAddress};
use crate::store::{CartStore, OrderStore, SharedStore};

pub(crate) fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Jane Doe".into(),
        street_address: "1 Main St".into(),
        city: "Springfield".into(),
        postal_code: "12345".into(),
        country: "USA".into(),
    }
}

pub(crate) fn product(slug: &str, price: Decimal, stock: u32) -> Product {
    Product::create(input(slug, price, stock), "USD").unwrap()
}

/// Two lines: 10.00 x2 and 5.00 x1.
pub(crate) fn user_cart(user_id: Uuid) -> Cart {
    let mut cart = Cart::for_user(user_id, "USD");
    cart.add_item(CartItem::snapshot(&product("widget", Decimal::new(1000, 2), 10), 2)).unwrap();
    cart.add_item(CartItem::snapshot(&product("gadget", Decimal::new(500, 2), 10), 1)).unwrap();
    cart
}

pub(crate) fn ten_percent_flat_five() -> PricingPolicy {
    PricingPolicy::flat(Decimal::new(10, 2), Decimal::new(500, 2))
}

pub(crate) fn placed_order(cart: &Cart) -> Order {
    placed_order_with(cart, PaymentMethod::PayPal)
}

pub(crate) fn placed_order_with(cart: &Cart, method: PaymentMethod) -> Order {
    Order::place(cart.user_id(), cart, Some(&address()), Some(method), &ten_percent_flat_five()).unwrap()
}

/// Saves `cart` and turns it into a stored order.
pub(crate) async fn checked_out(store: &SharedStore, cart: &Cart, method: PaymentMethod) -> Order {
    store.save_cart(cart).await.unwrap();
    let order = placed_order_with(cart, method);
    store.create_order_from_cart(&order, cart).await.unwrap();
    order
}
