//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod user;

pub use product::{Product, ProductError, ProductInput};
pub use order::{Order, OrderError, OrderItem, PaymentResult, PaymentStatus, DeliveryStatus, CAPTURE_COMPLETED};
pub use cart::{Cart, CartError, CartItem};
pub use user::{ProfileUpdate, Role, User};
