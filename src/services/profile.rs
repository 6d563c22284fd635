//! User profile: name, shipping address and preferred payment method.

use validator::Validate;

use crate::domain::aggregates::{ProfileUpdate, User};
use crate::domain::value_objects::{PaymentMethod, ShippingAddress};
use crate::policy::Actor;
use crate::store::{SharedStore, UserStore};
use crate::{Result, StorefrontError};

#[derive(Clone)]
pub struct ProfileService {
    store: SharedStore,
}

impl ProfileService {
    pub fn new(store: SharedStore) -> Self { Self { store } }

    pub async fn profile(&self, actor: &Actor) -> Result<User> {
        self.store.user_by_id(actor.user_id).await?.ok_or(StorefrontError::UserNotFound)
    }

    pub async fn update_profile(&self, actor: &Actor, update: ProfileUpdate) -> Result<User> {
        update.validate()?;
        self.modify(actor, |user| user.rename(update.name.trim())).await
    }

    pub async fn update_address(&self, actor: &Actor, address: ShippingAddress) -> Result<User> {
        address.validate()?;
        self.modify(actor, |user| user.set_address(address)).await
    }

    pub async fn update_payment_method(&self, actor: &Actor, method: PaymentMethod) -> Result<User> {
        self.modify(actor, |user| user.set_payment_method(method)).await
    }

    async fn modify(&self, actor: &Actor, change: impl FnOnce(&mut User) + Send) -> Result<User> {
        let mut user = self.profile(actor).await?;
        change(&mut user);
        self.store.update_user(&user).await?;
        tracing::debug!(user_id = %actor.user_id, "profile updated");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::Role;
    use crate::store::MemoryStore;
    use crate::test_support::address;
    use std::sync::Arc;

    async fn setup() -> (ProfileService, Actor) {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let user = User::new("Jane Doe", "jane@example.com", Role::User);
        store.insert_user(&user).await.unwrap();
        (ProfileService::new(store), Actor::user(user.id()))
    }

    #[tokio::test]
    async fn address_and_method_are_saved() {
        let (service, actor) = setup().await;
        service.update_address(&actor, address()).await.unwrap();
        service.update_payment_method(&actor, PaymentMethod::CashOnDelivery).await.unwrap();

        let user = service.profile(&actor).await.unwrap();
        assert_eq!(user.address(), Some(&address()));
        assert_eq!(user.payment_method(), Some(PaymentMethod::CashOnDelivery));
    }

    #[tokio::test]
    async fn invalid_input_is_rejected() {
        let (service, actor) = setup().await;
        let err = service.update_profile(&actor, ProfileUpdate { name: "Jo".into() }).await.unwrap_err();
        assert_eq!(err.to_string(), "Name must be at least 3 characters");

        let short = ShippingAddress { city: "NY".into(), ..address() };
        assert!(matches!(service.update_address(&actor, short).await, Err(StorefrontError::Validation(_))));
        assert!(service.profile(&actor).await.unwrap().address().is_none());
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let (service, _) = setup().await;
        let err = service.update_payment_method(&Actor::user(uuid::Uuid::now_v7()), PaymentMethod::PayPal).await;
        assert!(matches!(err, Err(StorefrontError::UserNotFound)));
    }
}
