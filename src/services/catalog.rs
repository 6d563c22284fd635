//! Catalog reads and admin product management.

use std::sync::Arc;
use uuid::Uuid;

use crate::config::ShopSettings;
use crate::domain::aggregates::{Product, ProductInput};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::Slug;
use crate::notify::Notifiers;
use crate::pagination::{Page, PageRequest};
use crate::policy::{require_admin, Actor};
use crate::store::{ProductFilter, ProductStore, SharedStore};
use crate::{Result, StorefrontError};

#[derive(Clone)]
pub struct CatalogService {
    store: SharedStore,
    notifiers: Notifiers,
    settings: Arc<ShopSettings>,
}

impl CatalogService {
    pub fn new(store: SharedStore, notifiers: Notifiers, settings: Arc<ShopSettings>) -> Self {
        Self { store, notifiers, settings }
    }

    /// Newest products for the home page.
    pub async fn latest(&self) -> Result<Vec<Product>> { self.latest_n(self.settings.latest_limit).await }

    pub async fn latest_n(&self, n: u32) -> Result<Vec<Product>> { self.store.latest_products(n).await }

    /// One page of the catalog at the configured page size.
    pub async fn paginate(&self, page: u32, filter: ProductFilter) -> Result<Page<Product>> {
        self.paginate_with(PageRequest::new(page, self.settings.page_size)?, filter).await
    }

    pub async fn paginate_with(&self, request: PageRequest, filter: ProductFilter) -> Result<Page<Product>> {
        let filter = filter.normalized();
        let (items, total) = self.store.list_products(&filter, request.offset(), request.limit()).await?;
        Ok(Page::from_window(request, items, total))
    }

    pub async fn by_slug(&self, slug: &str) -> Result<Product> {
        let slug = Slug::new(slug).map_err(|_| StorefrontError::ProductNotFound)?;
        self.store.product_by_slug(slug.as_str()).await?.ok_or(StorefrontError::ProductNotFound)
    }

    pub async fn by_id(&self, id: Uuid) -> Result<Product> {
        self.store.product_by_id(id).await?.ok_or(StorefrontError::ProductNotFound)
    }

    pub async fn create_product(&self, actor: &Actor, input: ProductInput) -> Result<Product> {
        require_admin(actor)?;
        let product = Product::create(input, &self.settings.currency)?;
        self.store.insert_product(&product).await?;
        tracing::info!(product_id = %product.id(), slug = %product.slug(), "product created");
        self.notifiers
            .dispatch(DomainEvent::Product(ProductEvent::Created { product_id: product.id(), slug: product.slug().clone() }))
            .await;
        Ok(product)
    }

    pub async fn update_product(&self, actor: &Actor, id: Uuid, input: ProductInput) -> Result<Product> {
        require_admin(actor)?;
        let mut product = self.by_id(id).await?;
        product.update(input)?;
        self.store.update_product(&product).await?;
        tracing::info!(product_id = %id, "product updated");
        self.notifiers
            .dispatch(DomainEvent::Product(ProductEvent::Updated { product_id: id, slug: product.slug().clone() }))
            .await;
        Ok(product)
    }

    pub async fn delete_product(&self, actor: &Actor, id: Uuid) -> Result<()> {
        require_admin(actor)?;
        if !self.store.delete_product(id).await? {
            return Err(StorefrontError::ProductNotFound);
        }
        tracing::info!(product_id = %id, "product deleted");
        self.notifiers.dispatch(DomainEvent::Product(ProductEvent::Deleted { product_id: id })).await;
        Ok(())
    }
}
