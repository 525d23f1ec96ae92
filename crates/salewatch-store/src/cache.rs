use salewatch_core::Product;

use crate::blob::BlobStore;
use crate::CacheError;

/// Snapshot key for the full aggregated product list.
pub const PRODUCTS_KEY: &str = "data.json";
/// Snapshot key for the retailer's own sale-category list.
pub const SALES_KEY: &str = "sales.json";

/// The two collections a refresh cycle persists.
#[derive(Debug, Clone, Default)]
pub struct CachedCollections {
    pub products: Vec<Product>,
    pub sale_category: Vec<Product>,
}

/// JSON snapshots of product collections over a [`BlobStore`].
///
/// Snapshots are plain JSON arrays of product records with no version
/// header. Every failure is returned to the caller; nothing is retried.
#[derive(Debug, Clone)]
pub struct PersistentCache<S> {
    store: S,
}

impl<S: BlobStore> PersistentCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Serializes `collection` and stores it under `name`, replacing any
    /// previous snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Serialize`] if encoding fails, or whatever the
    /// store returns for the write.
    pub async fn save(&self, name: &str, collection: &[Product]) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(collection).map_err(|source| CacheError::Serialize {
            key: name.to_owned(),
            source,
        })?;
        self.store.write(name, bytes).await?;
        tracing::debug!(name, count = collection.len(), "collection saved");
        Ok(())
    }

    /// Loads the collection stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Missing`] if nothing was saved under `name`,
    /// [`CacheError::Deserialize`] if the snapshot is not a product array.
    pub async fn load(&self, name: &str) -> Result<Vec<Product>, CacheError> {
        let bytes = self.store.read(name).await?;
        serde_json::from_slice(&bytes).map_err(|source| CacheError::Deserialize {
            key: name.to_owned(),
            source,
        })
    }

    /// # Errors
    ///
    /// Returns whatever the store returns for the existence check.
    pub async fn exists(&self, name: &str) -> Result<bool, CacheError> {
        self.store.exists(name).await
    }

    /// Persists both collections of a cycle: products first, then the sale
    /// category.
    ///
    /// If the sale category cannot be written, the products snapshot is put
    /// back the way it was, so the pair on disk always comes from one cycle.
    ///
    /// # Errors
    ///
    /// Returns the first failing save, or the error from reading the current
    /// products snapshot before it is replaced.
    pub async fn save_collections(
        &self,
        products: &[Product],
        sale_category: &[Product],
    ) -> Result<(), CacheError> {
        let previous = match self.store.read(PRODUCTS_KEY).await {
            Ok(bytes) => Some(bytes),
            Err(CacheError::Missing { .. }) => None,
            Err(e) => return Err(e),
        };

        self.save(PRODUCTS_KEY, products).await?;
        if let Err(e) = self.save(SALES_KEY, sale_category).await {
            self.restore_products(previous).await;
            return Err(e);
        }
        Ok(())
    }

    async fn restore_products(&self, previous: Option<Vec<u8>>) {
        let restored = match previous {
            Some(bytes) => self.store.write(PRODUCTS_KEY, bytes).await,
            None => self.store.remove(PRODUCTS_KEY).await,
        };
        match restored {
            Ok(()) => tracing::warn!("sale snapshot write failed, products snapshot restored"),
            Err(e) => tracing::error!(
                error = %e,
                "failed to restore products snapshot, cached pair is inconsistent"
            ),
        }
    }

    /// Whether both snapshots are present.
    ///
    /// # Errors
    ///
    /// Returns whatever the store returns for either existence check.
    pub async fn has_collections(&self) -> Result<bool, CacheError> {
        Ok(self.exists(PRODUCTS_KEY).await? && self.exists(SALES_KEY).await?)
    }

    /// Loads both snapshots, or `None` when either one has never been saved.
    ///
    /// # Errors
    ///
    /// Returns any error other than a missing snapshot.
    pub async fn load_collections(&self) -> Result<Option<CachedCollections>, CacheError> {
        if !self.has_collections().await? {
            return Ok(None);
        }
        let products = self.load(PRODUCTS_KEY).await?;
        let sale_category = self.load(SALES_KEY).await?;
        tracing::info!(
            products = products.len(),
            sale_category = sale_category.len(),
            "loaded cached collections"
        );
        Ok(Some(CachedCollections {
            products,
            sale_category,
        }))
    }
}
