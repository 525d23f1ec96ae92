//! In-process retailer and store doubles shared by the pipeline tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use salewatch_core::{CatalogFile, CatalogId, Product};
use salewatch_pipeline::DatasetSwap;
use salewatch_scraper::{Fetch, ScraperError};
use salewatch_store::{BlobStore, CacheError, MemoryBlobStore, PersistentCache, SALES_KEY};
use serde_json::json;
use tokio::sync::Semaphore;

pub const BASE_URL: &str = "http://shop.test/b/";

#[derive(Debug, Clone)]
enum Canned {
    Body(String),
    Status(u16),
}

/// Serves canned category bodies keyed by URL. Unknown URLs answer 404.
///
/// The response is chosen when the request arrives, so a held request
/// answers with what was served at that moment.
#[derive(Clone, Default)]
pub struct FakeRetailer {
    responses: Arc<Mutex<HashMap<String, Canned>>>,
    calls: Arc<AtomicUsize>,
    gate: Option<Arc<Semaphore>>,
    held_calls: usize,
}

impl FakeRetailer {
    /// Retailer serving the standard two-category catalog.
    pub fn standard() -> Self {
        let retailer = Self::default();
        retailer.serve("mens-pants", &pants());
        retailer.serve("mens-jeans", &jeans());
        retailer.serve("sale-for-men", &sale());
        retailer
    }

    /// Like [`FakeRetailer::standard`], but every fetch waits until
    /// [`FakeRetailer::open_gate`] is called.
    pub fn gated() -> Self {
        Self::holding_first(usize::MAX)
    }

    /// Like [`FakeRetailer::gated`], but only the first `calls` requests
    /// wait; later ones answer straight away.
    pub fn holding_first(calls: usize) -> Self {
        let mut retailer = Self::standard();
        retailer.gate = Some(Arc::new(Semaphore::new(0)));
        retailer.held_calls = calls;
        retailer
    }

    pub fn open_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn serve(&self, category: &str, body: &serde_json::Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(url(category), Canned::Body(body.to_string()));
    }

    pub fn serve_raw(&self, category: &str, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url(category), Canned::Body(body.to_owned()));
    }

    pub fn fail(&self, category: &str, status: u16) {
        self.responses
            .lock()
            .unwrap()
            .insert(url(category), Canned::Status(status));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetch for FakeRetailer {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ScraperError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let canned = self.responses.lock().unwrap().get(url).cloned();
        if let Some(gate) = &self.gate {
            if call < self.held_calls {
                let _permit = gate.acquire().await;
            }
        }
        match canned {
            Some(Canned::Body(body)) => Ok(body.into_bytes()),
            Some(Canned::Status(status)) => Err(ScraperError::UnexpectedStatus {
                status,
                url: url.to_owned(),
            }),
            None => Err(ScraperError::NotFound {
                url: url.to_owned(),
            }),
        }
    }
}

/// Store whose writes always fail; reads behave like an empty store.
#[derive(Clone, Default)]
pub struct ReadOnlyStore;

impl BlobStore for ReadOnlyStore {
    async fn write(&self, key: &str, _bytes: Vec<u8>) -> Result<(), CacheError> {
        Err(CacheError::Io {
            key: key.to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        Err(CacheError::Missing {
            key: key.to_owned(),
        })
    }

    async fn exists(&self, _key: &str) -> Result<bool, CacheError> {
        Ok(false)
    }

    async fn remove(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Memory store whose sale-snapshot writes fail after [`SaleWriteFails::arm`].
#[derive(Clone, Default)]
pub struct SaleWriteFails {
    pub inner: MemoryBlobStore,
    armed: Arc<AtomicBool>,
}

impl SaleWriteFails {
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

impl BlobStore for SaleWriteFails {
    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), CacheError> {
        if key == SALES_KEY && self.armed.load(Ordering::SeqCst) {
            return Err(CacheError::Io {
                key: key.to_owned(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.inner.write(key, bytes).await
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        self.inner.read(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.inner.exists(key).await
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.inner.remove(key).await
    }
}

/// Memory store whose reads wait until [`GatedReads::open`] is called.
#[derive(Clone)]
pub struct GatedReads {
    pub inner: MemoryBlobStore,
    gate: Arc<Semaphore>,
    reads: Arc<AtomicUsize>,
}

impl GatedReads {
    pub fn new(inner: MemoryBlobStore) -> Self {
        Self {
            inner,
            gate: Arc::new(Semaphore::new(0)),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn open(&self) {
        self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl BlobStore for GatedReads {
    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), CacheError> {
        self.inner.write(key, bytes).await
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let _permit = self.gate.acquire().await;
        self.inner.read(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.inner.exists(key).await
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.inner.remove(key).await
    }
}

fn url(category: &str) -> String {
    format!("{BASE_URL}{category}.json")
}

pub fn catalog() -> CatalogFile {
    CatalogFile {
        base_url: BASE_URL.to_owned(),
        sale_category: "sale-for-men".to_owned(),
        categories: vec!["mens-pants".to_owned(), "mens-jeans".to_owned()],
    }
}

pub fn swap_with<S: BlobStore>(retailer: FakeRetailer, store: S) -> DatasetSwap<FakeRetailer, S> {
    DatasetSwap::new(retailer, PersistentCache::new(store), &catalog(), 4)
}

pub fn swap(retailer: FakeRetailer) -> (DatasetSwap<FakeRetailer, MemoryBlobStore>, MemoryBlobStore) {
    let store = MemoryBlobStore::new();
    (swap_with(retailer, store.clone()), store)
}

/// Products 1 (20% off), 2 (full price) and 3 (25% off).
pub fn pants() -> serde_json::Value {
    json!({
        "sub_categories": [
            { "id": 3, "name": "Chinos", "products": [
                { "entity_id": 1, "price": 100, "special_price": 80, "name": "Washed Chino" },
                { "entity_id": 2, "price": 50, "special_price": 0, "name": "Travel Pant" }
            ]},
            { "id": 4, "name": "Corduroys", "products": [
                { "entity_id": 3, "price": 40, "special_price": 30, "name": "Cord" }
            ]}
        ]
    })
}

/// Product 4 (25% off).
pub fn jeans() -> serde_json::Value {
    json!({
        "sub_categories": [
            { "id": 8, "name": "Slim", "products": [
                { "entity_id": 4, "price": 200, "special_price": 150, "name": "Slim Jean" }
            ]}
        ]
    })
}

/// The retailer lists only product 3 on its sale page.
pub fn sale() -> serde_json::Value {
    json!({
        "sub_categories": [
            { "id": 90, "name": "Pants", "products": [
                { "entity_id": 3, "price": 40, "special_price": 30, "name": "Cord" }
            ]}
        ]
    })
}

/// Polls until `check` holds, failing the test after about a second.
pub async fn wait_until(what: &str, check: impl Fn() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

pub fn ids(products: &[Product]) -> Vec<CatalogId> {
    products.iter().map(|p| p.entity_id.clone()).collect()
}

pub fn numbers(ids: &[i64]) -> Vec<CatalogId> {
    ids.iter().copied().map(CatalogId::Number).collect()
}
