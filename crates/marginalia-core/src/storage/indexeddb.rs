//! IndexedDB storage for WebAssembly.
//!
//! Values are stored as plain JS strings keyed by page key in a single
//! object store.

use super::{BoxFuture, Storage, StorageError, StorageResult};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{IdbDatabase, IdbObjectStore, IdbRequest, IdbTransactionMode};

const DB_NAME: &str = "marginalia";
const DB_VERSION: u32 = 1;
const STORE_NAME: &str = "ink";

/// IndexedDB-backed key-value store.
///
/// Not Send/Sync: IndexedDB handles live on the page's single thread.
pub struct IndexedDbStorage {
    /// Connection opened on first use.
    db: Rc<RefCell<Option<IdbDatabase>>>,
}

impl IndexedDbStorage {
    pub fn new() -> Self {
        Self {
            db: Rc::new(RefCell::new(None)),
        }
    }

    async fn database(&self) -> StorageResult<IdbDatabase> {
        if let Some(db) = self.db.borrow().as_ref() {
            return Ok(db.clone());
        }

        let factory = web_sys::window()
            .ok_or_else(|| StorageError::Other("No window object".to_string()))?
            .indexed_db()
            .map_err(js_error("indexedDB"))?
            .ok_or_else(|| StorageError::Other("IndexedDB not available".to_string()))?;
        let open_request = factory
            .open_with_u32(DB_NAME, DB_VERSION)
            .map_err(js_error("open"))?;

        let onupgrade = Closure::once(move |event: web_sys::IdbVersionChangeEvent| {
            let Some(db) = event
                .target()
                .and_then(|t| t.dyn_into::<IdbRequest>().ok())
                .and_then(|r| r.result().ok())
                .and_then(|r| r.dyn_into::<IdbDatabase>().ok())
            else {
                log::error!("IndexedDB upgrade fired without a database");
                return;
            };
            if db.object_store_names().contains(STORE_NAME) {
                return;
            }
            if let Err(e) = db.create_object_store(STORE_NAME) {
                log::error!("Failed to create the {} store: {:?}", STORE_NAME, e);
            }
        });
        open_request.set_onupgradeneeded(Some(onupgrade.as_ref().unchecked_ref()));
        onupgrade.forget();

        let db = await_idb_request::<IdbDatabase>(&open_request).await?;
        *self.db.borrow_mut() = Some(db.clone());
        Ok(db)
    }

    /// Issue one request against the ink store and await its result.
    async fn request<T: JsCast>(
        &self,
        mode: IdbTransactionMode,
        op: &'static str,
        issue: impl FnOnce(&IdbObjectStore) -> Result<IdbRequest, JsValue>,
    ) -> StorageResult<T> {
        let db = self.database().await?;
        let store = db
            .transaction_with_str_and_mode(STORE_NAME, mode)
            .map_err(js_error("transaction"))?
            .object_store(STORE_NAME)
            .map_err(js_error("object store"))?;
        let request = issue(&store).map_err(js_error(op))?;
        await_idb_request::<T>(&request).await
    }
}

impl Default for IndexedDbStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn js_error(op: &'static str) -> impl Fn(JsValue) -> StorageError {
    move |e| StorageError::Other(format!("IndexedDB {op} failed: {e:?}"))
}

impl Storage for IndexedDbStorage {
    fn get(&self, key: &str) -> BoxFuture<'_, StorageResult<Option<String>>> {
        let key = JsValue::from_str(key);
        Box::pin(async move {
            let value: JsValue = self
                .request(IdbTransactionMode::Readonly, "get", |store| store.get(&key))
                .await?;
            if value.is_undefined() || value.is_null() {
                return Ok(None);
            }
            value
                .as_string()
                .map(Some)
                .ok_or_else(|| StorageError::Serialization("Stored ink is not a string".to_string()))
        })
    }

    fn set(&self, key: &str, value: String) -> BoxFuture<'_, StorageResult<()>> {
        let key = JsValue::from_str(key);
        let value = JsValue::from_str(&value);
        Box::pin(async move {
            self.request::<JsValue>(IdbTransactionMode::Readwrite, "put", |store| {
                store.put_with_key(&value, &key)
            })
            .await
            .map(drop)
        })
    }

    fn remove(&self, key: &str) -> BoxFuture<'_, StorageResult<()>> {
        let key = JsValue::from_str(key);
        Box::pin(async move {
            self.request::<JsValue>(IdbTransactionMode::Readwrite, "delete", |store| store.delete(&key))
                .await
                .map(drop)
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let keys: js_sys::Array = self
                .request(IdbTransactionMode::Readonly, "getAllKeys", |store| store.get_all_keys())
                .await?;
            Ok(keys.iter().filter_map(|k| k.as_string()).collect())
        })
    }

    fn exists(&self, key: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let key = JsValue::from_str(key);
        Box::pin(async move {
            let count: JsValue = self
                .request(IdbTransactionMode::Readonly, "count", |store| store.count_with_key(&key))
                .await?;
            Ok(count.as_f64().is_some_and(|n| n > 0.0))
        })
    }
}

/// Await an IndexedDB request through a Promise.
async fn await_idb_request<T: JsCast>(request: &IdbRequest) -> StorageResult<T> {
    use wasm_bindgen_futures::JsFuture;

    let promise = js_sys::Promise::new(&mut |resolve, reject| {
        let onsuccess = Closure::once(move |event: web_sys::Event| {
            let result = event
                .target()
                .and_then(|t| t.dyn_into::<IdbRequest>().ok())
                .and_then(|r| r.result().ok())
                .unwrap_or(JsValue::UNDEFINED);
            let _ = resolve.call1(&JsValue::NULL, &result);
        });
        let onerror = Closure::once(move |_event: web_sys::Event| {
            let _ = reject.call1(&JsValue::NULL, &JsValue::from_str("request error"));
        });

        request.set_onsuccess(Some(onsuccess.as_ref().unchecked_ref()));
        request.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onsuccess.forget();
        onerror.forget();
    });

    JsFuture::from(promise)
        .await
        .map_err(js_error("request"))?
        .dyn_into::<T>()
        .map_err(|_| StorageError::Serialization("Unexpected IndexedDB result type".to_string()))
}
