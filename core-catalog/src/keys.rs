/// Persisted key names for one storage namespace.
///
/// Every record lives under `<namespace>_<suffix>` so several catalogs can
/// share one key-value store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub initialized: String,
    pub user: String,
    pub albums: String,
    pub purchases: String,
}

impl StorageKeys {
    pub fn new(namespace: &str) -> Self {
        Self {
            initialized: format!("{}_initialized", namespace),
            user: format!("{}_user", namespace),
            albums: format!("{}_albums", namespace),
            purchases: format!("{}_purchases", namespace),
        }
    }
}
