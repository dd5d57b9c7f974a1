use crate::domain::ports::KeyValueStore;
use crate::error::{CheckoutError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family holding cart and history documents.
pub const CF_STOREFRONT: &str = "storefront";

/// A persistent key-value store backed by RocksDB.
///
/// Values are stored as UTF-8 JSON documents under their key. `Clone`
/// shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbKeyValueStore {
    db: Arc<DB>,
}

impl RocksDbKeyValueStore {
    /// Opens or creates a RocksDB instance at `path`, creating the
    /// storefront column family if needed.
    ///
    /// # Arguments
    ///
    /// * `path` - The directory holding the database files.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Storage`] if RocksDB cannot open the path,
    /// for example when another process holds its lock.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf = ColumnFamilyDescriptor::new(CF_STOREFRONT, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn missing_cf() -> CheckoutError {
        CheckoutError::Io(std::io::Error::other(
            "Storefront column family not found",
        ))
    }
}

#[async_trait]
impl KeyValueStore for RocksDbKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let cf = self
            .db
            .cf_handle(CF_STOREFRONT)
            .ok_or_else(Self::missing_cf)?;

        match self.db.get_cf(&cf, key.as_bytes())? {
            Some(bytes) => String::from_utf8(bytes).map(Some).map_err(|e| {
                CheckoutError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Stored value for {key} is not UTF-8: {e}"),
                ))
            }),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let cf = self
            .db
            .cf_handle(CF_STOREFRONT)
            .ok_or_else(Self::missing_cf)?;
        self.db.put_cf(&cf, key.as_bytes(), value.as_bytes())?;
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<()> {
        let cf = self
            .db
            .cf_handle(CF_STOREFRONT)
            .ok_or_else(Self::missing_cf)?;
        self.db.delete_cf(&cf, key.as_bytes())?;
        Ok(())
    }
}
