use std::sync::Arc;
use ian_core::{ArticleStore, Error, Result};

pub mod backends;

pub use backends::*;

pub const DEFAULT_DATABASE_PATH: &str = "ian.db";

/// Opens the store selected on the command line (`memory` or `sqlite`).
pub async fn create_storage(kind: &str, database_url: Option<&str>) -> Result<Arc<dyn ArticleStore>> {
    match kind {
        "memory" => {
            if database_url.is_some() {
                tracing::warn!("Ignoring database path for in-memory storage");
            }
            Ok(Arc::new(MemoryStorage::with_default_categories()))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = std::path::PathBuf::from(database_url.unwrap_or(DEFAULT_DATABASE_PATH));
            Ok(Arc::new(SQLiteStorage::new_with_path(&path).await?))
        }
        #[cfg(not(feature = "sqlite"))]
        "sqlite" => Err(Error::Config(
            "sqlite storage requires building with the 'sqlite' feature".to_string(),
        )),
        other => Err(Error::Config(format!("unknown storage backend '{}'", other))),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::create_storage;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_storage() {
        let storage = create_storage("memory", None).await.unwrap();
        assert!(storage.find_category("cultura").await.unwrap().is_some());

        assert!(matches!(create_storage("qdrant", None).await, Err(Error::Config(_))));
    }
}
