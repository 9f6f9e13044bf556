use thiserror::Error;

use crate::db_types::Service;

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Service {0} does not exist")]
    ServiceNotFound(String),
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        CatalogError::DatabaseError(e.to_string())
    }
}

/// Read access to the mirrored service catalog. Mirroring itself happens elsewhere and writes through `upsert_service`.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn fetch_service(&self, service_id: &str) -> Result<Option<Service>, CatalogError>;
    async fn upsert_service(&self, service: &Service) -> Result<(), CatalogError>;
}
