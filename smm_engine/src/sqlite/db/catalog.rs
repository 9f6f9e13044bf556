use sqlx::SqliteConnection;

use crate::{db_types::Service, traits::CatalogError};

pub async fn fetch_service(service_id: &str, conn: &mut SqliteConnection) -> Result<Option<Service>, CatalogError> {
    let service =
        sqlx::query_as("SELECT * FROM services WHERE service_id = $1").bind(service_id).fetch_optional(conn).await?;
    Ok(service)
}

pub async fn upsert_service(service: &Service, conn: &mut SqliteConnection) -> Result<(), CatalogError> {
    sqlx::query(
        r#"INSERT INTO services (service_id, name, category_id, service_type, rate, min_quantity, max_quantity)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (service_id) DO UPDATE SET
            name = excluded.name,
            category_id = excluded.category_id,
            service_type = excluded.service_type,
            rate = excluded.rate,
            min_quantity = excluded.min_quantity,
            max_quantity = excluded.max_quantity"#,
    )
    .bind(&service.service_id)
    .bind(&service.name)
    .bind(&service.category_id)
    .bind(&service.service_type)
    .bind(service.rate)
    .bind(service.min_quantity)
    .bind(service.max_quantity)
    .execute(conn)
    .await?;
    Ok(())
}
