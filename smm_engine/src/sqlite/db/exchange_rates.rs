use sqlx::SqliteConnection;

use crate::{
    db_types::{Currency, ExchangeRate},
    traits::ExchangeRateError,
};

pub async fn fetch_last_rate(
    currency: Currency,
    conn: &mut SqliteConnection,
) -> Result<ExchangeRate, ExchangeRateError> {
    let rate = sqlx::query_as(
        r#"SELECT base_currency AS currency, rate, updated_at FROM exchange_rates
        WHERE base_currency = $1 ORDER BY id DESC LIMIT 1"#,
    )
    .bind(currency)
    .fetch_optional(conn)
    .await?
    .ok_or(ExchangeRateError::RateDoesNotExist(currency))?;
    Ok(rate)
}

pub async fn set_exchange_rate(rate: &ExchangeRate, conn: &mut SqliteConnection) -> Result<(), ExchangeRateError> {
    sqlx::query("INSERT INTO exchange_rates (base_currency, rate, updated_at) VALUES ($1, $2, $3)")
        .bind(rate.currency)
        .bind(rate.rate)
        .bind(rate.updated_at)
        .execute(conn)
        .await?;
    Ok(())
}
