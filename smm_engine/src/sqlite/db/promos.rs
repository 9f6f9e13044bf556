use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPromoCode, PromoCode, UsedPromoCode},
    traits::PromoError,
};

pub async fn insert_promo_code(code: NewPromoCode, conn: &mut SqliteConnection) -> Result<PromoCode, PromoError> {
    let result = sqlx::query_as(
        r#"INSERT INTO promo_codes (code, discount, max_activations, promo_type) VALUES ($1, $2, $3, $4)
        RETURNING *"#,
    )
    .bind(&code.code)
    .bind(code.discount)
    .bind(code.max_activations)
    .bind(code.promo_type)
    .fetch_one(conn)
    .await;
    match result {
        Ok(promo) => Ok(promo),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(PromoError::AlreadyExists(code.code)),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_promo_code(code: &str, conn: &mut SqliteConnection) -> Result<Option<PromoCode>, PromoError> {
    let promo = sqlx::query_as("SELECT * FROM promo_codes WHERE code = $1").bind(code).fetch_optional(conn).await?;
    Ok(promo)
}

/// Takes one activation, unless the code is already at its cap. Returns `false` if the code is exhausted.
pub async fn try_increment_activations(code: &str, conn: &mut SqliteConnection) -> Result<bool, PromoError> {
    let result = sqlx::query(
        "UPDATE promo_codes SET activations = activations + 1 WHERE code = $1 AND activations < max_activations",
    )
    .bind(code)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn fetch_used_promo_code(
    user_id: i64,
    code: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<UsedPromoCode>, PromoError> {
    let used = sqlx::query_as("SELECT * FROM used_promo_codes WHERE user_id = $1 AND promo_code = $2")
        .bind(user_id)
        .bind(code)
        .fetch_optional(conn)
        .await?;
    Ok(used)
}

/// Records the redemption. Returns `false` if the account has already redeemed this code.
pub async fn insert_used_promo_code(
    user_id: i64,
    code: &str,
    used: bool,
    conn: &mut SqliteConnection,
) -> Result<bool, PromoError> {
    let result = sqlx::query(
        r#"INSERT INTO used_promo_codes (user_id, promo_code, used) VALUES ($1, $2, $3)
        ON CONFLICT (user_id, promo_code) DO NOTHING"#,
    )
    .bind(user_id)
    .bind(code)
    .bind(used)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn armed_promo_codes(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<UsedPromoCode>, PromoError> {
    let codes = sqlx::query_as(
        r#"SELECT u.user_id, u.promo_code, u.used FROM used_promo_codes u
        JOIN promo_codes p ON p.code = u.promo_code
        WHERE u.user_id = $1 AND u.used = FALSE AND p.promo_type = 'discount'
        ORDER BY u.rowid"#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(codes)
}

/// Marks the oldest armed discount code for the account as used and returns its code and percentage.
pub async fn consume_armed_discount(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<(String, f64)>, sqlx::Error> {
    let armed: Option<(String, f64)> = sqlx::query_as(
        r#"SELECT u.promo_code, p.discount FROM used_promo_codes u
        JOIN promo_codes p ON p.code = u.promo_code
        WHERE u.user_id = $1 AND u.used = FALSE AND p.promo_type = 'discount'
        ORDER BY u.rowid LIMIT 1"#,
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some((code, discount)) = armed else {
        return Ok(None);
    };
    let result = sqlx::query(
        "UPDATE used_promo_codes SET used = TRUE WHERE user_id = $1 AND promo_code = $2 AND used = FALSE",
    )
    .bind(user_id)
    .bind(&code)
    .execute(conn)
    .await?;
    Ok((result.rows_affected() == 1).then_some((code, discount)))
}
