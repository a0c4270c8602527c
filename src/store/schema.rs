//! Embedded table definitions.
//!
//! Schema *migration* is out of scope; `ensure_schema` only bootstraps a
//! blank database (integration tests, local development).

use sqlx::PgPool;

const CREATE_SERVICES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS services (
    id              uuid PRIMARY KEY,
    type            text NOT NULL,
    state           text NOT NULL,
    permissions     bigint NOT NULL,
    currency        text NOT NULL,
    init_balance    numeric NOT NULL,
    balance         numeric NOT NULL
)
"#;

const CREATE_TRANSACTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transactions (
    id              uuid PRIMARY KEY,
    state           text NOT NULL,
    time            timestamptz NOT NULL,
    currency        text NOT NULL,
    amount          numeric NOT NULL,
    source          uuid NOT NULL REFERENCES services (id),
    destination     uuid NOT NULL REFERENCES services (id)
)
"#;

/// Create the `services` and `transactions` tables if they do not exist.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_SERVICES_TABLE).execute(pool).await?;
    sqlx::query(CREATE_TRANSACTIONS_TABLE).execute(pool).await?;
    tracing::debug!("schema ensured");
    Ok(())
}
