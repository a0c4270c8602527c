//! Service persistence: CRUD plus the row-lock primitive used by
//! settlement.

use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use crate::error::EngineError;
use crate::model::{Service, ServiceState, ServiceType};
use crate::store::transactions::DEFAULT_PAGE_SIZE;

const SERVICE_COLUMNS: &str = "id, type, state, permissions, currency, init_balance, balance";

pub struct ServiceStore {
    pool: PgPool,
}

impl ServiceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a service row as-is.
    pub async fn create(&self, service: &Service) -> Result<(), EngineError> {
        sqlx::query(
            r#"
            INSERT INTO services (id, type, state, permissions, currency, init_balance, balance)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(service.id)
        .bind(service.kind.as_code())
        .bind(service.state.as_code())
        .bind(service.permissions)
        .bind(&service.currency)
        .bind(service.init_balance)
        .bind(service.balance)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Service>, EngineError> {
        let row = sqlx::query(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_service).transpose()
    }

    /// Keyset-paginated listing, ascending by id.
    pub async fn list(
        &self,
        cursor: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<Service>, EngineError> {
        let limit = if limit <= 0 { DEFAULT_PAGE_SIZE } else { limit };

        let rows = match cursor {
            Some(cursor) => {
                sqlx::query(&format!(
                    "SELECT {SERVICE_COLUMNS} FROM services WHERE id > $1 ORDER BY id LIMIT $2"
                ))
                .bind(cursor)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {SERVICE_COLUMNS} FROM services ORDER BY id LIMIT $1"
                ))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(row_to_service).collect()
    }

    /// Update a service's lifecycle state. Errors unless exactly one row
    /// changed.
    pub async fn set_state(&self, id: Uuid, state: ServiceState) -> Result<(), EngineError> {
        let result = sqlx::query("UPDATE services SET state = $1 WHERE id = $2")
            .bind(state.as_code())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() != 1 {
            return Err(EngineError::Store(sqlx::Error::RowNotFound));
        }
        Ok(())
    }
}

/// Lock one service row for the remainder of the enclosing database
/// transaction.
///
/// `FOR NO KEY UPDATE` blocks other lockers of the row without blocking
/// plain reads, so settlements over disjoint services never wait on each
/// other. Callers must acquire locks in ascending id order.
pub(crate) async fn lock_service_for_update(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Service, EngineError> {
    let row = sqlx::query(&format!(
        "SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1 FOR NO KEY UPDATE"
    ))
    .bind(id)
    .fetch_one(conn)
    .await?;

    row_to_service(&row)
}

fn row_to_service(row: &PgRow) -> Result<Service, EngineError> {
    let kind_code: String = row.try_get("type")?;
    let kind = ServiceType::from_code(&kind_code)
        .ok_or_else(|| EngineError::Corrupt(format!("unknown service type {kind_code:?}")))?;

    let state_code: String = row.try_get("state")?;
    let state = ServiceState::from_code(&state_code)
        .ok_or_else(|| EngineError::Corrupt(format!("unknown service state {state_code:?}")))?;

    Ok(Service {
        id: row.try_get("id")?,
        kind,
        state,
        permissions: row.try_get("permissions")?,
        currency: row.try_get("currency")?,
        init_balance: row.try_get("init_balance")?,
        balance: row.try_get("balance")?,
    })
}
