//! Client management service
//!
//! CRUD over clients plus the debt views the sales desk works from: the
//! per-client outstanding/overdue balance summary and a client's active
//! orders.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Client, ClientDebtSummary, ClientOrder};

use super::order::{OrderRow, ORDER_COLUMNS};

/// Client service
#[derive(Clone)]
pub struct ClientService {
    db: PgPool,
}

/// Input for creating a client
#[derive(Debug, Deserialize)]
pub struct CreateClientInput {
    pub name: String,
    pub phone: Option<String>,
}

/// Input for updating a client
#[derive(Debug, Deserialize)]
pub struct UpdateClientInput {
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// A client's open orders (outstanding balance or awaiting confirmation)
#[derive(Debug, Serialize)]
pub struct ClientActiveOrders {
    pub fullname: String,
    pub orders: Vec<ClientOrder>,
}

/// Row for client queries
#[derive(Debug, FromRow)]
struct ClientRow {
    id: Uuid,
    name: String,
    phone: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Client {
            id: row.id,
            name: row.name,
            phone: row.phone,
            created_at: row.created_at,
        }
    }
}

/// Row for the debt summary query
#[derive(Debug, FromRow)]
struct DebtSummaryRow {
    id: Uuid,
    name: String,
    phone: Option<String>,
    total_debt: Decimal,
    overdue_debt: Decimal,
    unconfirmed_count: i64,
}

impl ClientService {
    /// Create a new ClientService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List clients with their debt summaries, optionally filtered by a
    /// case-insensitive name search
    pub async fn list_with_debt(&self, search: Option<&str>) -> AppResult<Vec<ClientDebtSummary>> {
        let rows = sqlx::query_as::<_, DebtSummaryRow>(
            r#"
            SELECT c.id, c.name, c.phone,
                   COALESCE(SUM(o.balance), 0) AS total_debt,
                   COALESCE(SUM(o.balance) FILTER (WHERE o.payday IS NOT NULL AND o.payday < NOW()), 0) AS overdue_debt,
                   COUNT(*) FILTER (WHERE o.confirmed = FALSE) AS unconfirmed_count
            FROM clients c
            LEFT JOIN client_orders o ON o.client_id = c.id
            WHERE $1::TEXT IS NULL OR c.name ILIKE '%' || $1 || '%'
            GROUP BY c.id, c.name, c.phone
            ORDER BY c.name
            "#,
        )
        .bind(search)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ClientDebtSummary {
                id: row.id,
                name: row.name,
                phone: row.phone,
                total_debt: row.total_debt,
                overdue_debt: row.overdue_debt,
                unconfirmed_count: row.unconfirmed_count,
            })
            .collect())
    }

    /// A client's active orders: anything unpaid or not yet confirmed
    pub async fn active_orders(&self, client_id: Uuid) -> AppResult<ClientActiveOrders> {
        let name = sqlx::query_scalar::<_, String>("SELECT name FROM clients WHERE id = $1")
            .bind(client_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Client".to_string()))?;

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {}
            FROM client_orders
            WHERE client_id = $1 AND (balance > 0 OR confirmed = FALSE)
            ORDER BY order_date DESC
            "#,
            ORDER_COLUMNS
        ))
        .bind(client_id)
        .fetch_all(&self.db)
        .await?;

        let orders = rows
            .into_iter()
            .map(OrderRow::into_model)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(ClientActiveOrders {
            fullname: name,
            orders,
        })
    }

    /// Get a client by ID
    pub async fn get(&self, client_id: Uuid) -> AppResult<Client> {
        let row = sqlx::query_as::<_, ClientRow>(
            "SELECT id, name, phone, created_at FROM clients WHERE id = $1",
        )
        .bind(client_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Client".to_string()))?;

        Ok(row.into())
    }

    /// Create a new client
    pub async fn create(&self, input: CreateClientInput) -> AppResult<Client> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Name is required".to_string(),
            });
        }

        let row = sqlx::query_as::<_, ClientRow>(
            r#"
            INSERT INTO clients (name, phone)
            VALUES ($1, $2)
            RETURNING id, name, phone, created_at
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.phone)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Update a client by ID
    pub async fn update(&self, client_id: Uuid, input: UpdateClientInput) -> AppResult<Client> {
        let existing = self.get(client_id).await?;

        let name = input.name.unwrap_or(existing.name);
        let phone = input.phone.or(existing.phone);

        if name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Name is required".to_string(),
            });
        }

        let row = sqlx::query_as::<_, ClientRow>(
            r#"
            UPDATE clients
            SET name = $2, phone = $3
            WHERE id = $1
            RETURNING id, name, phone, created_at
            "#,
        )
        .bind(client_id)
        .bind(name.trim())
        .bind(&phone)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Delete a client. Clients with orders on record cannot be removed;
    /// their history backs the ledger.
    pub async fn delete(&self, client_id: Uuid) -> AppResult<()> {
        let has_orders = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM client_orders WHERE client_id = $1)",
        )
        .bind(client_id)
        .fetch_one(&self.db)
        .await?;

        if has_orders {
            return Err(AppError::Validation {
                field: "client_id".to_string(),
                message: "Client has orders on record and cannot be deleted".to_string(),
            });
        }

        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(client_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Client".to_string()));
        }

        Ok(())
    }
}
