use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::payment::{PaymentRepo, PaymentStats},
    domain::entities::{amount::Amount, invoice::Invoice, payment::Payment},
};

pub(super) fn row_to_payment(row: &sqlx::postgres::PgRow) -> Payment {
    Payment {
        id: row.get("id"),
        user_id: row.get("user_id"),
        subscription_id: row.get("subscription_id"),
        method: row.get("method"),
        status: row.get("status"),
        amount: row.get("amount"),
        transaction_id: row.get("transaction_id"),
        external_transaction_id: row.get("external_transaction_id"),
        description: row.get("description"),
        metadata: row.get("metadata"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_invoice(row: &sqlx::postgres::PgRow) -> Invoice {
    Invoice {
        id: row.get("id"),
        payment_id: row.get("payment_id"),
        invoice_number: row.get("invoice_number"),
        amount: row.get("amount"),
        tax: row.get("tax"),
        total: row.get("total"),
        pdf_url: row.get("pdf_url"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub(super) const SELECT_COLS: &str = r#"
    id, user_id, subscription_id, method, status, amount, transaction_id,
    external_transaction_id, description, metadata, created_at, updated_at
"#;

#[async_trait]
impl PaymentRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Payment>> {
        let row = sqlx::query(&format!("SELECT {} FROM payments WHERE id = $1", SELECT_COLS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_payment))
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Payment>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM payments WHERE user_id = $1 ORDER BY created_at DESC",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_payment).collect())
    }

    async fn list_all(&self) -> AppResult<Vec<Payment>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM payments ORDER BY created_at DESC",
            SELECT_COLS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_payment).collect())
    }

    async fn get_invoice_by_payment(&self, payment_id: Uuid) -> AppResult<Option<Invoice>> {
        let row = sqlx::query(
            r#"SELECT id, payment_id, invoice_number, amount, tax, total, pdf_url, created_at, updated_at
               FROM invoices WHERE payment_id = $1"#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_invoice))
    }

    async fn stats(&self) -> AppResult<PaymentStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'failed') AS failed,
                COALESCE(SUM(amount) FILTER (WHERE status = 'completed'), 0)::BIGINT AS revenue
            FROM payments
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(PaymentStats {
            total: row.get("total"),
            completed: row.get("completed"),
            pending: row.get("pending"),
            failed: row.get("failed"),
            total_revenue: Amount::from_tiyin(row.get("revenue")),
        })
    }
}
