use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::{
    adapters::persistence::{
        PostgresPersistence,
        payment::{SELECT_COLS as PAYMENT_COLS, row_to_payment},
        subscription::{SELECT_COLS as SUBSCRIPTION_COLS, row_to_subscription},
    },
    app_error::{AppError, AppResult},
    application::{
        ports::payment_gateway::CorrelationKey,
        use_cases::settlement::{SettlementRepo, SettlementTx},
    },
    domain::entities::{
        invoice::Invoice,
        payment::Payment,
        payment_method::PaymentMethod,
        subscription::{Subscription, SubscriptionStatus},
    },
};

#[async_trait]
impl SettlementRepo for PostgresPersistence {
    async fn begin(&self) -> AppResult<Box<dyn SettlementTx>> {
        let tx = self.pool.begin().await.map_err(AppError::from)?;
        Ok(Box::new(PgSettlementTx { tx }))
    }
}

/// A live Postgres transaction. sqlx rolls it back on drop unless committed.
pub struct PgSettlementTx {
    tx: Transaction<'static, Postgres>,
}

impl PgSettlementTx {
    async fn lock_payment_where(
        &mut self,
        method: PaymentMethod,
        column: &str,
        value: &str,
    ) -> AppResult<Option<Payment>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM payments WHERE {} = $1 AND method = $2 FOR UPDATE",
            PAYMENT_COLS, column
        ))
        .bind(value)
        .bind(method)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_payment))
    }
}

#[async_trait]
impl SettlementTx for PgSettlementTx {
    async fn lock_user_subscriptions(&mut self, user_id: Uuid) -> AppResult<Vec<Subscription>> {
        // The user row serialises callers that have no subscription rows yet.
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(AppError::from)?;

        let rows = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1 FOR UPDATE",
            SUBSCRIPTION_COLS
        ))
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_subscription).collect())
    }

    async fn lock_payment(
        &mut self,
        method: PaymentMethod,
        key: &CorrelationKey,
    ) -> AppResult<Option<Payment>> {
        if let Some(external_id) = &key.external_transaction_id {
            if let Some(payment) = self
                .lock_payment_where(method, "external_transaction_id", external_id)
                .await?
            {
                return Ok(Some(payment));
            }
        }
        match &key.transaction_id {
            Some(transaction_id) => {
                self.lock_payment_where(method, "transaction_id", transaction_id)
                    .await
            }
            None => Ok(None),
        }
    }

    async fn lock_subscription(&mut self, id: Uuid) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE id = $1 FOR UPDATE",
            SUBSCRIPTION_COLS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn insert_subscription(&mut self, subscription: &Subscription) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions
                (id, user_id, plan, status, amount, start_date, end_date,
                 cancelled_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(subscription.id)
        .bind(subscription.user_id)
        .bind(subscription.plan)
        .bind(subscription.status)
        .bind(subscription.amount)
        .bind(subscription.start_date)
        .bind(subscription.end_date)
        .bind(subscription.cancelled_at)
        .bind(subscription.created_at)
        .bind(subscription.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn insert_payment(&mut self, payment: &Payment) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO payments
                (id, user_id, subscription_id, method, status, amount, transaction_id,
                 external_transaction_id, description, metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(payment.id)
        .bind(payment.user_id)
        .bind(payment.subscription_id)
        .bind(payment.method)
        .bind(payment.status)
        .bind(payment.amount)
        .bind(&payment.transaction_id)
        .bind(&payment.external_transaction_id)
        .bind(&payment.description)
        .bind(&payment.metadata)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn insert_invoice(&mut self, invoice: &Invoice) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO invoices
                (id, payment_id, invoice_number, amount, tax, total, pdf_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(invoice.id)
        .bind(invoice.payment_id)
        .bind(&invoice.invoice_number)
        .bind(invoice.amount)
        .bind(invoice.tax)
        .bind(invoice.total)
        .bind(&invoice.pdf_url)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn save_payment(&mut self, payment: &Payment) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = $2, external_transaction_id = $3, metadata = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(payment.id)
        .bind(payment.status)
        .bind(&payment.external_transaction_id)
        .bind(&payment.metadata)
        .bind(payment.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(AppError::from)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn save_subscription(&mut self, subscription: &Subscription) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = $2, start_date = $3, end_date = $4, cancelled_at = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(subscription.id)
        .bind(subscription.status)
        .bind(subscription.start_date)
        .bind(subscription.end_date)
        .bind(subscription.cancelled_at)
        .bind(subscription.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(AppError::from)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn expire_elapsed_subscriptions(&mut self, now: NaiveDateTime) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = $1, updated_at = $3
            WHERE status = $2 AND end_date < $3
            "#,
        )
        .bind(SubscriptionStatus::Expired)
        .bind(SubscriptionStatus::Active)
        .bind(now)
        .execute(&mut *self.tx)
        .await
        .map_err(AppError::from)?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await.map_err(AppError::from)
    }
}
