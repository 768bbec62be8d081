use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{amount::Amount, invoice::Invoice, payment::Payment},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStats {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    pub failed: i64,
    /// Sum of COMPLETED payment amounts.
    pub total_revenue: Amount,
}

/// A payment together with its invoice.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentWithInvoice {
    #[serde(flatten)]
    pub payment: Payment,
    pub invoice: Option<Invoice>,
}

#[async_trait]
pub trait PaymentRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Payment>>;

    /// Newest first.
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Payment>>;

    /// Newest first.
    async fn list_all(&self) -> AppResult<Vec<Payment>>;

    async fn get_invoice_by_payment(&self, payment_id: Uuid) -> AppResult<Option<Invoice>>;

    async fn stats(&self) -> AppResult<PaymentStats>;
}

#[derive(Clone)]
pub struct PaymentUseCases {
    repo: Arc<dyn PaymentRepo>,
}

impl PaymentUseCases {
    pub fn new(repo: Arc<dyn PaymentRepo>) -> Self {
        Self { repo }
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Payment>> {
        self.repo.list_by_user(user_id).await
    }

    pub async fn list_all(&self) -> AppResult<Vec<Payment>> {
        self.repo.list_all().await
    }

    /// Owners and admins may read a payment and its invoice.
    pub async fn get(
        &self,
        payment_id: Uuid,
        actor_id: Uuid,
        actor_is_admin: bool,
    ) -> AppResult<PaymentWithInvoice> {
        let payment = self
            .repo
            .get_by_id(payment_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if payment.user_id != actor_id && !actor_is_admin {
            return Err(AppError::Forbidden);
        }
        let invoice = self.repo.get_invoice_by_payment(payment.id).await?;
        Ok(PaymentWithInvoice { payment, invoice })
    }

    pub async fn invoice_for_payment(&self, payment_id: Uuid) -> AppResult<Invoice> {
        self.repo
            .get_invoice_by_payment(payment_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn stats(&self) -> AppResult<PaymentStats> {
        self.repo.stats().await
    }
}
