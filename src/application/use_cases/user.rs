use async_trait::async_trait;
use uuid::Uuid;

use crate::{app_error::AppResult, domain::entities::user::User};

/// Read-only view of the account store owned by the user-management service.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
}
