pub mod amount;
pub mod invoice;
pub mod payment;
pub mod payment_method;
pub mod payment_mode;
pub mod payment_status;
pub mod subscription;
pub mod user;
