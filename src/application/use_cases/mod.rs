pub mod payment;
pub mod payment_gateway_registry;
pub mod settlement;
pub mod subscription;
pub mod user;
