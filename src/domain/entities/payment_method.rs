use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Payment method chosen by the user at checkout.
///
/// `Stripe` is a storable value carried over from the catalog schema but no
/// gateway settles it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, AsRefStr, Display,
    EnumString,
)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PaymentMethod {
    Click,
    Payme,
    Stripe,
}

impl PaymentMethod {
    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentMethod::Click => "Click",
            PaymentMethod::Payme => "Payme",
            PaymentMethod::Stripe => "Stripe",
        }
    }

    /// Methods with a gateway adapter wired in.
    pub fn implemented() -> &'static [PaymentMethod] {
        &[PaymentMethod::Click, PaymentMethod::Payme]
    }

    pub fn is_implemented(&self) -> bool {
        Self::implemented().contains(self)
    }
}
