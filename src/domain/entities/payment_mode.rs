use serde::{Deserialize, Serialize};

/// Gateway environment. Selects which Payme key signs and verifies payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    #[default]
    Test,
    Live,
}

impl PaymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Test => "test",
            PaymentMode::Live => "live",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, PaymentMode::Live)
    }
}

impl std::fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "test" => Ok(PaymentMode::Test),
            "live" | "production" => Ok(PaymentMode::Live),
            _ => Err(format!(
                "Invalid payment mode: {}. Must be 'test' or 'live'",
                s
            )),
        }
    }
}
