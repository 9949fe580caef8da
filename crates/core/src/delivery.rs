//! Delivery-attempt status state machine.

use serde::{Deserialize, Serialize};

use crate::listing::UnknownVariant;

/// Status of one notification delivery attempt.
///
/// Every attempt starts `pending` and transitions exactly once to a
/// terminal state: `pending -> sent` or `pending -> failed`. There are
/// no other transitions; a completed attempt is never reopened, and a
/// finished dispatch pass leaves no attempt `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
}

impl DeliveryStatus {
    /// Canonical text form, as stored in `delivery_attempts.status`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    /// Whether the status is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            other => Err(UnknownVariant {
                kind: "delivery_status",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [DeliveryStatus::Pending, DeliveryStatus::Sent, DeliveryStatus::Failed] {
            assert_eq!(status.as_str().parse::<DeliveryStatus>().unwrap(), status);
        }
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!DeliveryStatus::Pending.is_terminal());
        assert!(DeliveryStatus::Sent.is_terminal());
        assert!(DeliveryStatus::Failed.is_terminal());
    }

    #[test]
    fn unknown_status_text_is_an_error() {
        assert!("retrying".parse::<DeliveryStatus>().is_err());
    }
}
