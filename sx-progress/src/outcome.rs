//! Business outcomes of progression operations
//!
//! An operation either applies its mutation or is refused for an expected,
//! user-facing reason. Refusals never mutate state.

use serde::Serialize;

/// Why an operation was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Refusal {
    /// First attempt at a challenge with no hearts left and no subscription
    InsufficientHearts,
    /// Mistakes on an already-attempted challenge cost nothing
    PracticeNoPenalty,
    /// Subscribers have unlimited hearts, nothing to consume
    UnlimitedHearts,
    /// Refill requested with hearts already at the maximum
    HeartsAlreadyFull,
    /// Not enough points to pay for a refill
    InsufficientPoints,
}

impl Refusal {
    /// User-facing message
    pub fn message(&self) -> &'static str {
        match self {
            Refusal::InsufficientHearts => "You have no hearts left",
            Refusal::PracticeNoPenalty => "Practice mistakes do not cost hearts",
            Refusal::UnlimitedHearts => "Your subscription includes unlimited hearts",
            Refusal::HeartsAlreadyFull => "Your hearts are already full",
            Refusal::InsufficientPoints => "Not enough points to refill hearts",
        }
    }
}

/// Result of an operation that may be refused
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Applied(T),
    Refused { reason: Refusal },
}

impl<T> Outcome<T> {
    pub fn refused(reason: Refusal) -> Self {
        Outcome::Refused { reason }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    pub fn applied(&self) -> Option<&T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::Refused { .. } => None,
        }
    }

    pub fn refusal(&self) -> Option<Refusal> {
        match self {
            Outcome::Applied(_) => None,
            Outcome::Refused { reason } => Some(*reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Balance {
        hearts: i64,
    }

    #[test]
    fn test_applied_serializes_payload_with_status_tag() {
        let outcome = Outcome::Applied(Balance { hearts: 4 });
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value, json!({ "status": "applied", "hearts": 4 }));
    }

    #[test]
    fn test_refused_serializes_reason() {
        let outcome: Outcome<Balance> = Outcome::refused(Refusal::InsufficientHearts);
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            value,
            json!({ "status": "refused", "reason": "insufficient_hearts" })
        );
    }

    #[test]
    fn test_accessors() {
        let applied = Outcome::Applied(Balance { hearts: 1 });
        assert!(applied.is_applied());
        assert_eq!(applied.applied(), Some(&Balance { hearts: 1 }));
        assert_eq!(applied.refusal(), None);

        let refused: Outcome<Balance> = Outcome::refused(Refusal::HeartsAlreadyFull);
        assert!(!refused.is_applied());
        assert_eq!(refused.refusal(), Some(Refusal::HeartsAlreadyFull));
    }
}
