//! Mailing list subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SubscriberId;

/// A mailing list entry. Created once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    /// Subscriber identifier.
    pub id: SubscriberId,
    /// Subscribed address (unique).
    pub email: String,
    /// When the address was enrolled.
    pub created_at: DateTime<Utc>,
}

/// Cheap plausibility check applied before enrolling an address.
#[must_use]
pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.contains('@')
}
