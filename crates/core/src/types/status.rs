//! Status and category enums.
//!
//! Each enum has three spellings:
//! - a stable machine value (`as_str`) used in form posts, query strings and
//!   the `PostgreSQL` enum type
//! - a human label (`Display`) shown in the dashboard
//! - the serde representation, which matches the machine value

use serde::{Deserialize, Serialize};

/// Payment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Fully paid.
    Paid,
    /// Nothing received yet.
    #[default]
    Unpaid,
    /// Some money received, balance outstanding.
    Partial,
}

impl PaymentStatus {
    /// All statuses in display order.
    pub const ALL: [Self; 3] = [Self::Paid, Self::Unpaid, Self::Partial];

    /// Machine value used in forms and the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Unpaid => "unpaid",
            Self::Partial => "partial",
        }
    }

    /// Whether any money has been collected for the order.
    ///
    /// Both paid and partially paid orders count towards total sales.
    #[must_use]
    pub const fn counts_as_sale(&self) -> bool {
        matches!(self, Self::Paid | Self::Partial)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paid => write!(f, "Paid"),
            Self::Unpaid => write!(f, "Unpaid"),
            Self::Partial => write!(f, "Partial"),
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paid" => Ok(Self::Paid),
            "unpaid" => Ok(Self::Unpaid),
            "partial" => Ok(Self::Partial),
            _ => Err(format!("invalid payment status: {s}")),
        }
    }
}

/// Meal slot a menu item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "meal_category", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum MealCategory {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealCategory {
    /// All categories in serving order.
    pub const ALL: [Self; 3] = [Self::Breakfast, Self::Lunch, Self::Dinner];

    /// Machine value used in forms and the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
        }
    }
}

impl std::fmt::Display for MealCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Breakfast => write!(f, "Breakfast"),
            Self::Lunch => write!(f, "Lunch"),
            Self::Dinner => write!(f, "Dinner"),
        }
    }
}

impl std::str::FromStr for MealCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            _ => Err(format!("invalid meal category: {s}")),
        }
    }
}

/// Where an order is dropped off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "delivery_location"))]
pub enum DeliveryLocation {
    #[serde(rename = "wework")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "wework"))]
    WeWork,
    #[serde(rename = "p1_hostel")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "p1_hostel"))]
    P1Hostel,
    #[serde(rename = "p2_hostel")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "p2_hostel"))]
    P2Hostel,
}

impl DeliveryLocation {
    /// All drop-off points offered on the order forms.
    pub const ALL: [Self; 3] = [Self::WeWork, Self::P1Hostel, Self::P2Hostel];

    /// Machine value used in forms and the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::WeWork => "wework",
            Self::P1Hostel => "p1_hostel",
            Self::P2Hostel => "p2_hostel",
        }
    }
}

impl std::fmt::Display for DeliveryLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WeWork => write!(f, "WeWork"),
            Self::P1Hostel => write!(f, "P1 Hostel"),
            Self::P2Hostel => write!(f, "P2 Hostel"),
        }
    }
}

impl std::str::FromStr for DeliveryLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wework" => Ok(Self::WeWork),
            "p1_hostel" | "p1 hostel" => Ok(Self::P1Hostel),
            "p2_hostel" | "p2 hostel" => Ok(Self::P2Hostel),
            _ => Err(format!("invalid delivery location: {s}")),
        }
    }
}

/// Progress of one gateway checkout attempt.
///
/// ```text
/// Created --> Settled
///    |           ^
///    +--> Abandoned  (late capture can still settle)
///    |
///    +--> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_attempt_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentAttemptStatus {
    /// Gateway order exists, widget opened.
    Created,
    /// Gateway reported a successful, verified payment.
    Settled,
    /// Payer dismissed the widget.
    Abandoned,
    /// Gateway reported a failed payment.
    Failed,
}

impl PaymentAttemptStatus {
    /// Machine value used in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Settled => "settled",
            Self::Abandoned => "abandoned",
            Self::Failed => "failed",
        }
    }

    /// Whether moving from `self` to `next` is allowed.
    ///
    /// Settled is final: a dismiss or failure that arrives after the
    /// success callback never downgrades it. Re-applying the same status
    /// is allowed so callbacks can be replayed.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, _)
                | (Self::Abandoned | Self::Failed, Self::Settled)
                | (Self::Settled, Self::Settled)
                | (Self::Abandoned, Self::Abandoned | Self::Failed)
                | (Self::Failed, Self::Failed)
        )
    }
}

impl std::fmt::Display for PaymentAttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
