//! Membership, user and actor models.
//!
//! A [`Membership`] attaches a person to one restaurant with a role and an
//! optional manager-tier rate. The [`Actor`] is what the authorization layer
//! hands the engine for every call.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role a membership holds within its restaurant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular staff.
    Employee,
    /// Restaurant manager.
    Manager,
    /// Restaurant owner.
    Owner,
    /// Platform administrator.
    SuperAdmin,
}

impl Role {
    /// True for the roles that may be paid the manager-tier rate.
    pub fn holds_manager_tier(self) -> bool {
        matches!(self, Role::Manager | Role::Owner)
    }
}

/// Lifecycle status of a membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    /// Invited, not yet accepted.
    Pending,
    /// Working member.
    Active,
    /// Soft-deactivated; kept while time entries reference it.
    Inactive,
}

/// A worker's role-scoped attachment to one restaurant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    /// Unique identifier.
    pub id: Uuid,
    /// The person.
    pub user_id: Uuid,
    /// The restaurant.
    pub restaurant_id: Uuid,
    /// Role within the restaurant.
    pub role: Role,
    /// Membership status.
    pub status: MembershipStatus,
    /// Optional manager-tier hourly rate.
    #[serde(default)]
    pub manager_rate: Option<Decimal>,
}

impl Membership {
    /// Returns true if the membership can clock in.
    pub fn is_active(&self) -> bool {
        self.status == MembershipStatus::Active
    }
}

/// The parts of a user account the engine reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: Uuid,
    /// Display name used in report rows.
    pub display_name: String,
    /// The user's default hourly rate.
    #[serde(default)]
    pub default_rate: Option<Decimal>,
}

/// The identity the authorization layer supplies for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// The acting user.
    pub user_id: Uuid,
    /// The acting user's role.
    pub role: Role,
    /// The acting user's membership, when acting within a restaurant.
    #[serde(default)]
    pub membership_id: Option<Uuid>,
}
