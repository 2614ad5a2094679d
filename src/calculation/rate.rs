//! Effective hourly rate resolution.
//!
//! The manager-tier rate is only paid to memberships that actually hold the
//! manager or owner role. An employee or super admin flagged as working as
//! manager still gets their default rate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Role;

/// Where a resolved rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// The membership's manager-tier rate.
    ManagerTier,
    /// The user's default rate.
    UserDefault,
    /// Neither rate was set.
    Unset,
}

/// The result of a rate resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateResolution {
    /// The effective hourly rate.
    pub rate: Decimal,
    /// Which input supplied it.
    pub source: RateSource,
}

/// Resolves the effective hourly rate for a worked interval.
///
/// 1. Working as manager, role manager or owner, manager rate set: manager rate.
/// 2. Otherwise the user's default rate, if set.
/// 3. Otherwise zero.
///
/// # Examples
///
/// ```
/// use shift_ledger::calculation::{resolve_rate, RateSource};
/// use shift_ledger::models::Role;
/// use rust_decimal::Decimal;
///
/// let default_rate = Some(Decimal::new(3500, 2));
/// let manager_rate = Some(Decimal::new(5500, 2));
///
/// let manager = resolve_rate(default_rate, manager_rate, Role::Manager, true);
/// assert_eq!(manager.rate, Decimal::new(5500, 2));
/// assert_eq!(manager.source, RateSource::ManagerTier);
///
/// let employee = resolve_rate(default_rate, manager_rate, Role::Employee, true);
/// assert_eq!(employee.rate, Decimal::new(3500, 2));
/// ```
pub fn resolve_rate(
    user_default_rate: Option<Decimal>,
    manager_rate: Option<Decimal>,
    role: Role,
    working_as_manager: bool,
) -> RateResolution {
    if working_as_manager && role.holds_manager_tier() {
        if let Some(rate) = manager_rate {
            return RateResolution {
                rate,
                source: RateSource::ManagerTier,
            };
        }
    }

    match user_default_rate {
        Some(rate) => RateResolution {
            rate,
            source: RateSource::UserDefault,
        },
        None => RateResolution {
            rate: Decimal::ZERO,
            source: RateSource::Unset,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_manager_working_as_manager_gets_manager_rate() {
        let result = resolve_rate(Some(dec("35")), Some(dec("55")), Role::Manager, true);
        assert_eq!(result.rate, dec("55"));
        assert_eq!(result.source, RateSource::ManagerTier);
    }

    #[test]
    fn test_owner_working_as_manager_gets_manager_rate() {
        let result = resolve_rate(None, Some(dec("70.25")), Role::Owner, true);
        assert_eq!(result.rate, dec("70.25"));
    }

    #[test]
    fn test_employee_flagged_as_manager_still_gets_default_rate() {
        let result = resolve_rate(Some(dec("35")), Some(dec("55")), Role::Employee, true);
        assert_eq!(result.rate, dec("35"));
        assert_eq!(result.source, RateSource::UserDefault);
    }

    #[test]
    fn test_super_admin_never_gets_manager_rate() {
        let result = resolve_rate(Some(dec("40")), Some(dec("90")), Role::SuperAdmin, true);
        assert_eq!(result.rate, dec("40"));
    }

    #[test]
    fn test_manager_not_working_as_manager_gets_default_rate() {
        let result = resolve_rate(Some(dec("35")), Some(dec("55")), Role::Manager, false);
        assert_eq!(result.rate, dec("35"));
    }

    #[test]
    fn test_manager_without_default_rate_not_working_as_manager_gets_zero() {
        let result = resolve_rate(None, Some(dec("55")), Role::Manager, false);
        assert_eq!(result.rate, Decimal::ZERO);
        assert_eq!(result.source, RateSource::Unset);
    }

    #[test]
    fn test_manager_without_manager_rate_falls_back_to_default() {
        let result = resolve_rate(Some(dec("42.10")), None, Role::Manager, true);
        assert_eq!(result.rate, dec("42.10"));
        assert_eq!(result.source, RateSource::UserDefault);
    }
}
