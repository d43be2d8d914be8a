//! Inventory levels against configured capacity.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::InventoryConfig;
use crate::error::Result;
use crate::models::{BloodGroup, InventoryEntry, StockLevel};
use crate::session::{Role, SessionContext};
use crate::storage::{current_timestamp, Storage};

/// One row of the inventory view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryLevel {
    /// The group this row counts.
    pub blood_group: BloodGroup,
    /// Units currently held.
    pub units_available: u32,
    /// Configured capacity for the group.
    pub capacity: u32,
    /// Fill percentage, 0 to 100.
    pub percentage: u32,
    /// Stock classification.
    pub level: StockLevel,
    /// Whether the group is below the alert threshold.
    pub alert: bool,
    /// When the count was last changed.
    pub last_updated: Option<DateTime<Utc>>,
}

impl InventoryLevel {
    fn from_entry(entry: &InventoryEntry, config: &InventoryConfig) -> Self {
        let capacity = config.capacity.for_group(entry.blood_group);
        let percentage = entry.percentage(capacity);
        Self {
            blood_group: entry.blood_group,
            units_available: entry.units_available,
            capacity,
            percentage,
            level: entry.level(capacity),
            alert: percentage < config.alert_percent,
            last_updated: entry.last_updated,
        }
    }
}

/// Stock overview across all groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InventorySummary {
    /// Groups classified `Critical`.
    pub critical_count: u32,
    /// Units held across all groups.
    pub total_units: u64,
    /// Configured capacity across all groups.
    pub total_capacity: u64,
    /// `total_units` as a percentage of `total_capacity`, not capped.
    pub utilization_percent: u64,
}

impl InventorySummary {
    fn from_levels(levels: &[InventoryLevel]) -> Self {
        let mut summary = Self::default();
        for level in levels {
            if level.level == StockLevel::Critical {
                summary.critical_count += 1;
            }
            summary.total_units += u64::from(level.units_available);
            summary.total_capacity += u64::from(level.capacity);
        }
        if summary.total_capacity > 0 {
            summary.utilization_percent = summary.total_units * 100 / summary.total_capacity;
        }
        summary
    }
}

/// Per-group rows plus the overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryReport {
    /// One row per blood group, in group order.
    pub levels: Vec<InventoryLevel>,
    /// Totals over `levels`.
    pub summary: InventorySummary,
}

/// The inventory view. Public: no session needed.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn inventory_report(storage: &Storage, config: &InventoryConfig) -> Result<InventoryReport> {
    let levels: Vec<InventoryLevel> = storage
        .list_inventory()?
        .iter()
        .map(|entry| InventoryLevel::from_entry(entry, config))
        .collect();
    let summary = InventorySummary::from_levels(&levels);
    Ok(InventoryReport { levels, summary })
}

/// Set the units on hand for one group. Admin only.
///
/// # Errors
///
/// Returns [`crate::Error::PermissionDenied`] for a non-admin session, or
/// an error if the database operation fails.
pub fn set_inventory_units(
    storage: &Storage,
    session: &SessionContext,
    group: BloodGroup,
    units: u32,
) -> Result<InventoryEntry> {
    session.require_role(Role::Admin, "inventory updates")?;
    let entry = storage.set_inventory_units(group, units, current_timestamp())?;
    info!(
        blood_group = %group,
        units,
        operator = %session.username(),
        "Inventory updated"
    );
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::forms::Credentials;
    use crate::session::{register_operator, SessionPolicy};
    use chrono::Duration;

    fn policy() -> SessionPolicy {
        SessionPolicy {
            ttl: Duration::minutes(30),
            refresh_window: Duration::minutes(5),
        }
    }

    fn sign_in(
        storage: &Storage,
        username: &str,
        role: Role,
        admin: Option<&SessionContext>,
    ) -> SessionContext {
        let creds = Credentials {
            username: username.to_string(),
            password: "password123".to_string(),
        };
        let now = current_timestamp();
        register_operator(storage, admin, &creds, role, now).unwrap();
        SessionContext::sign_in(storage, &creds, policy(), now).unwrap()
    }

    #[test]
    fn test_report_uses_capacity_and_threshold() {
        let storage = Storage::open_in_memory().unwrap();
        let admin = sign_in(&storage, "root", Role::Admin, None);
        let config = InventoryConfig::default();

        // O- capacity 60: 12 units is 20%, Low and below the 30% alert.
        set_inventory_units(&storage, &admin, BloodGroup::ONegative, 12).unwrap();
        // A+ capacity 100: 45 units is Good.
        set_inventory_units(&storage, &admin, BloodGroup::APositive, 45).unwrap();

        let report = inventory_report(&storage, &config).unwrap().levels;
        assert_eq!(report.len(), 8);

        let o_neg = report
            .iter()
            .find(|l| l.blood_group == BloodGroup::ONegative)
            .unwrap();
        assert_eq!(o_neg.capacity, 60);
        assert_eq!(o_neg.percentage, 20);
        assert_eq!(o_neg.level, StockLevel::Low);
        assert!(o_neg.alert);
        assert!(o_neg.last_updated.is_some());

        let a_pos = report
            .iter()
            .find(|l| l.blood_group == BloodGroup::APositive)
            .unwrap();
        assert_eq!(a_pos.level, StockLevel::Good);
        assert!(!a_pos.alert);

        let b_neg = report
            .iter()
            .find(|l| l.blood_group == BloodGroup::BNegative)
            .unwrap();
        assert_eq!(b_neg.level, StockLevel::Critical);
        assert!(b_neg.last_updated.is_none());
    }

    #[test]
    fn test_summary_totals() {
        let storage = Storage::open_in_memory().unwrap();
        let admin = sign_in(&storage, "root", Role::Admin, None);

        // Capacities total 560. A+ 100/100 Good, B+ 50/100 Good, O+ 30/120 Low;
        // the other five groups hold nothing and are Critical.
        set_inventory_units(&storage, &admin, BloodGroup::APositive, 100).unwrap();
        set_inventory_units(&storage, &admin, BloodGroup::BPositive, 50).unwrap();
        set_inventory_units(&storage, &admin, BloodGroup::OPositive, 30).unwrap();

        let summary = inventory_report(&storage, &InventoryConfig::default())
            .unwrap()
            .summary;
        assert_eq!(summary.critical_count, 5);
        assert_eq!(summary.total_units, 180);
        assert_eq!(summary.total_capacity, 560);
        assert_eq!(summary.utilization_percent, 32);
    }

    #[test]
    fn test_summary_of_empty_stock() {
        let storage = Storage::open_in_memory().unwrap();
        let summary = inventory_report(&storage, &InventoryConfig::default())
            .unwrap()
            .summary;
        assert_eq!(summary.critical_count, 8);
        assert_eq!(summary.total_units, 0);
        assert_eq!(summary.utilization_percent, 0);
    }

    #[test]
    fn test_summary_of_no_levels() {
        assert_eq!(InventorySummary::from_levels(&[]), InventorySummary::default());
    }

    #[test]
    fn test_hospital_cannot_set_units() {
        let storage = Storage::open_in_memory().unwrap();
        let admin = sign_in(&storage, "root", Role::Admin, None);
        let hospital = sign_in(&storage, "clinic", Role::Hospital, Some(&admin));

        let err = set_inventory_units(&storage, &hospital, BloodGroup::OPositive, 5).unwrap_err();
        assert!(matches!(err, Error::PermissionDenied { .. }));
        assert!(storage
            .list_inventory()
            .unwrap()
            .iter()
            .all(|e| e.units_available == 0));
    }
}
