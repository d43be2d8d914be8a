use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::BloodGroup;

/// How full a blood group's stock is relative to its capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockLevel {
    /// Below 20% of capacity.
    Critical,
    /// Below 40% of capacity.
    Low,
    /// 40% of capacity or more.
    Good,
}

impl StockLevel {
    /// Classify a fill percentage.
    #[must_use]
    pub fn from_percentage(percentage: u32) -> Self {
        if percentage < 20 {
            Self::Critical
        } else if percentage < 40 {
            Self::Low
        } else {
            Self::Good
        }
    }
}

impl fmt::Display for StockLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => f.pad("Critical"),
            Self::Low => f.pad("Low"),
            Self::Good => f.pad("Good"),
        }
    }
}

/// Stock on hand for one blood group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    /// The group this row counts.
    pub blood_group: BloodGroup,
    /// Units currently held.
    pub units_available: u32,
    /// When the count was last changed.
    pub last_updated: Option<DateTime<Utc>>,
}

impl InventoryEntry {
    /// Fill percentage against `capacity`, saturating at 100.
    ///
    /// A zero capacity reports 0%.
    #[must_use]
    pub fn percentage(&self, capacity: u32) -> u32 {
        if capacity == 0 {
            return 0;
        }
        let pct = u64::from(self.units_available) * 100 / u64::from(capacity);
        u32::try_from(pct.min(100)).unwrap_or(100)
    }

    /// Stock level against `capacity`.
    #[must_use]
    pub fn level(&self, capacity: u32) -> StockLevel {
        StockLevel::from_percentage(self.percentage(capacity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(units: u32) -> InventoryEntry {
        InventoryEntry {
            blood_group: BloodGroup::APositive,
            units_available: units,
            last_updated: None,
        }
    }

    #[test]
    fn test_stock_level_thresholds() {
        assert_eq!(StockLevel::from_percentage(0), StockLevel::Critical);
        assert_eq!(StockLevel::from_percentage(19), StockLevel::Critical);
        assert_eq!(StockLevel::from_percentage(20), StockLevel::Low);
        assert_eq!(StockLevel::from_percentage(39), StockLevel::Low);
        assert_eq!(StockLevel::from_percentage(40), StockLevel::Good);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(entry(45).percentage(100), 45);
        assert_eq!(entry(12).percentage(50), 24);
        assert_eq!(entry(500).percentage(100), 100);
        assert_eq!(entry(5).percentage(0), 0);
    }

    #[test]
    fn test_level_uses_capacity() {
        assert_eq!(entry(8).level(50), StockLevel::Critical);
        assert_eq!(entry(15).level(60), StockLevel::Low);
        assert_eq!(entry(89).level(120), StockLevel::Good);
    }
}
