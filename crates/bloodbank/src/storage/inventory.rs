//! Per-group inventory counts.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use super::{enum_column, format_timestamp, optional_timestamp_column, Storage};
use crate::error::{Error, Result};
use crate::models::{BloodGroup, InventoryEntry};

impl Storage {
    /// All eight inventory rows in blood-group order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_inventory(&self) -> Result<Vec<InventoryEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT blood_group, units_available, last_updated FROM blood_inventory")?;
        let mut entries = stmt
            .query_map([], row_to_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        entries.sort_by_key(|e| e.blood_group);
        Ok(entries)
    }

    /// Set the units on hand for one group and stamp `last_updated`.
    ///
    /// # Errors
    ///
    /// Returns an error if the group has no inventory row or the database
    /// operation fails.
    pub fn set_inventory_units(
        &self,
        group: BloodGroup,
        units: u32,
        now: DateTime<Utc>,
    ) -> Result<InventoryEntry> {
        let affected = self.conn.execute(
            "UPDATE blood_inventory SET units_available = ?1, last_updated = ?2 WHERE blood_group = ?3",
            params![units, format_timestamp(now), group.as_str()],
        )?;
        if affected == 0 {
            return Err(Error::internal(format!(
                "no inventory row for blood group {group}"
            )));
        }

        Ok(InventoryEntry {
            blood_group: group,
            units_available: units,
            last_updated: Some(now),
        })
    }
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<InventoryEntry> {
    Ok(InventoryEntry {
        blood_group: enum_column(row, 0)?,
        units_available: row.get(1)?,
        last_updated: optional_timestamp_column(row, 2)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_inventory_is_empty() {
        let storage = Storage::open_in_memory().unwrap();
        let entries = storage.list_inventory().unwrap();

        let groups: Vec<_> = entries.iter().map(|e| e.blood_group).collect();
        assert_eq!(groups, BloodGroup::ALL);
        assert!(entries.iter().all(|e| e.units_available == 0));
        assert!(entries.iter().all(|e| e.last_updated.is_none()));
    }

    #[test]
    fn test_set_inventory_units() {
        let storage = Storage::open_in_memory().unwrap();
        let now = Utc::now();

        storage
            .set_inventory_units(BloodGroup::AbNegative, 9, now)
            .unwrap();

        let entry = storage
            .list_inventory()
            .unwrap()
            .into_iter()
            .find(|e| e.blood_group == BloodGroup::AbNegative)
            .unwrap();
        assert_eq!(entry.units_available, 9);
        assert!(entry.last_updated.is_some());
    }

    #[test]
    fn test_set_inventory_units_missing_row() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .conn()
            .execute("DELETE FROM blood_inventory WHERE blood_group = 'B-'", [])
            .unwrap();

        let err = storage
            .set_inventory_units(BloodGroup::BNegative, 1, Utc::now())
            .unwrap_err();
        assert!(err.to_string().contains("B-"));
    }
}
