//! Rendering of command results as plain text, tables or JSON.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::OutputFormat;
use crate::error::Result;
use crate::inventory::InventoryReport;
use crate::models::{BloodRequest, Donor, DonorDetails};
use crate::storage::DashboardStats;

fn date(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

fn optional_date(ts: Option<DateTime<Utc>>) -> String {
    ts.map_or_else(|| "-".to_string(), date)
}

fn write_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Write the donor list.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_donors(out: &mut impl Write, donors: &[Donor], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => write_json(out, donors)?,
        OutputFormat::Table => {
            writeln!(
                out,
                "{:>5}  {:<24} {:>3} {:<1}  {:<3}  {:<14} {:<20} {:<16}",
                "ID", "NAME", "AGE", "G", "BG", "CONTACT", "STATUS", "NEXT"
            )?;
            for donor in donors {
                writeln!(
                    out,
                    "{:>5}  {:<24} {:>3} {:<1}  {:<3}  {:<14} {:<20} {:<16}",
                    donor.id,
                    truncate(&donor.name, 24),
                    donor.age,
                    donor.gender,
                    donor.blood_group,
                    truncate(&donor.contact, 14),
                    donor.status,
                    donor.next_action().map_or("-", |a| a.label()),
                )?;
            }
        }
        OutputFormat::Plain => {
            for donor in donors {
                writeln!(
                    out,
                    "#{} {} ({}, {}) - {}",
                    donor.id, donor.name, donor.blood_group, donor.contact, donor.status
                )?;
            }
        }
    }
    Ok(())
}

/// Write one donor with its history.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_donor_details(
    out: &mut impl Write,
    details: &DonorDetails,
    format: OutputFormat,
) -> Result<()> {
    if format == OutputFormat::Json {
        return write_json(out, details);
    }

    let donor = &details.donor;
    writeln!(out, "Donor #{}", donor.id)?;
    writeln!(out, "  Name:           {}", donor.name)?;
    writeln!(out, "  Age:            {}", donor.age)?;
    writeln!(out, "  Gender:         {}", donor.gender)?;
    writeln!(out, "  Blood group:    {}", donor.blood_group)?;
    writeln!(out, "  Contact:        {}", donor.contact)?;
    if let Some(email) = &donor.email {
        writeln!(out, "  Email:          {email}")?;
    }
    if let Some(address) = &donor.address {
        writeln!(out, "  Address:        {address}")?;
    }
    writeln!(out, "  Status:         {}", donor.status)?;
    writeln!(
        out,
        "  Last donation:  {}",
        optional_date(donor.last_donation_date)
    )?;
    writeln!(out, "  Registered:     {}", date(donor.created_at))?;

    writeln!(out)?;
    writeln!(out, "Donations ({})", details.donations.len())?;
    for d in &details.donations {
        writeln!(
            out,
            "  {}  {} ml  {}  {}{}",
            date(d.donation_date),
            d.quantity_ml,
            d.blood_group,
            d.status,
            d.notes
                .as_deref()
                .map(|n| format!("  ({n})"))
                .unwrap_or_default(),
        )?;
    }

    writeln!(out)?;
    writeln!(out, "Screenings ({})", details.screenings.len())?;
    for s in &details.screenings {
        writeln!(
            out,
            "  {}  BP {}  Hb {}  {} kg  {} C  pulse {}  {}  by {}",
            date(s.screened_at),
            s.blood_pressure,
            s.hemoglobin,
            s.weight,
            s.temperature,
            s.pulse,
            s.result,
            s.screened_by,
        )?;
    }
    Ok(())
}

/// Write the request list.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_requests(
    out: &mut impl Write,
    requests: &[BloodRequest],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => write_json(out, requests)?,
        OutputFormat::Table => {
            writeln!(
                out,
                "{:>5}  {:<24} {:<3}  {:>5}  {:<9}  {:<9}  {:<16}",
                "ID", "HOSPITAL", "BG", "UNITS", "URGENCY", "STATUS", "REQUESTED"
            )?;
            for r in requests {
                writeln!(
                    out,
                    "{:>5}  {:<24} {:<3}  {:>5}  {:<9}  {:<9}  {:<16}",
                    r.id,
                    truncate(&r.hospital_name, 24),
                    r.blood_group,
                    r.units_requested,
                    r.urgency,
                    r.status,
                    date(r.requested_at),
                )?;
            }
        }
        OutputFormat::Plain => {
            for r in requests {
                writeln!(
                    out,
                    "#{} {} needs {} x {} ({}) - {}",
                    r.id, r.hospital_name, r.units_requested, r.blood_group, r.urgency, r.status
                )?;
            }
        }
    }
    Ok(())
}

/// Write the inventory view.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_inventory(
    out: &mut impl Write,
    report: &InventoryReport,
    format: OutputFormat,
) -> Result<()> {
    if format == OutputFormat::Json {
        return write_json(out, report);
    }

    let levels = &report.levels;
    if format == OutputFormat::Table {
        writeln!(
            out,
            "{:<3}  {:>5}  {:>8}  {:>4}  {:<8}  {:<16}",
            "BG", "UNITS", "CAPACITY", "PCT", "LEVEL", "UPDATED"
        )?;
        for l in levels {
            writeln!(
                out,
                "{:<3}  {:>5}  {:>8}  {:>3}%  {:<8}  {:<16}{}",
                l.blood_group,
                l.units_available,
                l.capacity,
                l.percentage,
                l.level,
                optional_date(l.last_updated),
                if l.alert { "  !" } else { "" },
            )?;
        }
    } else {
        for l in levels {
            writeln!(
                out,
                "{}: {} units ({}%, {})",
                l.blood_group, l.units_available, l.percentage, l.level
            )?;
        }
    }

    let summary = &report.summary;
    writeln!(out)?;
    writeln!(out, "Critical groups:  {}", summary.critical_count)?;
    writeln!(out, "Total units:      {}", summary.total_units)?;
    writeln!(out, "Total capacity:   {}", summary.total_capacity)?;
    writeln!(out, "Utilization:      {}%", summary.utilization_percent)?;

    let alerts: Vec<_> = levels
        .iter()
        .filter(|l| l.alert)
        .map(|l| l.blood_group.as_str())
        .collect();
    if !alerts.is_empty() {
        writeln!(out)?;
        writeln!(out, "Low stock alert: {}", alerts.join(", "))?;
    }
    Ok(())
}

/// Write the dashboard figures.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_stats(out: &mut impl Write, stats: &DashboardStats, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return write_json(out, stats);
    }

    writeln!(out, "Donors:               {}", stats.total_donors)?;
    writeln!(out, "  Eligible:           {}", stats.eligible_donors)?;
    writeln!(out, "  Screening queue:    {}", stats.in_screening_queue)?;
    writeln!(out, "  Ready to collect:   {}", stats.ready_for_collection)?;
    writeln!(out, "Donations:            {}", stats.total_donations)?;
    writeln!(out, "  This month:         {}", stats.donations_this_month)?;
    writeln!(out, "Collected (ml):       {}", stats.total_collected_ml)?;
    writeln!(out, "Pending requests:     {}", stats.pending_requests)?;
    writeln!(out, "Units in inventory:   {}", stats.total_units_available)?;
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{InventoryLevel, InventorySummary};
    use crate::models::{BloodGroup, DonorStatus, Gender, RequestStatus, StockLevel, Urgency};

    fn donor() -> Donor {
        let ts = DateTime::parse_from_rfc3339("2024-05-01T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Donor {
            id: 3,
            name: "Ada Obi".to_string(),
            age: 31,
            gender: Gender::Female,
            blood_group: BloodGroup::ONegative,
            contact: "555-0700".to_string(),
            email: None,
            address: None,
            status: DonorStatus::ReadyForCollection,
            last_donation_date: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_donor_table_shows_next_action() {
        let text = render(|out| write_donors(out, &[donor()], OutputFormat::Table));
        assert!(text.starts_with("   ID"));
        assert!(text.contains("Ready for Collection"));
        assert!(text.contains("Collect Blood"));
    }

    #[test]
    fn test_donor_plain() {
        let text = render(|out| write_donors(out, &[donor()], OutputFormat::Plain));
        assert_eq!(
            text,
            "#3 Ada Obi (O-, 555-0700) - Ready for Collection\n"
        );
    }

    #[test]
    fn test_donors_json() {
        let text = render(|out| write_donors(out, &[donor()], OutputFormat::Json));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["status"], "Ready for Collection");
        assert_eq!(value[0]["blood_group"], "O-");
    }

    #[test]
    fn test_details_plain() {
        let details = DonorDetails {
            donor: donor(),
            donations: Vec::new(),
            screenings: Vec::new(),
        };
        let text = render(|out| write_donor_details(out, &details, OutputFormat::Plain));
        assert!(text.contains("Donor #3"));
        assert!(text.contains("Last donation:  -"));
        assert!(text.contains("Donations (0)"));
    }

    #[test]
    fn test_requests_plain() {
        let request = BloodRequest {
            id: 9,
            hospital_name: "Eastside".to_string(),
            contact_person: "Dr. Vale".to_string(),
            contact: "555-0800".to_string(),
            email: None,
            blood_group: BloodGroup::APositive,
            units_requested: 2,
            urgency: Urgency::Emergency,
            reason: None,
            status: RequestStatus::Pending,
            requested_at: donor().created_at,
            processed_at: None,
        };
        let text = render(|out| write_requests(out, &[request], OutputFormat::Plain));
        assert_eq!(text, "#9 Eastside needs 2 x A+ (Emergency) - Pending\n");
    }

    #[test]
    fn test_inventory_alert_line() {
        let levels = [
            InventoryLevel {
                blood_group: BloodGroup::ONegative,
                units_available: 6,
                capacity: 60,
                percentage: 10,
                level: StockLevel::Critical,
                alert: true,
                last_updated: None,
            },
            InventoryLevel {
                blood_group: BloodGroup::APositive,
                units_available: 80,
                capacity: 100,
                percentage: 80,
                level: StockLevel::Good,
                alert: false,
                last_updated: None,
            },
        ];
        let report = InventoryReport {
            levels: levels.to_vec(),
            summary: InventorySummary {
                critical_count: 1,
                total_units: 86,
                total_capacity: 160,
                utilization_percent: 53,
            },
        };
        let text = render(|out| write_inventory(out, &report, OutputFormat::Plain));
        assert!(text.contains("O-: 6 units (10%, Critical)"));
        assert!(text.contains("Critical groups:  1\n"));
        assert!(text.contains("Total capacity:   160\n"));
        assert!(text.contains("Utilization:      53%\n"));
        assert!(text.ends_with("Low stock alert: O-\n"));

        let json = render(|out| write_inventory(out, &report, OutputFormat::Json));
        assert!(!json.contains("Low stock alert"));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["summary"]["total_units"], 86);
        assert_eq!(value["levels"][0]["blood_group"], "O-");
    }

    #[test]
    fn test_stats_json() {
        let stats = DashboardStats {
            total_donors: 4,
            ..DashboardStats::default()
        };
        let text = render(|out| write_stats(out, &stats, OutputFormat::Json));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["total_donors"], 4);
    }

    #[test]
    fn test_stats_show_monthly_donations() {
        let stats = DashboardStats {
            total_donations: 12,
            donations_this_month: 3,
            ..DashboardStats::default()
        };
        let text = render(|out| write_stats(out, &stats, OutputFormat::Plain));
        assert!(text.contains("Donations:            12\n  This month:         3\n"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
