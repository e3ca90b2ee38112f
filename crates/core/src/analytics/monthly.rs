use chrono::Datelike;
use serde::{Serialize, Serializer};

use crate::domain::invoice::Invoice;

pub const MONTHS: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MonthPoint {
    pub month: u32,
    pub purchases: u32,
}

/// Invoice counts for one customer name across the twelve months of a year.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonthlySeries {
    customer_name: String,
    year: i32,
    counts: [u32; MONTHS],
}

impl MonthlySeries {
    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Count for a 1-based month, `None` outside `1..=12`.
    pub fn get(&self, month: u32) -> Option<u32> {
        let index = usize::try_from(month).ok()?.checked_sub(1)?;
        self.counts.get(index).copied()
    }

    pub fn counts(&self) -> &[u32; MONTHS] {
        &self.counts
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    pub fn points(&self) -> Vec<MonthPoint> {
        (1u32..)
            .zip(self.counts.iter())
            .map(|(month, purchases)| MonthPoint { month, purchases: *purchases })
            .collect()
    }
}

impl Serialize for MonthlySeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct View<'a> {
            customer_name: &'a str,
            year: i32,
            total: u32,
            months: Vec<MonthPoint>,
        }

        View {
            customer_name: &self.customer_name,
            year: self.year,
            total: self.total(),
            months: self.points(),
        }
        .serialize(serializer)
    }
}

/// Counts invoices per month for an exact display name and year.
///
/// Months without invoices report zero, so the series always has twelve
/// entries. An unknown name yields an all-zero series.
pub fn monthly_purchases(invoices: &[Invoice], customer_name: &str, year: i32) -> MonthlySeries {
    let mut counts = [0u32; MONTHS];
    for invoice in invoices
        .iter()
        .filter(|invoice| invoice.customer_name == customer_name && invoice.date.year() == year)
    {
        counts[invoice.date.month0() as usize] += 1;
    }
    MonthlySeries { customer_name: customer_name.to_string(), year, counts }
}

/// Distinct display names in first-seen order.
pub fn distinct_names(invoices: &[Invoice]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for invoice in invoices {
        if !names.iter().any(|name| name == &invoice.customer_name) {
            names.push(invoice.customer_name.clone());
        }
    }
    names
}

/// Distinct invoice years in first-seen order.
pub fn distinct_years(invoices: &[Invoice]) -> Vec<i32> {
    let mut years: Vec<i32> = Vec::new();
    for invoice in invoices {
        let year = invoice.date.year();
        if !years.contains(&year) {
            years.push(year);
        }
    }
    years
}
