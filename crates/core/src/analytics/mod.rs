//! Customer analytics over an aggregated invoice table.
//!
//! Every function here is a pure transformation of its inputs: the same
//! snapshot and parameters always produce the same tables.

pub mod aggregate;
pub mod cltv;
pub mod monthly;
pub mod names;
pub mod quantile;
pub mod recommend;
pub mod rfm;
pub mod segment;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::{
    customer::CustomerId,
    invoice::{Invoice, InvoiceId},
};
use crate::errors::ScoringError;

/// Per-customer totals shared by the RFM and CLTV scorers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CustomerActivity {
    pub last_purchase: NaiveDate,
    pub invoice_ids: BTreeSet<InvoiceId>,
    pub weight: Decimal,
    pub value: Decimal,
}

impl CustomerActivity {
    pub fn invoice_count(&self) -> u32 {
        u32::try_from(self.invoice_ids.len()).unwrap_or(u32::MAX)
    }
}

/// Adds `rhs` to `total`, reporting `metric` for `subject` when the sum
/// leaves the decimal range.
pub(crate) fn add_checked(
    total: &mut Decimal,
    rhs: Decimal,
    metric: &'static str,
    subject: &impl fmt::Display,
) -> Result<(), ScoringError> {
    *total = total
        .checked_add(rhs)
        .ok_or_else(|| ScoringError::Overflow { metric, subject: subject.to_string() })?;
    Ok(())
}

/// Groups invoices by customer, ordered by customer id.
pub(crate) fn activity_by_customer(
    invoices: &[Invoice],
) -> Result<BTreeMap<CustomerId, CustomerActivity>, ScoringError> {
    let mut grouped: BTreeMap<CustomerId, CustomerActivity> = BTreeMap::new();
    for invoice in invoices {
        let activity =
            grouped.entry(invoice.customer_id.clone()).or_insert_with(|| CustomerActivity {
                last_purchase: invoice.date,
                invoice_ids: BTreeSet::new(),
                weight: Decimal::ZERO,
                value: Decimal::ZERO,
            });
        activity.last_purchase = activity.last_purchase.max(invoice.date);
        activity.invoice_ids.insert(invoice.id.clone());
        add_checked(&mut activity.weight, invoice.weight, "weight", &invoice.customer_id)?;
        add_checked(&mut activity.value, invoice.value, "value", &invoice.customer_id)?;
    }
    Ok(grouped)
}

pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}


#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::fixtures::{date, invoice};
    use super::{activity_by_customer, contains_ignore_case};
    use crate::domain::customer::CustomerId;
    use crate::errors::ScoringError;

    #[test]
    fn activity_tracks_latest_date_and_distinct_invoices() {
        let invoices = vec![
            invoice("F1", "C1", date(2024, 1, 5), 10),
            invoice("F2", "C1", date(2024, 2, 10), 15),
            invoice("F3", "C2", date(2023, 12, 1), 7),
        ];

        let grouped = activity_by_customer(&invoices).expect("totals fit");
        let first = &grouped[&CustomerId::from("C1")];

        assert_eq!(grouped.len(), 2);
        assert_eq!(first.last_purchase, date(2024, 2, 10));
        assert_eq!(first.invoice_count(), 2);
        assert_eq!(first.value, Decimal::from(25));
    }

    #[test]
    fn customer_total_beyond_decimal_range_is_an_error() {
        let mut first = invoice("F1", "C1", date(2024, 1, 5), 0);
        first.value = Decimal::MAX;
        let second = invoice("F2", "C1", date(2024, 1, 6), 1);

        let error = activity_by_customer(&[first, second]).expect_err("sum overflows");

        assert_eq!(error, ScoringError::Overflow { metric: "value", subject: "C1".to_string() });
    }

    #[test]
    fn substring_match_ignores_case() {
        assert!(contains_ignore_case("Denge Boya Ltd", "boya"));
        assert!(contains_ignore_case("anything", ""));
        assert!(!contains_ignore_case("Denge", "acme"));
    }
}
