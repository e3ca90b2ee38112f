use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analytics::{activity_by_customer, quantile::quantile_buckets};
use crate::domain::{customer::CustomerId, invoice::Invoice};
use crate::errors::ScoringError;

pub const CLTV_BUCKETS: usize = 4;

pub const DEFAULT_PROFIT_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Lifetime-value tier, `D` lowest through `A` highest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CltvTier {
    D,
    C,
    B,
    A,
}

impl CltvTier {
    const ASCENDING: [Self; CLTV_BUCKETS] = [Self::D, Self::C, Self::B, Self::A];

    fn from_bucket(bucket: usize) -> Self {
        Self::ASCENDING[bucket.min(CLTV_BUCKETS - 1)]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::D => "D",
            Self::C => "C",
            Self::B => "B",
            Self::A => "A",
        }
    }
}

impl fmt::Display for CltvTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CltvRecord {
    pub customer_id: CustomerId,
    pub total_transaction: u32,
    pub total_unit: Decimal,
    pub value: Decimal,
    pub avg_order_value: Decimal,
    pub purchase_frequency: Decimal,
    pub profit_margin: Decimal,
    pub customer_value: Decimal,
    pub cltv: Decimal,
    pub tier: CltvTier,
}

/// Run-wide figures shared by every record of one scoring pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CltvSummary {
    pub customers: usize,
    pub repeat_customers: usize,
    pub repeat_rate: Decimal,
    pub churn_rate: Decimal,
    pub profit_rate: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CltvTable {
    pub summary: CltvSummary,
    pub records: Vec<CltvRecord>,
}

pub fn score_cltv(invoices: &[Invoice], profit_rate: Decimal) -> Result<CltvTable, ScoringError> {
    let activity = activity_by_customer(invoices)?;
    let customers = activity.len();
    if customers == 0 {
        return Err(ScoringError::InsufficientPopulation {
            metric: "cltv",
            required: CLTV_BUCKETS,
            available: 0,
        });
    }

    let population = Decimal::from(customers);
    let repeat_customers = activity.values().filter(|totals| totals.invoice_count() > 1).count();
    let repeat_rate = Decimal::from(repeat_customers) / population;
    let churn_rate = Decimal::ONE - repeat_rate;
    if churn_rate.is_zero() {
        return Err(ScoringError::ZeroChurnRate);
    }

    let mut records = Vec::with_capacity(customers);
    for (customer_id, totals) in activity {
        let overflow = |metric: &'static str| ScoringError::Overflow {
            metric,
            subject: customer_id.to_string(),
        };
        let total_transaction = totals.invoice_count();
        let transactions = Decimal::from(total_transaction);
        let avg_order_value =
            totals.value.checked_div(transactions).ok_or_else(|| overflow("avg_order_value"))?;
        let purchase_frequency =
            transactions.checked_div(population).ok_or_else(|| overflow("purchase_frequency"))?;
        let profit_margin =
            totals.value.checked_mul(profit_rate).ok_or_else(|| overflow("profit_margin"))?;
        let customer_value = avg_order_value
            .checked_mul(purchase_frequency)
            .ok_or_else(|| overflow("customer_value"))?;
        let cltv = customer_value
            .checked_div(churn_rate)
            .and_then(|scaled| scaled.checked_mul(profit_margin))
            .ok_or_else(|| overflow("cltv"))?;

        records.push(CltvRecord {
            customer_id,
            total_transaction,
            total_unit: totals.weight,
            value: totals.value,
            avg_order_value,
            purchase_frequency,
            profit_margin,
            customer_value,
            cltv,
            tier: CltvTier::D,
        });
    }

    let values: Vec<Decimal> = records.iter().map(|record| record.cltv).collect();
    let buckets = quantile_buckets("cltv", &values, CLTV_BUCKETS)?;
    for (record, bucket) in records.iter_mut().zip(buckets) {
        record.tier = CltvTier::from_bucket(bucket);
    }

    info!(
        event_name = "cohort.score.cltv",
        customers,
        repeat_customers,
        churn_rate = %churn_rate,
        profit_rate = %profit_rate,
        "cltv table scored"
    );

    Ok(CltvTable {
        summary: CltvSummary { customers, repeat_customers, repeat_rate, churn_rate, profit_rate },
        records,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{score_cltv, CltvTier, DEFAULT_PROFIT_RATE};
    use crate::analytics::fixtures::{date, invoice};
    use crate::domain::invoice::Invoice;
    use crate::errors::ScoringError;

    fn book() -> Vec<Invoice> {
        vec![
            invoice("F1", "C1", date(2024, 1, 5), 100),
            invoice("F2", "C1", date(2024, 2, 10), 300),
            invoice("F3", "C2", date(2024, 1, 7), 50),
            invoice("F4", "C3", date(2024, 1, 8), 200),
            invoice("F5", "C4", date(2024, 1, 9), 10),
        ]
    }

    #[test]
    fn default_profit_rate_is_ten_percent() {
        assert_eq!(DEFAULT_PROFIT_RATE, Decimal::new(10, 2));
    }

    #[test]
    fn lifetime_value_follows_the_formula() {
        let table = score_cltv(&book(), DEFAULT_PROFIT_RATE).expect("scored");
        let first = &table.records[0];

        // 1 of 4 customers repeats: churn = 0.75
        assert_eq!(table.summary.customers, 4);
        assert_eq!(table.summary.repeat_customers, 1);
        assert_eq!(table.summary.churn_rate, Decimal::new(75, 2));

        assert_eq!(first.customer_id.0, "C1");
        assert_eq!(first.total_transaction, 2);
        assert_eq!(first.total_unit, Decimal::from(2));
        assert_eq!(first.avg_order_value, Decimal::from(200));
        assert_eq!(first.purchase_frequency, Decimal::new(5, 1));
        assert_eq!(first.profit_margin, Decimal::from(40));
        assert_eq!(first.customer_value, Decimal::from(100));
        // (100 / 0.75) * 40
        assert_eq!(first.cltv.round_dp(6), Decimal::new(5_333_333_333, 6));
    }

    #[test]
    fn tiers_run_from_d_to_a_by_lifetime_value() {
        let table = score_cltv(&book(), DEFAULT_PROFIT_RATE).expect("scored");
        let tiers: Vec<(String, CltvTier)> = table
            .records
            .iter()
            .map(|record| (record.customer_id.0.clone(), record.tier))
            .collect();

        assert_eq!(
            tiers,
            vec![
                ("C1".to_string(), CltvTier::A),
                ("C2".to_string(), CltvTier::C),
                ("C3".to_string(), CltvTier::B),
                ("C4".to_string(), CltvTier::D),
            ]
        );
    }

    #[test]
    fn all_repeat_customers_report_zero_churn() {
        let invoices = vec![
            invoice("F1", "C1", date(2024, 1, 5), 10),
            invoice("F2", "C1", date(2024, 1, 6), 10),
            invoice("F3", "C2", date(2024, 1, 7), 10),
            invoice("F4", "C2", date(2024, 1, 8), 10),
        ];

        let error = score_cltv(&invoices, DEFAULT_PROFIT_RATE).expect_err("churn is zero");

        assert_eq!(error, ScoringError::ZeroChurnRate);
    }

    #[test]
    fn fewer_than_four_customers_cannot_be_tiered() {
        let invoices = book().into_iter().take(4).collect::<Vec<_>>();

        let error = score_cltv(&invoices, DEFAULT_PROFIT_RATE).expect_err("three customers");

        assert!(matches!(
            error,
            ScoringError::InsufficientPopulation { metric: "cltv", required: 4, available: 3 }
        ));
    }

    #[test]
    fn lifetime_value_beyond_decimal_range_is_an_error() {
        let mut invoices = book();
        invoices[0].value = Decimal::from(10_000_000_000_000_000_i64);

        let error = score_cltv(&invoices, DEFAULT_PROFIT_RATE).expect_err("cltv overflows");

        assert_eq!(
            error,
            ScoringError::Overflow { metric: "cltv", subject: "C1".to_string() }
        );
    }

    #[test]
    fn empty_book_is_insufficient() {
        let error = score_cltv(&[], DEFAULT_PROFIT_RATE).expect_err("no customers");

        assert!(matches!(error, ScoringError::InsufficientPopulation { available: 0, .. }));
    }
}
