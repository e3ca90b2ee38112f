use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analytics::{
    activity_by_customer,
    quantile::{ascending_scores, descending_scores},
    segment::{classify, rfm_code, SegmentLabel},
};
use crate::domain::{customer::CustomerId, invoice::Invoice};
use crate::errors::ScoringError;

pub const RFM_BUCKETS: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfmRecord {
    pub customer_id: CustomerId,
    /// Days between the reference date and the latest invoice.
    pub recency: i64,
    /// Invoices for this customer in the snapshot.
    pub frequency: u32,
    pub monetary: Decimal,
    pub recency_score: u8,
    pub frequency_score: u8,
    pub monetary_score: u8,
    pub rfm_score: String,
    pub segment: SegmentLabel,
}

/// Scores every customer on recency, frequency and monetary value.
///
/// Records come back ordered by customer id, which is also the tie-breaking
/// order for the quantile cuts.
pub fn score_rfm(
    invoices: &[Invoice],
    reference_date: NaiveDate,
) -> Result<Vec<RfmRecord>, ScoringError> {
    let activity = activity_by_customer(invoices)?;

    let mut customers = Vec::with_capacity(activity.len());
    let mut recency = Vec::with_capacity(activity.len());
    let mut frequency = Vec::with_capacity(activity.len());
    let mut monetary = Vec::with_capacity(activity.len());
    for (customer_id, totals) in activity {
        let days = (reference_date - totals.last_purchase).num_days();
        if days < 0 {
            warn!(
                event_name = "cohort.score.rfm.future_invoice",
                customer_id = %customer_id,
                last_purchase = %totals.last_purchase,
                reference_date = %reference_date,
                "latest invoice is after the reference date; recency is negative"
            );
        }
        customers.push(customer_id);
        recency.push(days);
        frequency.push(totals.invoice_count());
        monetary.push(totals.value);
    }

    let recency_scores = descending_scores("recency", &recency, RFM_BUCKETS)?;
    let frequency_scores = ascending_scores("frequency", &frequency, RFM_BUCKETS)?;
    let monetary_scores = ascending_scores("monetary", &monetary, RFM_BUCKETS)?;

    let records: Vec<RfmRecord> = customers
        .into_iter()
        .enumerate()
        .map(|(index, customer_id)| {
            let recency_score = recency_scores[index];
            let frequency_score = frequency_scores[index];
            RfmRecord {
                customer_id,
                recency: recency[index],
                frequency: frequency[index],
                monetary: monetary[index],
                recency_score,
                frequency_score,
                monetary_score: monetary_scores[index],
                rfm_score: rfm_code(recency_score, frequency_score),
                segment: classify(recency_score, frequency_score),
            }
        })
        .collect();

    info!(
        event_name = "cohort.score.rfm",
        customers = records.len(),
        reference_date = %reference_date,
        "rfm table scored"
    );
    Ok(records)
}
