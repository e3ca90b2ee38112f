//! One scored snapshot of the source sheets and the queries run against it.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analytics::{
    aggregate::aggregate_invoices,
    cltv::{score_cltv, CltvRecord, CltvSummary, CltvTier},
    contains_ignore_case,
    monthly::{distinct_names, distinct_years, monthly_purchases, MonthlySeries},
    names::{attach_names, customer_directory, Named},
    recommend::RecommendationTable,
    rfm::{score_rfm, RfmRecord},
    segment::SegmentLabel,
};
use crate::config::{AppConfig, ScoringConfig};
use crate::domain::{
    customer::CustomerId,
    invoice::{Invoice, LineItem},
    recommendation::{RecommendationGroup, RecommendationRow},
};
use crate::errors::{ApplicationError, ScoringError};
use crate::export::write_rfm_file;
use crate::loader::SourceSnapshot;

/// A customer whose display name matched a segment lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMatch {
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub rfm_segment: SegmentLabel,
    pub cltv_tier: Option<CltvTier>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub invoices: usize,
    pub customers: usize,
    pub recommendation_groups: usize,
}

#[derive(Clone, Debug)]
pub struct Dashboard {
    scoring: ScoringConfig,
    invoices: Vec<Invoice>,
    rfm: Vec<Named<RfmRecord>>,
    cltv: Vec<Named<CltvRecord>>,
    cltv_summary: CltvSummary,
    tiers: HashMap<CustomerId, CltvTier>,
    recommendations: RecommendationTable,
}

impl Dashboard {
    /// Runs the whole pipeline over one snapshot. Either every table is
    /// scored or the build fails; there is no partially scored dashboard.
    pub fn build(
        line_items: &[LineItem],
        recommendation_rows: &[RecommendationRow],
        scoring: &ScoringConfig,
    ) -> Result<Self, ScoringError> {
        let invoices = aggregate_invoices(line_items)?;
        let rfm_records = score_rfm(&invoices, scoring.reference_date)?;
        let cltv_table = score_cltv(&invoices, scoring.profit_rate)?;

        let directory = customer_directory(&invoices);
        let tiers = cltv_table
            .records
            .iter()
            .map(|record| (record.customer_id.clone(), record.tier))
            .collect();
        let rfm = attach_names(&rfm_records, &directory);
        let cltv = attach_names(&cltv_table.records, &directory);
        let recommendations = RecommendationTable::from_rows(recommendation_rows);

        info!(
            event_name = "cohort.dashboard.built",
            line_items = line_items.len(),
            invoices = invoices.len(),
            customers = cltv_table.summary.customers,
            recommendation_groups = recommendations.len(),
            "dashboard snapshot built"
        );

        Ok(Self {
            scoring: scoring.clone(),
            invoices,
            rfm,
            cltv,
            cltv_summary: cltv_table.summary,
            tiers,
            recommendations,
        })
    }

    pub fn from_snapshot(
        snapshot: &SourceSnapshot,
        scoring: &ScoringConfig,
    ) -> Result<Self, ScoringError> {
        Self::build(&snapshot.line_items, &snapshot.recommendations, scoring)
    }

    /// Loads both configured sheets and scores them.
    pub fn load(config: &AppConfig) -> Result<Self, ApplicationError> {
        let snapshot = SourceSnapshot::load(&config.data)?;
        Ok(Self::from_snapshot(&snapshot, &config.scoring)?)
    }

    /// Customers whose display name contains `name_part`, ignoring case.
    /// No match is an empty vector.
    pub fn lookup_segment(&self, name_part: &str) -> Vec<SegmentMatch> {
        self.rfm
            .iter()
            .filter_map(|row| {
                let name = row.customer_name.as_deref()?;
                contains_ignore_case(name, name_part).then(|| SegmentMatch {
                    customer_id: row.record.customer_id.clone(),
                    customer_name: name.to_string(),
                    rfm_segment: row.record.segment.clone(),
                    cltv_tier: self.tiers.get(&row.record.customer_id).copied(),
                })
            })
            .collect()
    }

    pub fn monthly_purchases(&self, customer_name: &str, year: i32) -> MonthlySeries {
        monthly_purchases(&self.invoices, customer_name, year)
    }

    pub fn recommend(&self, product_part: &str) -> Vec<RecommendationGroup> {
        self.recommendations.lookup(product_part)
    }

    pub fn customer_names(&self) -> Vec<String> {
        distinct_names(&self.invoices)
    }

    pub fn years(&self) -> Vec<i32> {
        distinct_years(&self.invoices)
    }

    pub fn recommendations(&self) -> &RecommendationTable {
        &self.recommendations
    }

    pub fn invoices(&self) -> &[Invoice] {
        &self.invoices
    }

    pub fn rfm(&self) -> &[Named<RfmRecord>] {
        &self.rfm
    }

    pub fn cltv(&self) -> &[Named<CltvRecord>] {
        &self.cltv
    }

    pub fn cltv_summary(&self) -> &CltvSummary {
        &self.cltv_summary
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    /// RFM records without the name join, one per customer.
    pub fn rfm_records(&self) -> Vec<RfmRecord> {
        let mut seen = HashSet::new();
        self.rfm
            .iter()
            .filter(|row| seen.insert(&row.record.customer_id))
            .map(|row| row.record.clone())
            .collect()
    }

    pub fn export_rfm(&self, config: &AppConfig) -> Result<usize, ApplicationError> {
        let records = self.rfm_records();
        write_rfm_file(&config.export.rfm_path, &records, config.export.delimiter_byte())?;
        Ok(records.len())
    }

    pub fn stats(&self) -> DashboardStats {
        DashboardStats {
            invoices: self.invoices.len(),
            customers: self.cltv_summary.customers,
            recommendation_groups: self.recommendations.len(),
        }
    }
}
