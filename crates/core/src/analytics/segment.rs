use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Hibernating,
    AtRisk,
    CantLoose,
    AboutToSleep,
    NeedAttention,
    LoyalCustomers,
    Promising,
    NewCustomers,
    PotentialLoyalists,
    Champions,
}

impl Segment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hibernating => "hibernating",
            Self::AtRisk => "at_risk",
            Self::CantLoose => "cant_loose",
            Self::AboutToSleep => "about_to_sleep",
            Self::NeedAttention => "need_attention",
            Self::LoyalCustomers => "loyal_customers",
            Self::Promising => "promising",
            Self::NewCustomers => "new_customers",
            Self::PotentialLoyalists => "potential_loyalists",
            Self::Champions => "champions",
        }
    }
}

/// A segment name, or the raw two-digit code when no rule claimed it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SegmentLabel {
    Named(Segment),
    Unmatched(String),
}

impl fmt::Display for SegmentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(segment) => f.write_str(segment.as_str()),
            Self::Unmatched(code) => f.write_str(code),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentRule {
    pub recency: RangeInclusive<u8>,
    pub frequency: RangeInclusive<u8>,
    pub segment: Segment,
}

impl SegmentRule {
    const fn new(recency: RangeInclusive<u8>, frequency: RangeInclusive<u8>, segment: Segment) -> Self {
        Self { recency, frequency, segment }
    }

    pub fn matches(&self, recency_score: u8, frequency_score: u8) -> bool {
        self.recency.contains(&recency_score) && self.frequency.contains(&frequency_score)
    }
}

/// Evaluated top to bottom; the first matching rule names the segment.
pub const SEGMENT_RULES: [SegmentRule; 10] = [
    SegmentRule::new(1..=2, 1..=2, Segment::Hibernating),
    SegmentRule::new(1..=2, 3..=4, Segment::AtRisk),
    SegmentRule::new(1..=2, 5..=5, Segment::CantLoose),
    SegmentRule::new(3..=3, 1..=2, Segment::AboutToSleep),
    SegmentRule::new(3..=3, 3..=3, Segment::NeedAttention),
    SegmentRule::new(3..=4, 4..=5, Segment::LoyalCustomers),
    SegmentRule::new(4..=4, 1..=1, Segment::Promising),
    SegmentRule::new(5..=5, 1..=1, Segment::NewCustomers),
    SegmentRule::new(4..=5, 2..=3, Segment::PotentialLoyalists),
    SegmentRule::new(5..=5, 4..=5, Segment::Champions),
];

pub fn rfm_code(recency_score: u8, frequency_score: u8) -> String {
    format!("{recency_score}{frequency_score}")
}

pub fn classify(recency_score: u8, frequency_score: u8) -> SegmentLabel {
    SEGMENT_RULES
        .iter()
        .find(|rule| rule.matches(recency_score, frequency_score))
        .map(|rule| SegmentLabel::Named(rule.segment))
        .unwrap_or_else(|| SegmentLabel::Unmatched(rfm_code(recency_score, frequency_score)))
}

#[cfg(test)]
mod tests {
    use super::{classify, rfm_code, Segment, SegmentLabel};

    #[test]
    fn every_score_pair_maps_to_a_named_segment() {
        for recency in 1..=5 {
            for frequency in 1..=5 {
                let label = classify(recency, frequency);
                assert!(
                    matches!(label, SegmentLabel::Named(_)),
                    "{} should be covered by a rule",
                    rfm_code(recency, frequency)
                );
            }
        }
    }

    #[test]
    fn rule_table_matches_reference_grid() {
        use Segment::*;
        // Rows are recency 1..5, columns frequency 1..5.
        let grid = [
            [Hibernating, Hibernating, AtRisk, AtRisk, CantLoose],
            [Hibernating, Hibernating, AtRisk, AtRisk, CantLoose],
            [AboutToSleep, AboutToSleep, NeedAttention, LoyalCustomers, LoyalCustomers],
            [Promising, PotentialLoyalists, PotentialLoyalists, LoyalCustomers, LoyalCustomers],
            [NewCustomers, PotentialLoyalists, PotentialLoyalists, Champions, Champions],
        ];

        for (r, row) in grid.iter().enumerate() {
            for (f, expected) in row.iter().enumerate() {
                let label = classify(r as u8 + 1, f as u8 + 1);
                assert_eq!(label, SegmentLabel::Named(*expected), "code {}{}", r + 1, f + 1);
            }
        }
    }

    #[test]
    fn out_of_range_scores_pass_the_raw_code_through() {
        assert_eq!(classify(0, 3), SegmentLabel::Unmatched("03".to_string()));
        assert_eq!(classify(6, 1).to_string(), "61");
    }

    #[test]
    fn labels_serialize_as_plain_strings() {
        let named = serde_json::to_string(&SegmentLabel::Named(Segment::CantLoose))
            .expect("label should serialize");
        let raw = serde_json::to_string(&SegmentLabel::Unmatched("07".to_string()))
            .expect("label should serialize");

        assert_eq!(named, "\"cant_loose\"");
        assert_eq!(raw, "\"07\"");
    }
}
