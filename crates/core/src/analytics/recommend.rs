use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analytics::contains_ignore_case;
use crate::domain::recommendation::{RecommendationGroup, RecommendationRow};

/// Competitor products grouped with the products suggested in their place.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationTable {
    groups: Vec<RecommendationGroup>,
}

impl RecommendationTable {
    /// Groups rows by product name (ascending). Suggestions keep source order
    /// and duplicates.
    pub fn from_rows(rows: &[RecommendationRow]) -> Self {
        let mut grouped: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for row in rows {
            grouped
                .entry(row.product_name.as_str())
                .or_default()
                .push(row.recommended_product_name.clone());
        }

        let groups = grouped
            .into_iter()
            .map(|(product_name, recommended)| RecommendationGroup {
                product_name: product_name.to_string(),
                recommended,
            })
            .collect();
        Self { groups }
    }

    pub fn groups(&self) -> &[RecommendationGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Case-insensitive substring search over product names. No match is an
    /// empty vector.
    pub fn lookup(&self, product_part: &str) -> Vec<RecommendationGroup> {
        self.groups
            .iter()
            .filter(|group| contains_ignore_case(&group.product_name, product_part))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::RecommendationTable;
    use crate::domain::recommendation::RecommendationRow;

    fn row(product: &str, recommended: &str) -> RecommendationRow {
        RecommendationRow {
            product_name: product.to_string(),
            recommended_product_name: recommended.to_string(),
        }
    }

    fn table() -> RecommendationTable {
        RecommendationTable::from_rows(&[
            row("Rakip Boya 2.5L", "Denge Boya 2.5L"),
            row("Acme Tiner", "Denge Tiner"),
            row("Rakip Boya 2.5L", "Denge Astar"),
            row("Rakip Boya 2.5L", "Denge Boya 2.5L"),
        ])
    }

    #[test]
    fn rows_group_by_product_keeping_order_and_duplicates() {
        let table = table();

        assert_eq!(table.len(), 2);
        assert_eq!(table.groups()[0].product_name, "Acme Tiner");
        assert_eq!(
            table.groups()[1].recommended,
            vec!["Denge Boya 2.5L", "Denge Astar", "Denge Boya 2.5L"]
        );
    }

    #[test]
    fn lookup_matches_substrings_case_insensitively() {
        let matches = table().lookup("boya");

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].product_name, "Rakip Boya 2.5L");
    }

    #[test]
    fn unknown_product_returns_empty_result() {
        assert!(table().lookup("vernik").is_empty());
    }

    #[test]
    fn empty_table_has_no_matches() {
        let table = RecommendationTable::from_rows(&[]);

        assert!(table.is_empty());
        assert!(table.lookup("").is_empty());
    }
}
