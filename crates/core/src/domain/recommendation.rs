use serde::{Deserialize, Serialize};

/// A row of the substitution sheet: a competitor product and one suggested replacement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationRow {
    pub product_name: String,
    pub recommended_product_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationGroup {
    pub product_name: String,
    pub recommended: Vec<String>,
}
