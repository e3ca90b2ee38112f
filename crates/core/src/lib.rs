pub mod analytics;
pub mod config;
pub mod dashboard;
pub mod domain;
pub mod errors;
pub mod export;
pub mod loader;

pub use analytics::{
    cltv::{CltvRecord, CltvSummary, CltvTable, CltvTier},
    monthly::{MonthPoint, MonthlySeries},
    names::Named,
    recommend::RecommendationTable,
    rfm::RfmRecord,
    segment::{Segment, SegmentLabel},
};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, ScoringConfig};
pub use dashboard::{Dashboard, DashboardStats, SegmentMatch};
pub use domain::customer::{Customer, CustomerId};
pub use domain::invoice::{Invoice, InvoiceId, LineItem};
pub use domain::recommendation::{RecommendationGroup, RecommendationRow};
pub use errors::{ApplicationError, InterfaceError, ScoringError};
pub use export::ExportError;
pub use loader::{load_recommendation_table, LoadError, SourceSnapshot};
