//! Flat delimited export of the RFM table.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::analytics::rfm::RfmRecord;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not create export file `{path}`: {source}")]
    Create { path: PathBuf, source: std::io::Error },
    #[error("could not write export row: {0}")]
    Write(#[from] csv::Error),
    #[error("could not flush export: {0}")]
    Flush(#[source] std::io::Error),
}

#[derive(Serialize)]
struct RfmExportRow<'a> {
    customer_id: &'a str,
    recency: i64,
    frequency: u32,
    monetary: Decimal,
    recency_score: u8,
    frequency_score: u8,
    monetary_score: u8,
    #[serde(rename = "RFM_SCORE")]
    rfm_score: &'a str,
    segment: String,
}

impl<'a> From<&'a RfmRecord> for RfmExportRow<'a> {
    fn from(record: &'a RfmRecord) -> Self {
        Self {
            customer_id: &record.customer_id.0,
            recency: record.recency,
            frequency: record.frequency,
            monetary: record.monetary,
            recency_score: record.recency_score,
            frequency_score: record.frequency_score,
            monetary_score: record.monetary_score,
            rfm_score: &record.rfm_score,
            segment: record.segment.to_string(),
        }
    }
}

pub fn write_rfm<W: Write>(
    output: W,
    records: &[RfmRecord],
    delimiter: u8,
) -> Result<(), ExportError> {
    let mut writer = csv::WriterBuilder::new().delimiter(delimiter).from_writer(output);
    for record in records {
        writer.serialize(RfmExportRow::from(record))?;
    }
    writer.flush().map_err(ExportError::Flush)
}

pub fn write_rfm_file(path: &Path, records: &[RfmRecord], delimiter: u8) -> Result<(), ExportError> {
    let file = File::create(path)
        .map_err(|source| ExportError::Create { path: path.to_path_buf(), source })?;
    write_rfm(file, records, delimiter)?;
    info!(
        event_name = "cohort.export.rfm",
        path = %path.display(),
        rows = records.len(),
        "rfm table exported"
    );
    Ok(())
}
