//! CSV loaders for the invoice and recommendation sheets.
//!
//! Each sheet is validated against a fixed column schema before any row is
//! read, so a missing column fails the whole load up front. Cells are trimmed
//! and parsed into their semantic type; the first unparseable cell aborts the
//! load with its line number.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use crate::analytics::recommend::RecommendationTable;
use crate::config::DataConfig;
use crate::domain::{
    customer::CustomerId,
    invoice::{InvoiceId, LineItem},
    recommendation::RecommendationRow,
};

pub const INVOICE_SHEET: &str = "invoice";
pub const RECOMMENDATION_SHEET: &str = "recommendation";

pub const COL_INVOICE: &str = "Fatura";
pub const COL_CUSTOMER_ID: &str = "Cari";
pub const COL_CUSTOMER_NAME: &str = "Ad";
pub const COL_DATE: &str = "Tarih";
pub const COL_PRODUCT: &str = "Urun";
pub const COL_WEIGHT: &str = "Kg";
pub const COL_VALUE: &str = "Tutar";

pub const COL_COMPETITOR_PRODUCT: &str = "UrunAdi";
pub const COL_RECOMMENDED_PRODUCT: &str = "OnerilenUrunAdi";

pub const INVOICE_COLUMNS: [&str; 7] = [
    COL_INVOICE,
    COL_CUSTOMER_ID,
    COL_CUSTOMER_NAME,
    COL_DATE,
    COL_PRODUCT,
    COL_WEIGHT,
    COL_VALUE,
];

pub const RECOMMENDATION_COLUMNS: [&str; 2] = [COL_COMPETITOR_PRODUCT, COL_RECOMMENDED_PRODUCT];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not open `{path}`: {source}")]
    Open { path: PathBuf, source: std::io::Error },
    #[error("could not read {sheet} sheet: {source}")]
    Csv { sheet: &'static str, source: csv::Error },
    #[error("{sheet} sheet is missing required column `{column}`")]
    MissingColumn { sheet: &'static str, column: &'static str },
    #[error("{sheet} sheet line {line}: column `{column}` is empty")]
    EmptyCell { sheet: &'static str, line: u64, column: &'static str },
    #[error("{sheet} sheet line {line}: column `{column}` is not a valid {expected}: `{value}`")]
    MalformedCell {
        sheet: &'static str,
        line: u64,
        column: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Both sheets of one source snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceSnapshot {
    pub line_items: Vec<LineItem>,
    pub recommendations: Vec<RecommendationRow>,
}

impl SourceSnapshot {
    pub fn load(data: &DataConfig) -> Result<Self, LoadError> {
        let line_items = load_line_items_file(&data.invoices_path)?;
        let recommendations = load_recommendations_file(&data.recommendations_path)?;
        Ok(Self { line_items, recommendations })
    }
}

/// Reads only the recommendation sheet; the invoice sheet is not touched.
pub fn load_recommendation_table(data: &DataConfig) -> Result<RecommendationTable, LoadError> {
    let rows = load_recommendations_file(&data.recommendations_path)?;
    Ok(RecommendationTable::from_rows(&rows))
}

struct Schema {
    sheet: &'static str,
    index: HashMap<&'static str, usize>,
}

impl Schema {
    fn resolve(
        sheet: &'static str,
        headers: &StringRecord,
        required: &[&'static str],
    ) -> Result<Self, LoadError> {
        let mut index = HashMap::with_capacity(required.len());
        for column in required {
            let position = headers
                .iter()
                .position(|header| header.trim_start_matches('\u{feff}').trim() == *column)
                .ok_or(LoadError::MissingColumn { sheet, column })?;
            index.insert(*column, position);
        }
        Ok(Self { sheet, index })
    }

    fn text<'r>(
        &self,
        record: &'r StringRecord,
        line: u64,
        column: &'static str,
    ) -> Result<&'r str, LoadError> {
        let value = self
            .index
            .get(column)
            .and_then(|position| record.get(*position))
            .map(str::trim)
            .unwrap_or("");
        if value.is_empty() {
            return Err(LoadError::EmptyCell { sheet: self.sheet, line, column });
        }
        Ok(value)
    }

    fn date(
        &self,
        record: &StringRecord,
        line: u64,
        column: &'static str,
    ) -> Result<NaiveDate, LoadError> {
        let raw = self.text(record, line, column)?;
        parse_date(raw).ok_or_else(|| LoadError::MalformedCell {
            sheet: self.sheet,
            line,
            column,
            expected: "date",
            value: raw.to_string(),
        })
    }

    fn decimal(
        &self,
        record: &StringRecord,
        line: u64,
        column: &'static str,
    ) -> Result<Decimal, LoadError> {
        let raw = self.text(record, line, column)?;
        parse_decimal(raw).ok_or_else(|| LoadError::MalformedCell {
            sheet: self.sheet,
            line,
            column,
            expected: "decimal",
            value: raw.to_string(),
        })
    }
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new().has_headers(true).flexible(true).from_reader(input)
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|position| position.line()).unwrap_or(0)
}

pub fn load_line_items<R: Read>(input: R) -> Result<Vec<LineItem>, LoadError> {
    let sheet = INVOICE_SHEET;
    let mut csv_reader = reader(input);
    let headers = csv_reader.headers().map_err(|source| LoadError::Csv { sheet, source })?.clone();
    let schema = Schema::resolve(sheet, &headers, &INVOICE_COLUMNS)?;

    let mut items = Vec::new();
    for result in csv_reader.records() {
        let record = result.map_err(|source| LoadError::Csv { sheet, source })?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let line = line_of(&record);
        items.push(LineItem {
            invoice_id: InvoiceId(schema.text(&record, line, COL_INVOICE)?.to_string()),
            customer_id: CustomerId(schema.text(&record, line, COL_CUSTOMER_ID)?.to_string()),
            customer_name: schema.text(&record, line, COL_CUSTOMER_NAME)?.to_string(),
            date: schema.date(&record, line, COL_DATE)?,
            product: schema.text(&record, line, COL_PRODUCT)?.to_string(),
            weight: schema.decimal(&record, line, COL_WEIGHT)?,
            value: schema.decimal(&record, line, COL_VALUE)?,
        });
    }

    Ok(items)
}

pub fn load_recommendations<R: Read>(input: R) -> Result<Vec<RecommendationRow>, LoadError> {
    let sheet = RECOMMENDATION_SHEET;
    let mut csv_reader = reader(input);
    let headers = csv_reader.headers().map_err(|source| LoadError::Csv { sheet, source })?.clone();
    let schema = Schema::resolve(sheet, &headers, &RECOMMENDATION_COLUMNS)?;

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result.map_err(|source| LoadError::Csv { sheet, source })?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let line = line_of(&record);
        rows.push(RecommendationRow {
            product_name: schema.text(&record, line, COL_COMPETITOR_PRODUCT)?.to_string(),
            recommended_product_name: schema
                .text(&record, line, COL_RECOMMENDED_PRODUCT)?
                .to_string(),
        });
    }

    Ok(rows)
}

pub fn load_line_items_file(path: &Path) -> Result<Vec<LineItem>, LoadError> {
    let file = File::open(path)
        .map_err(|source| LoadError::Open { path: path.to_path_buf(), source })?;
    let items = load_line_items(file)?;
    info!(
        event_name = "cohort.load.invoices",
        path = %path.display(),
        rows = items.len(),
        "invoice sheet loaded"
    );
    Ok(items)
}

pub fn load_recommendations_file(path: &Path) -> Result<Vec<RecommendationRow>, LoadError> {
    let file = File::open(path)
        .map_err(|source| LoadError::Open { path: path.to_path_buf(), source })?;
    let rows = load_recommendations(file)?;
    info!(
        event_name = "cohort.load.recommendations",
        path = %path.display(),
        rows = rows.len(),
        "recommendation sheet loaded"
    );
    Ok(rows)
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").ok().map(|value| value.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").ok().map(|value| value.date())
        })
        .or_else(|| NaiveDate::parse_from_str(raw, "%d.%m.%Y").ok())
}

pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if let Ok(value) = Decimal::from_str(raw) {
        return Some(value);
    }
    // Comma as the decimal separator, as exported by Turkish-locale spreadsheets.
    if !raw.contains('.') && raw.matches(',').count() == 1 {
        return Decimal::from_str(&raw.replace(',', ".")).ok();
    }
    None
}
