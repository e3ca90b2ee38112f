use std::path::PathBuf;

use cohort_core::errors::ApplicationError;
use serde::Serialize;
use tracing::info;

use super::{load_dashboard, CommandResult};
use crate::GlobalArgs;

#[derive(Debug, Serialize)]
struct ExportSummary {
    path: String,
    rows: usize,
    delimiter: char,
}

pub fn run(global: &GlobalArgs, output: Option<PathBuf>, delimiter: Option<char>) -> CommandResult {
    let (mut config, dashboard) = match load_dashboard("export-rfm", global) {
        Ok(loaded) => loaded,
        Err(result) => return result,
    };

    if let Some(output) = output {
        config.export.rfm_path = output;
    }
    if let Some(delimiter) = delimiter {
        config.export.delimiter = delimiter;
    }
    if let Err(error) = config.validate() {
        return CommandResult::from_error("export-rfm", &ApplicationError::from(error));
    }

    match dashboard.export_rfm(&config) {
        Ok(rows) => {
            let summary = ExportSummary {
                path: config.export.rfm_path.display().to_string(),
                rows,
                delimiter: config.export.delimiter,
            };
            info!(
                event_name = "cohort.cli.export_rfm",
                path = %summary.path,
                rows,
                "rfm table exported"
            );
            let message = format!("wrote {rows} rfm row(s) to `{}`", summary.path);
            CommandResult::success_with_data("export-rfm", message, Some(summary))
        }
        Err(error) => CommandResult::from_error("export-rfm", &error),
    }
}
