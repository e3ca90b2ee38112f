use cohort_core::config::AppConfig;
use cohort_core::loader::{load_line_items_file, load_recommendations_file};
use cohort_core::Dashboard;
use serde::Serialize;

use super::CommandResult;
use crate::GlobalArgs;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn skipped(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(global: &GlobalArgs, json_output: bool) -> CommandResult {
    let report = build_report(global);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult { exit_code, output };
    }

    CommandResult { exit_code, output: render_human(&report) }
}

fn build_report(global: &GlobalArgs) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(global.load_options()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            let sheets_ok = check_sheets(&config, &mut checks);
            if sheets_ok {
                checks.push(check_scoring(&config));
            } else {
                checks.push(DoctorCheck::skipped("scoring", "a source sheet did not load"));
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            let reason = "configuration did not load";
            checks.push(DoctorCheck::skipped("invoice_sheet", reason));
            checks.push(DoctorCheck::skipped("recommendation_sheet", reason));
            checks.push(DoctorCheck::skipped("scoring", reason));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_sheets(config: &AppConfig, checks: &mut Vec<DoctorCheck>) -> bool {
    let invoices_path = &config.data.invoices_path;
    let invoice_check = match load_line_items_file(invoices_path) {
        Ok(items) => DoctorCheck {
            name: "invoice_sheet",
            status: CheckStatus::Pass,
            details: format!("read {} line item(s) from `{}`", items.len(), invoices_path.display()),
        },
        Err(error) => {
            DoctorCheck { name: "invoice_sheet", status: CheckStatus::Fail, details: error.to_string() }
        }
    };

    let recommendations_path = &config.data.recommendations_path;
    let recommendation_check = match load_recommendations_file(recommendations_path) {
        Ok(rows) => DoctorCheck {
            name: "recommendation_sheet",
            status: CheckStatus::Pass,
            details: format!(
                "read {} recommendation row(s) from `{}`",
                rows.len(),
                recommendations_path.display()
            ),
        },
        Err(error) => DoctorCheck {
            name: "recommendation_sheet",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    };

    let ok = invoice_check.status == CheckStatus::Pass
        && recommendation_check.status == CheckStatus::Pass;
    checks.push(invoice_check);
    checks.push(recommendation_check);
    ok
}

fn check_scoring(config: &AppConfig) -> DoctorCheck {
    match Dashboard::load(config) {
        Ok(dashboard) => {
            let stats = dashboard.stats();
            DoctorCheck {
                name: "scoring",
                status: CheckStatus::Pass,
                details: format!(
                    "scored {} customer(s) from {} invoice(s) as of {}",
                    stats.customers, stats.invoices, config.scoring.reference_date
                ),
            }
        }
        Err(error) => DoctorCheck {
            name: "scoring",
            status: CheckStatus::Fail,
            details: format!("{} ({})", error, error.error_class()),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
