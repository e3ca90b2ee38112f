use cohort_core::errors::ApplicationError;

use super::{load_dashboard, CommandResult};
use crate::GlobalArgs;

pub fn run(global: &GlobalArgs, customer_name: &str, year: i32) -> CommandResult {
    if customer_name.trim().is_empty() {
        let error = ApplicationError::InvalidQuery("customer name must not be empty".to_string());
        return CommandResult::from_error("monthly", &error);
    }

    let (_, dashboard) = match load_dashboard("monthly", global) {
        Ok(loaded) => loaded,
        Err(result) => return result,
    };

    let series = dashboard.monthly_purchases(customer_name, year);
    let message = if series.total() == 0 {
        format!("no invoices for `{customer_name}` in {year}")
    } else {
        format!("{} invoice(s) for `{customer_name}` in {year}", series.total())
    };
    CommandResult::success_with_data("monthly", message, Some(series))
}
