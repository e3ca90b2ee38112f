use serde::Serialize;

use super::{load_dashboard, CommandResult};
use crate::GlobalArgs;

#[derive(Debug, Serialize)]
struct CustomerSelectors {
    names: Vec<String>,
    years: Vec<i32>,
}

pub fn run(global: &GlobalArgs) -> CommandResult {
    let (_, dashboard) = match load_dashboard("customers", global) {
        Ok(loaded) => loaded,
        Err(result) => return result,
    };

    let selectors =
        CustomerSelectors { names: dashboard.customer_names(), years: dashboard.years() };
    let message = format!(
        "{} customer name(s) across {} year(s)",
        selectors.names.len(),
        selectors.years.len()
    );
    CommandResult::success_with_data("customers", message, Some(selectors))
}
