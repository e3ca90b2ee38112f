use cohort_core::errors::ApplicationError;
use cohort_core::load_recommendation_table;

use super::{load_config, CommandResult};
use crate::GlobalArgs;

/// Reads the recommendation sheet alone, so a failing invoice sheet or an
/// unscorable population does not block the lookup. Without a product part
/// the whole grouped table is returned.
pub fn run(global: &GlobalArgs, product_part: Option<&str>) -> CommandResult {
    let config = match load_config("recommend", global) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let table = match load_recommendation_table(&config.data) {
        Ok(table) => table,
        Err(error) => {
            return CommandResult::from_error("recommend", &ApplicationError::from(error));
        }
    };

    let Some(product_part) = product_part else {
        let groups = table.groups().to_vec();
        let message = format!("{} competitor product(s) in the table", groups.len());
        return CommandResult::success_with_data("recommend", message, Some(groups));
    };

    let groups = table.lookup(product_part);
    let message = if groups.is_empty() {
        format!("no competitor product contains `{product_part}`")
    } else {
        format!("{} competitor product(s) matched `{product_part}`", groups.len())
    };
    CommandResult::success_with_data("recommend", message, Some(groups))
}
