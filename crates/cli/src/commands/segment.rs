use super::{load_dashboard, CommandResult};
use crate::GlobalArgs;

pub fn run(global: &GlobalArgs, name_part: &str) -> CommandResult {
    let (_, dashboard) = match load_dashboard("segment", global) {
        Ok(loaded) => loaded,
        Err(result) => return result,
    };

    let matches = dashboard.lookup_segment(name_part);
    let message = if matches.is_empty() {
        format!("no customer name contains `{name_part}`")
    } else {
        format!("{} customer(s) matched `{name_part}`", matches.len())
    };
    CommandResult::success_with_data("segment", message, Some(matches))
}
