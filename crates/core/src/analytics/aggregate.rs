use std::collections::{btree_map::Entry, BTreeMap};

use tracing::debug;

use crate::analytics::add_checked;
use crate::domain::invoice::{Invoice, InvoiceId, LineItem};
use crate::errors::ScoringError;

impl From<&LineItem> for Invoice {
    fn from(item: &LineItem) -> Self {
        Self {
            id: item.invoice_id.clone(),
            customer_id: item.customer_id.clone(),
            customer_name: item.customer_name.clone(),
            date: item.date,
            products: vec![item.product.clone()],
            weight: item.weight,
            value: item.value,
        }
    }
}

/// Collapses line items into one invoice per invoice id, ordered by id.
/// Fails only when an invoice total leaves the decimal range.
pub fn aggregate_invoices(items: &[LineItem]) -> Result<Vec<Invoice>, ScoringError> {
    merge_invoices(items.iter().map(Invoice::from))
}

/// Merges partial invoices that share an id.
///
/// The first-seen customer id, name and date win; later rows only contribute
/// products (in input order) and their weight and value totals. Merging an
/// already merged table returns it unchanged.
pub fn merge_invoices<I>(invoices: I) -> Result<Vec<Invoice>, ScoringError>
where
    I: IntoIterator<Item = Invoice>,
{
    let mut merged: BTreeMap<InvoiceId, Invoice> = BTreeMap::new();

    for part in invoices {
        match merged.entry(part.id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(part);
            }
            Entry::Occupied(mut slot) => {
                let invoice = slot.get_mut();
                if invoice.customer_id != part.customer_id
                    || invoice.customer_name != part.customer_name
                    || invoice.date != part.date
                {
                    debug!(
                        event_name = "cohort.aggregate.header_conflict",
                        invoice_id = %invoice.id,
                        kept_customer = %invoice.customer_id,
                        dropped_customer = %part.customer_id,
                        "invoice rows disagree on customer or date; keeping first-seen values"
                    );
                }
                add_checked(&mut invoice.weight, part.weight, "invoice_weight", &part.id)?;
                add_checked(&mut invoice.value, part.value, "invoice_value", &part.id)?;
                invoice.products.extend(part.products);
            }
        }
    }

    Ok(merged.into_values().collect())
}
