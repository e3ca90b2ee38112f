use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::analytics::{cltv::CltvRecord, rfm::RfmRecord};
use crate::domain::{
    customer::{Customer, CustomerId},
    invoice::Invoice,
};

/// Anything keyed by customer id that can be joined to display names.
pub trait CustomerKeyed {
    fn customer_id(&self) -> &CustomerId;
}

impl CustomerKeyed for RfmRecord {
    fn customer_id(&self) -> &CustomerId {
        &self.customer_id
    }
}

impl CustomerKeyed for CltvRecord {
    fn customer_id(&self) -> &CustomerId {
        &self.customer_id
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Named<T> {
    pub customer_name: Option<String>,
    #[serde(flatten)]
    pub record: T,
}

/// Distinct (id, name) pairs in first-seen order.
pub fn customer_directory(invoices: &[Invoice]) -> Vec<Customer> {
    let mut seen = HashSet::new();
    invoices
        .iter()
        .filter(|invoice| seen.insert((&invoice.customer_id, &invoice.customer_name)))
        .map(|invoice| Customer {
            id: invoice.customer_id.clone(),
            name: invoice.customer_name.clone(),
        })
        .collect()
}

/// Left-joins display names onto scored records.
///
/// Record order is kept. A customer known under several names yields one row
/// per name; a customer missing from the directory keeps `customer_name: None`.
pub fn attach_names<T>(records: &[T], directory: &[Customer]) -> Vec<Named<T>>
where
    T: CustomerKeyed + Clone,
{
    let mut names: HashMap<&CustomerId, Vec<&str>> = HashMap::new();
    for customer in directory {
        names.entry(&customer.id).or_default().push(&customer.name);
    }

    let mut joined = Vec::with_capacity(records.len());
    for record in records {
        match names.get(record.customer_id()) {
            Some(matches) => joined.extend(matches.iter().map(|name| Named {
                customer_name: Some((*name).to_string()),
                record: record.clone(),
            })),
            None => joined.push(Named { customer_name: None, record: record.clone() }),
        }
    }
    joined
}
