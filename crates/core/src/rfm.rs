//! Per-customer RFM aggregation.

use std::collections::{BTreeMap, HashSet};

use chrono::{Duration, NaiveDate};
use tracing::info;

use crate::domain::order::Order;
use crate::domain::rfm::RfmRecord;

/// Aggregate Recency/Frequency/Monetary per customer.
///
/// The reference date is max(order date) across the whole dataset plus
/// one day, applied uniformly to every customer. Frequency counts
/// distinct order ids; Monetary sums sales across order lines. Output is
/// sorted by customer id so downstream artifacts are reproducible.
pub fn compute_rfm(orders: &[Order]) -> Vec<RfmRecord> {
    let Some(max_order_date) = orders.iter().map(|order| order.order_date).max() else {
        return Vec::new();
    };
    let reference_date = max_order_date + Duration::days(1);

    struct Accumulator<'a> {
        latest_order: NaiveDate,
        order_ids: HashSet<&'a str>,
        monetary: f64,
    }

    let mut by_customer: BTreeMap<&str, Accumulator<'_>> = BTreeMap::new();
    for order in orders {
        let entry = by_customer.entry(order.customer_id.as_str()).or_insert_with(|| Accumulator {
            latest_order: order.order_date,
            order_ids: HashSet::new(),
            monetary: 0.0,
        });
        entry.latest_order = entry.latest_order.max(order.order_date);
        entry.order_ids.insert(order.order_id.as_str());
        entry.monetary += order.sales;
    }

    let records: Vec<RfmRecord> = by_customer
        .into_iter()
        .map(|(customer_id, acc)| RfmRecord {
            customer_id: customer_id.to_string(),
            recency_days: (reference_date - acc.latest_order).num_days(),
            frequency: acc.order_ids.len() as u64,
            monetary: acc.monetary,
        })
        .collect();

    info!(customers = records.len(), %reference_date, "computed RFM table");
    records
}
