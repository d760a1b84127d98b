//! Precomputed product-popularity tables.

use std::collections::HashMap;

use crate::domain::order::ClusteredOrder;

/// Products retained per cluster; generous so purchase filtering still
/// leaves candidates.
pub const CLUSTER_TOP_ITEMS: usize = 20;
/// Products retained in the global list.
pub const OVERALL_TOP_ITEMS: usize = 15;

/// Ranked product lists, derived from the clustered order table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PopularityTables {
    /// Per-cluster product names by purchase-frequency rank, top 20.
    pub by_cluster: HashMap<usize, Vec<String>>,
    /// Global product names by purchase-frequency rank, top 15.
    pub overall: Vec<String>,
}

impl PopularityTables {
    pub fn cluster_top(&self, cluster: usize) -> &[String] {
        match self.by_cluster.get(&cluster) {
            Some(products) => products,
            None => &[],
        }
    }
}

/// Build both popularity tables in one pass over the clustered orders.
/// Count ties break by first appearance in the order table, which keeps
/// the ranking stable across rebuilds of the same data.
pub fn build_popularity(orders: &[ClusteredOrder]) -> PopularityTables {
    let mut overall_counts: HashMap<&str, (u64, usize)> = HashMap::new();
    let mut cluster_counts: HashMap<usize, HashMap<&str, (u64, usize)>> = HashMap::new();

    for (position, order) in orders.iter().enumerate() {
        let product = order.product_name.as_str();
        let overall = overall_counts.entry(product).or_insert((0, position));
        overall.0 += 1;

        let in_cluster = cluster_counts
            .entry(order.cluster)
            .or_default()
            .entry(product)
            .or_insert((0, position));
        in_cluster.0 += 1;
    }

    let by_cluster = cluster_counts
        .into_iter()
        .map(|(cluster, counts)| (cluster, ranked(counts, CLUSTER_TOP_ITEMS)))
        .collect();

    PopularityTables { by_cluster, overall: ranked(overall_counts, OVERALL_TOP_ITEMS) }
}

fn ranked(counts: HashMap<&str, (u64, usize)>, keep: usize) -> Vec<String> {
    let mut entries: Vec<(&str, u64, usize)> =
        counts.into_iter().map(|(product, (count, first_seen))| (product, count, first_seen)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    entries.into_iter().take(keep).map(|(product, _, _)| product.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{build_popularity, CLUSTER_TOP_ITEMS, OVERALL_TOP_ITEMS};
    use crate::domain::order::{ClusteredOrder, Order, RawOrder};

    fn clustered(product: &str, cluster: usize, line: u32) -> ClusteredOrder {
        let order_date = NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid test date");
        let order = Order::derive(
            RawOrder {
                order_id: format!("ORD-{line}"),
                customer_id: "AA-0001".to_string(),
                product_name: product.to_string(),
                order_date,
                ship_date: order_date,
                sales: 10.0,
                quantity: 1,
                discount: 0.0,
                profit: 1.0,
            },
            false,
        );
        ClusteredOrder::from_order(&order, cluster)
    }

    #[test]
    fn ranks_products_by_purchase_count_within_cluster() {
        let orders = vec![
            clustered("Stapler", 0, 1),
            clustered("Stapler", 0, 2),
            clustered("Binder", 0, 3),
            clustered("Desk Lamp", 1, 4),
        ];

        let tables = build_popularity(&orders);
        assert_eq!(tables.cluster_top(0), ["Stapler".to_string(), "Binder".to_string()]);
        assert_eq!(tables.cluster_top(1), ["Desk Lamp".to_string()]);
        assert!(tables.cluster_top(9).is_empty());
    }

    #[test]
    fn count_ties_break_by_first_appearance() {
        let orders = vec![
            clustered("Binder", 0, 1),
            clustered("Stapler", 0, 2),
            clustered("Stapler", 0, 3),
            clustered("Binder", 0, 4),
            clustered("Desk Lamp", 0, 5),
        ];

        let tables = build_popularity(&orders);
        assert_eq!(
            tables.overall,
            vec!["Binder".to_string(), "Stapler".to_string(), "Desk Lamp".to_string()]
        );
    }

    #[test]
    fn tables_truncate_to_their_documented_sizes() {
        let mut orders = Vec::new();
        for index in 0..30 {
            // Distinct products with descending counts.
            for repeat in 0..(30 - index) {
                orders.push(clustered(&format!("Product {index:02}"), 0, (index * 100 + repeat) as u32));
            }
        }

        let tables = build_popularity(&orders);
        assert_eq!(tables.cluster_top(0).len(), CLUSTER_TOP_ITEMS);
        assert_eq!(tables.overall.len(), OVERALL_TOP_ITEMS);
        assert_eq!(tables.overall[0], "Product 00");
    }
}
