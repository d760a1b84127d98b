use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Sales bucket boundaries used for `SalesCategory`.
pub const SALES_BUCKETS: [f64; 3] = [100.0, 500.0, 1000.0];

/// Coarse order-value bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalesCategory {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl SalesCategory {
    pub fn from_sales(sales: f64) -> Self {
        if sales <= SALES_BUCKETS[0] {
            Self::Low
        } else if sales <= SALES_BUCKETS[1] {
            Self::Medium
        } else if sales <= SALES_BUCKETS[2] {
            Self::High
        } else {
            Self::VeryHigh
        }
    }
}

/// Base fields of one order line as they appear in the Orders sheet.
#[derive(Clone, Debug, PartialEq)]
pub struct RawOrder {
    pub order_id: String,
    pub customer_id: String,
    pub product_name: String,
    pub order_date: NaiveDate,
    pub ship_date: NaiveDate,
    pub sales: f64,
    pub quantity: u32,
    pub discount: f64,
    pub profit: f64,
}

/// One order line with the derived analytics fields attached. Every
/// derived field is a deterministic function of the base fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub customer_id: String,
    pub product_name: String,
    pub order_date: NaiveDate,
    pub ship_date: NaiveDate,
    pub sales: f64,
    pub quantity: u32,
    pub discount: f64,
    pub profit: f64,
    pub returned: bool,
    pub shipping_duration_days: i64,
    pub order_year: i32,
    pub order_month: u32,
    pub discount_rate: f64,
    pub sales_category: SalesCategory,
    pub profit_log: f64,
    pub sales_log: f64,
    pub quantity_log: f64,
}

impl Order {
    /// Attach the returns flag and compute every derived field.
    pub fn derive(raw: RawOrder, returned: bool) -> Self {
        let shipping_duration_days = (raw.ship_date - raw.order_date).num_days();
        // Positive profit is log-compressed; zero and negative profit are
        // carried through unchanged.
        let profit_log = if raw.profit > 0.0 { raw.profit.ln_1p() } else { raw.profit };

        Self {
            shipping_duration_days,
            order_year: raw.order_date.year(),
            order_month: raw.order_date.month(),
            discount_rate: raw.discount / (1.0 - raw.discount),
            sales_category: SalesCategory::from_sales(raw.sales),
            profit_log,
            sales_log: log1p_nonzero(raw.sales),
            quantity_log: log1p_nonzero(f64::from(raw.quantity)),
            returned,
            order_id: raw.order_id,
            customer_id: raw.customer_id,
            product_name: raw.product_name,
            order_date: raw.order_date,
            ship_date: raw.ship_date,
            sales: raw.sales,
            quantity: raw.quantity,
            discount: raw.discount,
            profit: raw.profit,
        }
    }
}

/// An order line joined with its customer's cluster assignment. This is
/// the flat row shape persisted to the clustered order table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusteredOrder {
    pub order_id: String,
    pub customer_id: String,
    pub product_name: String,
    pub order_date: NaiveDate,
    pub ship_date: NaiveDate,
    pub sales: f64,
    pub quantity: u32,
    pub discount: f64,
    pub profit: f64,
    pub returned: bool,
    pub shipping_duration_days: i64,
    pub order_year: i32,
    pub order_month: u32,
    pub discount_rate: f64,
    pub sales_category: SalesCategory,
    pub profit_log: f64,
    pub sales_log: f64,
    pub quantity_log: f64,
    pub cluster: usize,
}

impl ClusteredOrder {
    pub fn from_order(order: &Order, cluster: usize) -> Self {
        Self {
            order_id: order.order_id.clone(),
            customer_id: order.customer_id.clone(),
            product_name: order.product_name.clone(),
            order_date: order.order_date,
            ship_date: order.ship_date,
            sales: order.sales,
            quantity: order.quantity,
            discount: order.discount,
            profit: order.profit,
            returned: order.returned,
            shipping_duration_days: order.shipping_duration_days,
            order_year: order.order_year,
            order_month: order.order_month,
            discount_rate: order.discount_rate,
            sales_category: order.sales_category,
            profit_log: order.profit_log,
            sales_log: order.sales_log,
            quantity_log: order.quantity_log,
            cluster,
        }
    }
}

/// `ln(1 + x)` with exact zero replaced by machine epsilon first, so the
/// transform never produces negative infinity for zero-valued rows.
fn log1p_nonzero(value: f64) -> f64 {
    let value = if value == 0.0 { f64::EPSILON } else { value };
    value.ln_1p()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{Order, RawOrder, SalesCategory};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    fn raw(sales: f64, quantity: u32, discount: f64, profit: f64) -> RawOrder {
        RawOrder {
            order_id: "US-2023-100001".to_string(),
            customer_id: "CG-12520".to_string(),
            product_name: "Stackable Letter Trays".to_string(),
            order_date: date(2023, 3, 10),
            ship_date: date(2023, 3, 14),
            sales,
            quantity,
            discount,
            profit,
        }
    }

    #[test]
    fn derives_shipping_duration_and_calendar_fields() {
        let order = Order::derive(raw(250.0, 3, 0.2, 40.0), false);
        assert_eq!(order.shipping_duration_days, 4);
        assert_eq!(order.order_year, 2023);
        assert_eq!(order.order_month, 3);
    }

    #[test]
    fn discount_rate_is_discount_over_remainder() {
        let order = Order::derive(raw(250.0, 3, 0.2, 40.0), false);
        assert!((order.discount_rate - 0.25).abs() < 1e-12);
    }

    #[test]
    fn sales_category_buckets_are_right_closed() {
        assert_eq!(SalesCategory::from_sales(100.0), SalesCategory::Low);
        assert_eq!(SalesCategory::from_sales(100.01), SalesCategory::Medium);
        assert_eq!(SalesCategory::from_sales(500.0), SalesCategory::Medium);
        assert_eq!(SalesCategory::from_sales(1000.0), SalesCategory::High);
        assert_eq!(SalesCategory::from_sales(5000.0), SalesCategory::VeryHigh);
    }

    #[test]
    fn positive_profit_is_log_compressed_and_losses_pass_through() {
        let gain = Order::derive(raw(250.0, 3, 0.0, 40.0), false);
        assert!((gain.profit_log - 40.0f64.ln_1p()).abs() < 1e-12);

        let loss = Order::derive(raw(250.0, 3, 0.0, -12.5), false);
        assert_eq!(loss.profit_log, -12.5);
    }

    #[test]
    fn zero_sales_does_not_produce_negative_infinity() {
        let order = Order::derive(raw(0.0, 0, 0.0, 0.0), false);
        assert!(order.sales_log.is_finite());
        assert!(order.quantity_log.is_finite());
        assert_eq!(order.profit_log, 0.0);
    }
}
