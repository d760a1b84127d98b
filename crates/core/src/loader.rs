//! Workbook ingestion.
//!
//! Reads the raw orders/returns workbook, joins the returns flag onto
//! order lines, and computes the derived analytics fields. Sheet parsing
//! sits at the IO edge; row assembly is pure so derivation logic stays
//! testable without workbook fixtures.

use std::collections::HashSet;
use std::path::Path;

use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::info;

use crate::domain::order::{Order, RawOrder};
use crate::errors::LoadError;

pub const ORDERS_SHEET: &str = "Orders";
pub const RETURNS_SHEET: &str = "Returns";

const COL_ORDER_ID: &str = "Order ID";
const COL_CUSTOMER_ID: &str = "Customer ID";
const COL_PRODUCT_NAME: &str = "Product Name";
const COL_ORDER_DATE: &str = "Order Date";
const COL_SHIP_DATE: &str = "Ship Date";
const COL_SALES: &str = "Sales";
const COL_QUANTITY: &str = "Quantity";
const COL_DISCOUNT: &str = "Discount";
const COL_PROFIT: &str = "Profit";
const COL_RETURNED: &str = "Returned";

/// Load the order table from an xlsx workbook with "Orders" and
/// "Returns" sheets. Returns are left-joined by order id; an order id
/// absent from the returns sheet means not returned. A postal-code
/// column, if present, is simply never read.
pub fn load_orders(path: &Path) -> Result<Vec<Order>, LoadError> {
    let mut workbook = open_workbook::<Xlsx<_>, _>(path)
        .map_err(|source| LoadError::OpenWorkbook { path: path.to_path_buf(), source })?;

    let orders_range = workbook
        .worksheet_range(ORDERS_SHEET)
        .map_err(|source| LoadError::ReadSheet { sheet: ORDERS_SHEET.to_string(), source })?;
    let returns_range = workbook
        .worksheet_range(RETURNS_SHEET)
        .map_err(|source| LoadError::ReadSheet { sheet: RETURNS_SHEET.to_string(), source })?;

    let raw_orders = parse_orders_sheet(&orders_range)?;
    let returned_ids = parse_returns_sheet(&returns_range)?;
    let orders = assemble_orders(raw_orders, &returned_ids);

    info!(
        orders = orders.len(),
        returned_order_ids = returned_ids.len(),
        "loaded order table from workbook"
    );
    Ok(orders)
}

/// Join the returns flag and compute derived fields for every line.
pub fn assemble_orders(raw_orders: Vec<RawOrder>, returned_ids: &HashSet<String>) -> Vec<Order> {
    raw_orders
        .into_iter()
        .map(|raw| {
            let returned = returned_ids.contains(&raw.order_id);
            Order::derive(raw, returned)
        })
        .collect()
}

fn parse_orders_sheet(range: &Range<Data>) -> Result<Vec<RawOrder>, LoadError> {
    let mut rows = range.rows();
    let headers = rows.next().ok_or_else(|| LoadError::EmptySheet {
        sheet: ORDERS_SHEET.to_string(),
    })?;

    let order_id = column_index(headers, COL_ORDER_ID, ORDERS_SHEET)?;
    let customer_id = column_index(headers, COL_CUSTOMER_ID, ORDERS_SHEET)?;
    let product_name = column_index(headers, COL_PRODUCT_NAME, ORDERS_SHEET)?;
    let order_date = column_index(headers, COL_ORDER_DATE, ORDERS_SHEET)?;
    let ship_date = column_index(headers, COL_SHIP_DATE, ORDERS_SHEET)?;
    let sales = column_index(headers, COL_SALES, ORDERS_SHEET)?;
    let quantity = column_index(headers, COL_QUANTITY, ORDERS_SHEET)?;
    let discount = column_index(headers, COL_DISCOUNT, ORDERS_SHEET)?;
    let profit = column_index(headers, COL_PROFIT, ORDERS_SHEET)?;

    let mut raw_orders = Vec::new();
    for (index, row) in rows.enumerate() {
        // Spreadsheet row number, counting the header as row 1.
        let row_number = index + 2;
        raw_orders.push(RawOrder {
            order_id: cell_string(row, order_id, ORDERS_SHEET, row_number, COL_ORDER_ID)?,
            customer_id: cell_string(row, customer_id, ORDERS_SHEET, row_number, COL_CUSTOMER_ID)?,
            product_name: cell_string(
                row,
                product_name,
                ORDERS_SHEET,
                row_number,
                COL_PRODUCT_NAME,
            )?,
            order_date: cell_date(row, order_date, ORDERS_SHEET, row_number, COL_ORDER_DATE)?,
            ship_date: cell_date(row, ship_date, ORDERS_SHEET, row_number, COL_SHIP_DATE)?,
            sales: cell_f64(row, sales, ORDERS_SHEET, row_number, COL_SALES)?,
            quantity: cell_u32(row, quantity, ORDERS_SHEET, row_number, COL_QUANTITY)?,
            discount: cell_f64(row, discount, ORDERS_SHEET, row_number, COL_DISCOUNT)?,
            profit: cell_f64(row, profit, ORDERS_SHEET, row_number, COL_PROFIT)?,
        });
    }

    Ok(raw_orders)
}

/// Order ids flagged as returned. Any row whose `Returned` cell reads as
/// an affirmative marks the order id.
fn parse_returns_sheet(range: &Range<Data>) -> Result<HashSet<String>, LoadError> {
    let mut rows = range.rows();
    let headers = rows.next().ok_or_else(|| LoadError::EmptySheet {
        sheet: RETURNS_SHEET.to_string(),
    })?;

    let order_id = column_index(headers, COL_ORDER_ID, RETURNS_SHEET)?;
    let returned = column_index(headers, COL_RETURNED, RETURNS_SHEET)?;

    let mut returned_ids = HashSet::new();
    for (index, row) in rows.enumerate() {
        let row_number = index + 2;
        let id = cell_string(row, order_id, RETURNS_SHEET, row_number, COL_ORDER_ID)?;
        if cell_is_affirmative(row.get(returned)) {
            returned_ids.insert(id);
        }
    }

    Ok(returned_ids)
}

fn column_index(headers: &[Data], name: &str, sheet: &str) -> Result<usize, LoadError> {
    headers
        .iter()
        .position(|cell| matches!(cell, Data::String(text) if text.trim().eq_ignore_ascii_case(name)))
        .ok_or_else(|| LoadError::MissingColumn { sheet: sheet.to_string(), column: name.to_string() })
}

fn cell_error(sheet: &str, row: usize, column: &str, message: impl Into<String>) -> LoadError {
    LoadError::Cell {
        sheet: sheet.to_string(),
        row,
        column: column.to_string(),
        message: message.into(),
    }
}

fn cell_string(
    row: &[Data],
    index: usize,
    sheet: &str,
    row_number: usize,
    column: &str,
) -> Result<String, LoadError> {
    let text = match row.get(index) {
        Some(Data::String(text)) => text.trim().to_string(),
        Some(Data::Int(value)) => value.to_string(),
        Some(Data::Float(value)) => value.to_string(),
        Some(Data::Empty) | None => String::new(),
        Some(other) => {
            return Err(cell_error(sheet, row_number, column, format!("unexpected cell {other:?}")))
        }
    };

    if text.is_empty() {
        return Err(cell_error(sheet, row_number, column, "cell is empty"));
    }
    Ok(text)
}

fn cell_f64(
    row: &[Data],
    index: usize,
    sheet: &str,
    row_number: usize,
    column: &str,
) -> Result<f64, LoadError> {
    match row.get(index) {
        Some(Data::Float(value)) => Ok(*value),
        Some(Data::Int(value)) => Ok(*value as f64),
        Some(Data::String(text)) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| cell_error(sheet, row_number, column, format!("not a number: `{text}`"))),
        other => Err(cell_error(sheet, row_number, column, format!("not a number: {other:?}"))),
    }
}

fn cell_u32(
    row: &[Data],
    index: usize,
    sheet: &str,
    row_number: usize,
    column: &str,
) -> Result<u32, LoadError> {
    let value = cell_f64(row, index, sheet, row_number, column)?;
    if value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return Err(cell_error(sheet, row_number, column, format!("not a count: `{value}`")));
    }
    Ok(value as u32)
}

fn cell_date(
    row: &[Data],
    index: usize,
    sheet: &str,
    row_number: usize,
    column: &str,
) -> Result<NaiveDate, LoadError> {
    let parsed = match row.get(index) {
        Some(Data::DateTime(value)) => value.as_datetime().map(|datetime| datetime.date()),
        Some(Data::DateTimeIso(text)) => parse_date_text(text),
        Some(Data::String(text)) => parse_date_text(text),
        _ => None,
    };

    parsed.ok_or_else(|| {
        cell_error(sheet, row_number, column, "cell is not a readable date".to_string())
    })
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").ok().map(|dt| dt.date()))
        .or_else(|| NaiveDate::parse_from_str(text, "%m/%d/%Y").ok())
}

fn cell_is_affirmative(cell: Option<&Data>) -> bool {
    match cell {
        Some(Data::String(text)) => text.trim().eq_ignore_ascii_case("yes"),
        Some(Data::Bool(value)) => *value,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use calamine::Data;
    use chrono::NaiveDate;

    use super::{assemble_orders, cell_date, cell_string, column_index, parse_date_text};
    use crate::domain::order::RawOrder;
    use crate::errors::LoadError;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    fn raw_order(order_id: &str) -> RawOrder {
        RawOrder {
            order_id: order_id.to_string(),
            customer_id: "AA-10315".to_string(),
            product_name: "Memo Pads".to_string(),
            order_date: date(2023, 6, 1),
            ship_date: date(2023, 6, 4),
            sales: 24.5,
            quantity: 2,
            discount: 0.0,
            profit: 6.1,
        }
    }

    #[test]
    fn returns_join_flags_only_listed_order_ids() {
        let returned: HashSet<String> = ["US-2023-0002".to_string()].into_iter().collect();
        let orders =
            assemble_orders(vec![raw_order("US-2023-0001"), raw_order("US-2023-0002")], &returned);

        assert!(!orders[0].returned);
        assert!(orders[1].returned);
    }

    #[test]
    fn column_lookup_is_whitespace_and_case_tolerant() {
        let headers =
            vec![Data::String(" order id ".to_string()), Data::String("Sales".to_string())];
        assert_eq!(column_index(&headers, "Order ID", "Orders").expect("column present"), 0);

        let missing = column_index(&headers, "Profit", "Orders");
        assert!(matches!(missing, Err(LoadError::MissingColumn { ref column, .. }) if column == "Profit"));
    }

    #[test]
    fn empty_customer_cell_is_a_load_error() {
        let row = vec![Data::String(String::new())];
        let result = cell_string(&row, 0, "Orders", 2, "Customer ID");
        assert!(matches!(result, Err(LoadError::Cell { row: 2, .. })));
    }

    #[test]
    fn date_cells_accept_common_text_formats() {
        assert_eq!(parse_date_text("2023-06-01"), Some(date(2023, 6, 1)));
        assert_eq!(parse_date_text("06/01/2023"), Some(date(2023, 6, 1)));
        assert_eq!(parse_date_text("not a date"), None);

        let row = vec![Data::String("2023-06-01".to_string())];
        let parsed = cell_date(&row, 0, "Orders", 2, "Order Date").expect("readable date");
        assert_eq!(parsed, date(2023, 6, 1));
    }
}
