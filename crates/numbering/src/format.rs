use chrono::NaiveDate;

/// `PREFIX-YYYY/MM/DD-NNNN`.
pub fn format_invoice_number(prefix: &str, day: NaiveDate, sequence: u32) -> String {
    format!("{prefix}-{}-{sequence:04}", day.format("%Y/%m/%d"))
}

/// `YYYYMMDD-NNN`.
pub fn format_request_number(day: NaiveDate, sequence: u32) -> String {
    format!("{}-{sequence:03}", day.format("%Y%m%d"))
}
