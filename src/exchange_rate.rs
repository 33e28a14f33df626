use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// One currency's official rate on one date, in local currency per one
/// unit of the foreign currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateQuote {
    pub date: NaiveDate,
    pub currency_code: String,
    pub currency_name: String,
    pub rate: Decimal,
}
