//! Shapes the assembled rate table for the dashboard: selection filter,
//! headline cards, chart series and the pivoted (date x currency) table.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{error::CursError, exchange_rate::RateQuote};

pub const MAIN_CURRENCIES: [&str; 7] = ["EUR", "USD", "RON", "UAH", "GBP", "CHF", "RUB"];
pub const DEFAULT_SELECTION: [&str; 3] = ["EUR", "USD", "RON"];
pub const LOCAL_CURRENCY: &str = "MDL";
pub const CSV_FILE_NAME: &str = "cursuri_valutare_bnm.csv";
const DATE_FORMAT: &str = "%d.%m.%Y";

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Period {
    pub label: &'static str,
    pub days: i64,
}

pub const PERIODS: [Period; 4] = [
    Period { label: "Last month", days: 30 },
    Period { label: "Last 3 months", days: 90 },
    Period { label: "Last 6 months", days: 180 },
    Period { label: "Last year", days: 365 },
];

/// Parses a comma-separated code list. `None` means the default selection;
/// a blank list means nothing is selected.
pub fn parse_selection(raw: Option<&str>) -> Vec<String> {
    match raw {
        None => DEFAULT_SELECTION.iter().map(|c| c.to_string()).collect(),
        Some(raw) => raw
            .split(',')
            .map(|code| code.trim().to_uppercase())
            .filter(|code| !code.is_empty())
            .collect(),
    }
}

pub fn filter_codes(rows: &[RateQuote], codes: &[String]) -> Vec<RateQuote> {
    rows.iter()
        .filter(|quote| codes.contains(&quote.currency_code))
        .cloned()
        .collect()
}

/// Headline card for one currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestRate {
    pub code: String,
    pub name: String,
    pub date: NaiveDate,
    pub rate: Decimal,
    pub label: String,
}

/// Rates on the most recent date present in `rows`, one per selected code
/// quoted on that date, in selection order.
pub fn latest_rates(rows: &[RateQuote], codes: &[String]) -> Vec<LatestRate> {
    let Some(latest) = rows.iter().map(|quote| quote.date).max() else {
        return Vec::new();
    };

    codes
        .iter()
        .filter_map(|code| {
            rows.iter()
                .find(|quote| quote.date == latest && &quote.currency_code == code)
        })
        .map(|quote| LatestRate {
            code: quote.currency_code.clone(),
            name: quote.currency_name.clone(),
            date: quote.date,
            rate: quote.rate,
            label: format!("{:.4} {}", quote.rate, LOCAL_CURRENCY),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub code: String,
    pub name: String,
    pub points: Vec<SeriesPoint>,
}

/// One chronological series per selected code that has any data.
pub fn series(rows: &[RateQuote], codes: &[String]) -> Vec<Series> {
    codes
        .iter()
        .filter_map(|code| {
            let mut quotes: Vec<&RateQuote> = rows
                .iter()
                .filter(|quote| &quote.currency_code == code)
                .collect();
            let name = quotes.first()?.currency_name.clone();
            quotes.sort_by_key(|quote| quote.date);

            Some(Series {
                code: code.clone(),
                name,
                points: quotes
                    .into_iter()
                    .map(|quote| SeriesPoint {
                        date: quote.date,
                        rate: quote.rate,
                    })
                    .collect(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    pub date: NaiveDate,
    pub label: String,
    /// Aligned with [`PivotTable::codes`]; `None` where the currency has no
    /// quote for that date.
    pub rates: Vec<Option<Decimal>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub codes: Vec<String>,
    pub rows: Vec<PivotRow>,
}

/// Reshapes to one column per currency code (sorted) and one row per date,
/// newest first.
pub fn pivot(rows: &[RateQuote]) -> PivotTable {
    let mut by_date: BTreeMap<NaiveDate, BTreeMap<&str, Decimal>> = BTreeMap::new();
    for quote in rows {
        by_date
            .entry(quote.date)
            .or_default()
            .insert(&quote.currency_code, quote.rate);
    }

    let mut codes: Vec<String> = rows.iter().map(|quote| quote.currency_code.clone()).collect();
    codes.sort();
    codes.dedup();

    let rows = by_date
        .into_iter()
        .rev()
        .map(|(date, rates)| PivotRow {
            date,
            label: date.format(DATE_FORMAT).to_string(),
            rates: codes
                .iter()
                .map(|code| rates.get(code.as_str()).copied())
                .collect(),
        })
        .collect();

    PivotTable { codes, rows }
}

impl PivotTable {
    /// Header `Data` followed by the currency codes; an absent rate is an
    /// empty field.
    pub fn to_csv(&self) -> Result<Vec<u8>, CursError> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        let mut header = vec!["Data".to_string()];
        header.extend(self.codes.iter().cloned());
        writer.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.label.clone()];
            record.extend(row.rates.iter().map(|rate| match rate {
                Some(rate) => rate.normalize().to_string(),
                None => String::new(),
            }));
            writer.write_record(&record)?;
        }

        writer
            .into_inner()
            .map_err(|e| CursError::Csv(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::test_support::date;

    fn quote(date: NaiveDate, code: &str, name: &str, rate: Decimal) -> RateQuote {
        RateQuote {
            date,
            currency_code: code.to_string(),
            currency_name: name.to_string(),
            rate,
        }
    }

    fn codes(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    fn two_days() -> Vec<RateQuote> {
        vec![
            quote(date(2024, 3, 1), "EUR", "Euro", dec!(19.50)),
            quote(date(2024, 3, 1), "USD", "US Dollar", dec!(17.75)),
            quote(date(2024, 3, 2), "EUR", "Euro", dec!(19.42)),
            quote(date(2024, 3, 2), "USD", "US Dollar", dec!(17.8)),
        ]
    }

    #[test]
    fn csv_export_of_pivot() {
        let csv = pivot(&two_days()).to_csv().unwrap();

        assert_eq!(
            String::from_utf8(csv).unwrap(),
            "Data,EUR,USD\n02.03.2024,19.42,17.8\n01.03.2024,19.5,17.75\n"
        );
    }

    #[test]
    fn pivot_leaves_gaps_empty() {
        let mut rows = two_days();
        rows.push(quote(date(2024, 3, 2), "RON", "Romanian Leu", dec!(3.87)));

        let table = pivot(&rows);

        assert_eq!(table.codes, codes(&["EUR", "RON", "USD"]));
        assert_eq!(
            table.rows[0].rates,
            vec![Some(dec!(19.42)), Some(dec!(3.87)), Some(dec!(17.8))]
        );
        assert_eq!(table.rows[1].rates[1], None);
        assert_eq!(
            String::from_utf8(table.to_csv().unwrap()).unwrap().lines().last(),
            Some("01.03.2024,19.5,,17.75")
        );
    }

    #[test]
    fn empty_pivot_has_only_header() {
        let table = pivot(&[]);

        assert!(table.rows.is_empty());
        assert_eq!(String::from_utf8(table.to_csv().unwrap()).unwrap(), "Data\n");
    }

    #[test]
    fn selection_parsing() {
        assert_eq!(parse_selection(None), codes(&DEFAULT_SELECTION));
        assert_eq!(parse_selection(Some(" eur, USD ,,chf")), codes(&["EUR", "USD", "CHF"]));
        assert!(parse_selection(Some("")).is_empty());
        assert!(parse_selection(Some(" , ")).is_empty());
    }

    #[test]
    fn filter_keeps_selected_codes() {
        let filtered = filter_codes(&two_days(), &codes(&["USD", "GBP"]));

        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|q| q.currency_code == "USD"));
    }

    #[test]
    fn latest_cards_follow_selection_order() {
        let cards = latest_rates(&two_days(), &codes(&["USD", "GBP", "EUR"]));

        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].code, "USD");
        assert_eq!(cards[0].date, date(2024, 3, 2));
        assert_eq!(cards[0].label, "17.8000 MDL");
        assert_eq!(cards[1].code, "EUR");
        assert_eq!(cards[1].rate, dec!(19.42));
    }

    #[test]
    fn latest_of_nothing() {
        assert!(latest_rates(&[], &codes(&["EUR"])).is_empty());
    }

    #[test]
    fn series_per_currency() {
        let series = series(&two_days(), &codes(&["EUR", "CHF"]));

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].name, "Euro");
        assert_eq!(
            series[0].points,
            vec![
                SeriesPoint { date: date(2024, 3, 1), rate: dec!(19.50) },
                SeriesPoint { date: date(2024, 3, 2), rate: dec!(19.42) },
            ]
        );
    }
}
