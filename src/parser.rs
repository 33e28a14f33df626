use std::{collections::BTreeMap, str::FromStr};

use anyhow::Result;
use rust_decimal::Decimal;

use crate::val_curs::{ValCurs, Valute};

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRate {
    pub name: String,
    /// Local currency per one unit, i.e. `value / nominal`.
    pub rate: Decimal,
}

/// Parses one daily document into `code -> rate`.
///
/// A malformed document, or any entry lacking a field or carrying a bad
/// number, yields an empty map. Duplicate codes: the last entry wins.
pub fn parse(raw: &str) -> BTreeMap<String, ParsedRate> {
    match try_parse(raw) {
        Ok(map) => map,
        Err(e) => {
            log::debug!("Discarding rate document: {:#}", e);
            BTreeMap::new()
        }
    }
}

fn try_parse(raw: &str) -> Result<BTreeMap<String, ParsedRate>> {
    let val_curs: ValCurs = quick_xml::de::from_str(raw)?;
    let mut map = BTreeMap::new();

    for valute in &val_curs.valute {
        let (code, rate) = normalize(valute)?;
        map.insert(code, rate);
    }

    Ok(map)
}

fn normalize(valute: &Valute) -> Result<(String, ParsedRate)> {
    let code = required(&valute.char_code, "CharCode")?;
    let name = required(&valute.name, "Name")?;
    let value = positive_decimal(required(&valute.value, "Value")?)?;
    let nominal = positive_decimal(required(&valute.nominal, "Nominal")?)?;

    let rate = value
        .checked_div(nominal)
        .ok_or_else(|| anyhow::anyhow!("Can't divide {} by {}", value, nominal))?;

    Ok((code.to_string(), ParsedRate {
        name: name.to_string(),
        rate,
    }))
}

fn required<'a>(field: &'a Option<String>, tag: &str) -> Result<&'a str> {
    match field.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text),
        _ => anyhow::bail!("Missing <{}>", tag),
    }
}

fn positive_decimal(s: &str) -> Result<Decimal> {
    let value = Decimal::from_str(&normalize_decimal_string(s))?;
    if value <= Decimal::ZERO {
        anyhow::bail!("Expected a positive number, got {}", s);
    }

    Ok(value)
}

fn normalize_decimal_string(s: &str) -> String {
    s.replace(',', ".")
}
