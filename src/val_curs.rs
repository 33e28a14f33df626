use serde::Deserialize;
use serde::Serialize;

/// One `<Valute>` entry. Every child is optional so a partial entry still
/// deserializes; the parser decides whether the document is usable.
#[derive(Debug, Deserialize, Serialize, PartialEq, Default)]
pub struct Valute {
    #[serde(rename = "CharCode", default)]
    pub char_code: Option<String>,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Value", default)]
    pub value: Option<String>,
    #[serde(rename = "Nominal", default)]
    pub nominal: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Default)]
pub struct ValCurs {
    #[serde(rename = "Valute", default)]
    pub valute: Vec<Valute>,
}
