//! Fixtures shared by the unit tests.

use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::fetcher::RateSource;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn entry(code: &str, name: &str, value: &str, nominal: &str) -> String {
    format!(
        "<Valute><CharCode>{}</CharCode><Nominal>{}</Nominal>\
         <Name>{}</Name><Value>{}</Value></Valute>",
        code, nominal, name, value
    )
}

pub fn wrap(entries: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <ValCurs Date=\"01.03.2024\" name=\"Official exchange rate\">{}</ValCurs>",
        entries.concat()
    )
}

/// A document from `(code, name, value, nominal)` tuples.
pub fn document(entries: &[(&str, &str, &str, &str)]) -> String {
    let entries: Vec<String> = entries
        .iter()
        .map(|(code, name, value, nominal)| entry(code, name, value, nominal))
        .collect();
    wrap(&entries)
}

/// In-memory source: known dates return their document, `hanging` dates
/// never answer, everything else is absent.
#[derive(Default)]
pub struct MockSource {
    documents: HashMap<NaiveDate, String>,
    hanging: HashSet<NaiveDate>,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, date: NaiveDate, document: String) -> Self {
        self.documents.insert(date, document);
        self
    }

    pub fn hanging(mut self, date: NaiveDate) -> Self {
        self.hanging.insert(date);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateSource for MockSource {
    async fn fetch(&self, date: NaiveDate) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hanging.contains(&date) {
            std::future::pending::<()>().await;
        }
        self.documents.get(&date).cloned()
    }
}
