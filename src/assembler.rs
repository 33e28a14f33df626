use std::{
    collections::BTreeMap,
    future::Future,
    pin::pin,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use chrono::{Days, Local, NaiveDate};
use futures::{StreamExt, stream};

use crate::{
    error::CursError,
    exchange_rate::RateQuote,
    fetcher::RateSource,
    parser::{self, ParsedRate},
};

/// Longest window served unless configured otherwise: the "last year" preset.
pub const DEFAULT_MAX_DAYS: i64 = 365;

/// Rejects a window length outside `1..=max_days`.
pub fn check_window(days: i64, max_days: i64) -> Result<(), CursError> {
    if days <= 0 || days > max_days {
        return Err(CursError::InvalidWindow(days, max_days));
    }

    Ok(())
}

/// The trailing `days` calendar dates ending at `today`, today first.
pub fn rate_window(
    today: NaiveDate,
    days: i64,
    max_days: i64,
) -> Result<Vec<NaiveDate>, CursError> {
    check_window(days, max_days)?;

    (0..days as u64)
        .map(|offset| today.checked_sub_days(Days::new(offset)))
        .collect::<Option<Vec<_>>>()
        .ok_or(CursError::InvalidWindow(days, max_days))
}

/// Rows of one assembly, and whether every day of the window was visited.
/// `complete` is false when cancellation or the deadline cut it short.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub rows: Vec<RateQuote>,
    pub complete: bool,
}

/// Builds the chronological rate table for a trailing window of days.
///
/// Days are fetched concurrently, at most `concurrency` at a time. A day whose
/// document is missing or unusable contributes no rows.
pub struct HistoryAssembler {
    source: Arc<dyn RateSource>,
    concurrency: usize,
    deadline: Option<Duration>,
    max_days: i64,
}

impl HistoryAssembler {
    pub fn new(
        source: Arc<dyn RateSource>,
        concurrency: usize,
        deadline: Option<Duration>,
    ) -> Self {
        HistoryAssembler {
            source,
            concurrency: concurrency.max(1),
            deadline,
            max_days: DEFAULT_MAX_DAYS,
        }
    }

    pub fn with_max_days(mut self, max_days: i64) -> Self {
        self.max_days = max_days;
        self
    }

    pub fn check_window(&self, days: i64) -> Result<(), CursError> {
        check_window(days, self.max_days)
    }

    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    pub async fn assemble(&self, days: i64) -> Result<Vec<RateQuote>, CursError> {
        let assembly = self
            .assemble_at(Self::today(), days, std::future::pending())
            .await?;
        Ok(assembly.rows)
    }

    /// Assembles the window ending at `today`.
    ///
    /// When `cancel` resolves (or the configured deadline passes) no further
    /// fetches are started, in-flight ones are dropped and the rows gathered
    /// so far are returned.
    pub async fn assemble_at<C>(
        &self,
        today: NaiveDate,
        days: i64,
        cancel: C,
    ) -> Result<Assembly, CursError>
    where
        C: Future<Output = ()>,
    {
        let window = rate_window(today, days, self.max_days)?;
        let total = window.len();
        let done = AtomicUsize::new(0);
        let done = &done;
        let source = &self.source;

        let per_day = stream::iter(window)
            .map(move |date| async move {
                let rows = match source.fetch(date).await {
                    Some(raw) => {
                        let rates = parser::parse(&raw);
                        if rates.is_empty() {
                            log::debug!("No usable rates in document for {}", date);
                        }
                        quotes_for(date, rates)
                    }
                    None => Vec::new(),
                };

                let loaded = done.fetch_add(1, Ordering::Relaxed) + 1;
                log::debug!("Loaded {}/{} days", loaded, total);

                rows
            })
            .buffer_unordered(self.concurrency);

        let deadline = self.deadline;
        let stop = async move {
            match deadline {
                Some(limit) => {
                    tokio::select! {
                        _ = cancel => {}
                        _ = tokio::time::sleep(limit) => {
                            log::warn!("Assembly deadline of {:?} reached", limit);
                        }
                    }
                }
                None => cancel.await,
            }
        };

        let mut per_day = pin!(per_day.take_until(stop));
        let mut table = Vec::new();
        while let Some(rows) = per_day.next().await {
            table.extend(rows);
        }

        let loaded = done.load(Ordering::Relaxed);
        let complete = loaded == total;
        if !complete {
            log::info!("Assembly stopped early after {}/{} days", loaded, total);
        }

        table.sort_by_key(|quote| quote.date);

        log::info!(
            "Assembled {} rates over {} days ending {}",
            table.len(),
            total,
            today
        );

        Ok(Assembly {
            rows: table,
            complete,
        })
    }
}

fn quotes_for(date: NaiveDate, rates: BTreeMap<String, ParsedRate>) -> Vec<RateQuote> {
    rates
        .into_iter()
        .map(|(code, parsed)| RateQuote {
            date,
            currency_code: code,
            currency_name: parsed.name,
            rate: parsed.rate,
        })
        .collect()
}
