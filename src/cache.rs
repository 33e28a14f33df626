//! Time-boxed memoization of assembled windows.

use std::{sync::Arc, time::Duration};

use chrono::NaiveDate;
use moka::future::Cache;

use crate::{
    assembler::HistoryAssembler,
    error::CursError,
    exchange_rate::RateQuote,
};

/// Keyed on the computed window (end date, length), not on the length
/// alone, so a cached window never survives past the day it was built for.
type WindowKey = (NaiveDate, i64);

/// Why an assembly result stays out of the cache.
#[derive(Debug)]
enum Uncached {
    Failed(CursError),
    /// Empty, or cut short by the deadline; served once, retried next time.
    Degraded(Vec<RateQuote>),
}

pub struct HistoryCache {
    assembler: HistoryAssembler,
    windows: Cache<WindowKey, Arc<Vec<RateQuote>>>,
}

impl HistoryCache {
    pub fn new(assembler: HistoryAssembler, ttl: Duration) -> Self {
        HistoryCache {
            assembler,
            windows: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(32)
                .build(),
        }
    }

    pub async fn history(&self, days: i64) -> Result<Arc<Vec<RateQuote>>, CursError> {
        self.history_at(HistoryAssembler::today(), days).await
    }

    /// Concurrent requests for the same window share one assembly. Empty or
    /// incomplete tables are returned but not cached so the next request
    /// retries.
    pub async fn history_at(
        &self,
        today: NaiveDate,
        days: i64,
    ) -> Result<Arc<Vec<RateQuote>>, CursError> {
        self.assembler.check_window(days)?;

        let key = (today, days);
        if let Some(hit) = self.windows.get(&key).await {
            log::debug!("Cache hit for {} days ending {}", days, today);
            return Ok(hit);
        }

        log::info!("Cache miss for {} days ending {}", days, today);
        let result = self
            .windows
            .try_get_with(key, async {
                let assembly = self
                    .assembler
                    .assemble_at(today, days, std::future::pending())
                    .await
                    .map_err(Uncached::Failed)?;
                if assembly.rows.is_empty() || !assembly.complete {
                    return Err(Uncached::Degraded(assembly.rows));
                }
                Ok(Arc::new(assembly.rows))
            })
            .await;

        match result {
            Ok(table) => Ok(table),
            Err(e) => match e.as_ref() {
                Uncached::Degraded(rows) => {
                    log::warn!(
                        "Not caching degraded table of {} rates for {} days ending {}",
                        rows.len(),
                        days,
                        today
                    );
                    Ok(Arc::new(rows.clone()))
                }
                Uncached::Failed(err) => Err(err.clone()),
            },
        }
    }

    pub fn clear(&self) {
        self.windows.invalidate_all();
        log::info!("Rate cache cleared");
    }
}
