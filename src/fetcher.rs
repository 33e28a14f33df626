use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;

/// Where daily rate documents come from.
///
/// `fetch` is best-effort: any failure is `None`, never an error, so one bad
/// day cannot abort a whole window.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch(&self, date: NaiveDate) -> Option<String>;
}

/// Official exchange rates of the National Bank of Moldova.
pub struct BnmFetcher {
    client: Client,
    base_url: String,
}

impl BnmFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create reqwest client: {:?}", e))?;

        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        BnmFetcher {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn url(&self, date: NaiveDate) -> String {
        format!(
            "{}?get_xml=1&date={}",
            self.base_url,
            date.format("%d.%m.%Y")
        )
    }

    async fn load_xml(&self, url: &str) -> Result<String> {
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("Can't download the file: {}", resp.status());
        }

        let text = resp.text().await?;

        Ok(text)
    }
}

#[async_trait]
impl RateSource for BnmFetcher {
    async fn fetch(&self, date: NaiveDate) -> Option<String> {
        let url = self.url(date);
        match self.load_xml(&url).await {
            Ok(text) => Some(text),
            Err(e) => {
                log::warn!("No rates for {}: {:#}", date, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;

    /// Serves one canned HTTP response and returns the base URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{}/rates", addr)
    }

    fn local_fetcher(base: String, timeout: Duration) -> BnmFetcher {
        let client = Client::builder()
            .no_proxy()
            .timeout(timeout)
            .build()
            .unwrap();
        BnmFetcher::with_client(client, base)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn url_is_zero_padded_day_month_year() {
        let fetcher = BnmFetcher::new(
            "https://www.bnm.md/en/official_exchange_rates",
            Duration::from_secs(10),
        )
        .unwrap();

        assert_eq!(
            fetcher.url(date(2024, 3, 5)),
            "https://www.bnm.md/en/official_exchange_rates?get_xml=1&date=05.03.2024"
        );
    }

    #[tokio::test]
    async fn success_returns_body() {
        let base = serve_once("200 OK", "<ValCurs></ValCurs>").await;
        let fetcher = local_fetcher(base, Duration::from_secs(5));

        let body = fetcher.fetch(date(2024, 3, 1)).await;

        assert_eq!(body.as_deref(), Some("<ValCurs></ValCurs>"));
    }

    #[tokio::test]
    async fn error_status_is_absent() {
        let base = serve_once("500 Internal Server Error", "boom").await;
        let fetcher = local_fetcher(base, Duration::from_secs(5));

        assert_eq!(fetcher.fetch(date(2024, 3, 1)).await, None);
    }

    #[tokio::test]
    async fn connection_failure_is_absent() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let fetcher = local_fetcher(format!("http://{}/rates", addr), Duration::from_secs(2));

        assert_eq!(fetcher.fetch(date(2024, 3, 1)).await, None);
    }

    #[tokio::test]
    async fn timeout_is_absent() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        let fetcher = local_fetcher(format!("http://{}/rates", addr), Duration::from_millis(200));

        assert_eq!(fetcher.fetch(date(2024, 3, 1)).await, None);
    }
}
