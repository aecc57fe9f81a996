//! Source fetcher for the nflverse release archive.
//!
//! Each dataset is a single full-file CSV payload per (dataset, year) key,
//! no pagination and no auth. A failed download is retried a fixed number of
//! times with a fixed delay; nothing is kept between attempts.

use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::ImportError;

const RELEASE_BASE: &str = "https://github.com/nflverse/nflverse-data/releases/download";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    /// Full player roster extract (not yearly).
    Players,
    /// Play-by-play rows for one season.
    PlayByPlay { year: i32 },
    /// Per-player weekly stat lines for one season.
    WeeklyStats { year: i32 },
}

impl Dataset {
    pub fn url(&self) -> String {
        match self {
            Dataset::Players => format!("{RELEASE_BASE}/players/players.csv"),
            Dataset::PlayByPlay { year } => {
                format!("{RELEASE_BASE}/pbp/play_by_play_{year}.csv")
            }
            Dataset::WeeklyStats { year } => {
                format!("{RELEASE_BASE}/player_stats/player_stats_{year}.csv")
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Dataset::Players => "players",
            Dataset::PlayByPlay { .. } => "play_by_play",
            Dataset::WeeklyStats { .. } => "weekly_stats",
        }
    }
}

pub struct Fetcher {
    http: Client,
    /// Retries after the initial attempt; total attempts = max_retries + 1.
    max_retries: u32,
    retry_delay: Duration,
}

impl Fetcher {
    pub fn new(timeout: Duration, max_retries: u32, retry_delay: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent("gridiron-import/0.1")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            max_retries,
            retry_delay,
        })
    }

    /// Download the full CSV payload for a dataset. The initial attempt plus
    /// `max_retries` retries with a fixed inter-attempt delay; the last
    /// failure cause is carried out in `ImportError::FetchExhausted`.
    pub async fn fetch(&self, dataset: Dataset) -> Result<String, ImportError> {
        self.fetch_url(&dataset.url(), dataset.label()).await
    }

    async fn fetch_url(&self, url: &str, label: &str) -> Result<String, ImportError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.try_fetch(url).await {
                Ok(body) => {
                    info!(
                        dataset = label,
                        attempt,
                        bytes = body.len(),
                        "download complete"
                    );
                    return Ok(body);
                }
                Err(err) if attempt <= self.max_retries => {
                    warn!(
                        dataset = label,
                        attempt,
                        max_retries = self.max_retries,
                        error = %err,
                        "download failed; retrying"
                    );
                    sleep(self.retry_delay).await;
                }
                Err(err) => {
                    return Err(ImportError::FetchExhausted {
                        attempts: attempt,
                        source: err,
                    });
                }
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<String, reqwest::Error> {
        let resp = self.http.get(url).send().await?.error_for_status()?;
        resp.text().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn urls_are_deterministic() {
        assert_eq!(
            Dataset::PlayByPlay { year: 2023 }.url(),
            "https://github.com/nflverse/nflverse-data/releases/download/pbp/play_by_play_2023.csv"
        );
        assert_eq!(
            Dataset::WeeklyStats { year: 1999 }.url(),
            "https://github.com/nflverse/nflverse-data/releases/download/player_stats/player_stats_1999.csv"
        );
        assert!(Dataset::Players.url().ends_with("players/players.csv"));
    }

    /// Answers every request with a 503 and closes the connection, counting
    /// requests served. Each attempt shows up as its own connection.
    async fn failing_server() -> (String, Arc<AtomicU32>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = sock.read(&mut [0u8; 1024]).await;
                let _ = sock
                    .write_all(
                        b"HTTP/1.1 503 Service Unavailable\r\n\
                          content-length: 0\r\nconnection: close\r\n\r\n",
                    )
                    .await;
            }
        });
        (format!("http://{addr}/data.csv"), hits)
    }

    #[tokio::test]
    async fn budget_means_initial_attempt_plus_that_many_retries() {
        let (url, hits) = failing_server().await;
        let fetcher = Fetcher::new(Duration::from_secs(5), 3, Duration::from_millis(1)).unwrap();
        let err = fetcher.fetch_url(&url, "test").await.unwrap_err();
        assert_eq!(hits.load(Ordering::SeqCst), 4);
        assert!(matches!(
            err,
            ImportError::FetchExhausted { attempts: 4, .. }
        ));
    }

    #[tokio::test]
    async fn zero_retries_fails_after_one_attempt() {
        let (url, hits) = failing_server().await;
        let fetcher = Fetcher::new(Duration::from_secs(5), 0, Duration::from_millis(1)).unwrap();
        let err = fetcher.fetch_url(&url, "test").await.unwrap_err();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(matches!(
            err,
            ImportError::FetchExhausted { attempts: 1, .. }
        ));
    }
}
