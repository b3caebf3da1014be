//! Per-campus dataset persistence + HTTP fetch utilities.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use coursegraph_core::{Campus, CampusDataset};
use reqwest::StatusCode;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::info_span;
use uuid::Uuid;

pub const CRATE_NAME: &str = "coursegraph-storage";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dataset not found at {}", path.display())]
    NotFound { path: PathBuf },
    #[error("reading dataset {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed dataset {}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One JSON file per campus, written atomically via temp file + rename so a
/// crashed mining run never leaves a truncated dataset behind.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    root: PathBuf,
}

impl DatasetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dataset_path(&self, campus: Campus) -> PathBuf {
        self.root.join(format!("{}.json", campus.dataset_stem()))
    }

    pub fn save(&self, dataset: &CampusDataset) -> anyhow::Result<PathBuf> {
        let path = self.dataset_path(dataset.campus);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating dataset directory {}", parent.display()))?;
        }

        let bytes = serde_json::to_vec_pretty(dataset)
            .with_context(|| format!("serializing {} dataset", dataset.campus))?;

        let temp_path = path
            .parent()
            .expect("dataset path always has parent")
            .join(format!(".{}.tmp", Uuid::new_v4()));
        std::fs::write(&temp_path, &bytes)
            .with_context(|| format!("writing temp dataset file {}", temp_path.display()))?;
        if let Err(err) = std::fs::rename(&temp_path, &path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(err).with_context(|| {
                format!(
                    "atomically renaming temp dataset {} -> {}",
                    temp_path.display(),
                    path.display()
                )
            });
        }
        Ok(path)
    }

    /// Distinguishes a missing file from a corrupt one; both let the build
    /// skip that campus and continue with the others.
    pub fn load(&self, campus: Campus) -> Result<CampusDataset, StoreError> {
        let path = self.dataset_path(campus);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound { path })
            }
            Err(err) => return Err(StoreError::Io { path, source: err }),
        };
        serde_json::from_str(&text).map_err(|source| StoreError::Malformed { path, source })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retryable,
    NonRetryable,
}

pub fn classify_status(status: StatusCode) -> RetryDisposition {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        RetryDisposition::Retryable
    } else {
        RetryDisposition::NonRetryable
    }
}

pub fn classify_reqwest_error(err: &reqwest::Error) -> RetryDisposition {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        RetryDisposition::Retryable
    } else {
        RetryDisposition::NonRetryable
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl BackoffPolicy {
    pub fn delay_for_attempt(&self, attempt_index: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt_index as u32).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor);
        delay.min(self.max_delay)
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub concurrency: usize,
    pub backoff: BackoffPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            user_agent: None,
            concurrency: 8,
            backoff: BackoffPolicy::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed after retries: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("non-utf8 response body for {url}")]
    NotText { url: String },
}

enum RequestKind<'a> {
    Get,
    PostForm(&'a [(&'a str, String)]),
}

/// Shared fetcher for all campus adapters: bounded concurrency, retry with
/// exponential capped backoff, GET and form-POST (the UTSC department API
/// only answers POST requests).
#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    limit: Arc<Semaphore>,
    backoff: BackoffPolicy,
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().context("building reqwest client")?;
        Ok(Self {
            client,
            limit: Arc::new(Semaphore::new(config.concurrency.max(1))),
            backoff: config.backoff,
        })
    }

    pub async fn fetch_text(
        &self,
        run_id: Uuid,
        campus: Campus,
        url: &str,
    ) -> Result<String, FetchError> {
        self.request_text(run_id, campus, url, RequestKind::Get)
            .await
    }

    pub async fn post_form_text(
        &self,
        run_id: Uuid,
        campus: Campus,
        url: &str,
        form: &[(&str, String)],
    ) -> Result<String, FetchError> {
        self.request_text(run_id, campus, url, RequestKind::PostForm(form))
            .await
    }

    async fn request_text(
        &self,
        run_id: Uuid,
        campus: Campus,
        url: &str,
        kind: RequestKind<'_>,
    ) -> Result<String, FetchError> {
        let _permit = self.limit.acquire().await.expect("semaphore not closed");

        let span = info_span!("http_fetch", %run_id, campus = campus.tag(), url);
        let _guard = span.enter();

        let mut last_request_error: Option<reqwest::Error> = None;

        for attempt in 0..=self.backoff.max_retries {
            let request = match &kind {
                RequestKind::Get => self.client.get(url),
                RequestKind::PostForm(form) => self.client.post(url).form(form),
            };

            match request.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let final_url = resp.url().to_string();

                    if status.is_success() {
                        let body = resp.bytes().await?.to_vec();
                        return String::from_utf8(body)
                            .map_err(|_| FetchError::NotText { url: final_url });
                    }

                    if classify_status(status) == RetryDisposition::Retryable
                        && attempt < self.backoff.max_retries
                    {
                        tokio::time::sleep(self.backoff.delay_for_attempt(attempt)).await;
                        continue;
                    }

                    return Err(FetchError::HttpStatus {
                        status: status.as_u16(),
                        url: final_url,
                    });
                }
                Err(err) => {
                    if classify_reqwest_error(&err) == RetryDisposition::Retryable
                        && attempt < self.backoff.max_retries
                    {
                        last_request_error = Some(err);
                        tokio::time::sleep(self.backoff.delay_for_attempt(attempt)).await;
                        continue;
                    }
                    return Err(FetchError::Request(err));
                }
            }
        }

        Err(FetchError::Request(
            last_request_error.expect("retry loop should capture a request error"),
        ))
    }
}
