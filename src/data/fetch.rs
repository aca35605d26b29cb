//! Throttled page retrieval
//!
//! Every network request in a run goes through one [`Fetcher`], which owns
//! the only [`RateLimiter`]. Pipelines borrow it mutably, so two requests can
//! never overlap and the minimum gap applies across all entity kinds.

use crate::{FantasyError, FetchSettings, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Low-level page transport
pub trait Transport {
    /// Retrieve the body of `url`
    fn get(&self, url: &str) -> Result<String>;
}

/// Blocking HTTP transport
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<String> {
        log::debug!("Fetching {}", url);

        let response = self.client.get(url).send().map_err(|e| FantasyError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        if !response.status().is_success() {
            return Err(FantasyError::Fetch {
                url: url.to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        Ok(response.text()?)
    }
}

/// Size-1 token bucket with a fixed refill period
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_call: Option<Instant>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        RateLimiter {
            interval,
            last_call: None,
        }
    }

    /// Block until the interval since the previous call has elapsed.
    /// Returns how long the caller was held back.
    pub fn acquire(&mut self) -> Duration {
        let waited = match self.last_call {
            Some(last) => {
                let elapsed = last.elapsed();
                if elapsed < self.interval {
                    let remaining = self.interval - elapsed;
                    std::thread::sleep(remaining);
                    remaining
                } else {
                    Duration::ZERO
                }
            }
            None => Duration::ZERO,
        };
        self.last_call = Some(Instant::now());
        waited
    }
}

/// The process-scoped fetch service
pub struct Fetcher {
    transport: Box<dyn Transport>,
    limiter: RateLimiter,
    requests: usize,
}

impl Fetcher {
    pub fn new(transport: Box<dyn Transport>, interval: Duration) -> Self {
        Fetcher {
            transport,
            limiter: RateLimiter::new(interval),
            requests: 0,
        }
    }

    /// HTTP fetcher throttled by the configured interval
    pub fn from_settings(settings: &FetchSettings) -> Result<Self> {
        Ok(Self::new(
            Box::new(HttpTransport::new(settings)?),
            Duration::from_millis(settings.min_interval_ms),
        ))
    }

    /// Fetch one page. No retry: a failure means the data is unavailable.
    pub fn fetch(&mut self, url: &str) -> Result<String> {
        let waited = self.limiter.acquire();
        if !waited.is_zero() {
            log::debug!("Throttled {:?} before {}", waited, url);
        }
        self.requests += 1;
        self.transport.get(url)
    }

    /// Network requests issued so far
    pub fn request_count(&self) -> usize {
        self.requests
    }
}

/// Transport serving canned documents and recording every request.
/// Clones share their pages and call log.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    pages: Rc<RefCell<HashMap<String, String>>>,
    calls: Rc<RefCell<Vec<String>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: impl Into<String>, body: impl Into<String>) {
        self.pages.borrow_mut().insert(url.into(), body.into());
    }

    /// Stop serving `url`; later requests for it fail like a 404
    pub fn remove(&self, url: &str) {
        self.pages.borrow_mut().remove(url);
    }

    /// Number of requests made for `url`
    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.borrow().iter().filter(|u| *u == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl Transport for RecordingTransport {
    fn get(&self, url: &str) -> Result<String> {
        self.calls.borrow_mut().push(url.to_string());
        self.pages
            .borrow()
            .get(url)
            .cloned()
            .ok_or_else(|| FantasyError::Fetch {
                url: url.to_string(),
                message: "HTTP 404 Not Found".to_string(),
            })
    }
}
