//! Shared blocking HTTP client with retry, backoff, and error classification.
//!
//! Auth failures and non-retryable 4xx fail immediately; 429 and 5xx retry
//! with doubling backoff; network errors retry the same way. Callers own
//! their URL, auth, and query parameters via the request-building closure,
//! which is invoked once per attempt.

use std::thread;
use std::time::Duration;

use crate::error::ConnectError;

const MAX_RETRIES: u32 = 3;
pub(crate) const USER_AGENT: &str = concat!("vmaster/", env!("CARGO_PKG_VERSION"));

pub struct HttpClient {
    http: reqwest::blocking::Client,
    service: &'static str,
    error_extractor: fn(&serde_json::Value, u16) -> String,
}

impl HttpClient {
    pub fn new(service: &'static str, error_extractor: fn(&serde_json::Value, u16) -> String) -> Self {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            service,
            error_extractor,
        }
    }

    /// Make a request with retry + exponential backoff, returning parsed JSON.
    pub fn request_with_retry(
        &self,
        build_request: impl Fn(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<serde_json::Value, ConnectError> {
        let mut backoff_secs = 1u64;

        for attempt in 0..=MAX_RETRIES {
            let result = build_request(&self.http).send();

            match result {
                Ok(resp) => {
                    let status = resp.status().as_u16();

                    // Auth errors: fail immediately
                    if status == 401 || status == 403 {
                        let body: serde_json::Value = resp.json().unwrap_or(serde_json::Value::Null);
                        return Err(ConnectError::Auth {
                            service: self.service,
                            status,
                            message: (self.error_extractor)(&body, status),
                        });
                    }

                    // Other 4xx (not 429): fail immediately
                    if status >= 400 && status < 500 && status != 429 {
                        let body: serde_json::Value = resp.json().unwrap_or(serde_json::Value::Null);
                        return Err(ConnectError::Upstream {
                            service: self.service,
                            message: format!(
                                "rejected ({status}): {}",
                                (self.error_extractor)(&body, status)
                            ),
                        });
                    }

                    // Retryable: 429, 5xx
                    if status == 429 || status >= 500 {
                        if attempt == MAX_RETRIES {
                            return Err(ConnectError::Http {
                                service: self.service,
                                message: format!("HTTP {status} after {MAX_RETRIES} retries"),
                            });
                        }
                        let wait = if status == 429 {
                            resp.headers()
                                .get("retry-after")
                                .and_then(|v| v.to_str().ok())
                                .and_then(|v| v.parse::<u64>().ok())
                                .unwrap_or(backoff_secs)
                        } else {
                            backoff_secs
                        };
                        eprintln!(
                            "warning: {} retry {}/{} in {}s (HTTP {status})",
                            self.service,
                            attempt + 1,
                            MAX_RETRIES,
                            wait,
                        );
                        thread::sleep(Duration::from_secs(wait));
                        backoff_secs *= 2;
                        continue;
                    }

                    // Success: parse JSON
                    let text = resp.text().map_err(|e| ConnectError::Upstream {
                        service: self.service,
                        message: format!("failed to read response body: {e}"),
                    })?;
                    let trimmed = text.trim_start_matches('\u{feff}');
                    return serde_json::from_str(trimmed).map_err(|e| ConnectError::Upstream {
                        service: self.service,
                        message: format!(
                            "failed to parse JSON response: {e} (body: {})",
                            &trimmed[..trimmed.len().min(200)]
                        ),
                    });
                }
                Err(e) => {
                    // Network/timeout errors: retry
                    if attempt == MAX_RETRIES {
                        return Err(ConnectError::Http {
                            service: self.service,
                            message: format!("unreachable after {MAX_RETRIES} retries: {e}"),
                        });
                    }
                    eprintln!(
                        "warning: {} retry {}/{} in {backoff_secs}s ({e})",
                        self.service,
                        attempt + 1,
                        MAX_RETRIES,
                    );
                    thread::sleep(Duration::from_secs(backoff_secs));
                    backoff_secs *= 2;
                }
            }
        }

        unreachable!()
    }
}
