//! Artifact upload to durable remote storage.
//!
//! Bounded attempts with a fixed delay between them, cancellable between
//! attempts, reporting a structured result instead of logging success
//! through a side channel. Exhaustion never touches the already-committed
//! merge; the caller decides how loudly to fail.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::http::USER_AGENT;

#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug)]
pub struct UploadReport {
    /// Attempts actually made (0 when cancelled before the first).
    pub attempts: u32,
    pub outcome: UploadOutcome,
}

#[derive(Debug)]
pub enum UploadOutcome {
    Uploaded,
    Cancelled,
    Failed { message: String },
}

impl UploadReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, UploadOutcome::Uploaded)
    }
}

pub struct ArtifactUploader {
    http: reqwest::blocking::Client,
    endpoint: String,
    container: String,
    token: String,
}

impl ArtifactUploader {
    pub fn new(endpoint: String, container: String, token: String) -> Self {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            container,
            token,
        }
    }

    /// PUT the file under its own name in the configured container.
    pub fn upload(
        &self,
        file: &Path,
        policy: &UploadPolicy,
        cancel: &AtomicBool,
        quiet: bool,
    ) -> UploadReport {
        let file_name = match file.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => {
                return UploadReport {
                    attempts: 0,
                    outcome: UploadOutcome::Failed {
                        message: format!("not a file path: {}", file.display()),
                    },
                }
            }
        };

        let bytes = match std::fs::read(file) {
            Ok(bytes) => bytes,
            Err(e) => {
                return UploadReport {
                    attempts: 0,
                    outcome: UploadOutcome::Failed {
                        message: format!("cannot read {}: {e}", file.display()),
                    },
                }
            }
        };

        let url = format!("{}/{}/{}", self.endpoint, self.container, file_name);
        let mut last_error = String::new();

        for attempt in 1..=policy.attempts {
            if cancel.load(Ordering::Relaxed) {
                return UploadReport {
                    attempts: attempt - 1,
                    outcome: UploadOutcome::Cancelled,
                };
            }

            let result = self
                .http
                .put(&url)
                .bearer_auth(&self.token)
                .header("content-type", "application/octet-stream")
                .body(bytes.clone())
                .send();

            match result {
                Ok(resp) if resp.status().is_success() => {
                    return UploadReport {
                        attempts: attempt,
                        outcome: UploadOutcome::Uploaded,
                    };
                }
                Ok(resp) => {
                    last_error = format!("HTTP {}", resp.status().as_u16());
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }

            if attempt < policy.attempts {
                if !quiet {
                    eprintln!(
                        "warning: upload attempt {attempt}/{} failed ({last_error}), retrying in {}s",
                        policy.attempts,
                        policy.delay.as_secs(),
                    );
                }
                thread::sleep(policy.delay);
            }
        }

        UploadReport {
            attempts: policy.attempts,
            outcome: UploadOutcome::Failed {
                message: format!(
                    "{file_name}: {last_error} after {} attempts",
                    policy.attempts
                ),
            },
        }
    }
}
