//! Paginated GRC records client.
//!
//! The platform exposes supplier records one workflow step at a time:
//! `GET {base}/api/v2/records?workflow-id=…&step-id=…&page=N&size=100`
//! returning `{content: [...], page: {totalPages}}`. Records whose field map
//! is structurally broken are skipped and counted, not fatal; a malformed
//! page envelope is fatal.

use vmaster_recon::GrcSupplier;

use crate::error::ConnectError;
use crate::http::HttpClient;

const PAGE_SIZE: u32 = 100;
const SERVICE: &str = "GRC API";

pub struct GrcApiClient {
    client: HttpClient,
    base_url: String,
    token: String,
    workflow_id: String,
    step_id: String,
}

/// Fetched records plus the rows skipped for shape problems.
#[derive(Debug)]
pub struct GrcFetch {
    pub records: Vec<GrcSupplier>,
    pub skipped: usize,
}

impl GrcApiClient {
    pub fn new(base_url: String, token: String, workflow_id: String, step_id: String) -> Self {
        Self {
            client: HttpClient::new(SERVICE, extract_grc_error),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            workflow_id,
            step_id,
        }
    }

    /// Fetch every record of the configured workflow step.
    pub fn fetch_suppliers(&self, quiet: bool) -> Result<GrcFetch, ConnectError> {
        let mut records = Vec::new();
        let mut skipped = 0usize;
        let mut page = 0u64;
        let mut total_pages = u64::MAX;

        while page < total_pages {
            let url = format!("{}/api/v2/records", self.base_url);
            let params = [
                ("workflow-id".to_string(), self.workflow_id.clone()),
                ("step-id".to_string(), self.step_id.clone()),
                ("page".to_string(), page.to_string()),
                ("size".to_string(), PAGE_SIZE.to_string()),
            ];
            let token = self.token.clone();

            let body = self
                .client
                .request_with_retry(|http| http.get(&url).bearer_auth(&token).query(&params))?;

            let content = body["content"].as_array().ok_or_else(|| ConnectError::Upstream {
                service: SERVICE,
                message: "response missing 'content' array".into(),
            })?;

            if content.is_empty() {
                break;
            }

            if !quiet {
                eprintln!("  page {page}: {} records", content.len());
            }

            for item in content {
                match parse_record(item) {
                    Some(record) => records.push(record),
                    None => skipped += 1,
                }
            }

            // The page envelope tells us when to stop; if it is absent we
            // stop at the first short page instead of looping forever.
            match body["page"]["totalPages"].as_u64() {
                Some(pages) => total_pages = pages,
                None if (content.len() as u32) < PAGE_SIZE => break,
                None => {
                    return Err(ConnectError::Upstream {
                        service: SERVICE,
                        message: "response missing 'page.totalPages' on a full page".into(),
                    })
                }
            }

            page += 1;
        }

        Ok(GrcFetch { records, skipped })
    }
}

/// One record: `{id, updated: epoch-millis, fields: {…}}`. Returns `None`
/// when the record cannot be used at all (no id or no field map).
fn parse_record(item: &serde_json::Value) -> Option<GrcSupplier> {
    let record_id = item["id"].as_str()?;
    let fields = item["fields"].as_object()?;

    let text = |key: &str| {
        fields
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim()
            .to_string()
    };

    let updated = item["updated"]
        .as_i64()
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map(|dt| dt.naive_utc());

    // "1200 - Print Services" → id "1200", description "Print Services"
    let erp_group = text("erp_group");
    let (group_id, group_description) = split_group(&erp_group);

    let status = text("status");
    let active = status.eq_ignore_ascii_case("Active Supplier");

    Some(GrcSupplier {
        record_id: record_id.to_string(),
        rollup_name: text("rollup_name"),
        supplier_name: text("supplier_name"),
        group_id,
        group_description,
        active,
        updated,
    })
}

fn split_group(raw: &str) -> (String, String) {
    match raw.split_once('-') {
        Some((id, description)) => (id.trim().to_string(), description.trim().to_string()),
        None => (raw.trim().to_string(), String::new()),
    }
}

fn extract_grc_error(body: &serde_json::Value, status: u16) -> String {
    body["message"]
        .as_str()
        .or_else(|| body["error"].as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_splits_on_first_hyphen_only() {
        assert_eq!(
            split_group("1200 - Print Services"),
            ("1200".to_string(), "Print Services".to_string())
        );
        assert_eq!(
            split_group("1200 - Print - Offset"),
            ("1200".to_string(), "Print - Offset".to_string())
        );
        assert_eq!(split_group("1200"), ("1200".to_string(), String::new()));
    }

    #[test]
    fn record_without_id_is_skipped() {
        let item = serde_json::json!({"fields": {"supplier_name": "Acme"}});
        assert!(parse_record(&item).is_none());
    }

    #[test]
    fn status_text_drives_active_flag() {
        let item = serde_json::json!({
            "id": "r1",
            "updated": 1_706_000_000_000i64,
            "fields": {
                "rollup_name": "ACME CORP",
                "supplier_name": "Acme Corp",
                "erp_group": "1200 - Print Services",
                "status": "ACTIVE SUPPLIER"
            }
        });
        let record = parse_record(&item).unwrap();
        assert!(record.active);
        assert_eq!(record.rollup_name, "ACME CORP");
        assert_eq!(record.group_id, "1200");
        assert_eq!(record.group_description, "Print Services");
        assert!(record.updated.is_some());

        let inactive = serde_json::json!({
            "id": "r2",
            "fields": {"status": "Terminated"}
        });
        let record = parse_record(&inactive).unwrap();
        assert!(!record.active);
        assert!(record.updated.is_none());
    }
}
