//! HttpLedger: ledger client over the chain HTTP API
//!
//! Table reads go to `/v1/chain/get_table_rows`. Actions are posted unsigned
//! to the configured push endpoint, which signs and broadcasts them.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use super::action::{Action, TransactionRef};
use super::client::{LedgerClient, TableRequest, TableRows};
use super::config::LedgerConfig;
use crate::error::{DocGraphError, DocGraphResult};

/// Network client for a ledger node
pub struct HttpLedger {
    table_url: String,
    push_url: String,
    http_client: Client,
}

impl HttpLedger {
    pub fn new(config: &LedgerConfig) -> DocGraphResult<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DocGraphError::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self {
            table_url: config.table_url(),
            push_url: config.push_url(),
            http_client,
        })
    }

    async fn post<T, R>(&self, url: &str, body: &T, action: &str) -> DocGraphResult<R>
    where
        T: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let response = self.http_client.post(url).json(body).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error_body: JsonValue = response
            .json()
            .await
            .unwrap_or_else(|_| serde_json::json!({"message": "Unknown error"}));
        Err(classify_failure(status, action, &error_body))
    }
}

/// Map a non-success response onto the transient/permanent split
///
/// A chain error carrying assertion details is a conclusive refusal even when
/// delivered with a 5xx status; other 5xx, 408 and 429 are transient.
fn classify_failure(status: StatusCode, action: &str, body: &JsonValue) -> DocGraphError {
    let details: Vec<&str> = body
        .pointer("/error/details")
        .and_then(JsonValue::as_array)
        .map(|details| details.iter().filter_map(|d| d.get("message")?.as_str()).collect())
        .unwrap_or_default();
    if !details.is_empty() {
        return DocGraphError::Rejected {
            action: action.to_string(),
            message: details.join("; "),
        };
    }

    let message = body
        .pointer("/error/what")
        .or_else(|| body.get("message"))
        .and_then(JsonValue::as_str)
        .unwrap_or("Unknown error");
    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        DocGraphError::Transport(format!("{} returned {}: {}", action, status, message))
    } else {
        DocGraphError::Rejected {
            action: action.to_string(),
            message: format!("{}: {}", status, message),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    transaction_id: String,
    #[serde(default)]
    processed: Option<Processed>,
}

#[derive(Debug, Deserialize)]
struct Processed {
    #[serde(default)]
    action_traces: Vec<ActionTrace>,
}

#[derive(Debug, Deserialize)]
struct ActionTrace {
    #[serde(default)]
    return_value_data: Option<JsonValue>,
}

impl From<PushResponse> for TransactionRef {
    fn from(response: PushResponse) -> Self {
        let return_value = response
            .processed
            .and_then(|p| p.action_traces.into_iter().next())
            .and_then(|trace| trace.return_value_data)
            .filter(|value| !value.is_null());
        TransactionRef {
            transaction_id: response.transaction_id,
            return_value,
        }
    }
}

#[async_trait]
impl LedgerClient for HttpLedger {
    async fn get_table_rows(&self, request: &TableRequest) -> DocGraphResult<TableRows> {
        debug!(
            "get_table_rows {} index {} [{:?}, {:?}] limit {}",
            request.table, request.index_position, request.lower_bound, request.upper_bound, request.limit
        );
        self.post(&self.table_url, request, "get_table_rows").await
    }

    async fn push_action(&self, action: &Action) -> DocGraphResult<TransactionRef> {
        debug!("push_action {}::{}", action.account, action.name);
        let body = serde_json::json!({ "actions": [action] });
        let response: PushResponse = self.post(&self.push_url, &body, action.name.as_str()).await?;
        Ok(response.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assertion_is_rejection() {
        let body = json!({
            "code": 500,
            "message": "Internal Service Error",
            "error": {
                "code": 3050003,
                "name": "eosio_assert_message_exception",
                "what": "eosio_assert_message assertion failure",
                "details": [{"message": "assertion failure with message: document not found"}]
            }
        });
        match classify_failure(StatusCode::INTERNAL_SERVER_ERROR, "erase", &body) {
            DocGraphError::Rejected { action, message } => {
                assert_eq!(action, "erase");
                assert!(message.contains("document not found"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_server_errors_are_transient() {
        let body = json!({"message": "upstream down"});
        let error = classify_failure(StatusCode::BAD_GATEWAY, "get_table_rows", &body);
        assert!(error.is_transient());
        let error = classify_failure(StatusCode::TOO_MANY_REQUESTS, "get_table_rows", &body);
        assert!(error.is_transient());
    }

    #[test]
    fn test_client_errors_are_permanent() {
        let body = json!({"message": "bad request"});
        let error = classify_failure(StatusCode::BAD_REQUEST, "get_table_rows", &body);
        assert!(matches!(error, DocGraphError::Rejected { .. }));
        assert!(!error.is_transient());
    }

    #[test]
    fn test_push_response_return_value() {
        let response: PushResponse = serde_json::from_value(json!({
            "transaction_id": "abc",
            "processed": {"action_traces": [{"return_value_data": {"hash": "00"}}]}
        }))
        .unwrap();
        let trx: TransactionRef = response.into();
        assert_eq!(trx.transaction_id, "abc");
        assert_eq!(trx.return_value, Some(json!({"hash": "00"})));

        let bare: PushResponse = serde_json::from_value(json!({"transaction_id": "def"})).unwrap();
        assert_eq!(TransactionRef::from(bare).return_value, None);
    }

    #[test]
    fn test_new_from_config() {
        let config = LedgerConfig::default();
        let ledger = HttpLedger::new(&config).unwrap();
        assert_eq!(ledger.table_url, "http://127.0.0.1:8888/v1/chain/get_table_rows");
    }
}
