//! Solana JSON-RPC over HTTP.
//!
//! Implements [`LedgerClient`] with four methods: `getBalance`,
//! `getLatestBlockhash`, `sendTransaction`, and `getSignatureStatuses`.
//! `reqwest::Client` pools connections internally, so one client can be
//! shared by concurrent routing requests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chain_sol::{address_to_bytes, bytes_to_address};
use mix_core::{Commitment, LedgerClient, LedgerError, SignatureStatus, SubmitOptions};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

/// JSON-RPC error code for a failed preflight simulation.
const PREFLIGHT_FAILURE: i64 = -32002;

pub struct HttpLedgerClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Deserialize)]
struct BlockhashValue {
    blockhash: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcSignatureStatus {
    slot: u64,
    confirmation_status: Option<Commitment>,
    err: Option<Value>,
}

impl HttpLedgerClient {
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| LedgerError::Transport(format!("failed to build http client: {e}")))?;

        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, "rpc request");

        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(format!("{method}: {e}")))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LedgerError::Transport(format!("{method}: {e}")))?;

        let envelope: RpcResponse<T> = serde_json::from_str(&text).map_err(|e| {
            if status.is_success() {
                LedgerError::InvalidResponse(format!("{method}: {e}"))
            } else {
                LedgerError::Transport(format!("{method}: http {status}"))
            }
        })?;

        if let Some(err) = envelope.error {
            let message = match err.data {
                Some(data) => format!("{} ({data})", err.message),
                None => err.message,
            };
            return Err(LedgerError::Rpc {
                code: err.code,
                message,
            });
        }

        envelope
            .result
            .ok_or_else(|| LedgerError::InvalidResponse(format!("{method}: missing result")))
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn get_balance(
        &self,
        address: &[u8; 32],
        commitment: Commitment,
    ) -> Result<u64, LedgerError> {
        let params = json!([bytes_to_address(address), { "commitment": commitment }]);
        let balance: WithContext<u64> = self.call("getBalance", params).await?;
        Ok(balance.value)
    }

    async fn latest_blockhash(&self, commitment: Commitment) -> Result<[u8; 32], LedgerError> {
        let params = json!([{ "commitment": commitment }]);
        let latest: WithContext<BlockhashValue> = self.call("getLatestBlockhash", params).await?;
        address_to_bytes(&latest.value.blockhash)
            .map_err(|e| LedgerError::InvalidResponse(format!("blockhash: {e}")))
    }

    async fn send_transaction(
        &self,
        wire: &[u8],
        options: &SubmitOptions,
    ) -> Result<String, LedgerError> {
        let params = json!([
            STANDARD.encode(wire),
            {
                "encoding": "base64",
                "skipPreflight": options.skip_preflight,
                "preflightCommitment": options.preflight_commitment,
            }
        ]);

        match self.call::<String>("sendTransaction", params).await {
            Err(LedgerError::Rpc { code, message }) if code == PREFLIGHT_FAILURE => {
                Err(LedgerError::Rejected(message))
            }
            other => other,
        }
    }

    async fn signature_status(
        &self,
        signature: &str,
    ) -> Result<Option<SignatureStatus>, LedgerError> {
        let params = json!([[signature], { "searchTransactionHistory": true }]);
        let statuses: WithContext<Vec<Option<RpcSignatureStatus>>> =
            self.call("getSignatureStatuses", params).await?;

        Ok(statuses
            .value
            .into_iter()
            .next()
            .flatten()
            .map(|s| SignatureStatus {
                slot: s.slot,
                confirmation: s.confirmation_status,
                err: s.err.filter(|e| !e.is_null()).map(|e| e.to_string()),
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    async fn client_for(server: &mockito::ServerGuard) -> HttpLedgerClient {
        HttpLedgerClient::new(server.url(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn get_balance_reads_context_value() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({
                "method": "getBalance",
                "params": ["11111111111111111111111111111111", { "commitment": "confirmed" }],
            })))
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":9},"value":12345}}"#)
            .create_async()
            .await;

        let client = client_for(&server).await;
        let balance = client.get_balance(&[0u8; 32], Commitment::Confirmed).await.unwrap();
        assert_eq!(balance, 12345);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn latest_blockhash_decodes_base58() {
        let mut server = mockito::Server::new_async().await;
        let blockhash = bytes_to_address(&[7u8; 32]);
        server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "method": "getLatestBlockhash" })))
            .with_body(format!(
                r#"{{"jsonrpc":"2.0","id":1,"result":{{"context":{{"slot":9}},"value":{{"blockhash":"{blockhash}","lastValidBlockHeight":100}}}}}}"#
            ))
            .create_async()
            .await;

        let client = client_for(&server).await;
        assert_eq!(
            client.latest_blockhash(Commitment::Finalized).await.unwrap(),
            [7u8; 32]
        );
    }

    #[tokio::test]
    async fn send_transaction_encodes_base64_with_preflight() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({
                "method": "sendTransaction",
                "params": ["AQID", {
                    "encoding": "base64",
                    "skipPreflight": false,
                    "preflightCommitment": "confirmed",
                }],
            })))
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"5sig"}"#)
            .create_async()
            .await;

        let client = client_for(&server).await;
        let options = SubmitOptions {
            preflight_commitment: Commitment::Confirmed,
            skip_preflight: false,
        };
        assert_eq!(client.send_transaction(&[1, 2, 3], &options).await.unwrap(), "5sig");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn preflight_failure_maps_to_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_body(
                r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32002,"message":"Transaction simulation failed: custom program error: 0x3","data":{"logs":[]}}}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server).await;
        let options = SubmitOptions {
            preflight_commitment: Commitment::Confirmed,
            skip_preflight: false,
        };
        let err = client.send_transaction(&[0], &options).await.unwrap_err();
        match err {
            LedgerError::Rejected(msg) => assert!(msg.contains("0x3")),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn other_rpc_errors_keep_their_code() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"Invalid params"}}"#)
            .create_async()
            .await;

        let client = client_for(&server).await;
        let err = client
            .get_balance(&[0u8; 32], Commitment::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rpc { code: -32602, .. }));
    }

    #[tokio::test]
    async fn signature_status_reports_confirmation_level() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({
                "method": "getSignatureStatuses",
                "params": [["5sig"], { "searchTransactionHistory": true }],
            })))
            .with_body(
                r#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":9},"value":[{"slot":88,"confirmations":null,"err":null,"confirmationStatus":"finalized"}]}}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server).await;
        let status = client.signature_status("5sig").await.unwrap().unwrap();
        assert_eq!(status.slot, 88);
        assert_eq!(status.confirmation, Some(Commitment::Finalized));
        assert_eq!(status.err, None);
    }

    #[tokio::test]
    async fn unknown_signature_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":9},"value":[null]}}"#)
            .create_async()
            .await;

        let client = client_for(&server).await;
        assert_eq!(client.signature_status("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn failed_transaction_carries_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_body(
                r#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":9},"value":[{"slot":5,"err":{"InstructionError":[0,{"Custom":4}]},"confirmationStatus":"confirmed"}]}}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server).await;
        let status = client.signature_status("s").await.unwrap().unwrap();
        assert!(status.err.unwrap().contains("Custom"));
    }

    #[tokio::test]
    async fn http_error_without_json_is_transport() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(503)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let client = client_for(&server).await;
        let err = client
            .latest_blockhash(Commitment::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Transport(_)));
    }
}
