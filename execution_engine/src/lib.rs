//! Execution engine client (spec.md §4.6, §6): JSON-RPC-over-HTTP to the execution layer's
//! `engine_newPayloadV1` / `engine_forkchoiceUpdatedV1` / `engine_getPayloadV1` methods.
//!
//! Grounded on the teacher's `execution_engine` crate shape (a `reqwest`-backed client behind a
//! narrow trait) generalized to the plain async `reqwest::Client` the block processor's
//! cooperative consumer loop (spec.md §5) awaits RPC calls from, rather than the teacher's
//! `either`-typed local/remote split (no local-execution mode is in scope here).

use std::time::Duration;

use anyhow::Result;
use ethereum_types::H256;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use types::{bellatrix::ExecutionPayload, primitives::PayloadId};

/// Default per-call timeout for `forkchoice_updated` (spec.md §4.3, §4.6, §6).
pub const FORKCHOICE_UPDATED_TIMEOUT: Duration = Duration::from_millis(650);
/// `new_payload` is allowed more time since the execution client re-executes every transaction.
pub const NEW_PAYLOAD_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayloadStatusKind {
    Valid,
    Invalid,
    InvalidBlockHash,
    InvalidTerminalBlock,
    Syncing,
    Accepted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayloadStatus {
    pub status: PayloadStatusKind,
    pub latest_valid_hash: Option<H256>,
    pub validation_error: Option<String>,
}

impl PayloadStatus {
    #[must_use]
    pub const fn syncing() -> Self {
        Self {
            status: PayloadStatusKind::Syncing,
            latest_valid_hash: None,
            validation_error: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ForkchoiceState {
    pub head_block_hash: H256,
    pub safe_block_hash: H256,
    pub finalized_block_hash: H256,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadAttributes {
    pub timestamp: u64,
    pub prev_randao: H256,
    pub suggested_fee_recipient: H256,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForkchoiceUpdated {
    pub payload_status: PayloadStatus,
    pub payload_id: Option<PayloadId>,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("execution engine request timed out")]
    Timeout,
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("execution engine returned malformed JSON-RPC response: {0}")]
    Format(#[from] serde_json::Error),
    #[error("execution engine returned a JSON-RPC error: {0}")]
    Rpc(String),
}

/// The narrow interface the block processor and fork choice store need from an execution client
/// (spec.md §4.6/§6). A mock implementation satisfying this trait is what spec.md §8 scenario 4
/// ("optimistic sync block") exercises in tests.
#[async_trait::async_trait]
pub trait ExecutionEngine<P>: Send + Sync {
    async fn new_payload(&self, payload: ExecutionPayload) -> Result<PayloadStatus, Error>;

    async fn forkchoice_updated(
        &self,
        state: ForkchoiceState,
        payload_attributes: Option<PayloadAttributes>,
    ) -> Result<ForkchoiceUpdated, Error>;

    async fn get_payload(&self, payload_id: PayloadId) -> Result<ExecutionPayload, Error>;
}

/// Maps an execution engine's `newPayload` response onto the block processor's dispatch
/// (spec.md §4.3 step 3-7): `invalid*` rejects the block outright, `valid` proceeds to
/// `store_block`, anything else is treated as `MissingParent`-style "not yet".
#[must_use]
pub fn is_invalid(status: PayloadStatusKind) -> bool {
    matches!(
        status,
        PayloadStatusKind::Invalid
            | PayloadStatusKind::InvalidBlockHash
            | PayloadStatusKind::InvalidTerminalBlock
    )
}

/// A lazily-connected JSON-RPC-over-HTTP client (spec.md §4.6's `ensure_data_provider`
/// contract: the connection is not held open between calls, only the endpoint URL is retained).
#[derive(Debug)]
pub struct HttpExecutionEngine {
    endpoint: String,
    client: reqwest::Client,
    jwt: Option<String>,
}

#[derive(Serialize)]
struct JsonRpcRequest<'params, T> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: &'params [T],
}

#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    message: String,
}

impl HttpExecutionEngine {
    #[must_use]
    pub fn new(endpoint: String, jwt: Option<String>) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
            jwt,
        }
    }

    async fn call<Params, Res>(
        &self,
        method: &'static str,
        params: &[Params],
        timeout: Duration,
    ) -> Result<Res, Error>
    where
        Params: Serialize,
        Res: serde::de::DeserializeOwned,
    {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let mut builder = self.client.post(&self.endpoint).json(&request).timeout(timeout);

        if let Some(jwt) = &self.jwt {
            builder = builder.bearer_auth(jwt);
        }

        let response = builder.send().await.map_err(|error| {
            if error.is_timeout() {
                Error::Timeout
            } else {
                Error::Transport(error)
            }
        })?;

        let body: JsonRpcResponse<Res> = response.json().await.map_err(Error::Transport)?;

        if let Some(error) = body.error {
            return Err(Error::Rpc(error.message));
        }

        body.result.ok_or(Error::Timeout)
    }
}

fn hex_encode(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn hex_decode_fixed<const N: usize>(value: &str) -> Result<[u8; N], Error> {
    let bytes = hex::decode(value.trim_start_matches("0x"))
        .map_err(|error| Error::Rpc(error.to_string()))?;

    bytes
        .try_into()
        .map_err(|_| Error::Rpc(format!("expected {N}-byte hex string, got {value}")))
}

fn hex_decode_u64(value: &str) -> Result<u64, Error> {
    u64::from_str_radix(value.trim_start_matches("0x"), 16).map_err(|error| Error::Rpc(error.to_string()))
}

/// The wire shape `engine_newPayloadV1`/`engine_getPayloadV1` exchange: every byte field is a
/// `0x`-prefixed hex string, every quantity a hex-encoded integer, per the Engine API JSON-RPC
/// convention (spec.md §6). The teacher reaches for `serde_utils`'s hex (de)serializers for this;
/// here the conversion is spelled out explicitly against the plain `hex` crate instead, since
/// `serde_utils` isn't part of this workspace (`DESIGN.md`).
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecutionPayloadV1 {
    parent_hash: String,
    fee_recipient: String,
    state_root: String,
    receipts_root: String,
    logs_bloom: String,
    prev_randao: String,
    block_number: String,
    gas_limit: String,
    gas_used: String,
    timestamp: String,
    extra_data: String,
    base_fee_per_gas: String,
    block_hash: String,
    transactions: Vec<String>,
}

impl ExecutionPayloadV1 {
    fn from_payload(payload: &ExecutionPayload) -> Self {
        Self {
            parent_hash: hex_encode(payload.parent_hash.as_bytes()),
            fee_recipient: hex_encode(payload.fee_recipient),
            state_root: hex_encode(payload.state_root.as_bytes()),
            receipts_root: hex_encode(payload.receipts_root.as_bytes()),
            logs_bloom: hex_encode(payload.logs_bloom.iter().copied().collect::<Vec<u8>>()),
            prev_randao: hex_encode(payload.prev_randao.as_bytes()),
            block_number: format!("0x{:x}", payload.block_number),
            gas_limit: format!("0x{:x}", payload.gas_limit),
            gas_used: format!("0x{:x}", payload.gas_used),
            timestamp: format!("0x{:x}", payload.timestamp),
            extra_data: hex_encode(payload.extra_data.as_slice()),
            base_fee_per_gas: hex_encode(payload.base_fee_per_gas),
            block_hash: hex_encode(payload.block_hash.as_bytes()),
            transactions: payload
                .transactions
                .iter()
                .map(|transaction| hex_encode(transaction.as_slice()))
                .collect(),
        }
    }

    fn into_payload(self) -> Result<ExecutionPayload, Error> {
        let logs_bloom: Vec<u8> = hex::decode(self.logs_bloom.trim_start_matches("0x"))
            .map_err(|error| Error::Rpc(error.to_string()))?;
        let extra_data: Vec<u8> = hex::decode(self.extra_data.trim_start_matches("0x"))
            .map_err(|error| Error::Rpc(error.to_string()))?;

        let mut transactions = Vec::with_capacity(self.transactions.len());

        for transaction in self.transactions {
            let bytes: Vec<u8> = hex::decode(transaction.trim_start_matches("0x"))
                .map_err(|error| Error::Rpc(error.to_string()))?;
            transactions.push(
                ssz::ContiguousList::try_from_iter(bytes)
                    .map_err(|error| Error::Rpc(error.to_string()))?,
            );
        }

        Ok(ExecutionPayload {
            parent_hash: H256(hex_decode_fixed(&self.parent_hash)?),
            fee_recipient: hex_decode_fixed(&self.fee_recipient)?,
            state_root: H256(hex_decode_fixed(&self.state_root)?),
            receipts_root: H256(hex_decode_fixed(&self.receipts_root)?),
            logs_bloom: ssz::Vector::try_from_iter(logs_bloom)
                .map_err(|error| Error::Rpc(error.to_string()))?,
            prev_randao: H256(hex_decode_fixed(&self.prev_randao)?),
            block_number: hex_decode_u64(&self.block_number)?,
            gas_limit: hex_decode_u64(&self.gas_limit)?,
            gas_used: hex_decode_u64(&self.gas_used)?,
            timestamp: hex_decode_u64(&self.timestamp)?,
            extra_data: ssz::ContiguousList::try_from_iter(extra_data)
                .map_err(|error| Error::Rpc(error.to_string()))?,
            base_fee_per_gas: hex_decode_fixed(&self.base_fee_per_gas)?,
            block_hash: H256(hex_decode_fixed(&self.block_hash)?),
            transactions,
        })
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForkchoiceStateV1 {
    head_block_hash: String,
    safe_block_hash: String,
    finalized_block_hash: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayloadStatusV1 {
    status: PayloadStatusKind,
    latest_valid_hash: Option<String>,
    validation_error: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForkchoiceUpdatedV1 {
    payload_status: PayloadStatusV1,
    payload_id: Option<String>,
}

#[async_trait::async_trait]
impl<P: Send + Sync> ExecutionEngine<P> for HttpExecutionEngine {
    async fn new_payload(&self, payload: ExecutionPayload) -> Result<PayloadStatus, Error> {
        let request = ExecutionPayloadV1::from_payload(&payload);

        let response: PayloadStatusV1 = self
            .call("engine_newPayloadV1", &[request], NEW_PAYLOAD_TIMEOUT)
            .await?;

        Ok(PayloadStatus {
            status: response.status,
            latest_valid_hash: response
                .latest_valid_hash
                .map(|hash| hex_decode_fixed(&hash).map(H256))
                .transpose()?,
            validation_error: response.validation_error,
        })
    }

    async fn forkchoice_updated(
        &self,
        state: ForkchoiceState,
        payload_attributes: Option<PayloadAttributes>,
    ) -> Result<ForkchoiceUpdated, Error> {
        #[derive(Serialize)]
        #[serde(untagged)]
        enum Param {
            State(ForkchoiceStateV1),
            Attributes(Option<PayloadAttributes>),
        }

        let params = [
            Param::State(ForkchoiceStateV1 {
                head_block_hash: hex_encode(state.head_block_hash.as_bytes()),
                safe_block_hash: hex_encode(state.safe_block_hash.as_bytes()),
                finalized_block_hash: hex_encode(state.finalized_block_hash.as_bytes()),
            }),
            Param::Attributes(payload_attributes),
        ];

        let response: ForkchoiceUpdatedV1 = self
            .call(
                "engine_forkchoiceUpdatedV1",
                &params,
                FORKCHOICE_UPDATED_TIMEOUT,
            )
            .await?;

        Ok(ForkchoiceUpdated {
            payload_status: PayloadStatus {
                status: response.payload_status.status,
                latest_valid_hash: response
                    .payload_status
                    .latest_valid_hash
                    .map(|hash| hex_decode_fixed(&hash).map(H256))
                    .transpose()?,
                validation_error: response.payload_status.validation_error,
            },
            payload_id: response
                .payload_id
                .map(|id| hex_decode_fixed::<8>(&id).map(|bytes| PayloadId::from(u64::from_be_bytes(bytes))))
                .transpose()?,
        })
    }

    async fn get_payload(&self, payload_id: PayloadId) -> Result<ExecutionPayload, Error> {
        let id = hex_encode(u64::from(payload_id).to_be_bytes());

        let response: ExecutionPayloadV1 =
            self.call("engine_getPayloadV1", &[id], NEW_PAYLOAD_TIMEOUT).await?;

        response.into_payload()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_statuses_are_recognised() {
        assert!(is_invalid(PayloadStatusKind::Invalid));
        assert!(is_invalid(PayloadStatusKind::InvalidBlockHash));
        assert!(is_invalid(PayloadStatusKind::InvalidTerminalBlock));
        assert!(!is_invalid(PayloadStatusKind::Valid));
        assert!(!is_invalid(PayloadStatusKind::Syncing));
        assert!(!is_invalid(PayloadStatusKind::Accepted));
    }
}
