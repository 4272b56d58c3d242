//! Seam to the blockchain connectivity layer.
//!
//! Signing, submission, confirmation tracking and log delivery live outside this crate.
//! Implementations of [`Connection`] hand logs over already decoded into [`ContractEvent`]s.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use primitive_types::U256;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::ciphertext::SolidityCiphertext;
use crate::encoding::parse_decimal;
use crate::error::{BlocklockError, Result};
use crate::identity::BlockHeight;

pub const ADDRESS_SIZE: usize = 20;

#[derive(Clone, Copy, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct Address([u8; ADDRESS_SIZE]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = BlocklockError;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| BlocklockError::invalid(format!("address {s:?} must start with 0x")))?;
        let mut bytes = [0u8; ADDRESS_SIZE];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| BlocklockError::invalid(format!("address {s:?}: {e}")))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Identifier the contract assigns to a blocklock request.
///
/// Identifiers are 256-bit and only ever leave the crate as decimal text.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct RequestId(U256);

impl RequestId {
    pub fn value(&self) -> U256 {
        self.0
    }
}

impl From<U256> for RequestId {
    fn from(id: U256) -> Self {
        Self(id)
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self(U256::from(id))
    }
}

impl FromStr for RequestId {
    type Err = BlocklockError;

    fn from_str(s: &str) -> Result<Self> {
        parse_decimal(s)
            .map(Self)
            .map_err(|e| BlocklockError::invalid(format!("request id {e}")))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TxHash(pub [u8; 32]);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Requested,
    CallbackSuccess,
    CallbackFailed,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventKind::Requested => "BlocklockRequested",
            EventKind::CallbackSuccess => "BlocklockCallbackSuccess",
            EventKind::CallbackFailed => "BlocklockCallbackFailed",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContractEvent {
    Requested {
        request_id: RequestId,
        block_height: BlockHeight,
        ciphertext: SolidityCiphertext,
    },
    CallbackSuccess {
        request_id: RequestId,
        block_height: BlockHeight,
        decryption_key: Vec<u8>,
        ciphertext: SolidityCiphertext,
    },
    CallbackFailed {
        request_id: RequestId,
    },
}

impl ContractEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ContractEvent::Requested { .. } => EventKind::Requested,
            ContractEvent::CallbackSuccess { .. } => EventKind::CallbackSuccess,
            ContractEvent::CallbackFailed { .. } => EventKind::CallbackFailed,
        }
    }

    pub fn request_id(&self) -> RequestId {
        match self {
            ContractEvent::Requested { request_id, .. }
            | ContractEvent::CallbackSuccess { request_id, .. }
            | ContractEvent::CallbackFailed { request_id } => *request_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub block_number: u64,
    pub event: ContractEvent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockRange {
    All,
    /// The trailing `n` blocks, counted back from the latest one.
    Lookback(u64),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    pub event: EventKind,
    pub request_id: Option<RequestId>,
    pub range: BlockRange,
}

impl LogFilter {
    pub fn new(address: Address, event: EventKind) -> Self {
        Self {
            address,
            event,
            request_id: None,
            range: BlockRange::All,
        }
    }

    pub fn request(mut self, id: RequestId) -> Self {
        self.request_id = Some(id);
        self
    }

    pub fn lookback(mut self, blocks: u64) -> Self {
        self.range = BlockRange::Lookback(blocks);
        self
    }

    /// Whether `log` satisfies everything but the block range.
    pub fn matches(&self, log: &Log) -> bool {
        log.address == self.address
            && log.event.kind() == self.event
            && self
                .request_id
                .map_or(true, |id| log.event.request_id() == id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContractCall {
    RequestBlocklock {
        contract: Address,
        block_height: BlockHeight,
        ciphertext: SolidityCiphertext,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTransaction {
    pub hash: TxHash,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub hash: TxHash,
    pub block_number: u64,
    pub logs: Vec<Log>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Blockchain connectivity used by the blocklock client.
pub trait Connection: Send + Sync {
    fn submit(
        &self,
        call: ContractCall,
    ) -> impl Future<Output = anyhow::Result<PendingTransaction>> + Send;

    /// Resolves to `None` when the transaction was not mined with `confirmations`.
    fn wait_for_confirmation(
        &self,
        tx: &PendingTransaction,
        confirmations: u64,
    ) -> impl Future<Output = anyhow::Result<Option<TransactionReceipt>>> + Send;

    fn query_logs(
        &self,
        filter: &LogFilter,
    ) -> impl Future<Output = anyhow::Result<Vec<Log>>> + Send;

    /// Forward every future log matching `filter` to `sink` until unsubscribed.
    fn subscribe(
        &self,
        filter: LogFilter,
        sink: UnboundedSender<Log>,
    ) -> impl Future<Output = anyhow::Result<SubscriptionId>> + Send;

    /// Stop future deliveries. A log already handed to the sink stays there.
    fn unsubscribe(&self, id: SubscriptionId);
}

impl<T: Connection> Connection for Arc<T> {
    fn submit(
        &self,
        call: ContractCall,
    ) -> impl Future<Output = anyhow::Result<PendingTransaction>> + Send {
        (**self).submit(call)
    }

    fn wait_for_confirmation(
        &self,
        tx: &PendingTransaction,
        confirmations: u64,
    ) -> impl Future<Output = anyhow::Result<Option<TransactionReceipt>>> + Send {
        (**self).wait_for_confirmation(tx, confirmations)
    }

    fn query_logs(
        &self,
        filter: &LogFilter,
    ) -> impl Future<Output = anyhow::Result<Vec<Log>>> + Send {
        (**self).query_logs(filter)
    }

    fn subscribe(
        &self,
        filter: LogFilter,
        sink: UnboundedSender<Log>,
    ) -> impl Future<Output = anyhow::Result<SubscriptionId>> + Send {
        (**self).subscribe(filter, sink)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        (**self).unsubscribe(id)
    }
}

/// Live subscription that is deregistered when dropped.
pub(crate) struct Subscription<'a, C: Connection> {
    connection: &'a C,
    id: SubscriptionId,
}

impl<'a, C: Connection> Subscription<'a, C> {
    pub(crate) async fn register(
        connection: &'a C,
        filter: LogFilter,
        sink: UnboundedSender<Log>,
    ) -> Result<Subscription<'a, C>> {
        let event = filter.event;
        let id = connection
            .subscribe(filter, sink)
            .await
            .map_err(BlocklockError::Connection)?;
        debug!(?id, %event, "subscribed");
        Ok(Self { connection, id })
    }
}

impl<C: Connection> Drop for Subscription<'_, C> {
    fn drop(&mut self) {
        debug!(id = ?self.id, "unsubscribed");
        self.connection.unsubscribe(self.id);
    }
}
