use std::collections::BTreeMap;

use itertools::Itertools;
use tracing::{debug, info_span, Instrument};

use crate::chain::{Connection, ContractEvent, EventKind, Log, LogFilter, RequestId};
use crate::ciphertext::{decode_ciphertext, Ciphertext};
use crate::error::{BlocklockError, Result};
use crate::identity::BlockHeight;
use crate::Blocklock;

/// Blocklock request as recorded by its `BlocklockRequested` log.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub id: RequestId,
    pub block_height: BlockHeight,
    pub ciphertext: Ciphertext,
}

/// A request together with its decryption key, once the network has released it.
#[derive(Clone, Debug, PartialEq)]
pub struct Status {
    pub id: RequestId,
    pub block_height: BlockHeight,
    pub ciphertext: Ciphertext,
    pub decryption_key: Option<Vec<u8>>,
}

impl Status {
    pub fn is_fulfilled(&self) -> bool {
        self.decryption_key.is_some()
    }
}

impl From<Request> for Status {
    fn from(r: Request) -> Self {
        Self {
            id: r.id,
            block_height: r.block_height,
            ciphertext: r.ciphertext,
            decryption_key: None,
        }
    }
}

impl TryFrom<Log> for Request {
    type Error = BlocklockError;

    fn try_from(log: Log) -> Result<Self> {
        match log.event {
            ContractEvent::Requested {
                request_id,
                block_height,
                ciphertext,
            } => Ok(Self {
                id: request_id,
                block_height,
                ciphertext: decode_ciphertext(&ciphertext)?,
            }),
            other => Err(unexpected(EventKind::Requested, &other)),
        }
    }
}

impl TryFrom<Log> for Status {
    type Error = BlocklockError;

    fn try_from(log: Log) -> Result<Self> {
        match log.event {
            ContractEvent::CallbackSuccess {
                request_id,
                block_height,
                decryption_key,
                ciphertext,
            } => Ok(Self {
                id: request_id,
                block_height,
                ciphertext: decode_ciphertext(&ciphertext)?,
                decryption_key: Some(decryption_key),
            }),
            other => Err(unexpected(EventKind::CallbackSuccess, &other)),
        }
    }
}

fn unexpected(expected: EventKind, got: &ContractEvent) -> BlocklockError {
    BlocklockError::violation(format!(
        "{expected} filter returned a {} log",
        got.kind()
    ))
}

impl<C: Connection, E> Blocklock<C, E> {
    pub(crate) async fn query(&self, filter: LogFilter) -> Result<Vec<Log>> {
        let event = filter.event;
        let logs = self
            .connection
            .query_logs(&filter)
            .await
            .map_err(BlocklockError::Connection)?;
        debug!(%event, count = logs.len(), "queried logs");
        Ok(logs)
    }

    /// At most one `event` log for request `id`.
    async fn single_log(&self, event: EventKind, id: RequestId) -> Result<Option<Log>> {
        let filter = LogFilter::new(self.config.contract_address, event).request(id);
        self.query(filter)
            .await?
            .into_iter()
            .at_most_one()
            .map_err(|logs| {
                BlocklockError::violation(format!(
                    "{event} filter returned {} results for request {id}",
                    logs.count()
                ))
            })
    }

    /// Fetch a blocklock request, decryption key excluded.
    ///
    /// Returns `None` when no request with this identifier was ever made.
    pub async fn fetch_request(&self, id: RequestId) -> Result<Option<Request>> {
        async {
            self.single_log(EventKind::Requested, id)
                .await?
                .map(Request::try_from)
                .transpose()
        }
        .instrument(info_span!("blocklock::fetch_request", %id))
        .await
    }

    /// Fetch every blocklock request ever made to the contract.
    pub async fn fetch_all_requests(&self) -> Result<BTreeMap<RequestId, Request>> {
        let filter = LogFilter::new(self.config.contract_address, EventKind::Requested);
        self.query(filter)
            .instrument(info_span!("blocklock::fetch_all_requests"))
            .await?
            .into_iter()
            .map(|log| Request::try_from(log).map(|r| (r.id, r)))
            .collect()
    }

    /// Fetch the status of a request, with its decryption key if it has been fulfilled.
    pub async fn fetch_status(&self, id: RequestId) -> Result<Option<Status>> {
        async {
            match self.single_log(EventKind::CallbackSuccess, id).await? {
                Some(log) => Status::try_from(log).map(Some),
                // not fulfilled yet, the request is all there is
                None => Ok(self.fetch_request(id).await?.map(Status::from)),
            }
        }
        .instrument(info_span!("blocklock::fetch_status", %id))
        .await
    }
}
