//! Waiting for a request to be fulfilled.
//!
//! The fulfillment can land before we start listening or after. Live subscriptions on
//! both terminal events are registered first, then a lookback query covers the blocks
//! mined just before they took effect. Whichever of the three watchers observes the
//! request first settles the wait with a freshly fetched status; the others are dropped
//! unpolled, so a second observation of the same fulfillment is simply never looked at.

use anyhow::anyhow;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::chain::{Connection, EventKind, Log, LogFilter, RequestId, Subscription};
use crate::config::WaitOptions;
use crate::error::{BlocklockError, Result};
use crate::tracker::Status;
use crate::Blocklock;

impl<C: Connection, E> Blocklock<C, E> {
    /// Wait until request `id` is fulfilled, or its callback failed, and return its status.
    ///
    /// Fails with [`BlocklockError::Timeout`] once `opts.timeout` elapses, unless the
    /// timeout is zero. Live subscriptions never outlive the call, including when the
    /// returned future is dropped before completion.
    pub async fn wait_for_decryption(&self, id: RequestId, opts: WaitOptions) -> Result<Status> {
        self.wait(id, opts)
            .instrument(info_span!("blocklock::wait_for_decryption", %id))
            .await
    }

    async fn wait(&self, id: RequestId, opts: WaitOptions) -> Result<Status> {
        let settle = self.settle(id, opts.block_lookback);
        let status = if opts.timeout.is_zero() {
            settle.await?
        } else {
            tokio::time::timeout(opts.timeout, settle)
                .await
                .map_err(|_| {
                    warn!(timeout = ?opts.timeout, "timed out waiting for decryption");
                    BlocklockError::Timeout {
                        request_id: id,
                        after: opts.timeout,
                    }
                })??
        };
        info!(fulfilled = status.is_fulfilled(), "request settled");
        Ok(status)
    }

    /// Register both live subscriptions, then race them against the lookback query.
    async fn settle(&self, id: RequestId, block_lookback: u64) -> Result<Status> {
        let address = self.config.contract_address;
        let (success_tx, success_rx) = mpsc::unbounded_channel();
        let (failure_tx, failure_rx) = mpsc::unbounded_channel();

        // must be in place before anything else is queried
        let _success = Subscription::register(
            &self.connection,
            LogFilter::new(address, EventKind::CallbackSuccess).request(id),
            success_tx,
        )
        .await?;
        let _failure = Subscription::register(
            &self.connection,
            LogFilter::new(address, EventKind::CallbackFailed).request(id),
            failure_tx,
        )
        .await?;

        self.race(id, block_lookback, success_rx, failure_rx).await
    }

    async fn race(
        &self,
        id: RequestId,
        block_lookback: u64,
        success: UnboundedReceiver<Log>,
        failure: UnboundedReceiver<Log>,
    ) -> Result<Status> {
        let backfill = self.backfill(id, block_lookback);
        let success = self.watch(id, success);
        let failure = self.watch(id, failure);
        tokio::pin!(backfill, success, failure);

        let (mut backfill_done, mut success_open, mut failure_open) = (false, true, true);
        loop {
            // the first watcher to yield a status settles the wait
            let settled = tokio::select! {
                status = &mut backfill, if !backfill_done => {
                    backfill_done = true;
                    status?
                }
                status = &mut success, if success_open => {
                    success_open = false;
                    status?
                }
                status = &mut failure, if failure_open => {
                    failure_open = false;
                    status?
                }
                else => {
                    return Err(BlocklockError::Connection(anyhow!(
                        "subscriptions closed before request {id} was fulfilled"
                    )))
                }
            };
            if let Some(status) = settled {
                return Ok(status);
            }
        }
    }

    /// Look for a fulfillment among the last `block_lookback` blocks.
    async fn backfill(&self, id: RequestId, block_lookback: u64) -> Result<Option<Status>> {
        let filter = LogFilter::new(self.config.contract_address, EventKind::CallbackSuccess)
            .request(id)
            .lookback(block_lookback);
        let logs = self.query(filter).await?;
        match logs.iter().find(|log| log.event.request_id() == id) {
            Some(log) => {
                debug!(block = log.block_number, "fulfillment found in lookback");
                self.settled_status(id).await.map(Some)
            }
            None => Ok(None),
        }
    }

    /// Follow a live subscription until it delivers a log for `id`.
    ///
    /// `None` means the subscription was closed by the connection.
    async fn watch(
        &self,
        id: RequestId,
        mut logs: UnboundedReceiver<Log>,
    ) -> Result<Option<Status>> {
        while let Some(log) = logs.recv().await {
            if log.event.request_id() == id {
                debug!(event = %log.event.kind(), block = log.block_number, "observed");
                return self.settled_status(id).await.map(Some);
            }
        }
        Ok(None)
    }

    async fn settled_status(&self, id: RequestId) -> Result<Status> {
        self.fetch_status(id)
            .await?
            .ok_or(BlocklockError::NotFound(id))
    }
}
