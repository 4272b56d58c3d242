//! In-memory doubles for the connectivity layer and the IBE primitive.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::anyhow;
use ark_bn254::G2Affine;
use ark_ec::AffineRepr;
use tokio::sync::mpsc::UnboundedSender;

use crate::chain::{
    Address, BlockRange, Connection, ContractCall, ContractEvent, Log, LogFilter,
    PendingTransaction, RequestId, SubscriptionId, TransactionReceipt, TxHash,
};
use crate::ciphertext::{encode_ciphertext, Ciphertext};
use crate::ibe::{IbeOpts, IdentityEncryption, PublicKey};
use crate::identity::{to_identity, BlockHeight, Identity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    Submit,
    Query,
    Subscribe,
    Unsubscribe,
}

#[derive(Default)]
struct State {
    head: u64,
    next_request_id: u64,
    next_subscription: u64,
    logs: Vec<Log>,
    receipts: HashMap<TxHash, TransactionReceipt>,
    subscriptions: HashMap<SubscriptionId, (LogFilter, UnboundedSender<Log>)>,
    extra_receipt_logs: Vec<Log>,
    unmined: bool,
    failing_queries: bool,
    stalled_subscriptions: bool,
    emit_on_query: Option<ContractEvent>,
    journal: Vec<Op>,
}

/// Chain holding one blocklock contract, with every log kept in memory.
pub(crate) struct MockChain {
    address: Address,
    state: Mutex<State>,
}

impl MockChain {
    pub(crate) fn new(address: Address) -> Self {
        Self {
            address,
            state: Mutex::new(State {
                head: 100,
                next_request_id: 1,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Mine `event` from the contract in a new block and deliver it to live subscribers.
    pub(crate) fn emit(&self, event: ContractEvent) -> Log {
        self.emit_from(self.address, event)
    }

    pub(crate) fn emit_from(&self, address: Address, event: ContractEvent) -> Log {
        let mut state = self.state();
        state.head += 1;
        let log = Log {
            address,
            block_number: state.head,
            event,
        };
        state.logs.push(log.clone());
        for (filter, sink) in state.subscriptions.values() {
            if filter.matches(&log) {
                let _ = sink.send(log.clone());
            }
        }
        log
    }

    pub(crate) fn advance(&self, blocks: u64) {
        self.state().head += blocks;
    }

    pub(crate) fn active_subscriptions(&self) -> usize {
        self.state().subscriptions.len()
    }

    pub(crate) fn journal(&self) -> Vec<Op> {
        self.state().journal.clone()
    }

    /// Logs added to the receipt of the next submitted transaction.
    pub(crate) fn inject_receipt_log(&self, log: Log) {
        self.state().extra_receipt_logs.push(log);
    }

    pub(crate) fn set_unmined(&self, unmined: bool) {
        self.state().unmined = unmined;
    }

    pub(crate) fn set_failing_queries(&self, failing: bool) {
        self.state().failing_queries = failing;
    }

    /// `subscribe` never completes.
    pub(crate) fn set_stalled_subscriptions(&self, stalled: bool) {
        self.state().stalled_subscriptions = stalled;
    }

    /// Mine `event` at the start of the next log query, before it is answered.
    pub(crate) fn emit_on_next_query(&self, event: ContractEvent) {
        self.state().emit_on_query = Some(event);
    }
}

impl Connection for MockChain {
    async fn submit(&self, call: ContractCall) -> anyhow::Result<PendingTransaction> {
        let ContractCall::RequestBlocklock {
            contract,
            block_height,
            ciphertext,
        } = call;
        if contract != self.address {
            return Err(anyhow!("no contract deployed at {contract}"));
        }

        let request_id = {
            let mut state = self.state();
            state.journal.push(Op::Submit);
            state.next_request_id += 1;
            RequestId::from(state.next_request_id - 1)
        };
        let log = self.emit(ContractEvent::Requested {
            request_id,
            block_height,
            ciphertext,
        });

        let mut state = self.state();
        let hash = TxHash([state.receipts.len() as u8 + 1; 32]);
        let mut logs = vec![log.clone()];
        logs.append(&mut state.extra_receipt_logs);
        if !state.unmined {
            state.receipts.insert(
                hash,
                TransactionReceipt {
                    hash,
                    block_number: log.block_number,
                    logs,
                },
            );
        }
        Ok(PendingTransaction { hash })
    }

    async fn wait_for_confirmation(
        &self,
        tx: &PendingTransaction,
        _confirmations: u64,
    ) -> anyhow::Result<Option<TransactionReceipt>> {
        Ok(self.state().receipts.get(&tx.hash).cloned())
    }

    async fn query_logs(&self, filter: &LogFilter) -> anyhow::Result<Vec<Log>> {
        let pending = self.state().emit_on_query.take();
        if let Some(event) = pending {
            self.emit(event);
        }
        let mut state = self.state();
        state.journal.push(Op::Query);
        if state.failing_queries {
            return Err(anyhow!("rpc endpoint unavailable"));
        }
        let from = match filter.range {
            BlockRange::All => 0,
            BlockRange::Lookback(n) => state.head.saturating_sub(n) + 1,
        };
        Ok(state
            .logs
            .iter()
            .filter(|log| log.block_number >= from && filter.matches(log))
            .cloned()
            .collect())
    }

    async fn subscribe(
        &self,
        filter: LogFilter,
        sink: UnboundedSender<Log>,
    ) -> anyhow::Result<SubscriptionId> {
        let stalled = self.state().stalled_subscriptions;
        if stalled {
            return std::future::pending().await;
        }
        let mut state = self.state();
        state.journal.push(Op::Subscribe);
        let id = SubscriptionId(state.next_subscription);
        state.next_subscription += 1;
        state.subscriptions.insert(id, (filter, sink));
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let mut state = self.state();
        state.journal.push(Op::Unsubscribe);
        state.subscriptions.remove(&id);
    }
}

/// Reversible stand-in for the pairing-based scheme.
///
/// The decryption key of an identity is the identity itself, so tests can release keys
/// with [`FakeIbe::key_for`].
#[derive(Default)]
pub(crate) struct FakeIbe {
    pub(crate) failing: bool,
}

impl FakeIbe {
    pub(crate) fn key_for(height: BlockHeight) -> Vec<u8> {
        to_identity(height).as_bytes().to_vec()
    }
}

fn mask(data: &[u8], key: &[u8]) -> Vec<u8> {
    data.iter()
        .zip(key.iter().cycle())
        .map(|(d, k)| d ^ k)
        .collect()
}

impl IdentityEncryption for FakeIbe {
    fn encrypt(
        &self,
        message: &[u8],
        identity: &Identity,
        _public_key: &PublicKey,
        _opts: &IbeOpts,
    ) -> anyhow::Result<Ciphertext> {
        if self.failing {
            return Err(anyhow!("message too long for the block size"));
        }
        Ok(Ciphertext {
            u: G2Affine::generator(),
            v: identity.as_bytes().to_vec(),
            w: mask(message, identity.as_bytes()),
        })
    }

    fn decrypt(
        &self,
        ciphertext: &Ciphertext,
        key: &[u8],
        _opts: &IbeOpts,
    ) -> anyhow::Result<Vec<u8>> {
        if self.failing || ciphertext.v != key {
            return Err(anyhow!("invalid decryption key"));
        }
        Ok(mask(&ciphertext.w, key))
    }
}

/// `BlocklockCallbackSuccess` for a request made at `height` with `ciphertext`.
pub(crate) fn fulfillment(
    id: RequestId,
    height: BlockHeight,
    ciphertext: &Ciphertext,
) -> ContractEvent {
    ContractEvent::CallbackSuccess {
        request_id: id,
        block_height: height,
        decryption_key: FakeIbe::key_for(height),
        ciphertext: encode_ciphertext(ciphertext),
    }
}
