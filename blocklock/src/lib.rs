//! # blocklock
//!
//! blocklock is a client for blockchain-anchored timelock encryption. A message is encrypted
//! towards a block height, the ciphertext is registered with the blocklock contract, and the
//! decryption key is released on chain by a threshold network once that height is reached.
//!
//! The crate covers the request lifecycle: deriving the identity of a block height, mapping
//! ciphertexts to and from their on-chain struct, submitting requests, reconstructing their
//! state from contract logs, and waiting for their fulfillment without missing an event
//! emitted between submission and subscription.
//!
//! Two collaborators are left to the caller, which allows for flexibility in how the chain is
//! reached and how the pairing arithmetic is performed:
//! - a [`Connection`] to the chain (submission, confirmations, log queries and subscriptions),
//! - an [`IdentityEncryption`] implementation of the BN254 identity-based encryption scheme.
//!
//! ## Example
//!
//! ```rust,ignore
//! let client = blocklock::Blocklock::new(connection, ibe, blocklock::Config::default());
//! let registration = client.encrypt_and_register(b"hello", height, &public_key).await?;
//! let status = client
//!     .wait_for_decryption(registration.id, blocklock::WaitOptions::default())
//!     .await?;
//! let plaintext = client.decrypt_with_id(status.id).await?;
//! ```

mod chain;
mod ciphertext;
mod conditions;
mod config;
mod decryptor;
mod encoding;
mod error;
mod ibe;
mod identity;
#[cfg(test)]
mod mock;
mod submitter;
mod tracker;
mod waiter;

pub use crate::chain::{
    Address, BlockRange, Connection, ContractCall, ContractEvent, EventKind, Log, LogFilter,
    PendingTransaction, RequestId, SubscriptionId, TransactionReceipt, TxHash, ADDRESS_SIZE,
};
pub use crate::ciphertext::{
    decode_ciphertext, encode_ciphertext, Ciphertext, G2Point, SolidityCiphertext,
};
pub use crate::conditions::{
    decode_conditions, encode_conditions, ConditionExpression, Field, Operator, ParamType,
};
pub use crate::config::{
    Config, WaitOptions, DEFAULT_BLOCK_LOOKBACK, DEFAULT_CONTRACT_ADDRESS, DEFAULT_WAIT_TIMEOUT,
};
pub use crate::error::{BlocklockError, Result};
pub use crate::ibe::{
    public_key_from_bytes, Dsts, ExpandFn, HashFunction, IbeOpts, IdentityEncryption, PublicKey,
    BLOCKLOCK_IBE_OPTS,
};
pub use crate::identity::{parse_block_height, to_identity, BlockHeight, Identity, IDENTITY_SIZE};
pub use crate::submitter::Registration;
pub use crate::tracker::{Request, Status};
pub use primitive_types::U256;

use tracing::info_span;

/// Client of a blocklock contract.
///
/// Holds no request state of its own: everything it reports is rebuilt from contract logs.
pub struct Blocklock<C, E> {
    pub(crate) connection: C,
    pub(crate) ibe: E,
    pub(crate) config: Config,
}

impl<C, E> Blocklock<C, E> {
    pub fn new(connection: C, ibe: E, config: Config) -> Self {
        Self {
            connection,
            ibe,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl<C, E: IdentityEncryption> Blocklock<C, E> {
    /// Encrypt `message` so that it can be decrypted once `block_height` is reached.
    pub fn encrypt(
        &self,
        message: &[u8],
        block_height: BlockHeight,
        public_key: &PublicKey,
    ) -> Result<Ciphertext> {
        let identity = to_identity(block_height);
        info_span!("ibe::encryption")
            .in_scope(|| {
                self.ibe
                    .encrypt(message, &identity, public_key, &self.config.ibe)
            })
            .map_err(BlocklockError::ExternalCrypto)
    }

    /// Decrypt `ciphertext` with the decryption key released for its block height.
    pub fn decrypt(&self, ciphertext: &Ciphertext, key: &[u8]) -> Result<Vec<u8>> {
        info_span!("ibe::decryption")
            .in_scope(|| self.ibe.decrypt(ciphertext, key, &self.config.ibe))
            .map_err(BlocklockError::ExternalCrypto)
    }
}
