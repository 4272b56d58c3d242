use anyhow::anyhow;
use itertools::Itertools;
use tracing::{debug, info, info_span, Instrument};

use crate::chain::{
    Address, Connection, ContractCall, ContractEvent, RequestId, TransactionReceipt,
};
use crate::ciphertext::{encode_ciphertext, Ciphertext};
use crate::error::{BlocklockError, Result};
use crate::ibe::{IdentityEncryption, PublicKey};
use crate::identity::BlockHeight;
use crate::Blocklock;

/// Outcome of [`Blocklock::encrypt_and_register`].
#[derive(Clone, Debug, PartialEq)]
pub struct Registration {
    pub id: RequestId,
    pub ciphertext: Ciphertext,
}

impl<C: Connection, E> Blocklock<C, E> {
    /// Request a blocklock decryption at `block_height` and return the request identifier.
    ///
    /// The identifier is read from the `BlocklockRequested` log of the confirmed
    /// transaction, which must contain exactly one such log from the configured contract.
    pub async fn request_blocklock(
        &self,
        block_height: BlockHeight,
        ciphertext: &Ciphertext,
    ) -> Result<RequestId> {
        self.submit_request(block_height, ciphertext)
            .instrument(info_span!("blocklock::request", %block_height))
            .await
    }

    async fn submit_request(
        &self,
        block_height: BlockHeight,
        ciphertext: &Ciphertext,
    ) -> Result<RequestId> {
        let contract = self.config.contract_address;
        let call = ContractCall::RequestBlocklock {
            contract,
            block_height,
            ciphertext: encode_ciphertext(ciphertext),
        };
        let tx = self
            .connection
            .submit(call)
            .await
            .map_err(BlocklockError::Transaction)?;
        debug!(hash = %tx.hash, "submitted");

        let receipt = self
            .connection
            .wait_for_confirmation(&tx, self.config.confirmations)
            .await
            .map_err(BlocklockError::Transaction)?
            .ok_or_else(|| {
                BlocklockError::Transaction(anyhow!("transaction {} has not been mined", tx.hash))
            })?;

        let id = extract_request_id(&receipt, &contract)?;
        info!(%id, block = receipt.block_number, "blocklock requested");
        Ok(id)
    }
}

impl<C: Connection, E: IdentityEncryption> Blocklock<C, E> {
    /// Encrypt `message` towards `block_height` and register it on chain.
    ///
    /// Sends one transaction.
    pub async fn encrypt_and_register(
        &self,
        message: &[u8],
        block_height: BlockHeight,
        public_key: &PublicKey,
    ) -> Result<Registration> {
        let ciphertext = self.encrypt(message, block_height, public_key)?;
        let id = self.request_blocklock(block_height, &ciphertext).await?;
        Ok(Registration { id, ciphertext })
    }
}

fn extract_request_id(receipt: &TransactionReceipt, contract: &Address) -> Result<RequestId> {
    receipt
        .logs
        .iter()
        .filter(|log| log.address == *contract)
        .filter_map(|log| match &log.event {
            ContractEvent::Requested { request_id, .. } => Some(*request_id),
            _ => None,
        })
        .exactly_one()
        .map_err(|ids| {
            BlocklockError::violation(format!(
                "transaction {} emitted {} BlocklockRequested logs from {contract}, expected one",
                receipt.hash,
                ids.count()
            ))
        })
}
