use tracing::{debug, info_span, Instrument};

use crate::chain::{Connection, RequestId};
use crate::error::{BlocklockError, Result};
use crate::ibe::IdentityEncryption;
use crate::Blocklock;

impl<C: Connection, E: IdentityEncryption> Blocklock<C, E> {
    /// Try to decrypt the ciphertext of request `id`.
    ///
    /// Returns `None` while the decryption key has not been released.
    pub async fn decrypt_with_id(&self, id: RequestId) -> Result<Option<Vec<u8>>> {
        let status = self
            .fetch_status(id)
            .instrument(info_span!("blocklock::decrypt_with_id", %id))
            .await?
            .ok_or(BlocklockError::NotFound(id))?;

        let Some(key) = status.decryption_key else {
            debug!(%id, "decryption key not released yet");
            return Ok(None);
        };
        self.decrypt(&status.ciphertext, &key).map(Some)
    }
}
