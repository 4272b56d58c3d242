use primitive_types::U256;

use crate::encoding::parse_decimal;
use crate::error::{BlocklockError, Result};

/// Target block height of a blocklock request.
pub type BlockHeight = U256;

pub const IDENTITY_SIZE: usize = 32;

/// IBE identity of a block height: its 32-byte big-endian encoding.
///
/// The key released on chain for a height is bound to these exact bytes, so they are
/// only ever derived through [`to_identity`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Identity([u8; IDENTITY_SIZE]);

impl Identity {
    pub fn as_bytes(&self) -> &[u8; IDENTITY_SIZE] {
        &self.0
    }
}

impl AsRef<[u8]> for Identity {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Encode `height` as a left zero-padded 32-byte big-endian identity.
pub fn to_identity(height: BlockHeight) -> Identity {
    let mut bytes = [0u8; IDENTITY_SIZE];
    height.to_big_endian(&mut bytes);
    Identity(bytes)
}

/// Parse a decimal block height.
///
/// Empty text, negative numbers and values that do not fit in 256 bits are rejected.
pub fn parse_block_height(s: &str) -> Result<BlockHeight> {
    parse_decimal(s).map_err(|e| BlocklockError::invalid(format!("block height {e}")))
}
