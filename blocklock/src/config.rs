use std::time::Duration;

use crate::chain::Address;
use crate::ibe::{IbeOpts, BLOCKLOCK_IBE_OPTS};

/// Blocklock sender contract used when no other address is configured,
/// `0xfd1bf3fcbf2e250abff4a61670dfa3ce740453e5`.
pub const DEFAULT_CONTRACT_ADDRESS: Address = Address::new([
    0xfd, 0x1b, 0xf3, 0xfc, 0xbf, 0x2e, 0x25, 0x0a, 0xbf, 0xf4, 0xa6, 0x16, 0x70, 0xdf, 0xa3,
    0xce, 0x74, 0x04, 0x53, 0xe5,
]);

pub const DEFAULT_BLOCK_LOOKBACK: u64 = 3;
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable settings shared by every operation of a [`crate::Blocklock`] client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub contract_address: Address,
    /// Confirmations to wait for after submitting a request.
    pub confirmations: u64,
    pub ibe: IbeOpts,
}

impl Config {
    pub fn new(contract_address: Address) -> Self {
        Self {
            contract_address,
            ..Default::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            contract_address: DEFAULT_CONTRACT_ADDRESS,
            confirmations: 1,
            ibe: BLOCKLOCK_IBE_OPTS,
        }
    }
}

/// Bounds of [`crate::Blocklock::wait_for_decryption`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitOptions {
    /// Trailing blocks scanned for a fulfillment that landed before the subscriptions.
    pub block_lookback: u64,
    /// Zero waits forever.
    pub timeout: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            block_lookback: DEFAULT_BLOCK_LOOKBACK,
            timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }
}
