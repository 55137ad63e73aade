pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const GENESIS_INDEX: u64 = 1;
pub const GENESIS_PROOF: u64 = 100;
pub const GENESIS_PREVIOUS_HASH: &str = "1";
/// Hex prefix a `sha256("{previous}{candidate}")` digest must start with.
pub const POW_PREFIX: &str = "0123";
pub const REWARD_SENDER: &str = "0";
pub const REWARD_AMOUNT: f64 = 1.0;
pub const DEFAULT_PEER_TIMEOUT_MS: u64 = 5_000;
