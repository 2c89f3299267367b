pub mod model;
pub mod pool;

pub use model::{Transaction, TransactionError, TransferInput};
pub use pool::TransactionPool;

/// Amount credited to a miner for sealing a block.
pub const MINING_REWARD: u64 = 50;

/// Sentinel sender address carried by reward credits.
pub const REWARD_INPUT_ADDRESS: &str = "*authorized-reward*";
