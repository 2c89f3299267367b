pub mod block;
pub mod error;
pub mod model;

pub use block::Block;
pub use error::ChainError;
pub use model::Blockchain;

/// Target milliseconds between blocks; the difficulty controller oscillates
/// around this rate.
pub const MINE_RATE: i64 = 1000;

/// Difficulty (leading zero bits) carried by the genesis block.
pub const INITIAL_DIFFICULTY: u32 = 3;

/// Genesis constants. Every node must reproduce the genesis block
/// byte-identically or no chain will ever validate.
pub const GENESIS_TIMESTAMP: i64 = 1;
pub const GENESIS_LAST_HASH: &str = "-----";
pub const GENESIS_HASH: &str = "hash-one";
