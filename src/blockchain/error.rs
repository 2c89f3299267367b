use thiserror::Error;

use crate::transaction::TransactionError;

/// Reasons a candidate chain or block is rejected. None of these are fatal;
/// a rejection leaves local state untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainError {
    #[error("incoming chain must be longer than the current chain")]
    ChainTooShort,

    #[error("incoming chain is structurally invalid")]
    ChainStructurallyInvalid,

    #[error("mined block no longer extends the current tip")]
    StaleTip,

    #[error("miner rewards exceed the one-per-block limit")]
    RewardLimitExceeded,

    #[error("miner reward amount is invalid")]
    RewardAmountInvalid,

    #[error("invalid transaction: {0}")]
    TransactionInvalid(#[from] TransactionError),

    #[error("transaction input amount does not match the sender balance")]
    BalanceMismatch,

    #[error("an identical transaction appears more than once in a block")]
    DuplicateTransaction,
}
