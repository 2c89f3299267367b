use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

use super::{MINING_REWARD, REWARD_INPUT_ADDRESS};
use crate::blockchain::Block;
use crate::util::crypto_hash;
use crate::wallet::{self, Wallet};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransactionError {
    #[error("amount exceeds the sender balance")]
    AmountExceedsBalance,

    #[error("output total does not match the declared input amount")]
    OutputTotalMismatch,

    #[error("signature does not verify against the sender address")]
    InvalidSignature,

    #[error("reward must carry exactly one output of the fixed amount")]
    MalformedReward,
}

/// Funding side of a transfer: the sender's whole replayed balance enters,
/// the output map distributes it (change returns as a self-output).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferInput {
    pub timestamp: i64, // Unix ms (UTC)
    pub address: String,
    pub amount: u64,
    /// Hex-encoded DER ECDSA signature over the output-map digest.
    pub signature: String,
}

/// Either an ordinary signed transfer or a synthetic miner reward. The two
/// constructors enforce the reward invariants (single output, fixed amount)
/// by construction; received chains are still checked explicitly.
///
/// The output map is a `BTreeMap` so serialization - and with it hashing and
/// signing - is deterministic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transaction {
    Transfer {
        id: String,
        input: TransferInput,
        output_map: BTreeMap<String, u64>,
    },
    Reward {
        id: String,
        output_map: BTreeMap<String, u64>,
    },
}

impl Transaction {
    /// Build a signed transfer of `amount` from `sender` to `recipient`,
    /// funding it with the sender's balance replayed from `chain`.
    pub fn transfer(
        sender: &Wallet,
        recipient: &str,
        amount: u64,
        chain: &[Block],
    ) -> Result<Self, TransactionError> {
        let address = sender.address();
        let balance = wallet::calculate_balance(chain, &address);
        if amount > balance {
            return Err(TransactionError::AmountExceedsBalance);
        }

        let mut output_map = BTreeMap::new();
        output_map.insert(recipient.to_string(), amount);
        // change flows back to the sender; a self-addressed transfer folds
        // the two entries into one
        *output_map.entry(address.clone()).or_insert(0) += balance - amount;

        let input = TransferInput {
            timestamp: Utc::now().timestamp_millis(),
            address,
            amount: balance,
            signature: sender.sign(wallet::output_map_digest(&output_map)),
        };

        Ok(Self::Transfer {
            id: Uuid::new_v4().to_string(),
            input,
            output_map,
        })
    }

    /// Synthetic credit of `MINING_REWARD` to the miner. No input side.
    pub fn reward(miner_address: &str) -> Self {
        let mut output_map = BTreeMap::new();
        output_map.insert(miner_address.to_string(), MINING_REWARD);
        Self::Reward {
            id: Uuid::new_v4().to_string(),
            output_map,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Transfer { id, .. } | Self::Reward { id, .. } => id,
        }
    }

    pub fn is_reward(&self) -> bool {
        matches!(self, Self::Reward { .. })
    }

    /// Sender address; rewards report the sentinel so balance replay and
    /// logging treat them uniformly.
    pub fn input_address(&self) -> &str {
        match self {
            Self::Transfer { input, .. } => &input.address,
            Self::Reward { .. } => REWARD_INPUT_ADDRESS,
        }
    }

    /// The balance a transfer claims to spend from. `None` for rewards.
    pub fn claimed_amount(&self) -> Option<u64> {
        match self {
            Self::Transfer { input, .. } => Some(input.amount),
            Self::Reward { .. } => None,
        }
    }

    pub fn output_map(&self) -> &BTreeMap<String, u64> {
        match self {
            Self::Transfer { output_map, .. } | Self::Reward { output_map, .. } => output_map,
        }
    }

    /// Amount this transaction credits to `address`, if any.
    pub fn output_to(&self, address: &str) -> Option<u64> {
        self.output_map().get(address).copied()
    }

    /// Content digest identifying this transaction; two structurally
    /// identical instances share a digest.
    pub fn digest(&self) -> String {
        crypto_hash(&[serde_json::to_value(self).expect("serialize transaction")])
    }

    /// Self-contained validity: output conservation and signature for
    /// transfers, the fixed single output for rewards. Balance consistency
    /// against a chain is the ledger validator's job, not this one's.
    pub fn verify(&self) -> Result<(), TransactionError> {
        match self {
            Self::Reward { output_map, .. } => {
                if output_map.len() != 1 || output_map.values().next() != Some(&MINING_REWARD) {
                    return Err(TransactionError::MalformedReward);
                }
                Ok(())
            }
            Self::Transfer {
                input, output_map, ..
            } => {
                let output_total: u64 = output_map.values().sum();
                if output_total != input.amount {
                    return Err(TransactionError::OutputTotalMismatch);
                }
                let digest = wallet::output_map_digest(output_map);
                match wallet::verify_signature_hex(&input.address, &input.signature, digest) {
                    Ok(true) => Ok(()),
                    _ => Err(TransactionError::InvalidSignature),
                }
            }
        }
    }
}
