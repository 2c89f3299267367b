use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{GENESIS_HASH, GENESIS_LAST_HASH, GENESIS_TIMESTAMP, INITIAL_DIFFICULTY, MINE_RATE};
use crate::transaction::Transaction;
use crate::util::{crypto_hash, hex_to_binary};

/// A single block: a batch of transactions sealed under a proof-of-work hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Block {
    pub timestamp: i64, // Unix ms (UTC)
    pub last_hash: String,
    pub hash: String,
    pub data: Vec<Transaction>,
    pub nonce: u64,
    pub difficulty: u32,
}

impl Block {
    /// The fixed first block of every chain.
    pub fn genesis() -> Self {
        Self {
            timestamp: GENESIS_TIMESTAMP,
            last_hash: GENESIS_LAST_HASH.to_string(),
            hash: GENESIS_HASH.to_string(),
            data: Vec::new(),
            nonce: 0,
            difficulty: INITIAL_DIFFICULTY,
        }
    }

    /// Mine a block holding `data` on top of `last_block`. Blocking and
    /// unbounded; difficulty adjustment is the only throttle.
    pub fn mine(last_block: &Block, data: Vec<Transaction>) -> Self {
        let abort = AtomicBool::new(false);
        Self::mine_with_abort(last_block, data, &abort)
            .expect("mining with an unraised abort flag runs to completion")
    }

    /// Mining loop with a cancellation token. Returns `None` once `abort` is
    /// raised, leaving no shared state touched; a caller that adopts a longer
    /// peer chain mid-mine raises the flag and discards the attempt.
    ///
    /// Each attempt re-reads the wall clock and re-adjusts the difficulty, so
    /// a long-running search self-corrects toward `MINE_RATE`.
    pub fn mine_with_abort(
        last_block: &Block,
        data: Vec<Transaction>,
        abort: &AtomicBool,
    ) -> Option<Self> {
        let last_hash = last_block.hash.clone();
        let data_json = serde_json::to_value(&data).expect("serialize block data");

        let mut nonce: u64 = 0;
        loop {
            if abort.load(Ordering::Relaxed) {
                return None;
            }
            nonce += 1;
            let timestamp = Utc::now().timestamp_millis();
            let difficulty = Self::adjust_difficulty(last_block, timestamp);
            let hash = crypto_hash(&[
                json!(timestamp),
                json!(last_hash),
                data_json.clone(),
                json!(nonce),
                json!(difficulty),
            ]);
            if meets_difficulty(&hash, difficulty) {
                return Some(Self {
                    timestamp,
                    last_hash,
                    hash,
                    data,
                    nonce,
                    difficulty,
                });
            }
        }
    }

    /// Recompute the canonical hash over this block's fields (excluding the
    /// cached `hash` itself).
    pub fn compute_hash(&self) -> String {
        crypto_hash(&[
            json!(self.timestamp),
            json!(self.last_hash),
            serde_json::to_value(&self.data).expect("serialize block data"),
            json!(self.nonce),
            json!(self.difficulty),
        ])
    }

    /// Per-block difficulty feedback: one step down when the previous block
    /// took longer than `MINE_RATE`, one step up otherwise, never below 1.
    pub fn adjust_difficulty(original_block: &Block, timestamp: i64) -> u32 {
        let difficulty = original_block.difficulty;
        if difficulty < 1 {
            return 1;
        }
        if timestamp - original_block.timestamp > MINE_RATE {
            return (difficulty - 1).max(1);
        }
        difficulty + 1
    }
}

/// True when the binary expansion of `hash` starts with `difficulty` zeros.
fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    hex_to_binary(hash)
        .chars()
        .take(difficulty as usize)
        .all(|c| c == '0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_has_fixed_fields() {
        let genesis = Block::genesis();
        assert_eq!(genesis.timestamp, GENESIS_TIMESTAMP);
        assert_eq!(genesis.last_hash, GENESIS_LAST_HASH);
        assert_eq!(genesis.hash, GENESIS_HASH);
        assert!(genesis.data.is_empty());
        assert_eq!(genesis.nonce, 0);
        assert_eq!(genesis.difficulty, INITIAL_DIFFICULTY);
    }

    #[test]
    fn mined_block_links_to_last_block() {
        let last_block = Block::genesis();
        let mined = Block::mine(&last_block, vec![]);
        assert_eq!(mined.last_hash, last_block.hash);
    }

    #[test]
    fn mined_block_keeps_its_data() {
        let last_block = Block::genesis();
        let data = vec![Transaction::reward("miner-address")];
        let mined = Block::mine(&last_block, data.clone());
        assert_eq!(mined.data, data);
    }

    #[test]
    fn mined_block_hash_recomputes() {
        let mined = Block::mine(&Block::genesis(), vec![]);
        assert_eq!(mined.hash, mined.compute_hash());
    }

    #[test]
    fn mined_block_hash_meets_its_difficulty() {
        let mined = Block::mine(&Block::genesis(), vec![]);
        let binary = hex_to_binary(&mined.hash);
        assert!(binary[..mined.difficulty as usize].chars().all(|c| c == '0'));
    }

    #[test]
    fn mined_block_adjusts_difficulty_by_one() {
        let last_block = Block::genesis();
        let mined = Block::mine(&last_block, vec![]);
        assert_eq!(last_block.difficulty.abs_diff(mined.difficulty), 1);
    }

    #[test]
    fn nonce_search_starts_at_one() {
        let mined = Block::mine(&Block::genesis(), vec![]);
        assert!(mined.nonce >= 1);
    }

    #[test]
    fn raises_difficulty_for_a_quick_block() {
        let block = Block {
            difficulty: 5,
            ..Block::genesis()
        };
        assert_eq!(
            Block::adjust_difficulty(&block, block.timestamp + MINE_RATE - 100),
            6
        );
    }

    #[test]
    fn lowers_difficulty_for_a_slow_block() {
        let block = Block {
            difficulty: 5,
            ..Block::genesis()
        };
        assert_eq!(
            Block::adjust_difficulty(&block, block.timestamp + MINE_RATE + 100),
            4
        );
    }

    #[test]
    fn difficulty_never_drops_below_one() {
        let block = Block {
            difficulty: 1,
            ..Block::genesis()
        };
        assert_eq!(
            Block::adjust_difficulty(&block, block.timestamp + MINE_RATE + 100),
            1
        );

        let zeroed = Block {
            difficulty: 0,
            ..Block::genesis()
        };
        assert_eq!(Block::adjust_difficulty(&zeroed, zeroed.timestamp), 1);
    }

    #[test]
    fn mining_stops_once_aborted() {
        let abort = AtomicBool::new(true);
        assert_eq!(Block::mine_with_abort(&Block::genesis(), vec![], &abort), None);
    }
}
