use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;

use crate::blockchain::{Block, Blockchain};
use crate::transaction::{Transaction, TransactionPool};
use crate::wallet::Wallet;

/// Shared application state.
///
/// The mutexes are the single-writer serialization of chain and pool
/// mutation: a finishing mining attempt and an incoming peer chain race on
/// the same instance, and no two mutations may interleave. `mine_abort` is
/// the cancellation token for an in-flight mining attempt; adopting a peer
/// chain raises it.
pub struct AppState {
    pub blockchain: Mutex<Blockchain>,
    pub pool: Mutex<TransactionPool>,
    pub wallet: Wallet,
    pub mine_abort: AtomicBool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            blockchain: Mutex::new(Blockchain::new()),
            pool: Mutex::new(TransactionPool::new()),
            wallet: Wallet::new(),
            mine_abort: AtomicBool::new(false),
        }
    }
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ChainResponse<'a> {
    pub length: usize,
    pub chain: &'a [Block],
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
}

#[derive(Serialize)]
pub struct AdoptionResponse {
    pub adopted: bool,
    pub length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/* ---------- Mining API Models ---------- */

#[derive(Serialize)]
pub struct MineResponse {
    pub mined_index: usize,
    pub hash: String,
    pub nonce: u64,
    pub difficulty: u32,
}

/* ---------- TX API Models ---------- */

#[derive(Deserialize)]
pub struct TransactRequest {
    pub recipient: String,
    pub amount: u64,
}

#[derive(Serialize)]
pub struct TransactResponse {
    pub id: String,
}

#[derive(Serialize)]
pub struct PoolResponse {
    pub size: usize,
    pub transactions: Vec<Transaction>,
}

/* ---------- Wallet API Models ---------- */

#[derive(Serialize)]
pub struct WalletInfoResponse {
    pub address: String,
    pub balance: u64,
}
