use actix_web::{HttpResponse, Responder, post, web};
use log::{debug, info, warn};
use std::sync::atomic::Ordering;

use super::models::{AppState, MineResponse};
use crate::blockchain::Block;
use crate::transaction::Transaction;

/// Mine a new block from the current pool:
/// - Collect the pool's valid transactions plus a reward for this node
/// - Mine PoW against a tip snapshot, outside the chain lock, honoring the
///   shared abort flag
/// - Append under the lock (the tip may have moved; a stale block is
///   discarded) and drop the mined transactions from the pool; anything
///   queued while the search ran stays for the next block
#[post("/mine/")]
pub async fn mine_block(state: web::Data<AppState>) -> impl Responder {
    let (last_block, data) = {
        let bc = state.blockchain.lock().expect("mutex poisoned");
        let pool = state.pool.lock().expect("mutex poisoned");
        let mut data = pool.valid_transactions();
        data.push(Transaction::reward(&state.wallet.address()));
        debug!("MINER - assembling block with {} transactions", data.len());
        (bc.last_block().clone(), data)
    };

    state.mine_abort.store(false, Ordering::Relaxed);
    let Some(block) = Block::mine_with_abort(&last_block, data, &state.mine_abort) else {
        warn!("MINER - attempt aborted, a peer chain was adopted mid-mine");
        return HttpResponse::Conflict().body("mining aborted");
    };

    let resp = {
        let mut bc = state.blockchain.lock().expect("mutex poisoned");
        if let Err(reason) = bc.append(block) {
            warn!("MINER - discarding mined block: {reason}");
            return HttpResponse::Conflict().body(reason.to_string());
        }

        {
            let mut pool = state.pool.lock().expect("mutex poisoned");
            pool.clear_blockchain_transactions(&bc.chain);
        }

        let sealed = bc.last_block();
        MineResponse {
            mined_index: bc.len() - 1,
            hash: sealed.hash.clone(),
            nonce: sealed.nonce,
            difficulty: sealed.difficulty,
        }
    };

    info!(
        "MINER - sealed block #{} (hash={}, nonce={})",
        resp.mined_index, resp.hash, resp.nonce
    );
    HttpResponse::Ok().json(resp)
}
