use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, info};
use std::sync::atomic::Ordering;

use super::models::{AdoptionResponse, AppState, ChainResponse, ValidateResponse};
use crate::blockchain::{Block, Blockchain};

/// Get the full chain in its serialized (broadcastable) form.
#[get("/blocks/")]
pub async fn get_blocks(state: web::Data<AppState>) -> impl Responder {
    let bc = state.blockchain.lock().expect("mutex poisoned");
    let resp = ChainResponse {
        length: bc.len(),
        chain: &bc.chain,
    };
    HttpResponse::Ok().json(resp)
}

/// Structural validity of the local chain.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<AppState>) -> impl Responder {
    let bc = state.blockchain.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(ValidateResponse {
        valid: Blockchain::is_valid_chain(&bc.chain),
        length: bc.len(),
    })
}

/// Receive a candidate chain from a peer: validate structure and transaction
/// data, adopt it if strictly longer, and on adoption drop the transactions
/// it already records from the pool. An in-flight mining attempt is aborted
/// first so a stale block never lands on the adopted chain.
#[post("/chain/")]
pub async fn receive_chain(
    state: web::Data<AppState>,
    body: web::Json<Vec<Block>>,
) -> impl Responder {
    let candidate = body.into_inner();
    debug!("received candidate chain of {} blocks", candidate.len());

    state.mine_abort.store(true, Ordering::Relaxed);

    let mut bc = state.blockchain.lock().expect("mutex poisoned");
    let mut pool = state.pool.lock().expect("mutex poisoned");
    let result = bc.replace_chain(candidate, true, |adopted| {
        pool.clear_blockchain_transactions(adopted);
    });

    match result {
        Ok(()) => {
            info!("adopted peer chain at {} blocks", bc.len());
            HttpResponse::Ok().json(AdoptionResponse {
                adopted: true,
                length: bc.len(),
                reason: None,
            })
        }
        Err(reason) => HttpResponse::Ok().json(AdoptionResponse {
            adopted: false,
            length: bc.len(),
            reason: Some(reason.to_string()),
        }),
    }
}
