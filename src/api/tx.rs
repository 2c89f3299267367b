use actix_web::{HttpResponse, Responder, get, post, web};
use log::{info, warn};

use super::models::{AppState, PoolResponse, TransactRequest, TransactResponse};
use crate::transaction::Transaction;

/// Build a signed transfer from the node wallet and queue it for inclusion.
/// A newer transfer from this wallet supersedes its pooled predecessor.
#[post("/transact/")]
pub async fn post_transact(
    state: web::Data<AppState>,
    body: web::Json<TransactRequest>,
) -> impl Responder {
    if body.amount == 0 {
        return HttpResponse::BadRequest().body("amount must be > 0");
    }
    if body.recipient.trim().is_empty() {
        return HttpResponse::BadRequest().body("recipient required");
    }

    let tx = {
        let bc = state.blockchain.lock().expect("mutex poisoned");
        match Transaction::transfer(&state.wallet, &body.recipient, body.amount, &bc.chain) {
            Ok(tx) => tx,
            Err(reason) => {
                warn!("POST /transact/ - rejected: {reason}");
                return HttpResponse::BadRequest().body(reason.to_string());
            }
        }
    };

    let id = tx.id().to_string();
    {
        let mut pool = state.pool.lock().expect("mutex poisoned");
        if let Some(previous) = pool.existing_transaction(&state.wallet.address()) {
            let superseded = previous.id().to_string();
            pool.remove(&superseded);
        }
        pool.set_transaction(tx);
    }

    info!("POST /transact/ - queued transaction {id}");
    HttpResponse::Ok().json(TransactResponse { id })
}

/// Receive a peer's transaction and queue it as-is. Ledger rules are only
/// enforced at block inclusion; the pool takes the transaction on faith.
#[post("/transactions/")]
pub async fn receive_transaction(
    state: web::Data<AppState>,
    body: web::Json<Transaction>,
) -> impl Responder {
    let tx = body.into_inner();
    let id = tx.id().to_string();
    {
        let mut pool = state.pool.lock().expect("mutex poisoned");
        pool.set_transaction(tx);
    }
    info!("POST /transactions/ - queued peer transaction {id}");
    HttpResponse::Ok().json(TransactResponse { id })
}

/// List the transactions waiting for block inclusion.
#[get("/transactions/")]
pub async fn get_transactions(state: web::Data<AppState>) -> impl Responder {
    let pool = state.pool.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(PoolResponse {
        size: pool.len(),
        transactions: pool.transactions(),
    })
}
