use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, WalletInfoResponse};
use crate::wallet::calculate_balance;

#[get("/wallet/")]
pub async fn wallet_info(state: web::Data<AppState>) -> impl Responder {
    let address = state.wallet.address();
    let balance = {
        let bc = state.blockchain.lock().expect("mutex poisoned");
        calculate_balance(&bc.chain, &address)
    };
    HttpResponse::Ok().json(WalletInfoResponse { address, balance })
}
