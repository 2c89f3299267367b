mod chain;
mod health;
mod mining;
pub mod models;
mod tx;
mod wallet;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::get_blocks)
            .service(chain::validate_chain)
            .service(chain::receive_chain)
            .service(mining::mine_block)
            .service(tx::post_transact)
            .service(tx::receive_transaction)
            .service(tx::get_transactions)
            .service(wallet::wallet_info),
    );
}
