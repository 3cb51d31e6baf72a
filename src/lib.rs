pub mod api;
pub mod config;
pub mod crypto;
pub mod db;
pub mod rating;

pub use db::DbPool;

use config::Config;
use crypto::TokenKeys;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub tokens: TokenKeys,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        let tokens = TokenKeys::new(&config.jwt_secret(), config.auth.token_ttl_hours);
        Self { config, db, tokens }
    }
}
