use std::sync::Arc;

use sqlx::PgPool;

use super::{config::Config, database::init_pool};

pub struct AppState {
    pub config: Config,
    pub db: PgPool,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let db = init_pool(&config.database_url).await;

        Arc::new(Self { config, db })
    }
}
