use std::sync::Arc;
use cors_core::config::AppConfig;
use tokio::sync::RwLock;
use crate::routes::Book;

#[derive(Clone)]
pub struct AppState {
    pub books: Arc<RwLock<Vec<Book>>>,
    pub cfg: Arc<AppConfig>,
}

impl AppState {
    pub fn new(cfg: Arc<AppConfig>) -> Self {
        Self { books: Arc::new(RwLock::new(Book::samples())), cfg }
    }
    pub fn config(&self) -> &AppConfig { &self.cfg }
}
