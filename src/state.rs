use std::sync::Arc;

use crate::analysis::Analyzer;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub analyzer: Arc<Analyzer>,
}

impl AppState {
    pub fn new(config: Arc<Config>, analyzer: Analyzer) -> Self {
        AppState {
            config,
            analyzer: Arc::new(analyzer),
        }
    }
}
