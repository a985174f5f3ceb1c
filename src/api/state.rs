use std::sync::Arc;

use crate::config::Config;
use crate::handlers::NodeRegistry;
use crate::observability::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<NodeRegistry>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(config: Config, registry: NodeRegistry) -> Self {
        let metrics = registry.metrics();
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            metrics,
        }
    }
}
