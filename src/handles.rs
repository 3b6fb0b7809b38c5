use std::sync::Arc;

use crate::service::RecommendationService;

/// Shared state handed to every actix worker.
#[derive(Clone)]
pub struct SharedHandlesAndConfig {
    pub service: Arc<RecommendationService>,
    pub num_recommendations: usize,
    pub max_num_recommendations: usize,
    pub max_similar_customers: usize,
    pub qty_workers: usize,
}
