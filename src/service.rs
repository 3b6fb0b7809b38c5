use std::cmp;
use std::sync::Arc;
use tracing::info;

use crate::cf::cache::MatrixCache;
use crate::cf::scorer::RecommendationScorer;
use crate::cf::Recommendation;
use crate::errors::RecommendError;
use crate::io::CustomerId;
use crate::store::PurchaseHistoryStore;

pub const DEFAULT_NUM_RECOMMENDATIONS: usize = 20;
pub const DEFAULT_MAX_NUM_RECOMMENDATIONS: usize = 200;

/// Entry point for serving recommendations: keeps the cache fresh and turns
/// "nothing to recommend" outcomes into an empty list.
pub struct RecommendationService {
    cache: Arc<MatrixCache>,
    store: Arc<dyn PurchaseHistoryStore>,
    max_similar_customers: usize,
    max_num_recommendations: usize,
}

impl RecommendationService {
    pub fn new(
        cache: Arc<MatrixCache>,
        store: Arc<dyn PurchaseHistoryStore>,
        max_similar_customers: usize,
        max_num_recommendations: usize,
    ) -> Self {
        RecommendationService {
            cache,
            store,
            max_similar_customers,
            max_num_recommendations,
        }
    }

    pub fn cache(&self) -> &MatrixCache {
        &self.cache
    }

    /// Only data source failures and malformed purchase data are errors here.
    pub fn get_recommendations(
        &self,
        customer_id: CustomerId,
        how_many: usize,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        let snapshot = self.cache.ensure_fresh()?;
        let how_many = cmp::min(how_many, self.max_num_recommendations);

        let scorer = RecommendationScorer::new(self.store.as_ref(), self.max_similar_customers);
        match scorer.recommend(customer_id, &snapshot, how_many) {
            Ok(recommendations) => Ok(recommendations),
            Err(err) if err.is_empty_result() => {
                info!(customer_id, reason = %err, "returning no recommendations");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }
}
