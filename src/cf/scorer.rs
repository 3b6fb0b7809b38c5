use hashbrown::{HashMap, HashSet};
use tracing::debug;

use crate::cf::snapshot::Snapshot;
use crate::cf::{top_k, CustomerScore, ProductScore, Recommendation};
use crate::errors::RecommendError;
use crate::io::{CustomerId, ProductId, ProductLineId};
use crate::store::PurchaseHistoryStore;

pub const DEFAULT_MAX_SIMILAR_CUSTOMERS: usize = 49;

/// User based collaborative filtering restricted to the product lines a
/// customer already buys from.
///
/// Every request costs at most three store round trips: the customer's live
/// purchases, one batched product line lookup and one batched detail lookup.
pub struct RecommendationScorer<'a> {
    store: &'a dyn PurchaseHistoryStore,
    max_similar_customers: usize,
}

impl<'a> RecommendationScorer<'a> {
    pub fn new(store: &'a dyn PurchaseHistoryStore, max_similar_customers: usize) -> Self {
        RecommendationScorer {
            store,
            max_similar_customers,
        }
    }

    /// The most similar other customers, best first. Equal similarities keep matrix row order.
    pub fn similar_customers(&self, row: usize, snapshot: &Snapshot) -> Vec<CustomerScore> {
        let candidates = snapshot
            .similarity
            .row(row)
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != row)
            .map(|(other, similarity)| CustomerScore::new(other, *similarity));
        top_k(candidates, self.max_similar_customers)
    }

    /// Ranks unseen products from the customer's neighbourhood, best first, at most `top_n`.
    pub fn score(
        &self,
        customer_id: CustomerId,
        snapshot: &Snapshot,
        top_n: usize,
    ) -> Result<Vec<ProductScore>, RecommendError> {
        let matrix = &snapshot.matrix;
        let row = matrix
            .row_of(customer_id)
            .ok_or(RecommendError::UnknownCustomer(customer_id))?;

        let neighbors = self.similar_customers(row, snapshot);
        if neighbors.is_empty() {
            return Err(RecommendError::NoSimilarCustomers(customer_id));
        }
        if top_n == 0 {
            return Err(RecommendError::NoRecommendations(customer_id));
        }

        // purchases made after the snapshot was built are excluded as well
        let mut purchased_products: HashSet<ProductId> = matrix.row(row).keys().copied().collect();
        purchased_products.extend(self.store.fetch_customer_product_ids(customer_id)?);

        let candidate_products: HashSet<ProductId> = neighbors
            .iter()
            .flat_map(|neighbor| matrix.row(neighbor.row).iter())
            .filter(|(product_id, count)| **count > 0.0 && !purchased_products.contains(*product_id))
            .map(|(product_id, _)| *product_id)
            .collect();
        if candidate_products.is_empty() {
            return Err(RecommendError::NoRecommendations(customer_id));
        }

        let lookup: HashSet<ProductId> = purchased_products
            .union(&candidate_products)
            .copied()
            .collect();
        let product_lines: HashMap<ProductId, ProductLineId> =
            self.store.fetch_product_lines(&lookup)?;
        let allowed_product_lines: HashSet<ProductLineId> = purchased_products
            .iter()
            .filter_map(|product_id| product_lines.get(product_id).copied())
            .collect();

        let mut product_scores: HashMap<ProductId, f64> =
            HashMap::with_capacity(candidate_products.len());
        for neighbor in neighbors.iter() {
            if neighbor.score == 0.0 {
                continue;
            }
            for (product_id, count) in matrix.row(neighbor.row).iter() {
                if *count <= 0.0 || purchased_products.contains(product_id) {
                    continue;
                }
                let in_allowed_line = product_lines
                    .get(product_id)
                    .map_or(false, |line| allowed_product_lines.contains(line));
                if in_allowed_line {
                    *product_scores.entry(*product_id).or_insert(0.0) += neighbor.score * count;
                }
            }
        }

        debug!(
            customer_id,
            qty_neighbors = neighbors.len(),
            qty_candidates = candidate_products.len(),
            qty_scored = product_scores.len(),
            "scored candidate products"
        );

        let ranked = top_k(
            product_scores
                .into_iter()
                .map(|(product_id, score)| ProductScore::new(product_id, score)),
            top_n,
        );
        if ranked.is_empty() {
            return Err(RecommendError::NoRecommendations(customer_id));
        }
        Ok(ranked)
    }

    /// Attaches product details in one batched lookup. Products without details
    /// are dropped and every product appears once, in ranking order.
    pub fn enrich(
        &self,
        customer_id: CustomerId,
        ranked: Vec<ProductScore>,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        let product_ids: HashSet<ProductId> = ranked.iter().map(|scored| scored.id).collect();
        let mut details = self.store.fetch_product_details(&product_ids)?;

        let recommendations: Vec<Recommendation> = ranked
            .into_iter()
            .filter_map(|scored| {
                details
                    .remove(&scored.id)
                    .map(|detail| Recommendation::new(detail, scored.score))
            })
            .collect();

        if recommendations.is_empty() {
            return Err(RecommendError::NoRecommendations(customer_id));
        }
        Ok(recommendations)
    }

    pub fn recommend(
        &self,
        customer_id: CustomerId,
        snapshot: &Snapshot,
        top_n: usize,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        let ranked = self.score(customer_id, snapshot, top_n)?;
        self.enrich(customer_id, ranked)
    }
}
