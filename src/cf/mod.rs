use serde::{Deserialize, Serialize};
use std::cmp::{self, Ordering};
use std::collections::BinaryHeap;

use crate::io::{ProductDetail, ProductId, ProductLineId};

pub mod cache;
pub mod interaction_matrix;
pub mod scorer;
pub mod similarity;
pub mod snapshot;

pub use cache::{Clock, MatrixCache, SystemClock};
pub use interaction_matrix::InteractionMatrix;
pub use scorer::RecommendationScorer;
pub use similarity::SimilarityMatrix;
pub use snapshot::{Snapshot, SnapshotStats};

/// A neighbouring customer, addressed by its row in the interaction matrix.
#[derive(PartialEq, Debug)]
pub struct CustomerScore {
    pub row: usize,
    pub score: f64,
}

impl CustomerScore {
    pub fn new(row: usize, score: f64) -> Self {
        CustomerScore { row, score }
    }
}

impl Eq for CustomerScore {}

impl Ord for CustomerScore {
    fn cmp(&self, other: &Self) -> Ordering {
        // reverse order by score, earlier rows win ties
        match self.score.partial_cmp(&other.score) {
            Some(Ordering::Less) => Ordering::Greater,
            Some(Ordering::Greater) => Ordering::Less,
            _ => self.row.cmp(&other.row),
        }
    }
}

impl PartialOrd for CustomerScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct ProductScore {
    pub id: ProductId,
    pub score: f64,
}

impl ProductScore {
    pub fn new(id: ProductId, score: f64) -> Self {
        ProductScore { id, score }
    }
}

impl Eq for ProductScore {}

impl Ord for ProductScore {
    fn cmp(&self, other: &Self) -> Ordering {
        // reverse order by score, lower product ids win ties
        match self.score.partial_cmp(&other.score) {
            Some(Ordering::Less) => Ordering::Greater,
            Some(Ordering::Greater) => Ordering::Less,
            _ => self.id.cmp(&other.id),
        }
    }
}

impl PartialOrd for ProductScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Keeps the `how_many` best entries. Because the orderings above are
/// reversed, the top of the heap is the weakest entry kept so far.
pub(crate) fn top_k<T: Ord>(scored: impl Iterator<Item = T>, how_many: usize) -> Vec<T> {
    if how_many == 0 {
        return Vec::new();
    }
    let (qty_lower, qty_upper) = scored.size_hint();
    let capacity = cmp::min(how_many, qty_upper.unwrap_or(qty_lower));
    let mut top_items: BinaryHeap<T> = BinaryHeap::with_capacity(capacity);
    for candidate in scored {
        if top_items.len() < how_many {
            top_items.push(candidate);
        } else if let Some(mut bottom) = top_items.peek_mut() {
            if candidate < *bottom {
                *bottom = candidate;
            }
        }
    }
    // ascending in the reversed ordering, so best first
    top_items.into_sorted_vec()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub product_id: ProductId,
    pub name: String,
    pub price: f64,
    #[serde(rename = "prod_line_id")]
    pub product_line_id: ProductLineId,
    pub score: f64,
}

impl Recommendation {
    pub fn new(detail: ProductDetail, score: f64) -> Self {
        Recommendation {
            product_id: detail.product_id,
            name: detail.name,
            price: detail.price,
            product_line_id: detail.product_line_id,
            score,
        }
    }
}

#[cfg(test)]
mod cf_test {
    use super::*;

    #[test]
    fn handle_reverse_ordering_productscore() {
        let largest = ProductScore::new(123, 5000 as f64);
        let middle = ProductScore::new(234, 100 as f64);
        let smallest = ProductScore::new(543, 1 as f64);
        let items = vec![largest, smallest, middle];

        let top_items = top_k(items.into_iter(), 2);

        let ids: Vec<ProductId> = top_items.iter().map(|scored| scored.id).collect();
        assert_eq!(vec![123, 234], ids);
    }

    #[test]
    fn handle_ties_customerscore() {
        let items = vec![
            CustomerScore::new(4, 0.5),
            CustomerScore::new(1, 0.9),
            CustomerScore::new(2, 0.5),
            CustomerScore::new(3, 0.5),
        ];

        let top_items = top_k(items.into_iter(), 3);

        let rows: Vec<usize> = top_items.iter().map(|scored| scored.row).collect();
        assert_eq!(vec![1, 2, 3], rows);
    }

    #[test]
    fn handle_ties_productscore() {
        let items = vec![
            ProductScore::new(30, 2.0),
            ProductScore::new(10, 2.0),
            ProductScore::new(20, 3.0),
        ];

        let ids: Vec<ProductId> = top_k(items.into_iter(), 10)
            .iter()
            .map(|scored| scored.id)
            .collect();
        assert_eq!(vec![20, 10, 30], ids);
    }

    #[test]
    fn should_accept_unbounded_capacity() {
        let items = vec![ProductScore::new(1, 0.5), ProductScore::new(2, 0.9)];
        let ids: Vec<ProductId> = top_k(items.into_iter(), usize::MAX)
            .into_iter()
            .map(|scored| scored.id)
            .collect();
        assert_eq!(vec![2, 1], ids);

        let unsized_scores = (1..=3u64).filter(|id| id % 2 == 1).map(|id| ProductScore::new(id, id as f64));
        assert_eq!(2, top_k(unsized_scores, usize::MAX).len());
    }

    #[test]
    fn should_return_nothing_for_zero_capacity() {
        let items = vec![ProductScore::new(1, 1.0)];
        assert!(top_k(items.into_iter(), 0).is_empty());
    }

    #[test]
    fn should_serialize_with_wire_names() {
        let recommendation = Recommendation {
            product_id: 7,
            name: "Mug".to_string(),
            price: 4.5,
            product_line_id: 2,
            score: 1.25,
        };
        let json = serde_json::to_value(&recommendation).unwrap();
        assert_eq!(
            serde_json::json!({
                "product_id": 7,
                "name": "Mug",
                "price": 4.5,
                "prod_line_id": 2,
                "score": 1.25
            }),
            json
        );
    }
}
