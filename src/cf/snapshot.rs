use chrono::{DateTime, NaiveDateTime, Utc};
use rayon::prelude::*;
use std::time::Instant;
use tracing::info;

use crate::cf::interaction_matrix::InteractionMatrix;
use crate::cf::similarity::SimilarityMatrix;
use crate::errors::RecommendError;
use crate::io::PurchaseFact;

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotStats {
    pub qty_facts: usize,
    pub qty_customers: usize,
    pub qty_products: usize,
    pub first_purchase_date: Option<NaiveDateTime>,
    pub last_purchase_date: Option<NaiveDateTime>,
    pub build_duration_micros: u128,
}

impl SnapshotStats {
    fn determine(
        facts: &[PurchaseFact],
        matrix: &InteractionMatrix,
        build_duration_micros: u128,
    ) -> Self {
        let first_purchase_date = facts
            .par_iter()
            .map(|fact| fact.last_purchase_date)
            .min();
        let last_purchase_date = facts
            .par_iter()
            .map(|fact| fact.last_purchase_date)
            .max();
        SnapshotStats {
            qty_facts: facts.len(),
            qty_customers: matrix.qty_customers(),
            qty_products: matrix.qty_products(),
            first_purchase_date,
            last_purchase_date,
            build_duration_micros,
        }
    }
}

/// One consistent view of the purchase history: the interaction matrix, the
/// customer similarities derived from it and the moment it was built.
/// Never modified after construction; a refresh builds a new one.
#[derive(Debug)]
pub struct Snapshot {
    pub matrix: InteractionMatrix,
    pub similarity: SimilarityMatrix,
    pub built_at: DateTime<Utc>,
    pub stats: SnapshotStats,
}

impl Snapshot {
    pub fn build(facts: &[PurchaseFact], built_at: DateTime<Utc>) -> Result<Self, RecommendError> {
        let start_time = Instant::now();
        let matrix = InteractionMatrix::build(facts)?;
        let matrix_micros = start_time.elapsed().as_micros();

        let similarity_start_time = Instant::now();
        let similarity = SimilarityMatrix::compute(&matrix);
        let similarity_micros = similarity_start_time.elapsed().as_micros();

        let stats = SnapshotStats::determine(facts, &matrix, start_time.elapsed().as_micros());
        info!(
            qty_facts = stats.qty_facts,
            qty_customers = stats.qty_customers,
            qty_products = stats.qty_products,
            matrix_micros = matrix_micros as u64,
            similarity_micros = similarity_micros as u64,
            "built interaction and similarity matrices"
        );

        Ok(Snapshot {
            matrix,
            similarity,
            built_at,
            stats,
        })
    }
}

#[cfg(test)]
mod snapshot_test {
    use super::*;
    use crate::io::parse_date_time;

    #[test]
    fn should_build_snapshot_with_stats() {
        let facts = vec![
            PurchaseFact::new(1, 10, 2.0, parse_date_time("2023-01-05 10:00:00").unwrap()),
            PurchaseFact::new(1, 11, 1.0, parse_date_time("2023-03-05 10:00:00").unwrap()),
            PurchaseFact::new(2, 10, 1.0, parse_date_time("2022-12-24 18:30:00").unwrap()),
        ];
        let built_at = Utc::now();

        let snapshot = Snapshot::build(&facts, built_at).unwrap();

        assert_eq!(built_at, snapshot.built_at);
        assert_eq!(2, snapshot.similarity.size());
        assert_eq!(3, snapshot.stats.qty_facts);
        assert_eq!(2, snapshot.stats.qty_customers);
        assert_eq!(2, snapshot.stats.qty_products);
        assert_eq!(
            parse_date_time("2022-12-24 18:30:00"),
            snapshot.stats.first_purchase_date
        );
        assert_eq!(
            parse_date_time("2023-03-05 10:00:00"),
            snapshot.stats.last_purchase_date
        );
    }

    #[test]
    fn should_fail_on_malformed_facts() {
        let facts = vec![PurchaseFact::new(
            1,
            10,
            -2.0,
            parse_date_time("2023-01-05 10:00:00").unwrap(),
        )];
        assert!(matches!(
            Snapshot::build(&facts, Utc::now()),
            Err(RecommendError::DataError { .. })
        ));
    }

    #[test]
    fn should_have_no_dates_without_facts() {
        let snapshot = Snapshot::build(&[], Utc::now()).unwrap();
        assert_eq!(None, snapshot.stats.first_purchase_date);
        assert_eq!(None, snapshot.stats.last_purchase_date);
    }
}
