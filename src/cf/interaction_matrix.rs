use hashbrown::HashMap;
use itertools::Itertools;

use crate::errors::RecommendError;
use crate::io::{CustomerId, ProductId, PurchaseFact};

/// Customer x product purchase counts.
///
/// Rows are the customers with at least one purchase fact, in ascending id
/// order. Each row only stores non-zero counts; a missing product means zero
/// interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionMatrix {
    customer_ids: Vec<CustomerId>,
    customer_to_row: HashMap<CustomerId, usize>,
    rows: Vec<HashMap<ProductId, f64>>,
    product_ids: Vec<ProductId>,
}

impl InteractionMatrix {
    /// Builds the matrix from facts that are aggregated per (customer, product).
    /// Should a pair appear twice anyway, the later fact overwrites the earlier one.
    pub fn build(facts: &[PurchaseFact]) -> Result<Self, RecommendError> {
        if let Some(invalid) = facts
            .iter()
            .find(|fact| !fact.purchase_count.is_finite() || fact.purchase_count < 0.0)
        {
            return Err(RecommendError::DataError {
                customer_id: invalid.customer_id,
                product_id: invalid.product_id,
                count: invalid.purchase_count,
            });
        }

        let customer_ids: Vec<CustomerId> = facts
            .iter()
            .map(|fact| fact.customer_id)
            .sorted()
            .dedup()
            .collect();
        let product_ids: Vec<ProductId> = facts
            .iter()
            .map(|fact| fact.product_id)
            .sorted()
            .dedup()
            .collect();
        let customer_to_row: HashMap<CustomerId, usize> = customer_ids
            .iter()
            .enumerate()
            .map(|(row, customer_id)| (*customer_id, row))
            .collect();

        let mut rows: Vec<HashMap<ProductId, f64>> = vec![HashMap::new(); customer_ids.len()];
        for fact in facts.iter() {
            let row = &mut rows[customer_to_row[&fact.customer_id]];
            if fact.purchase_count > 0.0 {
                row.insert(fact.product_id, fact.purchase_count);
            } else {
                row.remove(&fact.product_id);
            }
        }

        Ok(InteractionMatrix {
            customer_ids,
            customer_to_row,
            rows,
            product_ids,
        })
    }

    pub fn customer_ids(&self) -> &[CustomerId] {
        &self.customer_ids
    }

    pub fn product_ids(&self) -> &[ProductId] {
        &self.product_ids
    }

    pub fn qty_customers(&self) -> usize {
        self.customer_ids.len()
    }

    pub fn qty_products(&self) -> usize {
        self.product_ids.len()
    }

    pub fn row_of(&self, customer_id: CustomerId) -> Option<usize> {
        self.customer_to_row.get(&customer_id).copied()
    }

    pub fn customer_at(&self, row: usize) -> CustomerId {
        self.customer_ids[row]
    }

    pub fn row(&self, row: usize) -> &HashMap<ProductId, f64> {
        &self.rows[row]
    }

    pub(crate) fn rows(&self) -> &[HashMap<ProductId, f64>] {
        &self.rows
    }

    pub fn interactions(&self, customer_id: CustomerId) -> Option<&HashMap<ProductId, f64>> {
        self.row_of(customer_id).map(|row| &self.rows[row])
    }

    pub fn count(&self, customer_id: CustomerId, product_id: ProductId) -> f64 {
        self.interactions(customer_id)
            .and_then(|row| row.get(&product_id))
            .copied()
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod interaction_matrix_test {
    use super::*;
    use chrono::NaiveDate;

    fn fact(customer_id: CustomerId, product_id: ProductId, count: f64) -> PurchaseFact {
        let date = NaiveDate::from_ymd_opt(2023, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        PurchaseFact::new(customer_id, product_id, count, date)
    }

    #[test]
    fn should_build_rows_and_columns() {
        let facts = vec![fact(3, 30, 4.0), fact(1, 10, 3.0), fact(1, 20, 1.0), fact(2, 10, 2.0)];

        let matrix = InteractionMatrix::build(&facts).unwrap();

        assert_eq!(vec![1, 2, 3], matrix.customer_ids().to_vec());
        assert_eq!(vec![10, 20, 30], matrix.product_ids().to_vec());
        assert_eq!(Some(0), matrix.row_of(1));
        assert_eq!(3, matrix.customer_at(2));
        assert!((3.0 - matrix.count(1, 10)).abs() < f64::EPSILON);
        assert!((0.0 - matrix.count(1, 30)).abs() < f64::EPSILON);
        assert!((0.0 - matrix.count(99, 10)).abs() < f64::EPSILON);
        assert_eq!(2, matrix.interactions(1).unwrap().len());
        assert!(matrix.interactions(99).is_none());
    }

    #[test]
    fn should_let_the_last_duplicate_win() {
        let facts = vec![fact(1, 10, 3.0), fact(1, 10, 5.0)];

        let matrix = InteractionMatrix::build(&facts).unwrap();

        assert!((5.0 - matrix.count(1, 10)).abs() < f64::EPSILON);
    }

    #[test]
    fn should_keep_customers_with_only_zero_counts() {
        let facts = vec![fact(1, 10, 0.0), fact(2, 10, 1.0)];

        let matrix = InteractionMatrix::build(&facts).unwrap();

        assert_eq!(2, matrix.qty_customers());
        assert!(matrix.interactions(1).unwrap().is_empty());
    }

    #[test]
    fn should_reject_negative_counts() {
        let facts = vec![fact(1, 10, 3.0), fact(2, 11, -1.0)];

        match InteractionMatrix::build(&facts) {
            Err(RecommendError::DataError {
                customer_id,
                product_id,
                ..
            }) => assert_eq!((2, 11), (customer_id, product_id)),
            other => panic!("expected a data error, got {:?}", other),
        }
    }

    #[test]
    fn should_reject_non_finite_counts() {
        assert!(InteractionMatrix::build(&[fact(1, 10, f64::NAN)]).is_err());
        assert!(InteractionMatrix::build(&[fact(1, 10, f64::INFINITY)]).is_err());
    }

    #[test]
    fn should_build_empty_matrix() {
        let matrix = InteractionMatrix::build(&[]).unwrap();
        assert_eq!(0, matrix.qty_customers());
        assert_eq!(0, matrix.qty_products());
    }
}
