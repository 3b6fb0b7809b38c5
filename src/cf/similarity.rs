use hashbrown::HashMap;
use rayon::prelude::*;

use crate::cf::interaction_matrix::InteractionMatrix;
use crate::io::ProductId;

/// Symmetric customer x customer cosine similarities, indexed by interaction matrix row.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    size: usize,
    values: Vec<f64>,
}

fn dot(left: &HashMap<ProductId, f64>, right: &HashMap<ProductId, f64>) -> f64 {
    let (smaller, larger) = if left.len() <= right.len() {
        (left, right)
    } else {
        (right, left)
    };
    smaller
        .iter()
        .filter_map(|(product_id, count)| larger.get(product_id).map(|other| count * other))
        .sum()
}

impl SimilarityMatrix {
    /// Cosine similarity over the zero-filled product space. A customer without
    /// any counts has similarity 0 to everyone, itself included.
    ///
    /// Cost is quadratic in the number of customers, so this only runs on refresh.
    pub fn compute(matrix: &InteractionMatrix) -> Self {
        let rows = matrix.rows();
        let size = rows.len();

        let norms: Vec<f64> = rows
            .par_iter()
            .map(|row| row.values().map(|count| count * count).sum::<f64>().sqrt())
            .collect();

        // upper triangle, one rayon task per row
        let upper: Vec<Vec<f64>> = (0..size)
            .into_par_iter()
            .map(|i| {
                (i..size)
                    .map(|j| {
                        if norms[i] == 0.0 || norms[j] == 0.0 {
                            0.0
                        } else if i == j {
                            1.0
                        } else {
                            (dot(&rows[i], &rows[j]) / (norms[i] * norms[j])).clamp(-1.0, 1.0)
                        }
                    })
                    .collect()
            })
            .collect();

        let mut values = vec![0.0; size * size];
        for (i, row) in upper.iter().enumerate() {
            for (offset, similarity) in row.iter().enumerate() {
                let j = i + offset;
                values[i * size + j] = *similarity;
                values[j * size + i] = *similarity;
            }
        }

        SimilarityMatrix { size, values }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.size + j]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.size..(i + 1) * self.size]
    }
}

#[cfg(test)]
mod similarity_test {
    use super::*;
    use crate::io::{CustomerId, PurchaseFact};
    use chrono::NaiveDate;
    use float_cmp::approx_eq;

    fn fact(customer_id: CustomerId, product_id: ProductId, count: f64) -> PurchaseFact {
        let date = NaiveDate::from_ymd_opt(2023, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        PurchaseFact::new(customer_id, product_id, count, date)
    }

    fn abc_matrix() -> InteractionMatrix {
        InteractionMatrix::build(&[
            fact(1, 1, 3.0),
            fact(1, 2, 1.0),
            fact(2, 1, 2.0),
            fact(2, 2, 5.0),
            fact(3, 3, 4.0),
        ])
        .unwrap()
    }

    #[test]
    fn should_compute_cosine_similarity() {
        let similarity = SimilarityMatrix::compute(&abc_matrix());

        // (3*2 + 1*5) / (sqrt(10) * sqrt(29))
        let expected = 11.0 / (10.0_f64.sqrt() * 29.0_f64.sqrt());
        assert!(approx_eq!(f64, expected, similarity.get(0, 1), epsilon = 1e-12));
        assert!(approx_eq!(f64, 0.0, similarity.get(0, 2)));
        assert!(similarity.get(0, 1) > similarity.get(0, 2));
    }

    #[test]
    fn should_be_symmetric_with_unit_diagonal() {
        let similarity = SimilarityMatrix::compute(&abc_matrix());

        assert_eq!(3, similarity.size());
        for i in 0..similarity.size() {
            assert!(approx_eq!(f64, 1.0, similarity.get(i, i)));
            for j in 0..similarity.size() {
                assert_eq!(similarity.get(i, j), similarity.get(j, i));
                assert!(similarity.get(i, j) >= -1.0 && similarity.get(i, j) <= 1.0);
            }
        }
        assert_eq!(similarity.get(1, 0), similarity.row(1)[0]);
    }

    #[test]
    fn should_not_divide_by_zero_for_empty_rows() {
        let matrix = InteractionMatrix::build(&[fact(1, 1, 0.0), fact(2, 1, 2.0)]).unwrap();

        let similarity = SimilarityMatrix::compute(&matrix);

        assert!(approx_eq!(f64, 0.0, similarity.get(0, 0)));
        assert!(approx_eq!(f64, 0.0, similarity.get(0, 1)));
        assert!(approx_eq!(f64, 1.0, similarity.get(1, 1)));
    }

    #[test]
    fn should_handle_identical_customers() {
        let matrix = InteractionMatrix::build(&[
            fact(1, 1, 1.0),
            fact(1, 2, 2.0),
            fact(2, 1, 2.0),
            fact(2, 2, 4.0),
        ])
        .unwrap();

        let similarity = SimilarityMatrix::compute(&matrix);

        assert!(similarity.get(0, 1) <= 1.0);
        assert!(approx_eq!(f64, 1.0, similarity.get(0, 1), epsilon = 1e-12));
    }

    #[test]
    fn should_compute_empty_matrix() {
        let similarity = SimilarityMatrix::compute(&InteractionMatrix::build(&[]).unwrap());
        assert_eq!(0, similarity.size());
    }
}
