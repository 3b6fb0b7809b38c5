use thiserror::Error;

use crate::io::{CustomerId, ProductId};

/// Failures of the purchase history data source.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("reading purchase data failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed csv data: {0}")]
    Csv(#[from] csv::Error),
    #[error("purchase history unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("invalid purchase count {count} for customer {customer_id} and product {product_id}")]
    DataError {
        customer_id: CustomerId,
        product_id: ProductId,
        count: f64,
    },
    #[error("data source unavailable: {0}")]
    SourceUnavailable(#[from] StoreError),
    #[error("customer {0} has no purchase history")]
    UnknownCustomer(CustomerId),
    #[error("no similar customers for customer {0}")]
    NoSimilarCustomers(CustomerId),
    #[error("no recommendations for customer {0}")]
    NoRecommendations(CustomerId),
}

impl RecommendError {
    /// Conditions that mean "nothing to recommend" rather than a failure.
    pub fn is_empty_result(&self) -> bool {
        matches!(
            self,
            RecommendError::UnknownCustomer(_)
                | RecommendError::NoSimilarCustomers(_)
                | RecommendError::NoRecommendations(_)
        )
    }

    /// Copy of this error for callers that waited on the refresh which produced it.
    /// Source errors keep their message only.
    pub(crate) fn duplicate(&self) -> RecommendError {
        match self {
            RecommendError::DataError {
                customer_id,
                product_id,
                count,
            } => RecommendError::DataError {
                customer_id: *customer_id,
                product_id: *product_id,
                count: *count,
            },
            RecommendError::SourceUnavailable(StoreError::Unavailable(message)) => {
                RecommendError::SourceUnavailable(StoreError::Unavailable(message.clone()))
            }
            RecommendError::SourceUnavailable(err) => {
                RecommendError::SourceUnavailable(StoreError::Unavailable(err.to_string()))
            }
            RecommendError::UnknownCustomer(id) => RecommendError::UnknownCustomer(*id),
            RecommendError::NoSimilarCustomers(id) => RecommendError::NoSimilarCustomers(*id),
            RecommendError::NoRecommendations(id) => RecommendError::NoRecommendations(*id),
        }
    }
}
