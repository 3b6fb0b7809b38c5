use actix_web::error::BlockingError;
use actix_web::{get, web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::handles::SharedHandlesAndConfig;
use crate::io::CustomerId;

#[derive(Debug, Deserialize)]
pub struct RecommendQueryParams {
    n_recommendations: Option<String>,
}

impl RecommendQueryParams {
    /// Values that are not a non-negative integer fall back to the default.
    fn how_many(&self, default: usize) -> usize {
        self.n_recommendations
            .as_deref()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(default)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// Recommendations for a known customer, ranked by score.
// Scoring and a possible matrix refresh are blocking work, so they run on actix's thread pool.
#[get("/recommendations/{customer_id}")]
pub async fn recommendations(
    data: web::Data<SharedHandlesAndConfig>,
    path: web::Path<CustomerId>,
    query: web::Query<RecommendQueryParams>,
) -> HttpResponse {
    let customer_id = path.into_inner();
    let how_many = query.how_many(data.num_recommendations);
    let service = data.service.clone();

    match web::block(move || service.get_recommendations(customer_id, how_many)).await {
        Ok(recommendations) => HttpResponse::Ok().json(recommendations),
        Err(BlockingError::Error(err)) => {
            error!(customer_id, error = %err, "error in recommendation api");
            HttpResponse::InternalServerError().json(ErrorBody {
                error: err.to_string(),
            })
        }
        Err(BlockingError::Canceled) => {
            error!(customer_id, "recommendation task was canceled");
            HttpResponse::InternalServerError().json(ErrorBody {
                error: "recommendation task was canceled".to_string(),
            })
        }
    }
}
