pub mod health_resource;
pub mod index_resource;
pub mod recommend_resource;
