pub mod cf;
pub mod config;
pub mod config_processors;
pub mod endpoints;
pub mod errors;
pub mod handles;
pub mod io;
pub mod service;
pub mod store;
