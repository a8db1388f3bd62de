pub mod api;
pub mod filter;
pub mod models;
