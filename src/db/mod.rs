pub mod ingest;
pub mod models;

pub use ingest::ProductStore;
