pub mod loader;
pub mod models;
pub mod store;
