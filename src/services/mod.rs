pub mod aggregate;
pub mod correlate;
pub mod filter;
pub mod landmask;
pub mod weather;
