pub mod metrics;
pub mod observers;
pub mod persistence;
pub mod transport;
