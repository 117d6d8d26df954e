pub mod backup;
pub mod collections;
pub mod core;
pub mod exchange;
pub mod schedule;
