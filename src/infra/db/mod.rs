pub mod postgres;
pub mod repositories;
pub mod trusted_operations;
