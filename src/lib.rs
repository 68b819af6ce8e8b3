pub mod candidate;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod notify;
pub mod persistence;
pub mod scheduler;
pub mod service;
pub mod shutdown;
pub mod state;
