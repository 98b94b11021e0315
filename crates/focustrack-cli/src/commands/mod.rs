pub mod account;
pub mod config;
pub mod history;
pub mod stats;
pub mod timer;
