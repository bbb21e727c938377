pub mod api;
pub mod config;
pub mod executor;
pub mod imaging;
pub mod operations;
pub mod processing;
pub mod providers;
pub mod storage;
pub mod upload;
