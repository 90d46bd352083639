pub mod cache;
pub mod collate;
pub mod config;
pub mod db;
pub mod debounce;
pub mod error;
pub mod export;
pub mod ipc;
pub mod model;
pub mod ops;
pub mod remote;
pub mod session;
pub mod store;
pub mod sync;
