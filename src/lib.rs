#![forbid(unsafe_code)]

//! Survey intake service: validates survey submissions, pseudonymizes
//! personal fields and appends the resulting records to a JSONL log.

pub mod config;
pub mod errors;
pub mod http;
pub mod models;
pub mod storage;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
