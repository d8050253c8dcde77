// crates/linkflow-core/src/lib.rs
pub mod auth;
pub mod config;
pub mod error;
pub mod redaction;

pub use error::{LinkflowError, LinkflowResult};
