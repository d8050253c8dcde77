// crates/linkflow-engines/src/lib.rs
//! Remote-API plumbing for the linkflow pipeline: the authenticated HTTP
//! client, request payloads, response parsing, signed-upload field
//! resolution and the multipart upload form.
pub mod shared;

pub use shared::{ApiHttpClient, FieldResolver, FileHandler, UploadForm, UploadTarget};
