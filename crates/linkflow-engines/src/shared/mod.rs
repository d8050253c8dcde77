pub mod field_resolver;
pub mod file_handler;
pub mod http_client;
pub mod payload_builder;
pub mod response_parser;
pub mod url_builder;

pub use field_resolver::*;
pub use file_handler::*;
pub use http_client::*;
pub use payload_builder::*;
pub use response_parser::*;
pub use url_builder::*;
