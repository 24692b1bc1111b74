pub mod github;
pub mod http_source;
