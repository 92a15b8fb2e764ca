pub mod fetcher;
pub mod http;
pub mod parsers;
pub mod sources;
pub mod types;
