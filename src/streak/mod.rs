pub mod detector;
pub mod policy;
pub mod types;
