pub mod persistence;
pub mod runner;
