pub mod logger;
pub mod telegram;
