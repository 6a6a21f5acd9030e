pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod parser;
pub mod stats;
pub mod wrangle;
