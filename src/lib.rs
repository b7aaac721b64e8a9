pub mod analyzer;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod pipeline;
pub mod repair;
pub mod scanner;
