pub mod config;
pub mod export;
pub mod generate;
pub mod input;
pub mod ui;
