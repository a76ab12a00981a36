pub mod api_client;
pub mod cache;
pub mod config;
pub mod data;
pub mod history;
pub mod sql_highlighter;
pub mod suggest;
pub mod utils;
