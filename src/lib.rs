pub mod app;
pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod search;
pub mod state;
pub mod utils;
pub mod web;
pub mod wiki;
