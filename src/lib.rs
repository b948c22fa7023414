pub mod app;
pub mod community;
pub mod config;
pub mod domain;
pub mod error;
pub mod games_xml;
pub mod library;
pub mod manifest;
pub mod output;
pub mod tui;
