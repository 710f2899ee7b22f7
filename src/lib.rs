pub mod ai;
pub mod api;
pub mod cache;
pub mod config;
pub mod data_models;
pub mod scrapper;
pub mod search;
pub mod videos;
