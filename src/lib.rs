//! Core library for catalog-playlist-sync
pub mod config;
pub mod error;
pub mod models;
pub mod api;
pub mod paginate;
pub mod matcher;
pub mod differ;
pub mod transfer;
pub mod session;
