//! Movie archive sync library.
//!
//! A service that scans an Internet Archive uploader account for movie
//! uploads, registers previously-unseen items in a local SQLite video
//! registry, and cross-links them to canonical TMDB movie records.

pub mod config;
pub mod constants;
pub mod db;
pub mod ia;
pub mod sync;
pub mod tmdb;
pub mod web;
