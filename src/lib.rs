//! Tidepost Server Library
//!
//! Social content backend with paid-content gating, plus the resumable
//! chunked image upload client that talks to it.
//!
//! # Modules
//!
//! - `paid`: Paid-content gate (pure protection rules for list and detail views)
//! - `upload`: Chunked, resumable image upload client
//! - `media`: Server-side chunk and asset storage
//! - `routes`: HTTP API (search, post detail, upload endpoints)

pub mod auth;
pub mod config;
pub mod db;
pub mod envelope;
pub mod error;
pub mod media;
pub mod paid;
pub mod routes;
pub mod state;
pub mod upload;
