//! authgate library crate.
//!
//! OAuth2 access gate: reconciles configured client registrations with the
//! client store, classifies request paths into security tiers, and serves the
//! authenticated principal merged with its user profile.

pub mod config;
pub mod errors;
pub mod http;
pub mod oauth;
pub mod security;
pub mod storage;
pub mod templates;
