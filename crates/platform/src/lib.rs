//! Client for the newsletter platform's private editor API.
//!
//! Provides the typed REST wrapper used to verify a session, create drafts
//! and publish them, plus the headless-browser login that captures a fresh
//! session when no stored one is accepted.

pub mod api;
pub mod browser;
pub mod config;
pub mod login;
