//! Clipforged - recipe-driven media transformation service
//!
//! This library crate exposes the application layer for integration testing.

pub mod config;
pub mod engine;
pub mod server;
