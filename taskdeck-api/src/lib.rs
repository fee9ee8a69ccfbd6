//! # TaskDeck API Server Library
//!
//! HTTP surface of TaskDeck: a multi-user task manager with sharing,
//! attachments, notifications, and analytics.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers and session gates
//! - `routes`: Route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
