//! # Zenith CRM Sync Library
//!
//! This library provides the core functionality for the Zenith CRM sync
//! service: connection management, the provider connector abstraction, the
//! sync orchestrator and the HTTP API surface.

pub mod config;
pub mod connectors;
pub mod error;
pub mod handlers;
pub mod models;
pub mod registry;
pub mod server;
pub mod storage;
pub mod sync_engine;
pub mod sync_log;
pub mod telemetry;
