//! Library crate for quiz-engine, exposing the game orchestration engine for the binary and integration tests.

pub mod config;
/// Content collaborator contracts and the in-memory catalogue.
pub mod dao;
/// Wire types for the REST surface and room event streams.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
pub mod modes;
/// HTTP route trees.
pub mod routes;
/// Game orchestration and player input handling.
pub mod services;
/// Shared application state and per-room timers.
pub mod state;
