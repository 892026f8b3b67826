/// OpenAPI documentation generation.
pub mod documentation;
/// Buzzes, answers, answer timeouts and connectivity changes.
pub mod gameplay;
/// Health check service.
pub mod health_service;
/// Round and song lifecycle.
pub mod orchestrator;
/// Domain event emission helpers.
pub mod room_events;
/// Round and game rankings.
pub mod scoring;
/// Server-Sent Events streaming of room events.
pub mod sse_service;
