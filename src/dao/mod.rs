/// Distractor generation for multiple-choice modes.
pub mod choices;
/// Content collaborator contract.
pub mod content;
pub mod memory;
/// Room, player, session and song records.
pub mod models;
/// Collaborator error types.
pub mod storage;
