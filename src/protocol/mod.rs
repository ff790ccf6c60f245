//! # Protocol Vocabulary and Session Plumbing
//!
//! Packet shapes for each phase, the phase-scoped registries that map wire
//! ids to them, the login key exchange, and the game-phase event sink.
//!
//! ## Phases
//! ```text
//! Handshake ──> Login ──> Game
//! ```
//! Transitions are strictly linear. Each phase has its own registry and ids
//! are only meaningful within one phase and direction.

pub mod dispatcher;
pub mod game;
pub mod handshake;
pub mod login;
pub mod packet;
pub mod registry;
pub mod security;
pub mod state;

#[cfg(test)]
mod tests;
