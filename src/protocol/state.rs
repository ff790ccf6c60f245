use crate::error::{ProtocolError, Result};
use std::fmt;

/// Protocol phase. Selects the packet vocabulary and only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    Handshake,
    Login,
    Game,
}

impl Phase {
    /// The phase that legally follows this one.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Handshake => Some(Phase::Login),
            Phase::Login => Some(Phase::Game),
            Phase::Game => None,
        }
    }

    /// Move to `to`, rejecting skips, repeats and reversals.
    pub fn advance(self, to: Phase) -> Result<Phase> {
        match self.next() {
            Some(next) if next == to => Ok(to),
            _ => Err(ProtocolError::InvalidTransition { from: self, to }),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Handshake => "handshake",
            Phase::Login => "login",
            Phase::Game => "game",
        };
        f.write_str(name)
    }
}

/// Which peer a packet travels towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    ClientBound,
    ServerBound,
}

/// Intent announced in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextState {
    Status,
    Login,
}

impl NextState {
    pub fn id(self) -> i32 {
        match self {
            NextState::Status => 1,
            NextState::Login => 2,
        }
    }

    pub fn from_id(id: i32) -> Result<Self> {
        match id {
            1 => Ok(NextState::Status),
            2 => Ok(NextState::Login),
            other => Err(ProtocolError::MalformedFrame(format!(
                "invalid handshake next state {other}"
            ))),
        }
    }
}
