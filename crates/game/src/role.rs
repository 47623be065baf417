use serde::{Deserialize, Serialize};

use crate::replication::EntityId;

/// Which end of the connection this node is.
///
/// The server is authoritative for the ball and the left paddle; the client
/// owns the right paddle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Server,
    Client,
}

impl Role {
    pub fn is_server(self) -> bool {
        matches!(self, Self::Server)
    }

    pub fn owns(self, entity: EntityId) -> bool {
        match entity {
            EntityId::LeftPaddle | EntityId::Ball => self.is_server(),
            EntityId::RightPaddle => !self.is_server(),
        }
    }

    pub fn paddle(self) -> EntityId {
        match self {
            Self::Server => EntityId::LeftPaddle,
            Self::Client => EntityId::RightPaddle,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Client => "client",
        }
    }
}

/// A player, named by the side of the field their paddle defends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opponent(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}
