use std::fmt;
use std::str::FromStr;

use glam::IVec2;

use crate::replication::{EntityId, Motion};

pub const DEFAULT_PORT: u16 = 6666;
pub const MAX_MESSAGE_SIZE: usize = 512;

const FIELD_SEPARATOR: char = ':';

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty message")]
    Empty,
    #[error("message is not valid UTF-8")]
    NotUtf8,
    #[error("unknown message kind `{0}`")]
    UnknownKind(String),
    #[error("`{kind}` expects {expected} field(s), found {found}")]
    FieldCount {
        kind: &'static str,
        expected: &'static str,
        found: usize,
    },
    #[error("field `{field}` is not a valid number: `{value}`")]
    InvalidNumber { field: &'static str, value: String },
    #[error("direction component must be -1, 0 or 1, got {0}")]
    InvalidDirection(i32),
    #[error("malformed frame header: {0}")]
    FrameHeader(String),
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },
}

/// Authoritative position of one entity at a game time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityUpdate {
    pub entity: EntityId,
    pub time: i64,
    pub position: IVec2,
    /// Only carried for the ball.
    pub motion: Option<Motion>,
}

/// Round restart decided by the server and applied verbatim by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundReset {
    pub time: i64,
    pub countdown_until: i64,
    pub ball_direction: IVec2,
    pub left_score: u32,
    pub right_score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Ping { t0: i64 },
    Pong { t0: i64, t1: i64 },
    State(EntityUpdate),
    Reset(RoundReset),
    Goal,
    End,
    EndOk,
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ping { .. } => "ping",
            Self::Pong { .. } => "pong",
            Self::State(update) => entity_kind(update.entity),
            Self::Reset(_) => "reset",
            Self::Goal => "goal",
            Self::End => "end",
            Self::EndOk => "end-ok",
        }
    }
}

fn entity_kind(entity: EntityId) -> &'static str {
    match entity {
        EntityId::LeftPaddle => "left",
        EntityId::RightPaddle => "right",
        EntityId::Ball => "ball",
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = FIELD_SEPARATOR;
        match self {
            Self::Ping { t0 } => write!(f, "ping{sep}{t0}"),
            Self::Pong { t0, t1 } => write!(f, "pong{sep}{t0}{sep}{t1}"),
            Self::State(update) => {
                write!(
                    f,
                    "{}{sep}{}{sep}{}{sep}{}",
                    entity_kind(update.entity),
                    update.time,
                    update.position.x,
                    update.position.y
                )?;
                match update.motion {
                    Some(motion) if update.entity == EntityId::Ball => write!(
                        f,
                        "{sep}{}{sep}{}{sep}{}",
                        motion.direction.x, motion.direction.y, motion.velocity
                    ),
                    _ => Ok(()),
                }
            }
            Self::Reset(reset) => write!(
                f,
                "reset{sep}{}{sep}{}{sep}{}{sep}{}{sep}{}{sep}{}",
                reset.time,
                reset.countdown_until,
                reset.ball_direction.x,
                reset.ball_direction.y,
                reset.left_score,
                reset.right_score
            ),
            Self::Goal => f.write_str("goal"),
            Self::End => f.write_str("end"),
            Self::EndOk => f.write_str("end-ok"),
        }
    }
}

impl FromStr for Message {
    type Err = ProtocolError;

    /// Accepts both `:` and space separated tokens, and the short `lp`/`rp`/`b`
    /// aliases used by older peers.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut tokens = text
            .split([FIELD_SEPARATOR, ' '])
            .map(str::trim)
            .filter(|token| !token.is_empty());
        let kind = tokens.next().ok_or(ProtocolError::Empty)?;
        let fields: Vec<&str> = tokens.collect();

        match kind {
            "ping" => {
                expect_fields("ping", &fields, &[1], "1")?;
                Ok(Self::Ping {
                    t0: number("t0", fields[0])?,
                })
            }
            "pong" => {
                expect_fields("pong", &fields, &[2], "2")?;
                Ok(Self::Pong {
                    t0: number("t0", fields[0])?,
                    t1: number("t1", fields[1])?,
                })
            }
            "left" | "lp" => paddle(EntityId::LeftPaddle, &fields),
            "right" | "rp" => paddle(EntityId::RightPaddle, &fields),
            "ball" | "b" => {
                expect_fields("ball", &fields, &[3, 6], "3 or 6")?;
                let motion = if fields.len() == 6 {
                    Some(Motion::new(
                        IVec2::new(
                            direction("dir_x", fields[3])?,
                            direction("dir_y", fields[4])?,
                        ),
                        number("velocity", fields[5])?,
                    ))
                } else {
                    None
                };
                Ok(Self::State(EntityUpdate {
                    entity: EntityId::Ball,
                    time: number("time", fields[0])?,
                    position: IVec2::new(number("x", fields[1])?, number("y", fields[2])?),
                    motion,
                }))
            }
            "reset" => {
                expect_fields("reset", &fields, &[6], "6")?;
                Ok(Self::Reset(RoundReset {
                    time: number("time", fields[0])?,
                    countdown_until: number("countdown", fields[1])?,
                    ball_direction: IVec2::new(
                        direction("dir_x", fields[2])?,
                        direction("dir_y", fields[3])?,
                    ),
                    left_score: number("left_score", fields[4])?,
                    right_score: number("right_score", fields[5])?,
                }))
            }
            "goal" => bare("goal", &fields, Self::Goal),
            "end" => bare("end", &fields, Self::End),
            "end-ok" => bare("end-ok", &fields, Self::EndOk),
            other => Err(ProtocolError::UnknownKind(other.to_string())),
        }
    }
}

/// Parses one unframed message payload.
pub fn parse_payload(payload: &[u8]) -> Result<Message, ProtocolError> {
    let text = std::str::from_utf8(payload).map_err(|_| ProtocolError::NotUtf8)?;
    text.parse()
}

fn paddle(entity: EntityId, fields: &[&str]) -> Result<Message, ProtocolError> {
    expect_fields(entity_kind(entity), fields, &[3], "3")?;
    Ok(Message::State(EntityUpdate {
        entity,
        time: number("time", fields[0])?,
        position: IVec2::new(number("x", fields[1])?, number("y", fields[2])?),
        motion: None,
    }))
}

fn bare(kind: &'static str, fields: &[&str], message: Message) -> Result<Message, ProtocolError> {
    expect_fields(kind, fields, &[0], "0")?;
    Ok(message)
}

fn expect_fields(
    kind: &'static str,
    fields: &[&str],
    allowed: &[usize],
    expected: &'static str,
) -> Result<(), ProtocolError> {
    if allowed.contains(&fields.len()) {
        Ok(())
    } else {
        Err(ProtocolError::FieldCount {
            kind,
            expected,
            found: fields.len(),
        })
    }
}

fn number<T: FromStr>(field: &'static str, value: &str) -> Result<T, ProtocolError> {
    value.parse().map_err(|_| ProtocolError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

fn direction(field: &'static str, value: &str) -> Result<i32, ProtocolError> {
    let component: i32 = number(field, value)?;
    if (-1..=1).contains(&component) {
        Ok(component)
    } else {
        Err(ProtocolError::InvalidDirection(component))
    }
}
