pub mod arena;
pub mod clock;
pub mod config;
pub mod net;
pub mod replication;
pub mod role;
pub mod round;
pub mod session;
pub mod simulation;

pub use arena::{Arena, Rect};
pub use clock::{ClockSample, ClockSync, OffsetPolicy, local_millis};
pub use config::SessionConfig;
pub use net::{
    DEFAULT_PORT, EntityUpdate, FrameDecoder, Framing, Listener, LoopbackTransport,
    MAX_MESSAGE_SIZE, Message, NetworkStats, ProtocolError, RoundReset, TcpTransport, Transport,
    TransportError, TransportKind, UdpTransport, connect,
};
pub use replication::{
    Authority, EntityId, Motion, ReplicatedEntity, StateHistory, TimedState, UpdateOutcome,
};
pub use role::{Role, Side};
pub use round::{GoalOutcome, NO_SERVE, RoundController, RoundState};
pub use session::{SessionContext, SessionError, SessionEvent};
pub use simulation::{BallRules, FixedTimestep};
