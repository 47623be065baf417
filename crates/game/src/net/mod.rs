mod framing;
mod loopback;
mod protocol;
mod stats;
mod transport;

pub use framing::{DELIMITER, FrameDecoder, Framing, Parsed};
pub use loopback::LoopbackTransport;
pub use protocol::{
    DEFAULT_PORT, EntityUpdate, MAX_MESSAGE_SIZE, Message, ProtocolError, RoundReset,
    parse_payload,
};
pub use stats::NetworkStats;
pub use transport::{
    Listener, TcpTransport, Transport, TransportError, TransportKind, UdpTransport, connect,
};
