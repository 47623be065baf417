use std::io::{self, Read, Write};
use std::net::{
    Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs, UdpSocket,
};
use std::time::{Duration, Instant};

use bytes::{Buf, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use super::framing::Framing;
use super::protocol::MAX_MESSAGE_SIZE;

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 120;
/// Unsent bytes tolerated while the peer is not reading.
const MAX_PENDING_OUTBOUND: usize = MAX_MESSAGE_SIZE * 128;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("could not resolve `{0}`")]
    Resolve(String),
    #[error("no peer connected within {0:?}")]
    AcceptTimeout(Duration),
    #[error("connection to the peer was lost")]
    Disconnected,
    #[error("nothing received from the peer for {0:?}")]
    PeerTimeout(Duration),
    #[error("datagram of {len} bytes exceeds the {max} byte limit")]
    DatagramTooLarge { len: usize, max: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Tcp,
    Udp,
}

impl TransportKind {
    pub fn default_framing(self) -> Framing {
        match self {
            Self::Tcp => Framing::LengthPrefixed,
            Self::Udp => Framing::Datagram,
        }
    }
}

/// Bidirectional byte channel to the single remote peer.
///
/// `try_recv` never blocks. It returns `Ok(None)` when nothing is readable
/// and an error once the peer is gone.
pub trait Transport {
    fn kind(&self) -> TransportKind;

    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    fn try_recv(&mut self) -> Result<Option<Bytes>, TransportError>;

    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }

    /// How long a silent peer is tolerated. Only meaningful for transports
    /// without a connection state of their own.
    fn set_idle_timeout(&mut self, _timeout: Duration) {}
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn kind(&self) -> TransportKind {
        (**self).kind()
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).send(bytes)
    }

    fn try_recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        (**self).try_recv()
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        (**self).peer_addr()
    }

    fn set_idle_timeout(&mut self, timeout: Duration) {
        (**self).set_idle_timeout(timeout)
    }
}

fn resolve<A: ToSocketAddrs + std::fmt::Display>(addr: A) -> Result<SocketAddr, TransportError> {
    let display = addr.to_string();
    addr.to_socket_addrs()
        .map_err(|_| TransportError::Resolve(display.clone()))?
        .next()
        .ok_or(TransportError::Resolve(display))
}

/// Server side of the connection handshake: bound, waiting for exactly one
/// peer.
pub enum Listener {
    Tcp(TcpListener),
    Udp(UdpSocket),
}

impl Listener {
    pub fn bind<A: ToSocketAddrs + std::fmt::Display>(
        kind: TransportKind,
        addr: A,
    ) -> Result<Self, TransportError> {
        let addr = resolve(addr)?;
        Ok(match kind {
            TransportKind::Tcp => Self::Tcp(TcpListener::bind(addr)?),
            TransportKind::Udp => Self::Udp(UdpSocket::bind(addr)?),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(match self {
            Self::Tcp(listener) => listener.local_addr()?,
            Self::Udp(socket) => socket.local_addr()?,
        })
    }

    /// Blocks until one peer shows up or `timeout` elapses. The listening
    /// socket is consumed so no second peer can join.
    pub fn accept(self, timeout: Duration) -> Result<Box<dyn Transport>, TransportError> {
        match self {
            Self::Tcp(listener) => Ok(Box::new(TcpTransport::accept(listener, timeout)?)),
            Self::Udp(socket) => Ok(Box::new(UdpTransport::accept(socket, timeout)?)),
        }
    }
}

/// Client side of the connection handshake.
pub fn connect<A: ToSocketAddrs + std::fmt::Display>(
    kind: TransportKind,
    addr: A,
    timeout: Duration,
) -> Result<Box<dyn Transport>, TransportError> {
    let addr = resolve(addr)?;
    match kind {
        TransportKind::Tcp => Ok(Box::new(TcpTransport::connect(addr, timeout)?)),
        TransportKind::Udp => Ok(Box::new(UdpTransport::connect(addr)?)),
    }
}

/// Ordered byte stream. Writes that would block are queued and flushed on the
/// next call.
pub struct TcpTransport {
    stream: TcpStream,
    peer: SocketAddr,
    outbound: BytesMut,
    recv_buffer: [u8; MAX_MESSAGE_SIZE],
}

impl TcpTransport {
    pub fn connect(addr: SocketAddr, timeout: Duration) -> Result<Self, TransportError> {
        log::info!("Connecting to {} over TCP", addr);
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        Self::from_stream(stream)
    }

    fn accept(listener: TcpListener, timeout: Duration) -> Result<Self, TransportError> {
        listener.set_nonblocking(true)?;
        log::info!("Waiting for a peer on {} (TCP)", listener.local_addr()?);

        let deadline = Instant::now() + timeout;
        loop {
            match listener.accept() {
                Ok((stream, addr)) => {
                    log::info!("Peer {} joined", addr);
                    stream.set_nonblocking(false)?;
                    return Self::from_stream(stream);
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Err(TransportError::AcceptTimeout(timeout));
                    }
                    std::thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn from_stream(stream: TcpStream) -> Result<Self, TransportError> {
        stream.set_nodelay(true)?;
        stream.set_nonblocking(true)?;
        let peer = stream.peer_addr()?;

        Ok(Self {
            stream,
            peer,
            outbound: BytesMut::with_capacity(MAX_MESSAGE_SIZE),
            recv_buffer: [0u8; MAX_MESSAGE_SIZE],
        })
    }

    pub fn pending_outbound(&self) -> usize {
        self.outbound.len()
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        while !self.outbound.is_empty() {
            match self.stream.write(&self.outbound) {
                Ok(0) => return Err(TransportError::Disconnected),
                Ok(n) => self.outbound.advance(n),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(map_stream_error(e)),
            }
        }
        Ok(())
    }
}

fn map_stream_error(error: io::Error) -> TransportError {
    match error.kind() {
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => TransportError::Disconnected,
        _ => TransportError::Io(error),
    }
}

impl Transport for TcpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Tcp
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.outbound.len() + bytes.len() > MAX_PENDING_OUTBOUND {
            self.flush()?;
            if self.outbound.len() + bytes.len() > MAX_PENDING_OUTBOUND {
                log::warn!(
                    "Peer {} stopped reading with {} bytes queued",
                    self.peer,
                    self.outbound.len()
                );
                return Err(TransportError::Disconnected);
            }
        }
        self.outbound.extend_from_slice(bytes);
        self.flush()
    }

    fn try_recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        self.flush()?;
        match self.stream.read(&mut self.recv_buffer) {
            Ok(0) => Err(TransportError::Disconnected),
            Ok(n) => Ok(Some(Bytes::copy_from_slice(&self.recv_buffer[..n]))),
            Err(ref e)
                if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::Interrupted =>
            {
                Ok(None)
            }
            Err(e) => Err(map_stream_error(e)),
        }
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.peer)
    }
}

/// Connected UDP socket: one message per datagram, best-effort delivery.
pub struct UdpTransport {
    socket: UdpSocket,
    peer: SocketAddr,
    pending: Option<Bytes>,
    recv_buffer: [u8; MAX_MESSAGE_SIZE],
    last_receive_time: Instant,
    idle_timeout: Duration,
}

impl UdpTransport {
    pub fn connect(addr: SocketAddr) -> Result<Self, TransportError> {
        let local: SocketAddr = if addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local)?;
        socket.connect(addr)?;
        socket.set_nonblocking(true)?;
        log::info!("Sending to {} over UDP from {}", addr, socket.local_addr()?);

        Ok(Self::new(socket, addr, None))
    }

    /// The first datagram names the peer; the socket is then connected to it
    /// and everything else is filtered out by the OS.
    fn accept(socket: UdpSocket, timeout: Duration) -> Result<Self, TransportError> {
        log::info!("Waiting for a peer on {} (UDP)", socket.local_addr()?);
        socket.set_read_timeout(Some(timeout))?;

        let mut buffer = [0u8; MAX_MESSAGE_SIZE];
        let (size, peer) = match socket.recv_from(&mut buffer) {
            Ok(received) => received,
            Err(ref e)
                if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut =>
            {
                return Err(TransportError::AcceptTimeout(timeout));
            }
            Err(e) => return Err(e.into()),
        };

        socket.connect(peer)?;
        socket.set_read_timeout(None)?;
        socket.set_nonblocking(true)?;
        log::info!("Peer {} joined", peer);

        Ok(Self::new(
            socket,
            peer,
            Some(Bytes::copy_from_slice(&buffer[..size])),
        ))
    }

    fn new(socket: UdpSocket, peer: SocketAddr, pending: Option<Bytes>) -> Self {
        Self {
            socket,
            peer,
            pending,
            recv_buffer: [0u8; MAX_MESSAGE_SIZE],
            last_receive_time: Instant::now(),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }
}

impl Transport for UdpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Udp
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if bytes.len() > MAX_MESSAGE_SIZE {
            return Err(TransportError::DatagramTooLarge {
                len: bytes.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        match self.socket.send(bytes) {
            Ok(_) => Ok(()),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                log::trace!("UDP send buffer full, datagram dropped");
                Ok(())
            }
            Err(ref e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                Err(TransportError::Disconnected)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn try_recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        if let Some(datagram) = self.pending.take() {
            return Ok(Some(datagram));
        }
        match self.socket.recv(&mut self.recv_buffer) {
            Ok(size) => {
                self.last_receive_time = Instant::now();
                Ok(Some(Bytes::copy_from_slice(&self.recv_buffer[..size])))
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                if self.last_receive_time.elapsed() > self.idle_timeout {
                    Err(TransportError::PeerTimeout(self.idle_timeout))
                } else {
                    Ok(None)
                }
            }
            Err(ref e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                Err(TransportError::Disconnected)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.peer)
    }

    fn set_idle_timeout(&mut self, timeout: Duration) {
        self.idle_timeout = timeout;
    }
}
