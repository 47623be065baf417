use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};

use pong::{Framing, Role, SessionConfig, TransportKind};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(name = "pong-node")]
#[command(about = "Networked Pong node: hosts a game, or joins one when a host is given")]
pub struct Args {
    /// Address of the server to join. Without it the node hosts.
    pub host: Option<String>,

    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    #[arg(long, default_value = "0.0.0.0", help = "Address the server binds to")]
    pub bind: String,

    #[arg(short, long, default_value_t = pong::DEFAULT_PORT)]
    pub port: u16,

    #[arg(short, long, value_enum, default_value_t = TransportArg::Tcp)]
    pub transport: TransportArg,

    #[arg(short, long, value_enum, help = "Defaults to the transport's own framing")]
    pub framing: Option<FramingArg>,

    #[arg(long, default_value_t = 300, help = "How long the server waits for a peer")]
    pub accept_timeout_secs: u64,

    #[arg(long, default_value_t = 5)]
    pub score_limit: u32,

    #[arg(long, help = "Seed for reproducible ball directions")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Server,
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportArg {
    Tcp,
    Udp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FramingArg {
    Delimited,
    LengthPrefixed,
    Datagram,
}

impl From<TransportArg> for TransportKind {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Tcp => Self::Tcp,
            TransportArg::Udp => Self::Udp,
        }
    }
}

impl From<FramingArg> for Framing {
    fn from(arg: FramingArg) -> Self {
        match arg {
            FramingArg::Delimited => Self::Delimited,
            FramingArg::LengthPrefixed => Self::LengthPrefixed,
            FramingArg::Datagram => Self::Datagram,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub role: Role,
    pub host: Option<String>,
    pub bind: String,
    pub port: u16,
    pub transport: TransportKind,
    pub framing: Framing,
    pub accept_timeout: Duration,
    pub connect_timeout: Duration,
    pub session: SessionConfig,
}

impl NodeConfig {
    pub fn from_args(args: Args) -> Result<Self> {
        let role = match (args.mode, &args.host) {
            (Some(ModeArg::Server), _) => Role::Server,
            (Some(ModeArg::Client), Some(_)) => Role::Client,
            (Some(ModeArg::Client), None) => bail!("client mode needs a host to connect to"),
            (None, Some(_)) => Role::Client,
            (None, None) => Role::Server,
        };

        let transport = TransportKind::from(args.transport);
        let framing = args
            .framing
            .map(Framing::from)
            .unwrap_or_else(|| transport.default_framing());
        if transport == TransportKind::Tcp && framing == Framing::Datagram {
            bail!("datagram framing needs the udp transport");
        }

        Ok(Self {
            role,
            host: args.host,
            bind: args.bind,
            port: args.port,
            transport,
            framing,
            accept_timeout: Duration::from_secs(args.accept_timeout_secs),
            connect_timeout: CONNECT_TIMEOUT,
            session: SessionConfig {
                score_limit: args.score_limit,
                seed: args.seed,
                ..Default::default()
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn peer_addr(&self) -> Option<String> {
        self.host
            .as_ref()
            .map(|host| format!("{}:{}", host, self.port))
    }
}
