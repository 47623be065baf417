mod config;

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use config::{Args, NodeConfig};
use pong::{Listener, Role, SessionContext, SessionEvent, Transport, connect, local_millis};

const FRAME_SLEEP: Duration = Duration::from_millis(1);

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = NodeConfig::from_args(args)?;
    let transport = handshake(&config)?;

    let mut session =
        SessionContext::with_framing(config.role, config.session.clone(), transport, config.framing);
    run(&mut session)?;

    let stats = session.stats();
    let (left, right) = session.scores();
    log::info!(
        "final score {left}-{right}; sent {} msgs / {} bytes, received {} msgs / {} bytes, dropped {} malformed / {} invalid / {} stale",
        stats.messages_sent,
        stats.bytes_sent,
        stats.messages_received,
        stats.bytes_received,
        stats.malformed_dropped,
        stats.invalid_dropped,
        stats.stale_dropped
    );
    Ok(())
}

fn handshake(config: &NodeConfig) -> Result<Box<dyn Transport>> {
    let transport = match config.role {
        Role::Server => {
            let bind_addr = config.bind_addr();
            let listener = Listener::bind(config.transport, bind_addr.as_str())
                .with_context(|| format!("failed to bind {bind_addr}"))?;
            listener
                .accept(config.accept_timeout)
                .context("no peer connected")?
        }
        Role::Client => {
            let peer_addr = config
                .peer_addr()
                .context("client mode needs a host to connect to")?;
            connect(config.transport, peer_addr.as_str(), config.connect_timeout)
                .with_context(|| format!("failed to connect to {peer_addr}"))?
        }
    };

    match transport.peer_addr() {
        Some(peer) => log::info!("connected to {peer} as {}", config.role.as_str()),
        None => log::info!("connected as {}", config.role.as_str()),
    }
    Ok(transport)
}

fn run<T: Transport>(session: &mut SessionContext<T>) -> Result<()> {
    session
        .start(local_millis())
        .context("failed to start session")?;

    while !session.is_finished() {
        let result = session.tick(local_millis());
        for event in session.drain_events() {
            log_event(&event);
        }
        result.context("session ended unexpectedly")?;
        thread::sleep(FRAME_SLEEP);
    }
    Ok(())
}

fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::ClockSampled(sample) => log::debug!(
            "rtt {}ms, lag {}ms, offset {}ms",
            sample.round_trip_ms,
            sample.remote_lag_ms,
            sample.offset_ms
        ),
        SessionEvent::CountdownStarted {
            until,
            left_score,
            right_score,
        } => log::info!("score {left_score}-{right_score}, next serve at {until}"),
        SessionEvent::RoundStarted { at } => log::info!("ball in play at {at}"),
        SessionEvent::GoalScored {
            scorer,
            left_score,
            right_score,
        } => log::info!("{scorer:?} scores: {left_score}-{right_score}"),
        SessionEvent::GameOver {
            left_score,
            right_score,
        } => log::info!("game over: {left_score}-{right_score}"),
        SessionEvent::EndAcknowledged => log::info!("peer acknowledged game over"),
        SessionEvent::ConnectionLost { reason } => log::warn!("connection lost: {reason}"),
    }
}
