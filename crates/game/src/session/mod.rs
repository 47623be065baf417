//! One connected game between two nodes.
//!
//! [`SessionContext`] owns everything a node needs for the lifetime of a
//! connection: the shared clock, the round state machine, the three
//! replicated entities and the transport. The frame loop calls
//! [`SessionContext::tick`] with the local wall clock and reads positions
//! back with [`SessionContext::position_of`].

mod events;

use std::collections::VecDeque;
use std::time::Duration;

use bitflags::bitflags;
use glam::IVec2;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::arena::{Arena, Rect};
use crate::clock::ClockSync;
use crate::config::SessionConfig;
use crate::net::{
    EntityUpdate, FrameDecoder, Framing, Message, NetworkStats, RoundReset, Transport,
    TransportError,
};
use crate::replication::{Authority, EntityId, Motion, ReplicatedEntity, UpdateOutcome};
use crate::role::{Role, Side};
use crate::round::{GoalOutcome, NO_SERVE, RoundController, RoundState, reset_entities};
use crate::simulation::{BallRules, FixedTimestep, move_paddle, step_ball};

pub use events::SessionEvent;

/// Upper bound on chunks read from the transport in one frame.
const MAX_CHUNKS_PER_FRAME: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),
}

bitflags! {
    /// Messages waiting for the end-of-tick flush.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct Outbound: u8 {
        const LEFT_PADDLE = 1 << 0;
        const RIGHT_PADDLE = 1 << 1;
        const BALL = 1 << 2;
        const GOAL = 1 << 3;
        const END = 1 << 4;

        const ENTITIES = Self::LEFT_PADDLE.bits() | Self::RIGHT_PADDLE.bits() | Self::BALL.bits();
    }
}

impl Outbound {
    fn entity(id: EntityId) -> Self {
        match id {
            EntityId::LeftPaddle => Self::LEFT_PADDLE,
            EntityId::RightPaddle => Self::RIGHT_PADDLE,
            EntityId::Ball => Self::BALL,
        }
    }
}

pub struct SessionContext<T: Transport> {
    role: Role,
    config: SessionConfig,
    arena: Arena,
    rules: BallRules,
    clock: ClockSync,
    round: RoundController,
    entities: [ReplicatedEntity; 3],
    transport: T,
    framing: Framing,
    decoder: FrameDecoder,
    outbound: Outbound,
    pending_reset: Option<RoundReset>,
    last_reset_time: Option<i64>,
    goal_reported: bool,
    timestep: FixedTimestep,
    stats: NetworkStats,
    rng: StdRng,
    events: VecDeque<SessionEvent>,
    started: bool,
    finished: bool,
}

impl<T: Transport> SessionContext<T> {
    /// Builds a session using the transport's default framing.
    pub fn new(role: Role, config: SessionConfig, transport: T) -> Self {
        let framing = transport.kind().default_framing();
        Self::with_framing(role, config, transport, framing)
    }

    pub fn with_framing(
        role: Role,
        config: SessionConfig,
        mut transport: T,
        framing: Framing,
    ) -> Self {
        transport.set_idle_timeout(Duration::from_millis(config.peer_timeout_ms));

        let arena = config.arena();
        let entities = EntityId::ALL.map(|id| {
            let authority = if role.owns(id) {
                Authority::Local
            } else {
                Authority::Remote
            };
            let (rect, motion) = match id {
                EntityId::LeftPaddle => (
                    arena.left_paddle_start(),
                    Motion::new(IVec2::ZERO, config.paddle_velocity),
                ),
                EntityId::RightPaddle => (
                    arena.right_paddle_start(),
                    Motion::new(IVec2::ZERO, config.paddle_velocity),
                ),
                EntityId::Ball => (
                    arena.ball_start(),
                    Motion::new(IVec2::ZERO, config.ball_initial_velocity),
                ),
            };
            ReplicatedEntity::new(id, authority, rect, motion, 0, config.history_capacity)
        });

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            role,
            arena,
            rules: BallRules::from_config(&config),
            clock: ClockSync::new(role, &config),
            round: RoundController::new(role, &config),
            entities,
            transport,
            framing,
            decoder: FrameDecoder::new(framing),
            outbound: Outbound::empty(),
            pending_reset: None,
            last_reset_time: None,
            goal_reported: false,
            timestep: FixedTimestep::new(config.tick_ms),
            stats: NetworkStats::default(),
            rng,
            events: VecDeque::new(),
            started: false,
            finished: false,
            config,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn clock(&self) -> &ClockSync {
        &self.clock
    }

    pub fn round_state(&self) -> RoundState {
        self.round.state()
    }

    pub fn entity(&self, id: EntityId) -> &ReplicatedEntity {
        &self.entities[id.index()]
    }

    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    pub fn game_time(&self, local_now: i64) -> i64 {
        self.clock.game_time(local_now)
    }

    pub fn position_of(&self, id: EntityId, game_time: i64) -> Rect {
        self.entities[id.index()].position_at(game_time, self.clock.remote_lag_ms())
    }

    pub fn is_round_active(&self) -> bool {
        self.round.is_active()
    }

    pub fn scores(&self) -> (u32, u32) {
        self.round.scores()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = SessionEvent> + '_ {
        self.events.drain(..)
    }

    /// Steers the locally owned paddle: -1 up, 1 down, 0 stop.
    pub fn set_paddle_direction(&mut self, direction: i32) {
        let paddle = self.role.paddle();
        self.entities[paddle.index()].set_direction(IVec2::new(0, direction.signum()));
    }

    /// Sends the initial clock pings. The server also opens the first round.
    pub fn start(&mut self, local_now: i64) -> Result<(), SessionError> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        log::info!("session started as {}", self.role.as_str());

        for _ in 0..self.config.initial_pings.max(1) {
            let ping = self.clock.ping(local_now);
            self.send(ping)?;
        }

        if self.role.is_server() {
            let now = self.game_time(local_now);
            let reset = self.round.start_round(now, &mut self.rng);
            self.apply_round_reset(&reset);
            self.pending_reset = Some(reset);
        }

        self.timestep.advance(local_now);
        self.flush()
    }

    /// Runs one frame: reads the transport, answers clock pings, advances
    /// the round and at most one simulation step, then flushes outbound
    /// state.
    pub fn tick(&mut self, local_now: i64) -> Result<(), SessionError> {
        if self.finished {
            return Ok(());
        }
        if let Err(error) = self.frame(local_now) {
            return self.fail(error);
        }

        let now = self.game_time(local_now);
        if self.round.shutdown_due(now) {
            log::info!("grace period over, closing session");
            self.finished = true;
        }
        Ok(())
    }

    /// Feeds bytes that arrived outside of [`tick`](Self::tick).
    pub fn on_bytes_received(&mut self, bytes: &[u8], local_now: i64) -> Result<(), SessionError> {
        self.stats.record_received_bytes(bytes.len());

        for decoded in self.decoder.decode(bytes) {
            match decoded {
                Ok(message) => {
                    self.stats.messages_received += 1;
                    log::trace!("<- {message}");
                    self.handle_message(message, local_now)?;
                }
                Err(error) => {
                    self.stats.malformed_dropped += 1;
                    log::warn!("dropping malformed message: {error}");
                }
            }
        }
        Ok(())
    }

    /// Ends the game from this side. The peer is told with `end`.
    pub fn request_end(&mut self, local_now: i64) -> Result<(), SessionError> {
        if self.round.is_ended() {
            return Ok(());
        }
        let now = self.game_time(local_now);
        self.round.end(now);
        self.push_game_over();
        self.send(Message::End)
    }

    fn frame(&mut self, local_now: i64) -> Result<(), SessionError> {
        if !self.started {
            self.start(local_now)?;
        }

        for _ in 0..MAX_CHUNKS_PER_FRAME {
            match self.transport.try_recv()? {
                Some(chunk) => self.on_bytes_received(&chunk, local_now)?,
                None => break,
            }
        }

        if let Some(ping) = self.clock.poll(local_now) {
            self.send(ping)?;
        }

        let now = self.game_time(local_now);
        if self.round.update(now) {
            self.events.push_back(SessionEvent::RoundStarted { at: now });
        }

        self.timestep.advance(local_now);
        if self.timestep.consume_tick() && self.clock_synced() {
            self.simulate(now);
        }

        self.flush()
    }

    /// The client simulates nothing until it has its first clock sample, so
    /// it never stamps states with a game time it will later take back.
    fn clock_synced(&self) -> bool {
        self.role.is_server() || self.clock.samples() > 0
    }

    fn fail(&mut self, error: SessionError) -> Result<(), SessionError> {
        if self.round.is_ended()
            && matches!(
                error,
                SessionError::Transport(TransportError::Disconnected)
            )
        {
            log::info!("peer closed the connection after game over");
            self.finished = true;
            return Ok(());
        }

        log::warn!("session failed: {error}");
        self.events.push_back(SessionEvent::ConnectionLost {
            reason: error.to_string(),
        });
        self.finished = true;
        Err(error)
    }

    fn send(&mut self, message: Message) -> Result<(), SessionError> {
        let bytes = self.framing.encode(&message);
        self.transport.send(&bytes)?;
        self.stats.record_sent(bytes.len());
        log::trace!("-> {message}");
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SessionError> {
        let pending = std::mem::take(&mut self.outbound);

        if let Some(reset) = self.pending_reset.take() {
            self.send(Message::Reset(reset))?;
        }

        for id in EntityId::ALL {
            if !pending.contains(Outbound::entity(id)) {
                continue;
            }
            let entity = &self.entities[id.index()];
            let latest = entity.history().latest();
            let update = EntityUpdate {
                entity: id,
                time: latest.time,
                position: latest.rect.position(),
                motion: (id == EntityId::Ball).then(|| entity.motion()),
            };
            self.send(Message::State(update))?;
        }

        if pending.contains(Outbound::GOAL) {
            self.send(Message::Goal)?;
        }
        if pending.contains(Outbound::END) {
            self.send(Message::End)?;
        }
        Ok(())
    }

    fn handle_message(&mut self, message: Message, local_now: i64) -> Result<(), SessionError> {
        let now = self.game_time(local_now);

        match message {
            Message::Ping { t0 } => {
                let pong = self.clock.on_ping(t0, local_now);
                self.send(pong)?;
            }
            Message::Pong { t0, t1 } => {
                let previous_offset = self.clock.offset_ms();
                let Some(sample) = self.clock.on_pong(t0, t1, local_now) else {
                    self.stats.invalid_dropped += 1;
                    log::warn!("dropping pong with impossible stamps t0={t0} t1={t1}");
                    return Ok(());
                };
                if sample.offset_ms < previous_offset {
                    self.rewind_local_states(local_now);
                }
                self.stats.rtt_ms = Some(sample.round_trip_ms);
                self.stats.remote_lag_ms = sample.remote_lag_ms;
                self.stats.clock_offset_ms = sample.offset_ms;
                self.events.push_back(SessionEvent::ClockSampled(sample));
            }
            Message::State(update) => self.apply_update(update),
            Message::Reset(reset) => {
                if self.role.is_server() {
                    self.role_violation(&message);
                } else if self.last_reset_time.is_some_and(|last| reset.time <= last) {
                    self.stats.stale_dropped += 1;
                    log::debug!("dropping stale reset from {}", reset.time);
                } else {
                    self.on_remote_reset(&reset);
                }
            }
            Message::Goal => {
                if !self.role.is_server() {
                    self.role_violation(&message);
                } else if self
                    .round
                    .accepts_client_goal(self.entities[EntityId::Ball.index()].motion())
                {
                    log::debug!("client reported a goal at {now}");
                    self.resolve_goal(Side::Left, now);
                } else {
                    log::debug!("ignoring goal report outside of play");
                }
            }
            Message::End => {
                if self.round.is_ended() {
                    log::debug!("already ended, ignoring repeated `end`");
                    return Ok(());
                }
                self.round.end(now);
                self.push_game_over();
                if !self.role.is_server() {
                    self.send(Message::EndOk)?;
                }
            }
            Message::EndOk => {
                if self.role.is_server() {
                    log::info!("peer acknowledged game over");
                    self.events.push_back(SessionEvent::EndAcknowledged);
                } else {
                    self.role_violation(&message);
                }
            }
        }
        Ok(())
    }

    fn apply_update(&mut self, update: EntityUpdate) {
        let rect = self.entities[update.entity.index()]
            .current()
            .with_position(update.position);
        let velocity_ok = update
            .motion
            .is_none_or(|motion| (0..=self.rules.max_velocity).contains(&motion.velocity));
        if !self.arena.admits(rect) || !velocity_ok {
            self.stats.invalid_dropped += 1;
            log::warn!(
                "dropping {} update off the field at ({}, {})",
                update.entity.as_str(),
                update.position.x,
                update.position.y
            );
            return;
        }

        let entity = &mut self.entities[update.entity.index()];
        match entity.apply_remote_update(update.time, rect, update.motion) {
            UpdateOutcome::Applied => {}
            UpdateOutcome::Reconciled => {
                self.stats.reconciliations += 1;
                if update.entity == EntityId::Ball {
                    self.goal_reported = false;
                }
                log::debug!(
                    "reconciled {} at {}",
                    update.entity.as_str(),
                    update.time
                );
            }
            UpdateOutcome::Stale => {
                self.stats.stale_dropped += 1;
                log::debug!(
                    "dropping stale {} update from {}",
                    update.entity.as_str(),
                    update.time
                );
            }
            UpdateOutcome::Rejected => self.role_violation(&Message::State(update)),
        }
    }

    fn role_violation(&mut self, message: &Message) {
        self.stats.role_violations += 1;
        log::warn!(
            "ignoring `{}` not allowed for a {}",
            message.kind(),
            self.role.as_str()
        );
    }

    /// Game time went backwards. Pulls everything this node writes itself
    /// back onto the new time: owned entities and the client's ball
    /// predictions.
    fn rewind_local_states(&mut self, local_now: i64) {
        let now = self.game_time(local_now);
        for entity in &mut self.entities {
            if entity.is_owned() || !entity.id().is_paddle() {
                entity.rewind_to(now);
            }
        }
        log::debug!("clock moved back, local states restamped at {now}");
    }

    fn on_remote_reset(&mut self, reset: &RoundReset) {
        let (left, right) = self.round.scores();
        let scorer = if reset.left_score > left {
            Some(Side::Left)
        } else if reset.right_score > right {
            Some(Side::Right)
        } else {
            None
        };

        self.round.apply_reset(reset);
        self.apply_round_reset(reset);

        if let Some(scorer) = scorer {
            self.events.push_back(SessionEvent::GoalScored {
                scorer,
                left_score: reset.left_score,
                right_score: reset.right_score,
            });
        }
    }

    fn apply_round_reset(&mut self, reset: &RoundReset) {
        reset_entities(
            &mut self.entities,
            &self.arena,
            reset,
            self.rules.initial_velocity,
        );
        self.last_reset_time = Some(reset.time);
        self.goal_reported = false;
        self.outbound.remove(Outbound::ENTITIES | Outbound::GOAL);
        if reset.countdown_until != NO_SERVE {
            self.events.push_back(SessionEvent::CountdownStarted {
                until: reset.countdown_until,
                left_score: reset.left_score,
                right_score: reset.right_score,
            });
        }
    }

    fn resolve_goal(&mut self, scorer: Side, now: i64) {
        let outcome = self.round.score(scorer, now, &mut self.rng);
        let (left_score, right_score) = self.round.scores();
        self.events.push_back(SessionEvent::GoalScored {
            scorer,
            left_score,
            right_score,
        });

        match outcome {
            GoalOutcome::Reset(reset) => {
                self.apply_round_reset(&reset);
                self.pending_reset = Some(reset);
            }
            GoalOutcome::GameOver { winner, reset } => {
                log::info!("{winner:?} player wins");
                self.apply_round_reset(&reset);
                self.pending_reset = Some(reset);
                self.outbound.insert(Outbound::END);
                self.push_game_over();
            }
        }
    }

    fn push_game_over(&mut self) {
        let (left_score, right_score) = self.round.scores();
        self.events.push_back(SessionEvent::GameOver {
            left_score,
            right_score,
        });
    }

    fn simulate(&mut self, now: i64) {
        let paddle_id = self.role.paddle();
        let paddle = &mut self.entities[paddle_id.index()];
        if paddle.motion().direction != IVec2::ZERO {
            let moved = move_paddle(&self.arena, paddle.current(), paddle.motion());
            if moved != paddle.current() && paddle.record(now, moved) {
                self.outbound.insert(Outbound::entity(paddle_id));
            }
        }

        if !self.round.ball_may_move(now) || self.goal_reported {
            return;
        }

        let left = self.entities[EntityId::LeftPaddle.index()].current();
        let right = self.entities[EntityId::RightPaddle.index()].current();
        let ball = &mut self.entities[EntityId::Ball.index()];
        let step = step_ball(
            &self.arena,
            &self.rules,
            ball.current(),
            ball.motion(),
            left,
            right,
        );

        if ball.is_owned() {
            if let Some(scorer) = step.goal {
                self.resolve_goal(scorer, now);
                return;
            }
            ball.set_motion(step.motion);
            if ball.record(now, step.rect) {
                self.outbound.insert(Outbound::BALL);
            }
            return;
        }

        // Prediction only; never sent. An authoritative state for this
        // instant already beats it.
        if ball.history().latest().time >= now {
            return;
        }
        ball.set_motion(step.motion);
        ball.record(now, step.rect);
        if step.goal == Some(Side::Left) {
            log::debug!("ball entered the right goal at {now}");
            self.goal_reported = true;
            self.outbound.insert(Outbound::GOAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{LoopbackTransport, TransportKind};

    fn session(role: Role) -> (SessionContext<LoopbackTransport>, LoopbackTransport) {
        let (ours, theirs) = LoopbackTransport::pair(TransportKind::Tcp);
        let config = SessionConfig {
            seed: Some(11),
            ..Default::default()
        };
        (SessionContext::new(role, config, ours), theirs)
    }

    fn deliver(session: &mut SessionContext<LoopbackTransport>, message: Message, local_now: i64) {
        let bytes = session.framing().encode(&message);
        session.on_bytes_received(&bytes, local_now).unwrap();
    }

    fn received(peer: &mut LoopbackTransport, framing: Framing) -> Vec<Message> {
        let mut decoder = FrameDecoder::new(framing);
        let mut out = Vec::new();
        while let Some(chunk) = peer.try_recv().unwrap() {
            out.extend(decoder.decode(&chunk).into_iter().map(Result::unwrap));
        }
        out
    }

    #[test]
    fn server_start_sends_pings_then_reset() {
        let (mut server, mut peer) = session(Role::Server);
        server.start(10_000).unwrap();

        let messages = received(&mut peer, server.framing());
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], Message::Ping { t0: 10_000 });
        assert_eq!(messages[1], Message::Ping { t0: 10_000 });
        let Message::Reset(reset) = messages[2] else {
            panic!("expected reset, got {:?}", messages[2]);
        };
        assert_eq!(reset.time, 10_000);
        assert_eq!(reset.countdown_until, 12_000);
        assert_eq!(
            server.round_state(),
            RoundState::Countdown { until: 12_000 }
        );
    }

    #[test]
    fn client_start_only_pings() {
        let (mut client, mut peer) = session(Role::Client);
        client.start(0).unwrap();

        let messages = received(&mut peer, client.framing());
        assert!(messages.iter().all(|m| matches!(m, Message::Ping { .. })));
        assert!(!client.is_round_active());
    }

    #[test]
    fn paddle_input_moves_only_the_owned_paddle() {
        let (mut server, mut peer) = session(Role::Server);
        server.start(0).unwrap();
        received(&mut peer, server.framing());

        server.set_paddle_direction(1);
        server.tick(10).unwrap();

        let start = server.arena().left_paddle_start();
        let moved = server.position_of(EntityId::LeftPaddle, 10);
        assert_eq!(moved.y, start.y + server.config().paddle_velocity);

        let messages = received(&mut peer, server.framing());
        assert!(messages.iter().any(|m| matches!(
            m,
            Message::State(u) if u.entity == EntityId::LeftPaddle && u.position.y == moved.y
        )));
    }

    #[test]
    fn malformed_bytes_are_counted_and_skipped() {
        let (mut client, _peer) = session(Role::Client);
        let framed = client.framing().encode(&Message::Pong { t0: 0, t1: 0 });

        client.on_bytes_received(b"[4]pong", 100).unwrap();
        client.on_bytes_received(&framed, 100).unwrap();

        assert_eq!(client.stats().malformed_dropped, 1);
        assert_eq!(client.stats().messages_received, 1);
    }

    #[test]
    fn lost_connection_is_reported_once() {
        let (mut client, peer) = session(Role::Client);
        client.start(0).unwrap();
        peer.close();

        assert!(client.tick(10).is_err());
        assert!(client.is_finished());
        assert!(client.tick(20).is_ok());
        assert!(
            client
                .drain_events()
                .any(|e| matches!(e, SessionEvent::ConnectionLost { .. }))
        );
    }

    #[test]
    fn unsynced_client_holds_its_paddle() {
        let (mut client, _peer) = session(Role::Client);
        let start = client.arena().right_paddle_start();
        client.set_paddle_direction(1);

        for t in 0..4 {
            client.tick(t * 10).unwrap();
        }
        assert_eq!(client.entity(EntityId::RightPaddle).current(), start);

        deliver(&mut client, Message::Pong { t0: 0, t1: 20 }, 40);
        assert_eq!(client.clock().offset_ms(), 0);
        client.tick(40).unwrap();
        assert_eq!(
            client.entity(EntityId::RightPaddle).current().y,
            start.y + client.config().paddle_velocity
        );
    }

    #[test]
    fn lowered_offset_keeps_the_owned_paddle_moving() {
        let (mut client, _peer) = session(Role::Client);
        let start = client.arena().right_paddle_start();
        let step = client.config().paddle_velocity;
        deliver(&mut client, Message::Pong { t0: 0, t1: 50 }, 100);

        client.set_paddle_direction(1);
        client.tick(1_000).unwrap();
        client.tick(1_010).unwrap();
        client.tick(1_020).unwrap();
        assert_eq!(
            client.entity(EntityId::RightPaddle).current().y,
            start.y + 2 * step
        );

        // game time drops from 1030 to 990
        deliver(&mut client, Message::Pong { t0: 1_020, t1: 985 }, 1_030);
        assert_eq!(client.clock().offset_ms(), -40);

        client.tick(1_030).unwrap();
        let paddle = client.entity(EntityId::RightPaddle);
        assert_eq!(paddle.current().y, start.y + 3 * step);
        assert_eq!(paddle.history().latest().time, 990);

        client.tick(1_040).unwrap();
        assert_eq!(
            client.entity(EntityId::RightPaddle).current().y,
            start.y + 4 * step
        );
    }

    #[test]
    fn repeated_end_is_acknowledged_once() {
        let (mut client, mut peer) = session(Role::Client);
        deliver(&mut client, Message::End, 100);
        deliver(&mut client, Message::End, 110);

        let replies = received(&mut peer, client.framing());
        assert_eq!(replies, vec![Message::EndOk]);
        assert_eq!(
            client
                .drain_events()
                .filter(|e| matches!(e, SessionEvent::GameOver { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn updates_off_the_field_are_dropped() {
        let (mut server, _peer) = session(Role::Server);
        let start = server.arena().right_paddle_start();
        deliver(
            &mut server,
            Message::State(EntityUpdate {
                entity: EntityId::RightPaddle,
                time: 5,
                position: IVec2::new(start.x, i32::MAX),
                motion: None,
            }),
            100,
        );
        assert_eq!(server.stats().invalid_dropped, 1);
        assert_eq!(server.entity(EntityId::RightPaddle).current(), start);

        let (mut client, _peer) = session(Role::Client);
        let ball = client.arena().ball_start();
        deliver(
            &mut client,
            Message::State(EntityUpdate {
                entity: EntityId::Ball,
                time: 5,
                position: ball.position(),
                motion: Some(Motion::new(IVec2::new(1, 1), i32::MAX)),
            }),
            100,
        );
        assert_eq!(client.stats().invalid_dropped, 1);
        assert_eq!(client.entity(EntityId::Ball).motion().velocity, 2);
    }
}
