//! Owned tick scheduling for a [`SessionClock`].
//!
//! The driver runs as a single tokio task that owns the clock. Control
//! calls arrive over an mpsc channel from [`ClockHandle`]s; ticks come from
//! at most one `Interval`, which exists exactly while the clock is running.
//! Every transition drops the old interval before a new one is created, so
//! pause/resume can never leave two tick sources behind.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use super::engine::SessionClock;
use crate::error::ClockError;
use crate::events::Event;

/// Real-time cadence of the countdown.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 256;

type Reply = oneshot::Sender<Result<Option<Event>, ClockError>>;

enum Command {
    Start(Reply),
    Pause(Reply),
    Resume(Reply),
    Stop(Reply),
    Configure {
        work: u64,
        short_break: u64,
        long_break: u64,
        reply: Reply,
    },
    Snapshot(oneshot::Sender<SessionClock>),
    Shutdown,
}

/// Cloneable control surface for a running driver.
#[derive(Clone)]
pub struct ClockHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<Event>,
}

impl ClockHandle {
    pub async fn start(&self) -> Result<Option<Event>, ClockError> {
        self.request(Command::Start).await
    }

    pub async fn pause(&self) -> Result<Option<Event>, ClockError> {
        self.request(Command::Pause).await
    }

    /// # Errors
    /// Propagates [`ClockError::NothingToResume`] from the clock.
    pub async fn resume(&self) -> Result<Option<Event>, ClockError> {
        self.request(Command::Resume).await
    }

    pub async fn stop(&self) -> Result<Option<Event>, ClockError> {
        self.request(Command::Stop).await
    }

    /// # Errors
    /// Propagates [`ClockError::InvalidConfig`] from the clock.
    pub async fn configure(
        &self,
        work: u64,
        short_break: u64,
        long_break: u64,
    ) -> Result<Option<Event>, ClockError> {
        self.request(|reply| Command::Configure {
            work,
            short_break,
            long_break,
            reply,
        })
        .await
    }

    /// Copy of the current clock state.
    pub async fn snapshot(&self) -> Result<SessionClock, ClockError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Snapshot(tx))
            .await
            .map_err(|_| ClockError::DriverClosed)?;
        rx.await.map_err(|_| ClockError::DriverClosed)
    }

    /// Receive every event the clock produces from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Ask the driver to exit. Pending ticks are discarded.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }

    async fn request(
        &self,
        make: impl FnOnce(Reply) -> Command,
    ) -> Result<Option<Event>, ClockError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| ClockError::DriverClosed)?;
        rx.await.map_err(|_| ClockError::DriverClosed)?
    }
}

/// Task that owns the clock and its single tick source.
pub struct ClockDriver {
    clock: SessionClock,
    period: Duration,
    ticker: Option<Interval>,
    commands: mpsc::Receiver<Command>,
    events: broadcast::Sender<Event>,
}

impl ClockDriver {
    /// Spawn a driver ticking once per [`TICK_PERIOD`].
    ///
    /// Must be called from within a tokio runtime. The join handle yields
    /// the final clock state once the driver shuts down or every handle
    /// has been dropped.
    pub fn spawn(clock: SessionClock) -> (ClockHandle, JoinHandle<SessionClock>) {
        Self::spawn_with_period(clock, TICK_PERIOD)
    }

    pub fn spawn_with_period(
        clock: SessionClock,
        period: Duration,
    ) -> (ClockHandle, JoinHandle<SessionClock>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, _) = broadcast::channel(EVENT_BUFFER);
        let mut driver = Self {
            clock,
            period,
            ticker: None,
            commands: cmd_rx,
            events: event_tx.clone(),
        };
        // A clock handed over mid-phase keeps counting.
        driver.sync_ticker();
        let join = tokio::spawn(driver.run());
        (
            ClockHandle {
                commands: cmd_tx,
                events: event_tx,
            },
            join,
        )
    }

    async fn run(mut self) -> SessionClock {
        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Shutdown) | None => break,
                    Some(cmd) => self.handle(cmd),
                },
                _ = next_tick(&mut self.ticker) => {
                    let event = self.clock.tick();
                    if let Some(Event::PhaseRotated { completed, next, completed_work_sessions, .. }) = &event {
                        tracing::info!(
                            ?completed,
                            ?next,
                            completed_work_sessions,
                            "phase rotated"
                        );
                    }
                    self.publish(event);
                    self.sync_ticker();
                }
            }
        }
        self.ticker = None;
        tracing::debug!("clock driver stopped");
        self.clock
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Start(reply) => {
                let result = Ok(self.clock.start());
                self.finish(result, reply);
            }
            Command::Pause(reply) => {
                let result = Ok(self.clock.pause());
                self.finish(result, reply);
            }
            Command::Resume(reply) => {
                let result = self.clock.resume();
                self.finish(result, reply);
            }
            Command::Stop(reply) => {
                let result = Ok(self.clock.stop());
                self.finish(result, reply);
            }
            Command::Configure {
                work,
                short_break,
                long_break,
                reply,
            } => {
                let result = self.clock.configure(work, short_break, long_break).map(Some);
                if let Err(e) = &result {
                    tracing::warn!(error = %e, "rejected clock configuration");
                }
                self.finish(result, reply);
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.clock.clone());
            }
            Command::Shutdown => {}
        }
    }

    fn finish(&mut self, result: Result<Option<Event>, ClockError>, reply: Reply) {
        if let Ok(event) = &result {
            self.publish(event.clone());
        }
        self.sync_ticker();
        let _ = reply.send(result);
    }

    fn publish(&self, event: Option<Event>) {
        if let Some(event) = event {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
    }

    /// Bring the tick source in line with `clock.is_running()`.
    ///
    /// Cancels the interval when the clock stops running, and creates one
    /// only when none is armed. A fresh interval first fires one full
    /// period after the control call that armed it.
    fn sync_ticker(&mut self) {
        if !self.clock.is_running() {
            if self.ticker.take().is_some() {
                tracing::debug!("tick source cancelled");
            }
            return;
        }
        if self.ticker.is_none() {
            let mut interval = time::interval_at(Instant::now() + self.period, self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            self.ticker = Some(interval);
            tracing::debug!(period_ms = self.period.as_millis() as u64, "tick source armed");
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{Durations, SessionKind};
    use tokio::time::sleep;

    fn clock(work: u64, short: u64, long: u64) -> SessionClock {
        SessionClock::new(Durations::new(work, short, long).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_second() {
        let (handle, _join) = ClockDriver::spawn(clock(60, 5, 5));
        handle.start().await.unwrap();
        sleep(Duration::from_millis(3500)).await;
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.remaining_secs(), 57);
        assert!(snap.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn pause_cancels_ticking() {
        let (handle, _join) = ClockDriver::spawn(clock(60, 5, 5));
        handle.start().await.unwrap();
        sleep(Duration::from_millis(1500)).await;
        handle.pause().await.unwrap();
        sleep(Duration::from_secs(10)).await;
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.remaining_secs(), 59);
        assert!(!snap.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_resume_does_not_double_speed() {
        let (handle, _join) = ClockDriver::spawn(clock(60, 5, 5));
        handle.start().await.unwrap();
        sleep(Duration::from_millis(1500)).await;
        handle.pause().await.unwrap();
        handle.resume().await.unwrap();
        handle.pause().await.unwrap();
        handle.resume().await.unwrap();
        // Resume while running must not arm a second source either.
        handle.resume().await.unwrap();
        handle.start().await.unwrap();
        sleep(Duration::from_millis(1700)).await;
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.remaining_secs(), 58);
    }

    #[tokio::test(start_paused = true)]
    async fn rotation_continues_without_idling() {
        let (handle, _join) = ClockDriver::spawn(clock(2, 3, 4));
        let mut events = handle.subscribe();
        handle.start().await.unwrap();
        sleep(Duration::from_millis(3500)).await;

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.session_kind(), SessionKind::ShortBreak);
        assert_eq!(snap.remaining_secs(), 2);
        assert!(snap.is_running());

        let mut rotated = false;
        while let Ok(ev) = events.try_recv() {
            if let Event::PhaseRotated { next, .. } = ev {
                assert_eq!(next, SessionKind::ShortBreak);
                rotated = true;
            }
        }
        assert!(rotated);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_then_resume_reports_nothing_to_resume() {
        let (handle, _join) = ClockDriver::spawn(clock(60, 5, 5));
        handle.start().await.unwrap();
        handle.stop().await.unwrap();
        assert_eq!(handle.resume().await, Err(ClockError::NothingToResume));
        sleep(Duration::from_secs(5)).await;
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.remaining_secs(), 0);
        assert!(!snap.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_configure_is_rejected() {
        let (handle, _join) = ClockDriver::spawn(clock(60, 5, 5));
        let err = handle.configure(0, 5, 5).await.unwrap_err();
        assert!(matches!(err, ClockError::InvalidConfig { .. }));
        assert!(handle.configure(30, 5, 5).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_returns_final_state() {
        let (handle, join) = ClockDriver::spawn(clock(60, 5, 5));
        handle.start().await.unwrap();
        sleep(Duration::from_millis(2500)).await;
        handle.shutdown().await;
        let final_clock = join.await.unwrap();
        assert_eq!(final_clock.remaining_secs(), 58);
        assert_eq!(handle.start().await, Err(ClockError::DriverClosed));
    }
}
