use std::io::Write;

use chrono::Duration;
use clap::Subcommand;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use breakdown_core::storage::Database;
use breakdown_core::timer::{format_mm_ss, WORK_SESSIONS_PER_CYCLE};
use breakdown_core::{
    ClockDriver, ClockError, ClockHandle, Config, Durations, Event, SessionClock, SessionKind,
};

const BAR_WIDTH: usize = 20;
const MAX_PREVIEW_CYCLES: i64 = 100;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run the timer in the foreground (stdin: g=start p=pause r=resume s=stop q=quit)
    Run {
        /// Override work minutes
        #[arg(long)]
        work_min: Option<u64>,
        /// Override short break minutes
        #[arg(long)]
        short_min: Option<u64>,
        /// Override long break minutes
        #[arg(long)]
        long_min: Option<u64>,
        /// Wait for `g` instead of starting right away
        #[arg(long)]
        idle: bool,
    },
    /// Print the phase sequence a fresh timer would run through
    Preview {
        /// Number of four-session cycles to show
        #[arg(
            long,
            default_value = "1",
            value_parser = clap::value_parser!(u32).range(1..=MAX_PREVIEW_CYCLES)
        )]
        cycles: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Start,
    Pause,
    Resume,
    Stop,
    Quit,
}

fn parse_control(line: &str) -> Option<Control> {
    match line.trim().to_ascii_lowercase().as_str() {
        "g" | "start" => Some(Control::Start),
        "p" | "pause" => Some(Control::Pause),
        "r" | "resume" => Some(Control::Resume),
        "s" | "stop" => Some(Control::Stop),
        "q" | "quit" | "exit" => Some(Control::Quit),
        _ => None,
    }
}

fn durations_for(
    config: &Config,
    work_min: Option<u64>,
    short_min: Option<u64>,
    long_min: Option<u64>,
) -> Result<Durations, Box<dyn std::error::Error>> {
    let base = config.durations()?;
    let pick = |over: Option<u64>, secs: u64| over.map(|m| m.saturating_mul(60)).unwrap_or(secs);
    Ok(Durations::new(
        pick(work_min, base.work_secs()),
        pick(short_min, base.short_break_secs()),
        pick(long_min, base.long_break_secs()),
    )?)
}

/// One status line: kind, time left, remaining-progress bar, cycle counter.
fn render(clock: &SessionClock) -> String {
    let filled = (clock.progress() * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    let state = if clock.is_running() { "" } else { " (paused)" };
    format!(
        "[{}] {}  {}{}  session {}/4{}",
        clock.session_kind().label(),
        clock.display(),
        "█".repeat(filled),
        "░".repeat(BAR_WIDTH - filled),
        clock.cycle_position(),
        state,
    )
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    match action {
        TimerAction::Run {
            work_min,
            short_min,
            long_min,
            idle,
        } => {
            let durations = durations_for(&config, work_min, short_min, long_min)?;
            let db = Database::open()?;
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            rt.block_on(run_foreground(durations, db, !idle))
        }
        TimerAction::Preview { cycles } => {
            let durations = config.durations()?;
            for (i, (kind, secs)) in preview(durations, cycles).enumerate() {
                println!("{:>3}. {:<12} {}", i + 1, kind.label(), format_mm_ss(secs));
            }
            Ok(())
        }
    }
}

/// Phases a fresh clock passes through over `cycles` full cycles.
fn preview(durations: Durations, cycles: u32) -> impl Iterator<Item = (SessionKind, u64)> {
    let per_cycle = u64::from(WORK_SESSIONS_PER_CYCLE) * 2;
    (0..u64::from(cycles) * per_cycle).map(move |i| {
        let work_number = i / 2 + 1;
        let kind = if i % 2 == 0 {
            SessionKind::Work
        } else if work_number % u64::from(WORK_SESSIONS_PER_CYCLE) == 0 {
            SessionKind::LongBreak
        } else {
            SessionKind::ShortBreak
        };
        (kind, durations.for_kind(kind))
    })
}

async fn run_foreground(
    durations: Durations,
    db: Database,
    autostart: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (handle, join) = ClockDriver::spawn(SessionClock::new(durations));
    let mut events = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    eprintln!("controls: g=start p=pause r=resume s=stop q=quit");
    if autostart {
        handle.start().await?;
    } else {
        draw(&handle).await?;
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    record(&db, &event);
                    draw(&handle).await?;
                }
                Err(RecvError::Lagged(n)) => tracing::warn!(skipped = n, "renderer fell behind"),
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_control(&line) {
                    Some(Control::Quit) => break,
                    Some(control) => apply(&handle, control).await?,
                    None => eprintln!("\nunknown command: {}", line.trim()),
                }
            }
        }
    }

    handle.shutdown().await;
    let final_clock = join.await?;
    println!();
    println!(
        "completed work sessions: {}",
        final_clock.completed_work_sessions()
    );
    Ok(())
}

async fn apply(handle: &ClockHandle, control: Control) -> Result<(), ClockError> {
    let result = match control {
        Control::Start => handle.start().await,
        Control::Pause => handle.pause().await,
        Control::Resume => handle.resume().await,
        Control::Stop => handle.stop().await,
        Control::Quit => Ok(None),
    };
    match result {
        // Stale click, same as an ignored button.
        Err(ClockError::NothingToResume) => eprintln!("\nnothing to resume; press g to start"),
        Err(e) => return Err(e),
        Ok(_) => {}
    }
    draw(handle).await
}

async fn draw(handle: &ClockHandle) -> Result<(), ClockError> {
    let clock = handle.snapshot().await?;
    print!("\r\x1b[2K{}", render(&clock));
    let _ = std::io::stdout().flush();
    Ok(())
}

/// Phase history is best effort; a failed write never affects the clock.
fn record(db: &Database, event: &Event) {
    if let Event::PhaseRotated {
        completed,
        completed_secs,
        at,
        ..
    } = event
    {
        let started = *at - Duration::seconds(*completed_secs as i64);
        if let Err(e) = db.record_phase(*completed, *completed_secs, started, *at) {
            tracing::warn!(error = %e, "failed to record completed phase");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controls_parse() {
        assert_eq!(parse_control("p"), Some(Control::Pause));
        assert_eq!(parse_control(" Resume "), Some(Control::Resume));
        assert_eq!(parse_control("g"), Some(Control::Start));
        assert_eq!(parse_control("s"), Some(Control::Stop));
        assert_eq!(parse_control("q"), Some(Control::Quit));
        assert_eq!(parse_control("x"), None);
    }

    #[test]
    fn render_idle_clock() {
        let clock = SessionClock::default();
        let line = render(&clock);
        assert!(line.starts_with("[Work] 25:00  "));
        assert!(line.contains(&"█".repeat(BAR_WIDTH)));
        assert!(line.ends_with("session 1/4 (paused)"));
    }

    #[test]
    fn render_stopped_clock_has_empty_bar() {
        let mut clock = SessionClock::default();
        clock.start();
        clock.stop();
        let line = render(&clock);
        assert!(line.contains("00:00"));
        assert!(line.contains(&"░".repeat(BAR_WIDTH)));
    }

    #[test]
    fn preview_lists_one_cycle() {
        let d = Durations::new(3, 1, 2).unwrap();
        let phases: Vec<_> = preview(d, 1).collect();
        let kinds: Vec<SessionKind> = phases.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                SessionKind::Work,
                SessionKind::ShortBreak,
                SessionKind::Work,
                SessionKind::ShortBreak,
                SessionKind::Work,
                SessionKind::ShortBreak,
                SessionKind::Work,
                SessionKind::LongBreak,
            ]
        );
        assert_eq!(phases[7].1, 2);
    }

    #[test]
    fn preview_matches_a_ticking_clock() {
        let d = Durations::new(3, 1, 2).unwrap();
        let mut clock = SessionClock::new(d);
        clock.start();
        for (kind, secs) in preview(d, 3) {
            assert_eq!((clock.session_kind(), clock.total_secs()), (kind, secs));
            for _ in 0..secs {
                clock.tick();
            }
        }
    }

    #[test]
    fn preview_is_lazy_for_huge_inputs() {
        let d = Durations::new(u64::MAX, 1, u64::MAX).unwrap();
        let mut phases = preview(d, u32::MAX);
        assert_eq!(phases.next(), Some((SessionKind::Work, u64::MAX)));
        assert_eq!(phases.nth(6), Some((SessionKind::LongBreak, u64::MAX)));
        assert_eq!(phases.next(), Some((SessionKind::Work, u64::MAX)));
    }

    #[test]
    fn overrides_replace_configured_minutes() {
        let config = Config::default();
        let d = durations_for(&config, Some(50), None, Some(30)).unwrap();
        assert_eq!(d.work_secs(), 3000);
        assert_eq!(d.short_break_secs(), 300);
        assert_eq!(d.long_break_secs(), 1800);
        assert!(durations_for(&config, Some(0), None, None).is_err());
    }
}
