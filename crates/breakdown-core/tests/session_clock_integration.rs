//! Integration tests for the session clock contract.

use breakdown_core::{Durations, Event, SessionClock, SessionKind};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Start,
    Pause,
    Resume,
    Stop,
    Tick(u16),
    Configure(u64, u64, u64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Start),
        Just(Op::Pause),
        Just(Op::Resume),
        Just(Op::Stop),
        (1u16..200).prop_map(Op::Tick),
        (0u64..120, 0u64..60, 0u64..90).prop_map(|(w, s, l)| Op::Configure(w, s, l)),
    ]
}

fn apply(clock: &mut SessionClock, op: &Op) {
    match op {
        Op::Start => {
            clock.start();
        }
        Op::Pause => {
            clock.pause();
        }
        Op::Resume => {
            let _ = clock.resume();
        }
        Op::Stop => {
            clock.stop();
        }
        Op::Tick(n) => {
            for _ in 0..*n {
                clock.tick();
            }
        }
        Op::Configure(w, s, l) => {
            let _ = clock.configure(*w, *s, *l);
        }
    }
}

fn assert_invariants(clock: &SessionClock) {
    assert!(clock.remaining_secs() <= clock.total_secs());
    if clock.is_running() {
        assert!(clock.remaining_secs() > 0);
    }
    if clock.session_kind() == SessionKind::LongBreak {
        let done = clock.completed_work_sessions();
        assert!(done > 0 && done % 4 == 0);
    }
    let p = clock.progress();
    assert!((0.0..=1.0).contains(&p));
}

proptest! {
    #[test]
    fn start_loads_configured_work(work in 1u64..10_000, short in 1u64..5_000, long in 1u64..5_000) {
        let mut clock = SessionClock::default();
        clock.configure(work, short, long).unwrap();
        clock.start();
        prop_assert_eq!(clock.session_kind(), SessionKind::Work);
        prop_assert_eq!(clock.remaining_secs(), work);
        prop_assert_eq!(clock.total_secs(), work);
    }

    #[test]
    fn invariants_hold_for_any_sequence(ops in proptest::collection::vec(op(), 0..60)) {
        let mut clock = SessionClock::new(Durations::new(7, 3, 5).unwrap());
        assert_invariants(&clock);
        for op in &ops {
            apply(&mut clock, op);
            assert_invariants(&clock);
        }
    }

    #[test]
    fn one_work_phase_rotates_to_short_break(work in 1u64..500, short in 1u64..500, long in 1u64..500) {
        let mut clock = SessionClock::new(Durations::new(work, short, long).unwrap());
        clock.start();
        let mut rotations = 0;
        for _ in 0..work {
            if let Some(Event::PhaseRotated { .. }) = clock.tick() {
                rotations += 1;
            }
        }
        prop_assert_eq!(rotations, 1);
        prop_assert_eq!(clock.session_kind(), SessionKind::ShortBreak);
        prop_assert_eq!(clock.completed_work_sessions(), 1);
        prop_assert_eq!(clock.remaining_secs(), short);
    }

    #[test]
    fn pause_resume_preserves_counts(work in 2u64..300, ticks in 0u64..300) {
        let mut clock = SessionClock::new(Durations::new(work, 5, 9).unwrap());
        clock.start();
        for _ in 0..ticks {
            clock.tick();
        }
        let remaining = clock.remaining_secs();
        let total = clock.total_secs();
        clock.pause();
        clock.resume().unwrap();
        prop_assert!(clock.is_running());
        prop_assert_eq!(clock.remaining_secs(), remaining);
        prop_assert_eq!(clock.total_secs(), total);
    }

    #[test]
    fn stop_always_empties(ops in proptest::collection::vec(op(), 0..30)) {
        let mut clock = SessionClock::default();
        for op in &ops {
            apply(&mut clock, op);
        }
        let kind = clock.session_kind();
        let done = clock.completed_work_sessions();
        clock.stop();
        prop_assert_eq!(clock.remaining_secs(), 0);
        prop_assert!(!clock.is_running());
        prop_assert_eq!(clock.session_kind(), kind);
        prop_assert_eq!(clock.completed_work_sessions(), done);
    }
}

#[test]
fn four_cycles_end_in_long_break() {
    let mut clock = SessionClock::new(Durations::new(10, 2, 6).unwrap());
    clock.start();
    let mut kinds = Vec::new();
    while clock.completed_work_sessions() < 4 || clock.session_kind() == SessionKind::Work {
        if let Some(Event::PhaseRotated { next, .. }) = clock.tick() {
            kinds.push(next);
        }
    }
    assert_eq!(
        kinds,
        vec![
            SessionKind::ShortBreak,
            SessionKind::Work,
            SessionKind::ShortBreak,
            SessionKind::Work,
            SessionKind::ShortBreak,
            SessionKind::Work,
            SessionKind::LongBreak,
        ]
    );
    assert_eq!(clock.completed_work_sessions(), 4);
    assert_eq!(clock.remaining_secs(), 6);
    assert!(clock.is_running());
}

#[test]
fn pomodoro_walkthrough() {
    let mut clock = SessionClock::default();
    clock.configure(25 * 60, 5 * 60, 15 * 60).unwrap();
    clock.start();
    assert_eq!(
        (clock.session_kind(), clock.remaining_secs(), clock.total_secs(), clock.is_running()),
        (SessionKind::Work, 1500, 1500, true)
    );
    for _ in 0..1500 {
        clock.tick();
    }
    assert_eq!(
        (clock.session_kind(), clock.remaining_secs(), clock.total_secs(), clock.is_running()),
        (SessionKind::ShortBreak, 300, 300, true)
    );
    assert_eq!(clock.completed_work_sessions(), 1);
    clock.pause();
    assert!(!clock.is_running());
    assert_eq!(clock.remaining_secs(), 300);
    clock.resume().unwrap();
    assert!(clock.is_running());
    assert_eq!(clock.remaining_secs(), 300);
    assert_eq!(clock.display(), "05:00");
}
