//! Drives a running engine from other threads, the way the input and clock
//! collaborators do.
use crossbeam_channel::unbounded;
use padseq::{
    hit_channel, BoxError, Color, Config, DisplaySink, Engine, Error, Hit, HitEvent, Mode, Pattern,
    Pulse, SharedFrame, Trig,
};
use std::thread;
use std::time::{Duration, Instant};

fn wait_for(what: &str, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

fn spawn(
    engine: Engine<SharedFrame>,
) -> thread::JoinHandle<(Engine<SharedFrame>, Result<(), Error>)> {
    let mut engine = engine;
    thread::spawn(move || {
        let result = engine.run();
        (engine, result)
    })
}

#[test]
fn test_selected_track_fires_at_its_step() {
    let (hits, hit_rx) = hit_channel();
    let frame = SharedFrame::new();
    let mut engine = Engine::new(frame.clone(), hit_rx, &Config::default()).unwrap();

    let (trig_tx, trig_rx) = unbounded();
    engine.add_trigger(move |step: u8, trigs: &[Trig]| -> Result<(), BoxError> {
        trig_tx.send((step, trigs.to_vec()))?;
        Ok(())
    });
    let clock = engine.clock();
    let handle = engine.handle();
    let runner = spawn(engine);

    hits.send(Ok(Hit::new(2, 8))).unwrap();
    hits.send(Ok(Hit::new(5, 0))).unwrap();
    for count in 0..=5 {
        clock.pulse(Pulse::new(count, 120.0)).unwrap();
    }

    let fired: Vec<(u8, Vec<Trig>)> = trig_rx.iter().take(6).collect();
    assert_eq!(fired.last().unwrap().0, 5);
    assert_eq!(fired.last().unwrap().1, vec![Trig { track: 2, value: 100 }]);

    handle.cancel();
    let (engine, result) = runner.join().unwrap();
    assert!(result.is_ok());
    assert_eq!(engine.sequencer().track(), 2);
    assert_eq!(engine.sequencer().velocity(2, 5), 100);
}

#[test]
fn test_mode_round_trip_keeps_state() {
    let (hits, hit_rx) = hit_channel();
    let frame = SharedFrame::new();
    let engine = Engine::new(frame.clone(), hit_rx, &Config::default()).unwrap();
    let handle = engine.handle();
    let runner = spawn(engine);

    // Steps on tracks 0 and 9, then mute tracks 3 and 9.
    hits.send(Ok(Hit::new(0, 0))).unwrap();
    hits.send(Ok(Hit::new(7, 7))).unwrap();
    hits.send(Ok(Hit::new(8, 1))).unwrap();
    hits.send(Ok(Hit::new(1, 8))).unwrap();
    hits.send(Ok(Hit::new(4, 2))).unwrap();

    let resets = |n: usize| {
        let frame = frame.clone();
        move || frame.lock().map(|f| f.resets() >= n).unwrap_or(false)
    };
    handle.set_mode(Mode::Mutes).unwrap();
    wait_for("mutes mode", resets(4));
    hits.send(Ok(Hit::new(3, 0))).unwrap();
    hits.send(Ok(Hit::new(1, 1))).unwrap();

    handle.set_mode(Mode::Pattern).unwrap();
    wait_for("pattern mode", resets(5));
    handle.cancel();

    let (engine, result) = runner.join().unwrap();
    assert!(result.is_ok());

    let seq = engine.sequencer();
    let mut expected = Pattern::new();
    expected.set(0, 0, 100);
    expected.set(0, 63, 100);
    expected.set(9, 20, 100);
    assert_eq!(seq.pattern(), &expected);

    let muted: Vec<u8> = (0..64).filter(|t| seq.is_muted(*t)).collect();
    assert_eq!(muted, vec![3, 9]);
    assert_eq!(seq.mode(), Mode::Pattern);
}

#[test]
fn test_resolution_change_reaches_engine() {
    let (_hits, hit_rx) = hit_channel();
    let frame = SharedFrame::new();
    let mut engine = Engine::new(frame.clone(), hit_rx, &Config::default()).unwrap();
    let (trig_tx, trig_rx) = unbounded();
    engine.add_trigger(move |step: u8, _trigs: &[Trig]| -> Result<(), BoxError> {
        trig_tx.send(step)?;
        Ok(())
    });
    let clock = engine.clock();
    let handle = engine.handle();
    let runner = spawn(engine);

    assert!(handle.set_resolution("quarter").is_err());
    handle.set_resolution("16th").unwrap();
    // Control requests are handled in order, so the redraw marks the resolution as applied.
    handle.set_mode(Mode::Pattern).unwrap();
    wait_for("redraw", || frame.lock().map(|f| f.resets() >= 2).unwrap_or(false));

    for count in 2..=12 {
        clock.pulse(Pulse::new(count, 120.0)).unwrap();
    }
    handle.cancel();
    let (engine, result) = runner.join().unwrap();
    assert!(result.is_ok());
    assert_eq!(engine.sequencer().step_skip(), 6);
    assert_eq!(trig_rx.try_iter().count(), 2);
}

#[test]
fn test_transport_error_stops_the_loop() {
    let (hits, hit_rx) = hit_channel();
    let engine = Engine::new(SharedFrame::new(), hit_rx, &Config::default()).unwrap();
    let clock = engine.clock();
    let runner = thread::spawn(move || {
        let mut engine = engine;
        engine.run()
    });

    let event: HitEvent = Err("usb unplugged".into());
    hits.send(event).unwrap();
    let err = runner.join().unwrap().unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert!(matches!(clock.pulse(Pulse::new(0, 120.0)), Err(Error::Stopped)));
}

#[test]
fn test_closed_hit_stream_is_a_transport_error() {
    let (hits, hit_rx) = hit_channel();
    drop(hits);
    let mut engine = Engine::new(SharedFrame::new(), hit_rx, &Config::default()).unwrap();
    assert!(matches!(engine.run(), Err(Error::Transport(_))));
}

#[test]
fn test_trigger_failure_stops_the_loop() {
    let (_hits, hit_rx) = hit_channel();
    let mut engine = Engine::new(SharedFrame::new(), hit_rx, &Config::default()).unwrap();
    engine.add_trigger(|_step: u8, _trigs: &[Trig]| -> Result<(), BoxError> {
        Err("sampler crashed".into())
    });
    let clock = engine.clock();
    let handle = engine.handle();
    let runner = thread::spawn(move || {
        let mut engine = engine;
        engine.run()
    });

    clock.pulse(Pulse::new(0, 120.0)).unwrap();
    let err = runner.join().unwrap().unwrap_err();
    assert!(matches!(err, Error::Trigger(_)));
    assert!(matches!(handle.set_mode(Mode::Mutes), Err(Error::Stopped)));
}

#[test]
fn test_cancel_before_run_draws_only_the_initial_frame() {
    let (_hits, hit_rx) = hit_channel();
    let frame = SharedFrame::new();
    let mut engine = Engine::new(frame.clone(), hit_rx, &Config::default()).unwrap();
    engine.handle().cancel();
    assert!(engine.run().is_ok());
    let frame = frame.snapshot().unwrap();
    assert_eq!(frame.resets(), 1);
    assert_eq!(frame.writes(), 66);
}

/// Accepts a fixed number of light writes, then reports a broken link.
struct FlakyDisplay {
    writes_left: usize,
}

impl DisplaySink for FlakyDisplay {
    fn light(&mut self, _x: u8, _y: u8, _color: Color) -> Result<(), BoxError> {
        if self.writes_left == 0 {
            return Err("display unplugged".into());
        }
        self.writes_left -= 1;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

#[test]
fn test_display_failure_on_initial_draw_is_fatal() {
    let (_hits, hit_rx) = hit_channel();
    let display = FlakyDisplay { writes_left: 0 };
    let mut engine = Engine::new(display, hit_rx, &Config::default()).unwrap();
    assert!(matches!(engine.run(), Err(Error::Display(_))));
}

#[test]
fn test_display_failure_during_advance_is_fatal() {
    let (_hits, hit_rx) = hit_channel();
    // Enough for the initial frame: two track markers and 64 cells.
    let display = FlakyDisplay { writes_left: 66 };
    let engine = Engine::new(display, hit_rx, &Config::default()).unwrap();
    let clock = engine.clock();
    let runner = thread::spawn(move || {
        let mut engine = engine;
        engine.run()
    });

    clock.pulse(Pulse::new(0, 120.0)).unwrap();
    let err = runner.join().unwrap().unwrap_err();
    assert!(matches!(err, Error::Display(_)));
}
