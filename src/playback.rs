//! Transport events and a headless media clock that produces them.

use async_channel::{Receiver, Sender};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

const CHANNEL_CAPACITY: usize = 64;

/// Playback notifications from the media element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportEvent {
    Play,
    Pause,
    /// Jump to a position in seconds.
    Seek(f32),
    /// Animation-frame callback carrying the media time in seconds.
    Tick(f32),
    Ended,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaClock {
    pub duration: f32,
    pub frame_rate: f32,
    /// Media seconds per wall-clock second.
    pub speed: f32,
    /// Sleep between frames; off runs as fast as the receiver drains.
    pub realtime: bool,
}

impl Default for MediaClock {
    fn default() -> Self {
        Self {
            duration: 0.0,
            frame_rate: 60.0,
            speed: 1.0,
            realtime: true,
        }
    }
}

impl MediaClock {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.frame_rate.clamp(1.0, 1_000.0))
    }

    /// Media-time advance per frame.
    pub fn step(&self) -> f32 {
        self.speed.max(f32::EPSILON) / self.frame_rate.clamp(1.0, 1_000.0)
    }
}

/// Running clock thread; dropping it stops the clock.
#[derive(Debug)]
pub struct ClockHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ClockHandle {
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ClockHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Starts a named clock thread: `Play`, a `Tick` per frame up to the duration, then `Ended`.
pub fn spawn_media_clock(clock: MediaClock) -> io::Result<(Receiver<TransportEvent>, ClockHandle)> {
    let (sender, receiver) = async_channel::bounded(CHANNEL_CAPACITY);
    let stop = Arc::new(AtomicBool::new(false));
    let thread = thread::Builder::new()
        .name("sweepscope-media-clock".into())
        .spawn({
            let stop = Arc::clone(&stop);
            move || run_clock(clock, &sender, &stop)
        })?;
    Ok((
        receiver,
        ClockHandle {
            stop,
            thread: Some(thread),
        },
    ))
}

fn run_clock(clock: MediaClock, sender: &Sender<TransportEvent>, stop: &AtomicBool) {
    let duration = clock.duration.max(0.0);
    info!("[transport] clock started ({duration:.2}s at {:.0} fps)", clock.frame_rate);
    if sender.send_blocking(TransportEvent::Play).is_err() {
        return;
    }

    let step = clock.step();
    let mut frame: u64 = 0;
    loop {
        if stop.load(Ordering::Relaxed) {
            debug!("[transport] clock stopped at frame {frame}");
            let _ = sender.send_blocking(TransportEvent::Stop);
            return;
        }
        if clock.realtime {
            thread::sleep(clock.frame_interval());
        }
        frame += 1;
        let t = (frame as f32 * step).min(duration);
        if sender.send_blocking(TransportEvent::Tick(t)).is_err() {
            return;
        }
        if t >= duration {
            break;
        }
    }
    let _ = sender.send_blocking(TransportEvent::Ended);
    info!("[transport] clock ended after {frame} frames");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_plays_ticks_then_ends() {
        let (rx, _handle) = spawn_media_clock(MediaClock {
            duration: 1.0,
            frame_rate: 20.0,
            realtime: false,
            ..MediaClock::default()
        })
        .expect("spawn clock thread");

        let events: Vec<TransportEvent> = std::iter::from_fn(|| rx.recv_blocking().ok()).collect();
        assert_eq!(events.first(), Some(&TransportEvent::Play));
        assert_eq!(events.last(), Some(&TransportEvent::Ended));

        let ticks: Vec<f32> = events
            .iter()
            .filter_map(|e| match e {
                TransportEvent::Tick(t) => Some(*t),
                _ => None,
            })
            .collect();
        assert!(ticks.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(ticks.last().copied(), Some(1.0));
        assert!((19..=21).contains(&ticks.len()));
    }

    #[test]
    fn stopping_the_clock_ends_the_stream() {
        let (rx, mut handle) = spawn_media_clock(MediaClock {
            duration: 3_600.0,
            frame_rate: 1_000.0,
            realtime: true,
            ..MediaClock::default()
        })
        .expect("spawn clock thread");
        assert_eq!(rx.recv_blocking(), Ok(TransportEvent::Play));
        // Keep draining so the bounded channel never blocks the clock.
        let drain =
            std::thread::spawn(move || std::iter::from_fn(|| rx.recv_blocking().ok()).last());
        std::thread::sleep(Duration::from_millis(20));
        handle.stop();
        assert_eq!(drain.join().ok().flatten(), Some(TransportEvent::Stop));
    }
}
