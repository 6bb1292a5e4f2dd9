//! Background draw pipeline.
//!
//! Two threads run while asynchronous drawing is on:
//!
//! - the **consumer** takes queued [`DrawRequest`]s in FIFO order and writes
//!   them into the frame, backing off while a present cycle is running;
//! - the **presenter** runs a present cycle every frame period and sleeps for
//!   whatever is left of the period.
//!
//! Both observe a shared shutdown flag at every iteration and are joined
//! when the pipeline stops. Nothing is ever killed.

use crate::error::RenderError;
use crate::renderer::Shared;
use crate::TerminalBackend;
use gridcast_core::{ColorId, Surface};
use std::sync::atomic::Ordering;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::{Arc, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// How long the consumer waits for a request before rechecking shutdown.
const QUEUE_POLL: Duration = Duration::from_millis(5);

/// Wall time between housekeeping passes.
pub(crate) const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(1);

/// One queued draw: a single line of text at a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawRequest {
    /// Text without line breaks.
    pub text: String,
    /// Foreground color id.
    pub fg: ColorId,
    /// Background color id.
    pub bg: ColorId,
    /// Column of the first character; negative values clip.
    pub x: i32,
    /// Row; rows outside the surface are ignored.
    pub y: i32,
}

impl DrawRequest {
    /// Write the request into the frame.
    ///
    /// Empty text and origins past the right edge are ignored; the surface
    /// drops rows outside the grid.
    pub fn apply(&self, surface: &mut Surface) {
        if self.text.is_empty() || self.x > i32::from(surface.width()) {
            return;
        }
        surface.write(&self.text, self.fg, self.bg, self.x, self.y);
    }
}

/// Handles of the two running loops.
#[derive(Debug)]
pub(crate) struct Workers {
    consumer: JoinHandle<()>,
    presenter: JoinHandle<()>,
}

impl Workers {
    /// Start both loops.
    pub(crate) fn start<B>(shared: &Arc<Shared<B>>) -> Result<Self, RenderError>
    where
        B: TerminalBackend + 'static,
    {
        shared.shutdown.store(false, Ordering::Release);

        let consumer = spawn("gridcast-consumer", Arc::clone(shared), consume)?;
        let presenter = match spawn("gridcast-presenter", Arc::clone(shared), present) {
            Ok(handle) => handle,
            Err(err) => {
                shared.shutdown.store(true, Ordering::Release);
                let _ = consumer.join();
                return Err(err);
            }
        };

        debug!("draw pipeline started");
        Ok(Self {
            consumer,
            presenter,
        })
    }

    /// Signal both loops and wait for them to exit.
    pub(crate) fn stop<B>(self, shared: &Shared<B>) {
        shared.shutdown.store(true, Ordering::Release);
        self.presenter.thread().unpark();
        for (name, handle) in [("consumer", self.consumer), ("presenter", self.presenter)] {
            if handle.join().is_err() {
                warn!("{} loop panicked before shutdown", name);
            }
        }
        debug!("draw pipeline stopped");
    }
}

fn spawn<B>(
    name: &'static str,
    shared: Arc<Shared<B>>,
    body: fn(&Shared<B>),
) -> Result<JoinHandle<()>, RenderError>
where
    B: TerminalBackend + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || body(&shared))
        .map_err(|source| RenderError::WorkerSpawn { name, source })
}

/// Consumer loop body.
fn consume<B: TerminalBackend>(shared: &Shared<B>) {
    let queue = shared.queue.lock().unwrap_or_else(PoisonError::into_inner);

    while !shared.shutdown.load(Ordering::Acquire) {
        if shared.presenting.load(Ordering::Acquire) {
            thread::yield_now();
            continue;
        }
        match queue.recv_timeout(QUEUE_POLL) {
            Ok(request) => {
                let mut surface = shared.surface.acquire();
                request.apply(&mut surface);
                // Keep going while the surface is ours, but yield to a
                // present cycle as soon as one asks for it.
                while !shared.presenting.load(Ordering::Acquire) {
                    match queue.try_recv() {
                        Ok(next) => next.apply(&mut surface),
                        Err(_) => break,
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Presenter loop body.
fn present<B: TerminalBackend>(shared: &Shared<B>) {
    let mut last_housekeeping = Instant::now();
    let mut cycles = 0u64;

    while !shared.shutdown.load(Ordering::Acquire) {
        let started = Instant::now();
        let report = shared.present_cycle();
        cycles += 1;
        trace!(
            rows = report.rows_written,
            chunks = report.chunks_written,
            skipped = report.skipped_writes,
            elapsed_us = started.elapsed().as_micros() as u64,
            "present cycle"
        );

        if last_housekeeping.elapsed() >= HOUSEKEEPING_INTERVAL {
            shared.housekeeping(cycles);
            cycles = 0;
            last_housekeeping = Instant::now();
        }

        // An overrunning cycle leaves nothing to sleep and the next one
        // starts immediately.
        let deadline = started + shared.frame_period();
        loop {
            if shared.shutdown.load(Ordering::Acquire) {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::park_timeout(deadline - now);
        }
    }
}
