//! The rendering engine.
//!
//! [`Renderer`] owns the surface, the color table and the backend, and
//! exposes the draw/present/resize contract. In asynchronous mode draw calls
//! only enqueue; two background threads (see [`crate::pipeline`]) apply them
//! and present on a fixed period. In synchronous mode draws land in the
//! frame immediately and the caller presents explicitly.
//!
//! # Example
//!
//! ```
//! use gridcast_terminal::{MemoryBackend, Renderer, RendererConfig};
//!
//! let backend = MemoryBackend::new(20, 5);
//! let output = backend.clone();
//! let renderer = Renderer::new(backend, RendererConfig::synchronous()).unwrap();
//!
//! renderer.draw("hello", 0, 0);
//! let report = renderer.present();
//! assert_eq!(report.rows_written, 1);
//! assert!(output.output().contains("hello"));
//! ```

use crate::backend::{CrosstermBackend, TerminalBackend};
use crate::color::ColorMode;
use crate::config::RendererConfig;
use crate::encoder::PatchEncoder;
use crate::error::RenderError;
use crate::gate::SpinGate;
use crate::pipeline::{DrawRequest, Workers};
use gridcast_core::{
    Cell, ColorId, ColorTable, Rgb, Surface, TaggedText, Token, DEFAULT_BG_ID, DEFAULT_FG_ID,
};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// What one present cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresentReport {
    /// Cells copied from frame to canvas.
    pub cells_promoted: usize,
    /// Rows emitted to the terminal.
    pub rows_written: usize,
    /// Colored chunks contained in those rows.
    pub chunks_written: usize,
    /// Row writes that failed and stay dirty for the next cycle.
    pub skipped_writes: usize,
    /// Whether every row was repainted.
    pub forced_full: bool,
}

impl PresentReport {
    /// True when the cycle produced no terminal output.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows_written == 0
    }
}

/// Backend together with the encoder feeding it; guarded as one unit so a
/// row's bytes reach the terminal in one piece.
pub(crate) struct Output<B> {
    pub(crate) backend: B,
    pub(crate) encoder: PatchEncoder,
}

/// State shared between the caller and the pipeline threads.
pub(crate) struct Shared<B> {
    pub(crate) surface: SpinGate<Surface>,
    pub(crate) palette: SpinGate<ColorTable>,
    pub(crate) output: SpinGate<Output<B>>,
    pub(crate) queue: Mutex<Receiver<DrawRequest>>,
    pub(crate) sender: Sender<DrawRequest>,
    pub(crate) presenting: AtomicBool,
    pub(crate) shutdown: AtomicBool,
    pub(crate) async_mode: AtomicBool,
    /// Mirrors `Surface::uses_color` so draws can read it without the gate.
    pub(crate) use_color: AtomicBool,
    /// Surface size packed as `width << 16 | height`.
    pub(crate) dims: AtomicU32,
    pub(crate) force_full: AtomicBool,
    pub(crate) frame_period_ms: AtomicU64,
    pub(crate) max_size: (u16, u16),
}

impl<B: TerminalBackend> Shared<B> {
    pub(crate) fn frame_period(&self) -> Duration {
        Duration::from_millis(self.frame_period_ms.load(Ordering::Relaxed))
    }

    /// Promote, detect size drift, then emit every dirty row.
    pub(crate) fn present_cycle(&self) -> PresentReport {
        self.presenting.store(true, Ordering::Release);
        let report = self.present_locked();
        self.presenting.store(false, Ordering::Release);
        report
    }

    fn present_locked(&self) -> PresentReport {
        let mut surface = self.surface.acquire();
        let cells_promoted = surface.promote();

        let tracked = (surface.width(), surface.height());
        let mut forced_full = self.force_full.swap(false, Ordering::AcqRel);
        {
            let mut output = self.output.acquire();
            match output.backend.size() {
                Ok(actual) if actual != tracked => {
                    warn!(
                        "terminal size drifted to {}x{}, restoring {}x{}",
                        actual.0, actual.1, tracked.0, tracked.1
                    );
                    if let Err(e) = output.backend.set_size(tracked.0, tracked.1) {
                        warn!("Failed to restore terminal size: {}", e);
                    }
                    forced_full = true;
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to query terminal size: {}", e),
            }
        }

        let palette = self.palette.acquire().snapshot();
        let use_color = surface.uses_color();
        let summary = surface.flush(forced_full, |patch| {
            let mut output = self.output.acquire();
            let Output { backend, encoder } = &mut *output;
            let bytes = encoder.encode_patch(patch, &palette, use_color)?;
            backend.write_all(bytes)
        });

        if summary.rows_failed > 0 {
            warn!(
                "{} row writes failed; they stay dirty for the next cycle",
                summary.rows_failed
            );
        }

        PresentReport {
            cells_promoted,
            rows_written: summary.rows_written,
            chunks_written: summary.chunks_written,
            skipped_writes: summary.rows_failed,
            forced_full,
        }
    }

    /// Periodic maintenance run by the presenter about once a second.
    pub(crate) fn housekeeping(&self, cycles: u64) {
        let mut output = self.output.acquire();
        let encoder = &mut output.encoder;
        trace!(
            cycles,
            runs = encoder.runs_encoded(),
            style_changes = encoder.style_changes(),
            bytes = encoder.bytes_encoded(),
            "housekeeping"
        );
        encoder.reset_stats();
        encoder.shrink_scratch();
    }

    /// Apply requests left in the queue, unless the consumer owns it.
    fn drain_queue(&self, surface: &mut Surface) -> usize {
        let Ok(queue) = self.queue.try_lock() else {
            return 0;
        };
        let mut drained = 0;
        while let Ok(request) = queue.try_recv() {
            request.apply(surface);
            drained += 1;
        }
        drained
    }
}

/// Text-terminal rendering engine.
///
/// All methods take `&self`; wrap the renderer in an [`Arc`] to draw from
/// several threads.
pub struct Renderer<B: TerminalBackend + 'static> {
    shared: Arc<Shared<B>>,
    workers: Mutex<Option<Workers>>,
}

impl Renderer<CrosstermBackend> {
    /// Create a renderer drawing to stdout.
    ///
    /// # Errors
    ///
    /// See [`Renderer::new`].
    pub fn stdout(config: RendererConfig) -> Result<Self, RenderError> {
        Self::new(CrosstermBackend::new(), config)
    }
}

impl<B: TerminalBackend + 'static> Renderer<B> {
    /// Create a renderer sized to the backend's current terminal size.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid, the terminal size cannot
    /// be read, or the pipeline threads cannot be started.
    pub fn new(mut backend: B, config: RendererConfig) -> Result<Self, RenderError> {
        config.validate()?;
        let (width, height) = backend.size()?;
        let max_size = config.max_size.unwrap_or_else(|| backend.max_size());
        let width = width.clamp(1, max_size.0.max(1));
        let height = height.clamp(1, max_size.1.max(1));

        let mut palette = ColorTable::with_capacity(config.color_capacity)?;
        let mut surface = Surface::new(width, height);
        surface.set_use_color(config.use_color);
        if !config.use_color {
            palette.reset_defaults();
        }
        let color_mode = config.color_mode.unwrap_or_else(ColorMode::detect);

        backend.prepare()?;
        let (sender, receiver) = mpsc::channel();
        let shared = Arc::new(Shared {
            surface: SpinGate::new(surface),
            palette: SpinGate::new(palette),
            output: SpinGate::new(Output {
                backend,
                encoder: PatchEncoder::new(color_mode),
            }),
            queue: Mutex::new(receiver),
            sender,
            presenting: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            async_mode: AtomicBool::new(false),
            use_color: AtomicBool::new(config.use_color),
            dims: AtomicU32::new(pack_dims(width, height)),
            force_full: AtomicBool::new(false),
            frame_period_ms: AtomicU64::new(config.frame_period_ms),
            max_size,
        });

        let renderer = Self {
            shared,
            workers: Mutex::new(None),
        };
        debug!(
            "renderer created at {}x{} ({:?}, capacity {})",
            width, height, color_mode, config.color_capacity
        );
        if config.async_drawing {
            renderer.set_async_mode(true)?;
        }
        Ok(renderer)
    }

    fn workers(&self) -> MutexGuard<'_, Option<Workers>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Drawing
    // =========================================================================

    /// Draw `text` at `(x, y)` in the default colors.
    ///
    /// Line breaks continue the text on the following rows at the same `x`.
    /// Rows outside the surface, origins past the right edge and empty text
    /// are ignored.
    pub fn draw(&self, text: &str, x: i32, y: i32) {
        self.draw_ids(text, DEFAULT_FG_ID, DEFAULT_BG_ID, x, y);
    }

    /// Draw `text` with hex color keys such as `"FF0000"`.
    ///
    /// # Errors
    ///
    /// Returns an error if either key is not a 6-digit hex color; nothing is
    /// drawn in that case.
    pub fn draw_colored(
        &self,
        text: &str,
        fg: &str,
        bg: &str,
        x: i32,
        y: i32,
    ) -> Result<(), RenderError> {
        let fg = Rgb::from_hex(fg)?;
        let bg = Rgb::from_hex(bg)?;
        let (fg, bg) = if self.uses_color() {
            let mut palette = self.shared.palette.acquire();
            (palette.lookup_or_insert(fg), palette.lookup_or_insert(bg))
        } else {
            (DEFAULT_FG_ID, DEFAULT_BG_ID)
        };
        self.draw_ids(text, fg, bg, x, y);
        Ok(())
    }

    /// Draw any displayable value in the default colors.
    pub fn draw_value(&self, value: impl Display, x: i32, y: i32) {
        self.draw(&value.to_string(), x, y);
    }

    /// Draw any displayable value with hex color keys.
    ///
    /// # Errors
    ///
    /// Same as [`draw_colored`](Self::draw_colored).
    pub fn draw_value_colored(
        &self,
        value: impl Display,
        fg: &str,
        bg: &str,
        x: i32,
        y: i32,
    ) -> Result<(), RenderError> {
        self.draw_colored(&value.to_string(), fg, bg, x, y)
    }

    /// Draw text containing inline `<cfRRGGBB>`/`<cbRRGGBB>` color tags.
    ///
    /// `</cf>` and `</cb>` return to the default colors. Each segment is
    /// drawn at `x` plus its character offset in the tag-free text.
    ///
    /// # Errors
    ///
    /// Returns an error at the first malformed tag. Segments before it have
    /// already been drawn.
    pub fn draw_formatted(&self, text: &str, x: i32, y: i32) -> Result<(), RenderError> {
        let tagged = TaggedText::new(text);
        let use_color = self.uses_color();
        let mut fg = DEFAULT_FG_ID;
        let mut bg = DEFAULT_BG_ID;

        for token in tagged.tokens() {
            match token? {
                Token::Text { text, column } => {
                    let offset = i32::try_from(column).unwrap_or(i32::MAX);
                    self.draw_ids(text, fg, bg, x.saturating_add(offset), y);
                }
                Token::Foreground(color) if use_color => {
                    fg = self.shared.palette.acquire().lookup_or_insert(color);
                }
                Token::Background(color) if use_color => {
                    bg = self.shared.palette.acquire().lookup_or_insert(color);
                }
                Token::Foreground(_) | Token::Background(_) => {}
            }
        }
        Ok(())
    }

    fn draw_ids(&self, text: &str, fg: ColorId, bg: ColorId, x: i32, y: i32) {
        let asynchronous = self.is_async();
        let mut row = y;
        for line in text.lines() {
            let request = DrawRequest {
                text: line.to_string(),
                fg,
                bg,
                x,
                y: row,
            };
            row = row.saturating_add(1);
            if line.is_empty() {
                continue;
            }
            if asynchronous {
                if self.shared.sender.send(request).is_err() {
                    warn!("draw queue closed; dropping request");
                }
            } else {
                let mut surface = self.shared.surface.acquire();
                self.shared.drain_queue(&mut surface);
                request.apply(&mut surface);
            }
        }
    }

    /// Write text straight to the terminal at `(x, y)`.
    ///
    /// The text bypasses the grids, is never tracked as dirty and is
    /// overwritten by the next present touching that region. A position
    /// outside the surface or a failed write is logged and skipped.
    pub fn raw_write(&self, text: &str, x: u16, y: u16) {
        let (width, height) = self.size();
        if x >= width || y >= height {
            debug!("raw write at {},{} outside {}x{}; skipped", x, y, width, height);
            return;
        }
        let mut output = self.shared.output.acquire();
        let Output { backend, encoder } = &mut *output;
        let result = encoder
            .encode_raw(text, x, y)
            .and_then(|bytes| backend.write_all(bytes));
        if let Err(e) = result {
            warn!("Raw write failed: {}", e);
        }
    }

    // =========================================================================
    // Presenting
    // =========================================================================

    /// Run one present cycle now.
    ///
    /// Requests still queued while no consumer is running are applied first.
    pub fn present(&self) -> PresentReport {
        if !self.is_async() {
            let mut surface = self.shared.surface.acquire();
            self.shared.drain_queue(&mut surface);
        }
        self.shared.present_cycle()
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Resize the surface, keeping the overlapping top-left content.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidWindowSize`] if the size is outside
    /// `1×1` and [`max_size`](Self::max_size); state is left untouched.
    pub fn resize(&self, width: u16, height: u16) -> Result<(), RenderError> {
        let (max_width, max_height) = self.shared.max_size;
        if !(1..=max_width).contains(&width) || !(1..=max_height).contains(&height) {
            return Err(RenderError::InvalidWindowSize {
                width,
                height,
                max_width,
                max_height,
            });
        }

        {
            let mut surface = self.shared.surface.acquire();
            if (surface.width(), surface.height()) == (width, height) {
                return Ok(());
            }
            surface.resize(width, height);
            self.shared
                .dims
                .store(pack_dims(width, height), Ordering::Release);
        }
        if let Err(e) = self.shared.output.acquire().backend.set_size(width, height) {
            warn!("Failed to resize terminal: {}", e);
        }
        self.shared.force_full.store(true, Ordering::Release);
        debug!("resized to {}x{}", width, height);
        Ok(())
    }

    /// Change the color table capacity.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ColorCapacity`] if `capacity` is below 4.
    pub fn set_color_capacity(&self, capacity: usize) -> Result<(), RenderError> {
        self.shared.palette.acquire().set_capacity(capacity)?;
        debug!("color capacity set to {}", capacity);
        Ok(())
    }

    /// Switch between queued background drawing and synchronous drawing.
    ///
    /// Turning it off joins both loops and applies anything still queued.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::WorkerSpawn`] if a loop thread cannot start.
    pub fn set_async_mode(&self, enabled: bool) -> Result<(), RenderError> {
        let mut workers = self.workers();
        if enabled {
            if workers.is_none() {
                *workers = Some(Workers::start(&self.shared)?);
            }
            self.shared.async_mode.store(true, Ordering::Release);
        } else {
            self.shared.async_mode.store(false, Ordering::Release);
            if let Some(running) = workers.take() {
                running.stop(&self.shared);
            }
            let mut surface = self.shared.surface.acquire();
            let drained = self.shared.drain_queue(&mut surface);
            if drained > 0 {
                debug!("applied {} queued requests after stopping", drained);
            }
        }
        Ok(())
    }

    /// Toggle color handling. Turning it off restores the default colors in
    /// table slots 0 and 1.
    pub fn set_use_color(&self, use_color: bool) {
        {
            let mut surface = self.shared.surface.acquire();
            surface.set_use_color(use_color);
            self.shared.use_color.store(use_color, Ordering::Release);
        }
        if !use_color {
            self.shared.palette.acquire().reset_defaults();
        }
    }

    /// Change the present loop period.
    pub fn set_frame_period(&self, period: Duration) {
        let millis = u64::try_from(period.as_millis()).unwrap_or(u64::MAX);
        self.shared.frame_period_ms.store(millis, Ordering::Relaxed);
    }

    /// Change how colors are encoded.
    pub fn set_color_mode(&self, mode: ColorMode) {
        self.shared.output.acquire().encoder.set_color_mode(mode);
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Surface size as `(columns, rows)`.
    #[must_use]
    pub fn size(&self) -> (u16, u16) {
        let dims = self.shared.dims.load(Ordering::Acquire);
        ((dims >> 16) as u16, dims as u16)
    }

    /// Largest size [`resize`](Self::resize) accepts.
    #[must_use]
    pub fn max_size(&self) -> (u16, u16) {
        self.shared.max_size
    }

    /// Color table capacity.
    #[must_use]
    pub fn color_capacity(&self) -> usize {
        self.shared.palette.acquire().capacity()
    }

    /// Hex key currently stored under `id`.
    #[must_use]
    pub fn color_key(&self, id: ColorId) -> Option<String> {
        self.shared.palette.acquire().get(id).map(|rgb| rgb.to_hex())
    }

    /// Whether draws are queued for the background pipeline.
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.shared.async_mode.load(Ordering::Acquire)
    }

    /// Whether color ids are written and emitted.
    #[must_use]
    pub fn uses_color(&self) -> bool {
        self.shared.use_color.load(Ordering::Acquire)
    }

    /// Present loop period.
    #[must_use]
    pub fn frame_period(&self) -> Duration {
        self.shared.frame_period()
    }

    /// How colors are encoded for the terminal.
    #[must_use]
    pub fn color_mode(&self) -> ColorMode {
        self.shared.output.acquire().encoder.color_mode()
    }

    /// Frame cell at `(x, y)`, or `None` outside the surface.
    #[must_use]
    pub fn frame_cell(&self, x: u16, y: u16) -> Option<Cell> {
        self.shared.surface.acquire().frame_cell(x, y)
    }

    /// Canvas cell at `(x, y)`, or `None` outside the surface.
    #[must_use]
    pub fn canvas_cell(&self, x: u16, y: u16) -> Option<Cell> {
        self.shared.surface.acquire().canvas_cell(x, y)
    }
}

const fn pack_dims(width: u16, height: u16) -> u32 {
    ((width as u32) << 16) | height as u32
}

impl<B: TerminalBackend + 'static> Drop for Renderer<B> {
    fn drop(&mut self) {
        if let Some(running) = self.workers().take() {
            running.stop(&self.shared);
        }
        if let Err(e) = self.shared.output.acquire().backend.restore() {
            warn!("Failed to restore terminal: {}", e);
        }
    }
}
