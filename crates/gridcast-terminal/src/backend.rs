//! Terminal backend abstraction.
//!
//! The renderer only needs a handful of operations from the physical
//! terminal, gathered in [`TerminalBackend`]. [`CrosstermBackend`] drives a
//! real terminal through stdout; [`MemoryBackend`] records output in memory
//! for tests and headless use.

use crossterm::{cursor, execute, style::ResetColor, terminal};
use std::io::{self, Stdout, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Largest terminal size assumed when the platform reports none.
pub const DEFAULT_MAX_SIZE: (u16, u16) = (1024, 1024);

/// Operations the renderer performs on a physical terminal.
///
/// Backends are moved into the renderer and shared with its background
/// threads, hence the `Send` bound.
pub trait TerminalBackend: Send {
    /// Current terminal size as `(columns, rows)`.
    fn size(&self) -> io::Result<(u16, u16)>;

    /// Largest size the terminal accepts.
    fn max_size(&self) -> (u16, u16) {
        DEFAULT_MAX_SIZE
    }

    /// Ask the terminal to take a new size.
    fn set_size(&mut self, width: u16, height: u16) -> io::Result<()>;

    /// Write an already-encoded byte sequence and flush it.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Called once when the renderer takes ownership.
    fn prepare(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Called once when the renderer is dropped.
    fn restore(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Real crossterm backend.
pub struct CrosstermBackend {
    stdout: Stdout,
    max_size: (u16, u16),
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            max_size: DEFAULT_MAX_SIZE,
        }
    }

    /// Override the maximum size reported to the renderer.
    #[must_use]
    pub fn with_max_size(mut self, width: u16, height: u16) -> Self {
        self.max_size = (width.max(1), height.max(1));
        self
    }
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalBackend for CrosstermBackend {
    fn size(&self) -> io::Result<(u16, u16)> {
        terminal::size()
    }

    fn max_size(&self) -> (u16, u16) {
        self.max_size
    }

    fn set_size(&mut self, width: u16, height: u16) -> io::Result<()> {
        execute!(self.stdout, terminal::SetSize(width, height))
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stdout.write_all(bytes)?;
        self.stdout.flush()
    }

    fn prepare(&mut self) -> io::Result<()> {
        execute!(self.stdout, cursor::Hide)
    }

    fn restore(&mut self) -> io::Result<()> {
        let _ = execute!(self.stdout, ResetColor);
        execute!(self.stdout, cursor::Show)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    output: Vec<u8>,
    size: (u16, u16),
    max_size: (u16, u16),
    writes: usize,
    fail_writes: bool,
    prepared: bool,
    restored: bool,
}

/// In-memory backend recording every write.
///
/// Clones share the same state, so a test can keep a handle after moving
/// the backend into a renderer.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    /// Create a backend reporting `width × height`.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                size: (width, height),
                max_size: DEFAULT_MAX_SIZE,
                ..MemoryState::default()
            })),
        }
    }

    /// Set the maximum size reported to the renderer.
    #[must_use]
    pub fn with_max_size(self, width: u16, height: u16) -> Self {
        self.lock().max_size = (width, height);
        self
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Everything written so far, lossily decoded.
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.lock().output).into_owned()
    }

    /// Take and clear the recorded output.
    pub fn take_output(&self) -> String {
        let bytes = std::mem::take(&mut self.lock().output);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Number of successful `write_all` calls.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Make every later write fail with `BrokenPipe`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Change the reported size without telling the renderer, the way a
    /// user dragging the window would.
    pub fn simulate_resize(&self, width: u16, height: u16) {
        self.lock().size = (width, height);
    }

    /// Whether `prepare` ran.
    pub fn is_prepared(&self) -> bool {
        self.lock().prepared
    }

    /// Whether `restore` ran.
    pub fn is_restored(&self) -> bool {
        self.lock().restored
    }
}

impl TerminalBackend for MemoryBackend {
    fn size(&self) -> io::Result<(u16, u16)> {
        Ok(self.lock().size)
    }

    fn max_size(&self) -> (u16, u16) {
        self.lock().max_size
    }

    fn set_size(&mut self, width: u16, height: u16) -> io::Result<()> {
        self.lock().size = (width, height);
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "writes disabled"));
        }
        state.output.extend_from_slice(bytes);
        state.writes += 1;
        Ok(())
    }

    fn prepare(&mut self) -> io::Result<()> {
        self.lock().prepared = true;
        Ok(())
    }

    fn restore(&mut self) -> io::Result<()> {
        self.lock().restored = true;
        Ok(())
    }
}
