//! Cursor back-end abstraction.
//!
//! The engine talks to a platform cursor through four operations: absolute
//! move, relative move, position read, and scroll. Back-ends are registered
//! by name so individual commands can route to a specific one
//! (`api_override`); unknown names fall back to the default.
//!
//! Back-end failures are never fatal to the engine — callers log and carry
//! on, which is why every operation returns `anyhow::Result` rather than a
//! structured error.

use std::collections::HashMap;
use std::io::stdout;

use anyhow::Result;
use crossterm::{
    cursor::{MoveTo, position},
    execute,
    terminal::{ScrollDown, ScrollUp},
};

pub trait CursorBackend {
    /// Place the cursor at absolute screen coordinates.
    fn move_absolute(&mut self, x: i32, y: i32) -> Result<()>;
    /// Nudge the cursor by an integer delta.
    fn move_relative(&mut self, dx: i32, dy: i32) -> Result<()>;
    /// Report the current cursor position.
    fn read_position(&mut self) -> Result<(i32, i32)>;
    /// Scroll by an integer delta. `by_lines` selects line units over pixel
    /// units where the platform distinguishes them.
    fn scroll(&mut self, dx: i32, dy: i32, by_lines: bool) -> Result<()> {
        let _ = (dx, dy, by_lines);
        tracing::trace!(target: "rig.backend", "scroll unsupported by this backend");
        Ok(())
    }
}

/// Back-end that drives the terminal cursor through crossterm. The concrete
/// stand-in for a platform pointer API in this workspace; coordinates clamp
/// at the screen origin.
#[derive(Debug, Default)]
pub struct TerminalCursorBackend;

impl TerminalCursorBackend {
    pub fn new() -> Self {
        Self
    }
}

impl CursorBackend for TerminalCursorBackend {
    fn move_absolute(&mut self, x: i32, y: i32) -> Result<()> {
        execute!(stdout(), MoveTo(x.max(0) as u16, y.max(0) as u16))?;
        Ok(())
    }

    fn move_relative(&mut self, dx: i32, dy: i32) -> Result<()> {
        let (x, y) = self.read_position()?;
        self.move_absolute(x + dx, y + dy)
    }

    fn read_position(&mut self) -> Result<(i32, i32)> {
        let (x, y) = position()?;
        Ok((i32::from(x), i32::from(y)))
    }

    fn scroll(&mut self, _dx: i32, dy: i32, _by_lines: bool) -> Result<()> {
        if dy > 0 {
            execute!(stdout(), ScrollDown(dy as u16))?;
        } else if dy < 0 {
            execute!(stdout(), ScrollUp((-dy) as u16))?;
        }
        Ok(())
    }
}

/// In-memory back-end tracking a virtual cursor. The default when nothing
/// real is wired up, and the double every test reads its assertions from.
#[derive(Debug, Default)]
pub struct VirtualBackend {
    pub x: i32,
    pub y: i32,
    pub scroll_x: i32,
    pub scroll_y: i32,
    pub absolute_moves: u64,
    pub relative_moves: u64,
}

impl VirtualBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(x: i32, y: i32) -> Self {
        Self { x, y, ..Self::default() }
    }
}

impl CursorBackend for VirtualBackend {
    fn move_absolute(&mut self, x: i32, y: i32) -> Result<()> {
        self.x = x;
        self.y = y;
        self.absolute_moves += 1;
        Ok(())
    }

    fn move_relative(&mut self, dx: i32, dy: i32) -> Result<()> {
        self.x += dx;
        self.y += dy;
        self.relative_moves += 1;
        Ok(())
    }

    fn read_position(&mut self) -> Result<(i32, i32)> {
        Ok((self.x, self.y))
    }

    fn scroll(&mut self, dx: i32, dy: i32, _by_lines: bool) -> Result<()> {
        self.scroll_x += dx;
        self.scroll_y += dy;
        Ok(())
    }
}

/// Cloneable handle over a [`VirtualBackend`]. The registry owns one clone
/// while the embedder (or a test) keeps another to observe the cursor.
/// `Rc` keeps it deliberately single-threaded, matching the engine's
/// threading contract.
#[derive(Clone, Default)]
pub struct SharedVirtualBackend(std::rc::Rc<std::cell::RefCell<VirtualBackend>>);

impl SharedVirtualBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(x: i32, y: i32) -> Self {
        Self(std::rc::Rc::new(std::cell::RefCell::new(VirtualBackend::at(x, y))))
    }

    pub fn pos(&self) -> (i32, i32) {
        let b = self.0.borrow();
        (b.x, b.y)
    }

    pub fn scroll_total(&self) -> (i32, i32) {
        let b = self.0.borrow();
        (b.scroll_x, b.scroll_y)
    }

    pub fn move_counts(&self) -> (u64, u64) {
        let b = self.0.borrow();
        (b.absolute_moves, b.relative_moves)
    }

    /// Reposition out from under the engine, as a user would.
    pub fn user_move(&self, x: i32, y: i32) {
        let mut b = self.0.borrow_mut();
        b.x = x;
        b.y = y;
    }
}

impl CursorBackend for SharedVirtualBackend {
    fn move_absolute(&mut self, x: i32, y: i32) -> Result<()> {
        self.0.borrow_mut().move_absolute(x, y)
    }

    fn move_relative(&mut self, dx: i32, dy: i32) -> Result<()> {
        self.0.borrow_mut().move_relative(dx, dy)
    }

    fn read_position(&mut self) -> Result<(i32, i32)> {
        self.0.borrow_mut().read_position()
    }

    fn scroll(&mut self, dx: i32, dy: i32, by_lines: bool) -> Result<()> {
        self.0.borrow_mut().scroll(dx, dy, by_lines)
    }
}

/// Named back-end registry. One default plus any number of named variants;
/// `resolve` never fails, it falls back to the default for unknown names.
pub struct BackendRegistry {
    default_backend: Box<dyn CursorBackend>,
    named: HashMap<String, Box<dyn CursorBackend>>,
}

impl BackendRegistry {
    pub fn new(default_backend: Box<dyn CursorBackend>) -> Self {
        Self {
            default_backend,
            named: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, backend: Box<dyn CursorBackend>) {
        self.named.insert(name.into(), backend);
    }

    pub fn resolve(&mut self, name: Option<&str>) -> &mut dyn CursorBackend {
        match name {
            Some(n) if self.named.contains_key(n) => self
                .named
                .get_mut(n)
                .expect("checked contains_key")
                .as_mut(),
            Some(n) => {
                tracing::debug!(target: "rig.backend", name = n, "unknown backend, using default");
                self.default_backend.as_mut()
            }
            None => self.default_backend.as_mut(),
        }
    }

    pub fn default_backend(&mut self) -> &mut dyn CursorBackend {
        self.default_backend.as_mut()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new(Box::new(VirtualBackend::new()))
    }
}
