//! Captures where a recovered panic was raised.
//!
//! Rust hands `catch_unwind` only the payload, so the location has to be
//! taken from inside the panic hook, on the panicking thread, before
//! unwinding starts. A process-wide hook is installed once and chains to
//! whatever hook was there before. While the current thread is inside
//! [`catch`] it records the site and logs the panic at debug level instead of
//! printing it; everywhere else it defers to the previous hook. [`Abort`]
//! payloads are never printed.
//!
//! A recorded site is only handed back if its message matches the payload
//! `catch` received. A panic the handler caught itself, followed by
//! `resume_unwind` (which skips the hook), therefore yields no site.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Once;

use backtrace::Backtrace;
use tracing::debug;

use crate::handler::Abort;

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
    static WANT_FRAMES: Cell<bool> = const { Cell::new(false) };
    static LAST_SITE: RefCell<Option<PanicSite>> = const { RefCell::new(None) };
}

static INSTALL_HOOK: Once = Once::new();

/// A panic caught by [`catch`].
pub(crate) struct Caught {
    pub payload: Box<dyn Any + Send>,
    pub site: Option<PanicSite>,
}

/// Where a panic was raised.
pub(crate) struct PanicSite {
    message: String,
    file: String,
    line: u32,
    frames: Option<Backtrace>,
}

impl PanicSite {
    /// Source position `offset` frames outward from the panicking function.
    ///
    /// Offset 0 is the `panic!` call itself. Larger offsets walk the captured
    /// backtrace, counting only frames with file and line information, and
    /// starting from the frame that matches the panic location. File names
    /// come from the backtrace whenever one was captured, so every offset
    /// reports the same path form; without one only offset 0 resolves, to
    /// the path the compiler recorded.
    pub fn frame(&mut self, offset: usize) -> Option<(String, u32)> {
        let Some(bt) = self.frames.as_mut() else {
            return (offset == 0).then(|| (self.file.clone(), self.line));
        };
        bt.resolve();

        let located = bt
            .frames()
            .iter()
            .flat_map(|frame| frame.symbols())
            .filter_map(|sym| Some((sym.filename()?, sym.lineno()?)));

        let site = Path::new(&self.file);
        let mut outward = located.skip_while(|(file, line)| !(file.ends_with(site) && *line == self.line));
        match outward.nth(offset) {
            Some((file, line)) => Some((file.display().to_string(), line)),
            None if offset == 0 => Some((self.file.clone(), self.line)),
            None => None,
        }
    }
}

/// Runs `f`, catching any panic it raises along with its site.
///
/// `frames` asks the hook to also capture a backtrace, needed for offsets
/// past the panicking function and for full file paths.
pub(crate) fn catch<R>(frames: bool, f: impl FnOnce() -> R) -> Result<R, Caught> {
    INSTALL_HOOK.call_once(install_hook);

    let _scope = Scope::enter(frames);
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let site = LAST_SITE
            .with(|s| s.borrow_mut().take())
            .filter(|site| site.message == message(payload.as_ref()));
        Caught { payload, site }
    })
}

/// Human-readable panic payload, `Box<dyn Any>` for non-string payloads.
pub(crate) fn message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else if payload.is::<Abort>() {
        "abort"
    } else {
        "Box<dyn Any>"
    }
}

fn install_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if info.payload().is::<Abort>() {
            return;
        }
        if DEPTH.with(Cell::get) == 0 {
            previous(info);
            return;
        }
        let message = message(info.payload()).to_owned();
        match info.location() {
            Some(loc) => debug!(panic = %message, location = %loc, "panic inside recovery scope"),
            None => debug!(panic = %message, "panic inside recovery scope"),
        }
        let site = info.location().map(|loc| PanicSite {
            message,
            file: loc.file().to_owned(),
            line: loc.line(),
            frames: WANT_FRAMES.with(Cell::get).then(Backtrace::new_unresolved),
        });
        LAST_SITE.with(|s| *s.borrow_mut() = site);
    }));
}

/// Marks the current thread as inside [`catch`] until dropped.
struct Scope {
    prev_frames: bool,
}

impl Scope {
    fn enter(frames: bool) -> Self {
        DEPTH.with(|d| d.set(d.get() + 1));
        LAST_SITE.with(|s| s.borrow_mut().take());
        let prev_frames = WANT_FRAMES.with(|w| w.replace(frames));
        Self { prev_frames }
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        DEPTH.with(|d| d.set(d.get() - 1));
        WANT_FRAMES.with(|w| w.set(self.prev_frames));
    }
}
