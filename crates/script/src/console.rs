//! The console channel
//!
//! `console.log` writes to whatever sink is currently installed on this
//! thread. By default that is [`HostConsole`], which forwards to `tracing`.
//! A caller that wants to capture output installs its own sink and keeps the
//! returned [`ConsoleGuard`] alive for as long as the capture should last.

use std::cell::RefCell;
use std::rc::Rc;

/// Receives one line per `console.log` call
pub trait ConsoleSink {
    fn write_line(&self, line: &str);
}

/// Default sink: the host log
#[derive(Debug, Default, Clone, Copy)]
pub struct HostConsole;

impl ConsoleSink for HostConsole {
    fn write_line(&self, line: &str) {
        tracing::info!(target: "padscript::console", "{}", line);
    }
}

/// Sink that collects lines in memory
#[derive(Debug, Default)]
pub struct BufferedConsole {
    lines: RefCell<Vec<String>>,
}

impl BufferedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.borrow_mut())
    }
}

impl ConsoleSink for BufferedConsole {
    fn write_line(&self, line: &str) {
        self.lines.borrow_mut().push(line.to_string());
    }
}

thread_local! {
    static CHANNEL: RefCell<Rc<dyn ConsoleSink>> = RefCell::new(Rc::new(HostConsole));
}

/// Restores the previously installed sink when dropped.
///
/// Guards nest: drop them in reverse order of installation.
#[must_use = "the sink is uninstalled as soon as the guard is dropped"]
pub struct ConsoleGuard {
    previous: Option<Rc<dyn ConsoleSink>>,
}

impl Drop for ConsoleGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            CHANNEL.with(|channel| *channel.borrow_mut() = previous);
        }
    }
}

/// Make `sink` the current console channel for this thread
pub fn install(sink: Rc<dyn ConsoleSink>) -> ConsoleGuard {
    let previous = CHANNEL.with(|channel| channel.replace(sink));
    ConsoleGuard {
        previous: Some(previous),
    }
}

/// Write one line to the current sink
pub fn emit(line: &str) {
    // Clone out of the slot so a sink may itself install or emit
    let sink = CHANNEL.with(|channel| Rc::clone(&channel.borrow()));
    sink.write_line(line);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_captures_and_guard_restores() {
        let outer = Rc::new(BufferedConsole::new());
        let _outer_guard = install(outer.clone());

        let inner = Rc::new(BufferedConsole::new());
        {
            let _guard = install(inner.clone());
            emit("captured");
        }
        emit("after");

        assert_eq!(inner.lines(), vec!["captured".to_string()]);
        assert_eq!(outer.lines(), vec!["after".to_string()]);
    }

    #[test]
    fn test_nested_guards_unwind_in_order() {
        let base = Rc::new(BufferedConsole::new());
        let _base_guard = install(base.clone());

        let first = Rc::new(BufferedConsole::new());
        let second = Rc::new(BufferedConsole::new());
        let g1 = install(first.clone());
        let g2 = install(second.clone());
        emit("two");
        drop(g2);
        emit("one");
        drop(g1);
        emit("zero");

        assert_eq!(second.take(), vec!["two".to_string()]);
        assert_eq!(first.take(), vec!["one".to_string()]);
        assert_eq!(base.take(), vec!["zero".to_string()]);
    }

    #[test]
    fn test_guard_restores_on_panic() {
        let base = Rc::new(BufferedConsole::new());
        let _base_guard = install(base.clone());

        let result = std::panic::catch_unwind(|| {
            let sink = Rc::new(BufferedConsole::new());
            let _guard = install(sink);
            panic!("boom");
        });
        assert!(result.is_err());

        emit("restored");
        assert_eq!(base.lines(), vec!["restored".to_string()]);
    }
}
