//! Execution sandbox
//!
//! Runs the buffer's text in a fresh PadScript interpreter while the
//! console channel is redirected into an [`OutputLog`]. The script sees
//! only the builtin globals. Faults of every kind, panics included, end up
//! as one `Error: ...` entry after whatever was printed before the fault.
//!
//! This is containment, not isolation: scripts run in-process with the
//! playground's privileges.

use crate::editor::BufferSnapshot;
use padscript::console::{self, ConsoleSink};
use padscript::{Interpreter, RunOptions};
use std::any::Any;
use std::cell::{Cell, Ref, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::Once;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Called after each entry is appended, with the log as it now stands
pub type UpdateHook = Rc<dyn Fn(&OutputLog)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Output,
    Fault,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEntry {
    pub kind: EntryKind,
    pub text: String,
}

/// Captured output of the most recent run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputLog {
    entries: Vec<OutputEntry>,
    revision: u64,
}

impl OutputLog {
    pub fn entries(&self) -> &[OutputEntry] {
        &self.entries
    }

    pub fn lines(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.text.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The fault entry, if the last run failed
    pub fn fault(&self) -> Option<&OutputEntry> {
        self.entries.iter().find(|e| e.kind == EntryKind::Fault)
    }

    /// Bumped on every change; lets renderers notice new output
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.revision += 1;
    }

    fn push(&mut self, kind: EntryKind, text: String) {
        self.entries.push(OutputEntry { kind, text });
        self.revision += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxState {
    Idle,
    Running,
    Completed,
    Failed,
}

impl SandboxState {
    pub fn name(self) -> &'static str {
        match self {
            SandboxState::Idle => "idle",
            SandboxState::Running => "running",
            SandboxState::Completed => "ok",
            SandboxState::Failed => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed {
        lines: usize,
        elapsed: Duration,
    },
    Failed {
        message: String,
        /// (line, column) for syntax errors
        position: Option<(usize, usize)>,
        elapsed: Duration,
    },
}

/// Appends to the sandbox's log and announces each entry
struct CaptureSink {
    log: Rc<RefCell<OutputLog>>,
    hook: Option<UpdateHook>,
}

impl CaptureSink {
    fn append(&self, kind: EntryKind, text: String) {
        self.log.borrow_mut().push(kind, text);
        if let Some(hook) = &self.hook {
            hook(&self.log.borrow());
        }
    }
}

impl ConsoleSink for CaptureSink {
    fn write_line(&self, line: &str) {
        self.append(EntryKind::Output, line.to_string());
    }
}

pub struct Sandbox {
    options: RunOptions,
    log: Rc<RefCell<OutputLog>>,
    state: SandboxState,
    hook: Option<UpdateHook>,
    runs: u64,
}

impl Sandbox {
    pub fn new(options: RunOptions) -> Self {
        Self {
            options,
            log: Rc::new(RefCell::new(OutputLog::default())),
            state: SandboxState::Idle,
            hook: None,
            runs: 0,
        }
    }

    pub fn set_update_hook(&mut self, hook: UpdateHook) {
        self.hook = Some(hook);
    }

    pub fn log(&self) -> Ref<'_, OutputLog> {
        self.log.borrow()
    }

    pub fn state(&self) -> SandboxState {
        self.state
    }

    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Execute `snapshot` and capture its output
    pub fn run(&mut self, snapshot: &BufferSnapshot) -> RunOutcome {
        self.log.borrow_mut().clear();
        self.state = SandboxState::Running;
        self.runs += 1;
        let started = Instant::now();
        let source = snapshot.text();
        debug!(run = self.runs, bytes = source.len(), "running buffer");

        let sink = Rc::new(CaptureSink {
            log: Rc::clone(&self.log),
            hook: self.hook.clone(),
        });
        let options = self.options;
        let result = {
            let _guard = console::install(sink.clone());
            let _quiet = QuietPanics::install();
            panic::catch_unwind(AssertUnwindSafe(|| {
                Interpreter::new(options).run(&source)
            }))
        };

        let elapsed = started.elapsed();
        let failure = match result {
            Ok(Ok(_)) => None,
            Ok(Err(error)) => Some((error.message(), error.position())),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(%message, "interpreter panicked");
                Some((message, None))
            }
        };

        match failure {
            None => {
                self.state = SandboxState::Completed;
                let lines = self.log.borrow().len();
                debug!(lines, ?elapsed, "run completed");
                RunOutcome::Completed { lines, elapsed }
            }
            Some((message, position)) => {
                self.state = SandboxState::Failed;
                sink.append(EntryKind::Fault, format!("Error: {}", message));
                debug!(%message, ?elapsed, "run failed");
                RunOutcome::Failed {
                    message,
                    position,
                    elapsed,
                }
            }
        }
    }
}

thread_local! {
    static QUIET: Cell<bool> = const { Cell::new(false) };
}

/// Keeps panics on this thread off the terminal while alive. They are
/// logged at debug level instead; other threads keep the previous hook.
struct QuietPanics {
    was_quiet: bool,
}

impl QuietPanics {
    fn install() -> Self {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let previous = panic::take_hook();
            panic::set_hook(Box::new(move |info| {
                if QUIET.get() {
                    debug!(%info, "panic during run");
                } else {
                    previous(info);
                }
            }));
        });
        Self {
            was_quiet: QUIET.replace(true),
        }
    }

    #[cfg(test)]
    fn active() -> bool {
        QUIET.get()
    }
}

impl Drop for QuietPanics {
    fn drop(&mut self) {
        QUIET.set(self.was_quiet);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "interpreter panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use padscript::console::BufferedConsole;

    fn run(source: &str) -> (Vec<String>, RunOutcome) {
        let mut sandbox = Sandbox::new(RunOptions::default());
        let outcome = sandbox.run(&BufferSnapshot::from_text(source));
        let lines = sandbox.log().lines().into_iter().map(String::from).collect();
        (lines, outcome)
    }

    #[test]
    fn test_captures_in_order() {
        let (lines, outcome) = run("console.log('a'); console.log('b')");
        assert_eq!(lines, vec!["a", "b"]);
        assert!(matches!(outcome, RunOutcome::Completed { lines: 2, .. }));
    }

    #[test]
    fn test_thrown_error_becomes_fault_entry() {
        let (lines, outcome) = run("throw new Error('boom')");
        assert_eq!(lines, vec!["Error: boom"]);
        assert!(matches!(outcome, RunOutcome::Failed { ref message, .. } if message == "boom"));
    }

    #[test]
    fn test_output_before_fault_kept() {
        let (lines, _) = run("console.log('x'); throw new Error('y')");
        assert_eq!(lines, vec!["x", "Error: y"]);
    }

    #[test]
    fn test_thrown_string() {
        let (lines, _) = run("throw 'plain'");
        assert_eq!(lines, vec!["Error: plain"]);
    }

    #[test]
    fn test_syntax_error_position() {
        let mut sandbox = Sandbox::new(RunOptions::default());
        let outcome = sandbox.run(&BufferSnapshot::from_text("let x = ;"));
        assert_eq!(sandbox.state(), SandboxState::Failed);
        assert!(matches!(
            outcome,
            RunOutcome::Failed {
                position: Some((1, 9)),
                ..
            }
        ));
        assert_eq!(sandbox.log().len(), 1);
        assert!(sandbox.log().fault().is_some());
    }

    #[test]
    fn test_log_cleared_between_runs() {
        let mut sandbox = Sandbox::new(RunOptions::default());
        sandbox.run(&BufferSnapshot::from_text("console.log(1)"));
        sandbox.run(&BufferSnapshot::from_text("console.log(2)"));
        assert_eq!(sandbox.log().lines(), vec!["2"]);
        assert_eq!(sandbox.runs(), 2);
        assert_eq!(sandbox.state(), SandboxState::Completed);
    }

    #[test]
    fn test_identical_runs_identical_logs() {
        let source = "let s = 0\nfor (let i = 0; i < 5; i++) { s += i; console.log(s) }";
        let mut sandbox = Sandbox::new(RunOptions::default());
        let snapshot = BufferSnapshot::from_text(source);
        sandbox.run(&snapshot);
        let first = sandbox.log().clone();
        sandbox.run(&snapshot);
        assert_eq!(first.entries(), sandbox.log().entries());
    }

    #[test]
    fn test_console_restored_after_run() {
        let host = Rc::new(BufferedConsole::new());
        let _guard = console::install(host.clone());

        let mut sandbox = Sandbox::new(RunOptions::default());
        sandbox.run(&BufferSnapshot::from_text("console.log('inside')"));
        sandbox.run(&BufferSnapshot::from_text("console.log('x'); null.y"));
        console::emit("outside");

        assert_eq!(host.lines(), vec!["outside".to_string()]);
        assert_eq!(
            sandbox.log().lines(),
            vec!["x", "Error: Cannot read properties of null (reading 'y')"]
        );
    }

    #[test]
    fn test_update_hook_sees_each_line_already_logged() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let recorder = seen.clone();
        let mut sandbox = Sandbox::new(RunOptions::default());
        sandbox.set_update_hook(Rc::new(move |log: &OutputLog| {
            let last = log.lines().last().map(|l| l.to_string());
            recorder.borrow_mut().push((log.len(), last));
        }));
        sandbox.run(&BufferSnapshot::from_text("for (const c of 'abc') console.log(c)"));
        assert_eq!(
            *seen.borrow(),
            vec![
                (1, Some("a".to_string())),
                (2, Some("b".to_string())),
                (3, Some("c".to_string())),
            ]
        );
    }

    #[test]
    fn test_update_hook_announces_fault_entry() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let mut sandbox = Sandbox::new(RunOptions::default());
        sandbox.set_update_hook(Rc::new(move |log: &OutputLog| {
            counter.set(counter.get() + 1);
            assert_eq!(log.len(), counter.get());
        }));
        sandbox.run(&BufferSnapshot::from_text("console.log(1); throw 'x'"));
        assert_eq!(calls.get(), 2);
        assert!(sandbox.log().fault().is_some());
    }

    #[test]
    fn test_runaway_string_contained() {
        let (lines, outcome) = run("let s = 'x'\nfor (let i = 0; i < 40; i++) s += s");
        assert_eq!(lines, vec!["Error: Invalid string length"]);
        assert!(matches!(outcome, RunOutcome::Failed { .. }));
    }

    #[test]
    fn test_deep_nesting_contained() {
        let depth = 20_000;
        let source = format!("console.log({}1{})", "[".repeat(depth), "]".repeat(depth));
        let (lines, outcome) = run(&source);
        assert_eq!(lines, vec!["Error: Maximum nesting depth exceeded"]);
        assert!(matches!(
            outcome,
            RunOutcome::Failed {
                position: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn test_quiet_panics_scoped_to_guard() {
        assert!(!QuietPanics::active());
        {
            let _outer = QuietPanics::install();
            assert!(QuietPanics::active());
            {
                let _inner = QuietPanics::install();
                let caught = panic::catch_unwind(|| {
                    if QuietPanics::active() {
                        panic!("hidden");
                    }
                });
                assert!(caught.is_err());
            }
            assert!(QuietPanics::active());
        }
        assert!(!QuietPanics::active());
    }

    #[test]
    fn test_step_limit_contained() {
        let mut sandbox = Sandbox::new(RunOptions {
            step_limit: 1_000,
            ..RunOptions::default()
        });
        sandbox.run(&BufferSnapshot::from_text("while (true) {}"));
        assert_eq!(
            sandbox.log().lines(),
            vec!["Error: Execution step limit exceeded (1000 steps)"]
        );
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42), "interpreter panicked");
    }
}
