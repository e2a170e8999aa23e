//! PadScript
//!
//! A small, JavaScript-flavoured scripting language interpreted in-process.
//! Scripts see only the builtin globals; `console.log` output goes to the
//! thread's [`console`] channel so a host can capture it.
//!
//! ```
//! use padscript::{Interpreter, RunOptions, console};
//! use std::rc::Rc;
//!
//! let sink = Rc::new(console::BufferedConsole::new());
//! {
//!     let _guard = console::install(sink.clone());
//!     Interpreter::new(RunOptions::default())
//!         .run("console.log('hello', 1 + 1)")
//!         .unwrap();
//! }
//! assert_eq!(sink.lines(), vec!["hello 2".to_string()]);
//! ```

pub mod ast;
mod builtins;
pub mod console;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod value;

pub use error::{ErrorKind, ScriptError};
pub use interpreter::{DEFAULT_MAX_CALL_DEPTH, DEFAULT_STEP_LIMIT, Interpreter, RunOptions};
pub use value::Value;

/// Run `source` in a fresh interpreter
pub fn run(source: &str, options: RunOptions) -> Result<Value, ScriptError> {
    Interpreter::new(options).run(source)
}
