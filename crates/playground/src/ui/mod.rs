//! UI components for the playground
//!
//! These modules handle rendering of the split-pane interface.

pub mod console_pane;
pub mod editor_pane;
pub mod help;
pub mod highlight;
pub mod layout;
