//! Interaction layer: talks to the assistant CLI.
//!
//! - [`invocation`] builds the argument list for one turn
//! - [`protocol`] decodes the `stream-json` output
//! - [`claude_code`] spawns the process and drives a turn end to end

pub mod claude_code;
pub mod invocation;
pub mod protocol;

pub use claude_code::ClaudeCodeExecutor;
pub use invocation::build_invocation;
pub use protocol::{StreamAccumulator, StreamEvent};
