//! Function calling: tool declarations, dispatch, and the chat loop.

mod calling;
mod registry;

pub use calling::{FunctionCalling, ToolChatResult, DEFAULT_MAX_ROUNDS};
pub use registry::{evaluate_equation, ToolError, ToolRegistry};
