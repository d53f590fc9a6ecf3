//! Tool calls: types, streaming accumulation and the invocation boundary

pub mod accumulator;
pub mod invoker;
pub mod types;

pub use accumulator::ToolCallAccumulator;
pub use invoker::{ProgressSender, ToolInvoker};
pub use types::{
    ToolCall, ToolCallRecord, ToolCallStatus, ToolOutput, ToolRegistry, ToolSpec, stringify_result,
};
