//! Tool invocation boundary

use super::types::{ToolCall, ToolOutput, ToolRegistry};
use crate::error::ToolExecutionError;
use crate::events::StreamEvent;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Channel on which a running tool reports progress events
pub type ProgressSender = mpsc::UnboundedSender<StreamEvent>;

/// Executes tool actions on behalf of the handler
///
/// Progress goes out on `progress` while the call runs; the completion value
/// is the return value. The handler drains both, so implementations never
/// need to smuggle the result through the event channel.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn execute(
        &self,
        tools: &ToolRegistry,
        call: &ToolCall,
        progress: ProgressSender,
    ) -> Result<ToolOutput, ToolExecutionError>;
}
