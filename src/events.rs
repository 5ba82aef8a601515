use serde::{Deserialize, Serialize};

/// One unit of progress streamed to the client for a generation task.
/// The worker enqueues `Log`/`Result`/`Error`; `Done` is appended by the
/// streaming layer once the queue has drained.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TaskEvent {
    Log { line: String },
    Result { test_code: String },
    Error { message: String },
    Done,
}
