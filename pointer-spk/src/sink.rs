//! Speech sink capability used by the pipeline

use std::time::Duration;

/// Fire-and-forget speech output.
///
/// Callable from any thread, including non-async pipeline roles.
pub trait SpeechSink: Send + Sync {
    /// Queue `text` to be spoken; never blocks on vocalization
    fn speak(&self, text: &str);

    /// Block until everything queued so far has been spoken or `timeout`
    /// elapsed. Returns `true` when the sink is idle.
    fn wait_idle(&self, timeout: Duration) -> bool;
}
