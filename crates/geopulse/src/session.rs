/// Boundary to the external speech/AI session.
///
/// The real transport (websocket session protocol) lives outside this
/// repository; the adapter only needs somewhere to push system
/// instructions.
pub trait SessionSink: Send {
    fn send_context(&mut self, instruction: &str);
}

/// Sink that logs forwarded instructions; the default when no external
/// session is wired up.
#[derive(Debug, Default)]
pub struct LoggingSession {
    sent: u64,
}

impl LoggingSession {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionSink for LoggingSession {
    fn send_context(&mut self, instruction: &str) {
        self.sent += 1;
        tracing::info!(n = self.sent, %instruction, "context forwarded to session");
    }
}
