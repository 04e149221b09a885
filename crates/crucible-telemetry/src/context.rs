//! Invocation context for correlating the phases of one request.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which service operation an invocation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationKind {
    /// Compile a complete unit, run nothing.
    CompileOnly,
    /// Wrap a snippet, compile it and run it in a fresh runtime.
    CompileAndRun,
}

impl fmt::Display for InvocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CompileOnly => "compile_only",
            Self::CompileAndRun => "compile_and_run",
        })
    }
}

/// Correlation data carried through one compile or run request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationContext {
    /// Unique invocation identifier.
    pub invocation_id: Uuid,
    /// Operation being performed.
    pub kind: InvocationKind,
    /// Front end that issued the request (e.g. `cli`).
    pub source: String,
    /// When the invocation started.
    pub started_at: DateTime<Utc>,
    /// Additional metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl InvocationContext {
    /// Create a context for a new invocation.
    #[must_use]
    pub fn new(kind: InvocationKind, source: impl Into<String>) -> Self {
        Self {
            invocation_id: Uuid::new_v4(),
            kind,
            source: source.into(),
            started_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// Add metadata.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Milliseconds since the invocation started.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
    }

    /// First eight characters of the invocation id, for log lines.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.invocation_id.simple().to_string().chars().take(8).collect()
    }

    /// A tracing span carrying this context.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "invocation",
            id = %self.short_id(),
            kind = %self.kind,
            source = %self.source,
        )
    }

    /// Enter the context's span until the returned guard is dropped.
    #[must_use]
    pub fn enter(self) -> InvocationGuard {
        InvocationGuard::new(self)
    }
}

/// Keeps an invocation span entered and logs completion on drop.
pub struct InvocationGuard {
    context: InvocationContext,
    _span: tracing::span::EnteredSpan,
}

impl InvocationGuard {
    /// Enter the span for `context`.
    #[must_use]
    pub fn new(context: InvocationContext) -> Self {
        let span = context.span().entered();
        tracing::debug!("invocation started");
        Self {
            context,
            _span: span,
        }
    }

    /// The guarded context.
    #[must_use]
    pub fn context(&self) -> &InvocationContext {
        &self.context
    }
}

impl Drop for InvocationGuard {
    fn drop(&mut self) {
        tracing::debug!(elapsed_ms = self.context.elapsed_ms(), "invocation finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_creation() {
        let ctx = InvocationContext::new(InvocationKind::CompileOnly, "cli");
        assert_eq!(ctx.source, "cli");
        assert_eq!(ctx.kind, InvocationKind::CompileOnly);
        assert!(ctx.metadata.is_empty());
    }

    #[test]
    fn test_contexts_are_unique() {
        let a = InvocationContext::new(InvocationKind::CompileAndRun, "cli");
        let b = InvocationContext::new(InvocationKind::CompileAndRun, "cli");
        assert_ne!(a.invocation_id, b.invocation_id);
    }

    #[test]
    fn test_short_id() {
        let ctx = InvocationContext::new(InvocationKind::CompileAndRun, "test");
        assert_eq!(ctx.short_id().len(), 8);
    }

    #[test]
    fn test_elapsed() {
        let ctx = InvocationContext::new(InvocationKind::CompileAndRun, "test");
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(ctx.elapsed_ms() >= 10);
    }

    #[test]
    fn test_serialization() {
        let ctx = InvocationContext::new(InvocationKind::CompileAndRun, "test")
            .with_metadata("snippet_bytes", "24");
        let json = serde_json::to_string(&ctx).unwrap();
        assert!(json.contains("\"kind\":\"compile_and_run\""));

        let parsed: InvocationContext = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.metadata.get("snippet_bytes"), Some(&"24".to_string()));
    }

    #[test]
    fn test_guard_exposes_context() {
        let guard = InvocationContext::new(InvocationKind::CompileOnly, "test").enter();
        assert_eq!(guard.context().kind, InvocationKind::CompileOnly);
    }
}
