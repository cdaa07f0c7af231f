// src/serve/events.rs

use std::path::PathBuf;

/// How a changed output reached the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushKind {
    Inject,
    Reload,
}

/// Lifecycle of a serve session, in order: `Started`, then any number of
/// `Restarted` / `AssetPushed`, and at most one final `Crashed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServeEvent {
    Started,
    Restarted { changed: PathBuf },
    AssetPushed { path: String, kind: PushKind },
    Crashed { code: Option<i32> },
}
