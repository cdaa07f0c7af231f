// src/serve/mod.rs

//! The `serve` task: app-server supervision plus a live-reload proxy.

pub mod events;
pub mod livereload;
pub mod proxy;
pub mod readiness;
pub mod session;
pub mod supervisor;

pub use events::{PushKind, ServeEvent};
pub use livereload::{LiveReloadHub, ReloadMessage};
pub use session::run_serve;
pub use supervisor::Supervisor;
