//! Runtime integration layer.
//!
//! Keeps task spawning and listener-to-loop plumbing in one place so the correlation and plugin
//! layers never touch `tokio::spawn` directly.

pub(crate) mod listener_queue;
pub(crate) mod task_supervisor;
