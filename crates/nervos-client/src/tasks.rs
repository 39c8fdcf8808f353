//! Supervision for long-running background loops.
//!
//! A panic inside a loop is caught at the task boundary, recorded on the
//! [`Context`] as a user-visible error and the loop is started again.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::state::Context;

/// Pause before restarting a loop that panicked.
pub const RESTART_DELAY: Duration = Duration::from_millis(500);

/// Spawn `make_loop()` and keep it running across panics. The task ends when
/// the loop returns normally or the handle is aborted.
pub fn spawn_supervised<F, Fut>(name: &'static str, ctx: Context, make_loop: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match AssertUnwindSafe(make_loop()).catch_unwind().await {
                Ok(()) => {
                    debug!(task = name, "Background task finished");
                    return;
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(task = name, panic = %message, "Background task panicked, restarting");
                    ctx.record_error(format!("{name}: panic: {message}"));
                    tokio::time::sleep(RESTART_DELAY).await;
                }
            }
        }
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
