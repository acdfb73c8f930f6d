//! Runtime helper for spawning delivery loops on dedicated threads.

use crate::observability::{events, fields};
use std::future::Future;
use std::io;
use std::thread;
use tokio::runtime::Builder;
use tracing::{debug, error};

pub(crate) const DEFAULT_DELIVERY_RUNTIME_THREAD_NAME: &str = "exchange-delivery";
const COMPONENT: &str = "worker_runtime";

/// Spawns `run_loop` on a named OS thread driving its own current-thread runtime.
///
/// Thread creation failures are returned; a runtime that cannot be built is logged and
/// ends the thread without running the loop.
pub(crate) fn spawn_delivery_loop<F, Fut>(
    thread_name: String,
    run_loop: F,
) -> io::Result<thread::JoinHandle<()>>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + 'static,
{
    debug!(
        event = events::RUNTIME_SPAWN_START,
        component = COMPONENT,
        worker_thread = thread_name.as_str(),
        "spawning delivery runtime thread"
    );

    let handle = thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!(
                        event = events::RUNTIME_SPAWN_FAILED,
                        component = COMPONENT,
                        worker_thread = fields::current_thread_name_or_default().as_str(),
                        err = %err,
                        "failed to build delivery runtime"
                    );
                    return;
                }
            };

            runtime.block_on(run_loop());
        });

    match &handle {
        Ok(_) => debug!(
            event = events::RUNTIME_SPAWN_OK,
            component = COMPONENT,
            worker_thread = thread_name.as_str(),
            "delivery runtime thread spawned"
        ),
        Err(err) => error!(
            event = events::RUNTIME_SPAWN_FAILED,
            component = COMPONENT,
            worker_thread = thread_name.as_str(),
            err = %err,
            "failed to spawn delivery runtime thread"
        ),
    }

    handle
}

#[cfg(test)]
mod tests {
    use super::spawn_delivery_loop;
    use std::sync::mpsc;

    #[test]
    fn spawned_loop_runs_on_named_thread() {
        let (sender, receiver) = mpsc::channel();

        let handle = spawn_delivery_loop("exchange-test".to_string(), move || async move {
            tokio::task::yield_now().await;
            let _ = sender.send(std::thread::current().name().map(str::to_string));
        })
        .expect("thread should spawn");

        handle.join().expect("loop thread should not panic");
        assert_eq!(
            receiver.recv().expect("loop should report"),
            Some("exchange-test".to_string())
        );
    }
}
