//! Named worker threads, each driving one monitor future.
//!
//! Every long-running loop (power pulse, coin tick, transport) gets its own
//! OS thread so a blocking pin write or socket read in one subsystem never
//! stalls another. Futures run on a per-thread `edge_executor`.

use core::future::Future;
use std::thread::JoinHandle;

use edge_executor::LocalExecutor;

use crate::error::{Error, Result};

/// Spawn `f` on a named thread with an explicit stack size.
pub fn spawn_named<T, F>(name: &'static str, stack_kb: usize, f: F) -> Result<JoinHandle<T>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    log::info!("Spawning '{}' (stack={}KB)", name, stack_kb);
    std::thread::Builder::new()
        .name(name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
        .map_err(|_| Error::Init("worker thread creation failed"))
}

/// Drive `fut` to completion on a fresh local executor on this thread.
pub fn block_on_local<F: Future>(fut: F) -> F::Output {
    let ex: LocalExecutor<'_, 8> = LocalExecutor::new();
    futures_lite::future::block_on(ex.run(fut))
}
