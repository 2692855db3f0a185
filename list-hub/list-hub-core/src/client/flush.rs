//! Save-on-unload.
//!
//! When the view goes away the client gets one chance to push its full
//! state. The push is advisory and at-most-once per adopted state: it is
//! never awaited by the caller and a lost write is tolerated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::remote::ApiClient;
use crate::model::Document;

pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleSignal {
    Hidden,
    Teardown,
}

/// How a flush attempt left the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushDispatch {
    /// Detached task on the running runtime.
    Spawned,
    /// No runtime available; handed to a short-lived background thread.
    Thread,
    /// Already flushed this state, or the attempt could not be started.
    Skipped,
}

#[derive(Default)]
pub struct UnloadFlush {
    sent: AtomicBool,
}

impl UnloadFlush {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_spent(&self) -> bool {
        self.sent.load(Ordering::SeqCst)
    }

    /// Allow one more flush; called whenever the owner adopts new state.
    pub fn rearm(&self) {
        self.sent.store(false, Ordering::SeqCst);
    }

    pub fn fire(&self, api: &ApiClient, doc: Document, signal: LifecycleSignal) -> FlushDispatch {
        if self.sent.swap(true, Ordering::SeqCst) {
            debug!("state already flushed, ignoring {:?}", signal);
            return FlushDispatch::Skipped;
        }
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(push(api.clone(), doc, signal));
                FlushDispatch::Spawned
            }
            Err(_) => {
                let api = api.detached();
                let spawned = std::thread::Builder::new()
                    .name("list-hub-flush".to_string())
                    .spawn(move || {
                        match tokio::runtime::Builder::new_current_thread()
                            .enable_all()
                            .build()
                        {
                            Ok(rt) => rt.block_on(push(api, doc, signal)),
                            Err(err) => warn!("no runtime for final save: {}", err),
                        }
                    });
                match spawned {
                    Ok(_) => FlushDispatch::Thread,
                    Err(err) => {
                        warn!("could not start final save: {}", err);
                        FlushDispatch::Skipped
                    }
                }
            }
        }
    }
}

async fn push(api: ApiClient, doc: Document, signal: LifecycleSignal) {
    match tokio::time::timeout(FLUSH_TIMEOUT, api.save_all(&doc)).await {
        Ok(Ok(saved)) => debug!(
            "flushed {} folders on {:?}",
            saved.folders.len(),
            signal
        ),
        Ok(Err(err)) => warn!("final save on {:?} failed: {}", signal, err),
        Err(_) => warn!("final save on {:?} timed out", signal),
    }
}
