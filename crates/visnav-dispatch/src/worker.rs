//! Background dispatch so network latency never stalls frame acquisition.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use visnav_core::{LatestSlot, MotionCommand};

use crate::dispatcher::{CommandDispatcher, CommandSink, DispatchOutcome, DispatchStats};
use crate::transport::Transport;

/// Owns a [`CommandDispatcher`] on its own thread.
///
/// Commands are handed over through a single slot: a command not yet picked
/// up is replaced by a newer one, so at most one request sequence is in
/// flight and commands are never reordered.
pub struct DispatchWorker {
    slot: Arc<LatestSlot<MotionCommand>>,
    handle: Option<JoinHandle<DispatchStats>>,
}

impl DispatchWorker {
    pub fn spawn<T>(mut dispatcher: CommandDispatcher<T>) -> std::io::Result<Self>
    where
        T: Transport + Send + 'static,
    {
        let slot = Arc::new(LatestSlot::new());
        let rx = Arc::clone(&slot);
        let handle = thread::Builder::new()
            .name("visnav-dispatch".into())
            .spawn(move || {
                while let Some(command) = rx.wait_take() {
                    dispatcher.dispatch(command);
                }
                dispatcher.stats()
            })?;
        Ok(Self {
            slot,
            handle: Some(handle),
        })
    }

    /// Queue `command` without blocking. Returns `true` if it superseded a
    /// command that had not been sent yet.
    pub fn submit(&self, command: MotionCommand) -> bool {
        let superseded = self.slot.put(command);
        if superseded {
            log::debug!("pending command superseded by {command}");
        }
        superseded
    }

    /// Number of commands replaced before the worker picked them up.
    pub fn superseded(&self) -> u64 {
        self.slot.dropped()
    }

    /// Queue `final_command` (if any), drain, and join the worker thread.
    pub fn shutdown(mut self, final_command: Option<MotionCommand>) -> DispatchStats {
        if let Some(command) = final_command {
            self.submit(command);
        }
        self.join()
    }

    fn join(&mut self) -> DispatchStats {
        self.slot.close();
        match self.handle.take().map(JoinHandle::join) {
            Some(Ok(stats)) => stats,
            Some(Err(_)) => {
                log::error!("dispatch thread panicked");
                DispatchStats::default()
            }
            None => DispatchStats::default(),
        }
    }
}

impl CommandSink for DispatchWorker {
    fn issue(&mut self, command: MotionCommand) -> Option<DispatchOutcome> {
        self.submit(command);
        None
    }
}

impl Drop for DispatchWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.join();
        }
    }
}
