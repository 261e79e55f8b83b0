use serde::{Deserialize, Serialize};
use visnav_core::MotionCommand;

use crate::endpoint::Endpoint;
use crate::transport::Transport;

/// Whether repeated commands are sent again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchPolicy {
    /// Send every command.
    #[default]
    Unconditional,
    /// Skip a command of the same kind as the last one delivered, whatever
    /// its speed. Changes of kind, including into and out of `Stop`, are sent.
    Deduplicated,
}

/// What happened to one command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    Sent,
    Suppressed,
    Failed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    pub sent: u64,
    pub suppressed: u64,
    pub failed: u64,
}

impl DispatchStats {
    fn record(&mut self, outcome: DispatchOutcome) {
        match outcome {
            DispatchOutcome::Sent => self.sent += 1,
            DispatchOutcome::Suppressed => self.suppressed += 1,
            DispatchOutcome::Failed => self.failed += 1,
        }
    }
}

/// Something the control loop can hand commands to.
///
/// Returns the outcome when it is known synchronously, `None` when the
/// command was queued for later delivery.
pub trait CommandSink {
    fn issue(&mut self, command: MotionCommand) -> Option<DispatchOutcome>;
}

impl<S: CommandSink + ?Sized> CommandSink for &mut S {
    fn issue(&mut self, command: MotionCommand) -> Option<DispatchOutcome> {
        (**self).issue(command)
    }
}

/// Turns motion commands into requests and sends them, owning the
/// last-delivered command used for de-duplication.
#[derive(Debug)]
pub struct CommandDispatcher<T> {
    endpoint: Endpoint,
    transport: T,
    policy: DispatchPolicy,
    last_sent: Option<MotionCommand>,
    stats: DispatchStats,
}

impl<T: Transport> CommandDispatcher<T> {
    pub fn new(endpoint: Endpoint, transport: T, policy: DispatchPolicy) -> Self {
        Self {
            endpoint,
            transport,
            policy,
            last_sent: None,
            stats: DispatchStats::default(),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    /// Last command whose requests were all delivered.
    pub fn last_sent(&self) -> Option<MotionCommand> {
        self.last_sent
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Send `command` unless the policy suppresses it.
    ///
    /// Delivery failures are logged and reported as
    /// [`DispatchOutcome::Failed`]; they leave the de-duplication state
    /// untouched so the same command is retried on the next call.
    pub fn dispatch(&mut self, command: MotionCommand) -> DispatchOutcome {
        let outcome = self.deliver(command);
        self.stats.record(outcome);
        outcome
    }

    fn deliver(&mut self, command: MotionCommand) -> DispatchOutcome {
        if self.policy == DispatchPolicy::Deduplicated && self.repeats_last(&command) {
            log::trace!("suppressed repeated {command}");
            return DispatchOutcome::Suppressed;
        }

        for request in self.endpoint.requests(&command) {
            if let Err(err) = self.transport.send(&request) {
                log::warn!("dispatch of {command} failed: {err}");
                return DispatchOutcome::Failed;
            }
        }
        log::info!("sent {command}");
        self.last_sent = Some(command);
        DispatchOutcome::Sent
    }

    fn repeats_last(&self, command: &MotionCommand) -> bool {
        self.last_sent.is_some_and(|last| last.kind == command.kind)
    }
}

impl<T: Transport> CommandSink for CommandDispatcher<T> {
    fn issue(&mut self, command: MotionCommand) -> Option<DispatchOutcome> {
        Some(self.dispatch(command))
    }
}
