//! Delivery of motion commands to the robot's HTTP control endpoint.
//!
//! [`Endpoint`] turns a [`MotionCommand`](visnav_core::MotionCommand) into
//! the GET requests the firmware expects, a [`Transport`] delivers them, and
//! [`CommandDispatcher`] applies the de-duplication policy. Wrap the
//! dispatcher in a [`DispatchWorker`] to keep HTTP off the capture thread.

mod dispatcher;
mod endpoint;
mod transport;
mod worker;

pub use dispatcher::{
    CommandDispatcher, CommandSink, DispatchOutcome, DispatchPolicy, DispatchStats,
};
pub use endpoint::{CommandRequest, Endpoint, DEFAULT_BASE};
pub use transport::{HttpTransport, Transport, TransportError};
pub use worker::DispatchWorker;
