//! Fiducial marker detection for vision-guided navigation.
//!
//! A [`PayloadDecoder`] finds symbols and their payloads; the payload text
//! decides the marker's role (`"car"` → robot, `"target"` → target), and
//! [`FiducialDetector::detect`] reduces a frame to one robot and one target.

mod classify;
mod decoder;
mod detector;

pub use classify::{classify_payload, resolve_markers};
pub use decoder::{DecodedSymbol, PayloadDecoder, QrDecoder};
pub use detector::FiducialDetector;
