use image::GrayImage;
use visnav_core::{BoundingBox, MarkerDetection, MarkerPair};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::classify::{classify_payload, resolve_markers};
use crate::decoder::{DecodedSymbol, PayloadDecoder, QrDecoder};

/// Locates the robot and target markers in a frame.
///
/// Stateless: every call scans the frame from scratch.
#[derive(Clone, Debug, Default)]
pub struct FiducialDetector<D = QrDecoder> {
    decoder: D,
}

impl<D: PayloadDecoder> FiducialDetector<D> {
    pub fn new(decoder: D) -> Self {
        Self { decoder }
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Every decoded symbol, classified, in decoder order.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, image), fields(width = image.width(), height = image.height()))
    )]
    pub fn detect_all(&self, image: &GrayImage) -> Vec<MarkerDetection> {
        self.decoder
            .decode(image)
            .into_iter()
            .map(to_detection)
            .collect()
    }

    /// Robot and target markers of this frame; either may be missing.
    pub fn detect(&self, image: &GrayImage) -> MarkerPair {
        let pair = resolve_markers(self.detect_all(image));
        log::debug!(
            "markers: robot={} target={}",
            pair.robot.is_some(),
            pair.target.is_some()
        );
        pair
    }
}

fn to_detection(symbol: DecodedSymbol) -> MarkerDetection {
    let role = classify_payload(&symbol.payload);
    let bbox = BoundingBox::enclosing(&symbol.corners).unwrap_or(BoundingBox::new(
        symbol.corners[0].x,
        symbol.corners[0].y,
        0.0,
        0.0,
    ));
    MarkerDetection {
        role,
        payload: symbol.payload,
        bbox,
        polygon: symbol.corners.to_vec(),
    }
}
