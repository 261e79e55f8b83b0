use image::GrayImage;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// A decoded symbol: payload text and the four outer corners in pixels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecodedSymbol {
    pub payload: String,
    pub corners: [Point2<f32>; 4],
}

/// Finds and decodes fiducial symbols in a grayscale frame.
///
/// Implementations return symbols in a stable scan order; symbols that are
/// located but fail to decode are dropped.
pub trait PayloadDecoder {
    fn decode(&self, image: &GrayImage) -> Vec<DecodedSymbol>;
}

impl<D: PayloadDecoder + ?Sized> PayloadDecoder for &D {
    fn decode(&self, image: &GrayImage) -> Vec<DecodedSymbol> {
        (**self).decode(image)
    }
}

impl<D: PayloadDecoder + ?Sized> PayloadDecoder for Box<D> {
    fn decode(&self, image: &GrayImage) -> Vec<DecodedSymbol> {
        (**self).decode(image)
    }
}

/// QR code decoder backed by `rqrr`.
#[derive(Clone, Copy, Debug, Default)]
pub struct QrDecoder;

impl QrDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl PayloadDecoder for QrDecoder {
    fn decode(&self, image: &GrayImage) -> Vec<DecodedSymbol> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Vec::new();
        }

        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            w as usize,
            h as usize,
            |x, y| image.get_pixel(x as u32, y as u32)[0],
        );
        let grids = prepared.detect_grids();
        log::trace!("{} QR grid candidates in {w}x{h} frame", grids.len());

        grids
            .into_iter()
            .filter_map(|grid| {
                let corners = grid.bounds.map(|p| Point2::new(p.x as f32, p.y as f32));
                match grid.decode() {
                    Ok((_, payload)) => Some(DecodedSymbol { payload, corners }),
                    Err(err) => {
                        log::debug!("QR grid at {:?} failed to decode: {err}", corners[0]);
                        None
                    }
                }
            })
            .collect()
    }
}
