//! Frame sources feeding the control loop.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::{GrayImage, ImageFormat};

use crate::error::CaptureError;

/// Produces grayscale frames in capture order.
///
/// `Ok(None)` marks the end of the stream. A live camera driver implements
/// this trait the same way the file-backed sources below do.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<GrayImage>, CaptureError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<GrayImage>, CaptureError> {
        (**self).next_frame()
    }
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn next_frame(&mut self) -> Result<Option<GrayImage>, CaptureError> {
        (**self).next_frame()
    }
}

/// Image files of a directory, replayed in file-name order.
#[derive(Clone, Debug)]
pub struct ImageSequenceSource {
    frames: Vec<PathBuf>,
    next: usize,
}

impl ImageSequenceSource {
    /// List the images in `dir`. Fails when the directory is missing or
    /// holds no file with a recognised image extension.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let dir = dir.as_ref();
        let open_err = |source: io::Error| CaptureError::Open {
            path: dir.to_path_buf(),
            source,
        };

        let mut frames = Vec::new();
        for entry in fs::read_dir(dir).map_err(open_err)? {
            let path = entry.map_err(open_err)?.path();
            if path.is_file() && ImageFormat::from_path(&path).is_ok() {
                frames.push(path);
            }
        }
        if frames.is_empty() {
            return Err(open_err(io::Error::new(
                io::ErrorKind::NotFound,
                "no image files found",
            )));
        }
        frames.sort();
        log::info!("{} frames queued from {}", frames.len(), dir.display());
        Ok(Self { frames, next: 0 })
    }

    pub fn from_paths(frames: Vec<PathBuf>) -> Self {
        Self { frames, next: 0 }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.frames.len() - self.next
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<GrayImage>, CaptureError> {
        let Some(path) = self.frames.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;
        let img = image::open(path).map_err(|source| CaptureError::Read {
            path: path.clone(),
            source,
        })?;
        Ok(Some(img.to_luma8()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn replays_images_in_name_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        for (name, shade) in [("b.png", 20u8), ("a.png", 10), ("c.png", 30)] {
            GrayImage::from_pixel(4, 3, Luma([shade]))
                .save(dir.path().join(name))
                .expect("write frame");
        }
        fs::write(dir.path().join("notes.txt"), "not a frame").expect("write");

        let mut source = ImageSequenceSource::open(dir.path()).expect("open");
        assert_eq!(source.len(), 3);
        let shades: Vec<u8> = std::iter::from_fn(|| source.next_frame().expect("read"))
            .map(|f| f.get_pixel(0, 0)[0])
            .collect();
        assert_eq!(shades, vec![10, 20, 30]);
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn empty_or_missing_directory_fails_to_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            ImageSequenceSource::open(dir.path()),
            Err(CaptureError::Open { .. })
        ));
        assert!(matches!(
            ImageSequenceSource::open(dir.path().join("missing")),
            Err(CaptureError::Open { .. })
        ));
    }

    #[test]
    fn corrupt_frame_is_a_read_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.png");
        fs::write(&path, b"not a png").expect("write");
        let mut source = ImageSequenceSource::from_paths(vec![path]);
        assert!(matches!(source.next_frame(), Err(CaptureError::Read { .. })));
        assert!(source.next_frame().expect("end of stream").is_none());
    }
}
