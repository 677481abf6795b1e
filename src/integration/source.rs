//! Frame sources and scoped acquisition of them.

use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{MonitorError, Result};
use crate::frame::Frame;

/// Supplies frames on demand.
pub trait FrameSource: Send {
    /// Block until the next frame is available. [`MonitorError::FrameRead`]
    /// is transient; [`MonitorError::SourceExhausted`] is final.
    fn read(&mut self) -> Result<Frame>;

    /// Free the underlying device. Must be idempotent.
    fn release(&mut self);
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read(&mut self) -> Result<Frame> {
        (**self).read()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Owns a frame source and releases it when dropped.
pub struct SourceGuard<S: FrameSource> {
    source: S,
}

impl<S: FrameSource> SourceGuard<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: FrameSource> Deref for SourceGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.source
    }
}

impl<S: FrameSource> DerefMut for SourceGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

impl<S: FrameSource> Drop for SourceGuard<S> {
    fn drop(&mut self) {
        self.source.release();
    }
}

/// Produces blank frames of a fixed size; stands in for a camera when only
/// detections matter.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    width: u32,
    height: u32,
    fill: [u8; 3],
    released: bool,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fill: [0, 0, 0],
            released: false,
        }
    }

    pub fn with_fill(mut self, fill: [u8; 3]) -> Self {
        self.fill = fill;
        self
    }
}

impl FrameSource for SyntheticSource {
    fn read(&mut self) -> Result<Frame> {
        if self.released {
            return Err(MonitorError::FrameRead("source released".into()));
        }
        Ok(Frame::filled(self.width, self.height, self.fill))
    }

    fn release(&mut self) {
        if !self.released {
            debug!("Synthetic source released");
            self.released = true;
        }
    }
}

/// Reads an image sequence (png/jpg/jpeg) from a directory in file-name order.
#[derive(Debug)]
pub struct DirectorySource {
    paths: Vec<PathBuf>,
    cursor: usize,
    looping: bool,
    released: bool,
}

impl DirectorySource {
    /// Scan `dir` for images. Missing or image-less directories fail with
    /// [`MonitorError::Startup`].
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|e| {
            MonitorError::Startup(format!("could not open frame directory {}: {e}", dir.display()))
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| is_image(p))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(MonitorError::Startup(format!(
                "no images found in {}",
                dir.display()
            )));
        }
        info!(dir = %dir.display(), frames = paths.len(), "Frame directory opened");

        Ok(Self {
            paths,
            cursor: 0,
            looping: false,
            released: false,
        })
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
        .unwrap_or(false)
}

impl FrameSource for DirectorySource {
    fn read(&mut self) -> Result<Frame> {
        if self.released {
            return Err(MonitorError::FrameRead("source released".into()));
        }
        if self.cursor >= self.paths.len() {
            if !self.looping {
                return Err(MonitorError::SourceExhausted);
            }
            self.cursor = 0;
        }
        let path = &self.paths[self.cursor];
        self.cursor += 1;

        let image = image::open(path)
            .map_err(|e| MonitorError::FrameRead(format!("{}: {e}", path.display())))?;
        Ok(Frame::from_rgb_image(image.to_rgb8()))
    }

    fn release(&mut self) {
        if !self.released {
            debug!("Frame directory released");
            self.released = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_source() {
        let mut source = SyntheticSource::new(8, 6).with_fill([1, 2, 3]);
        let frame = source.read().unwrap();
        assert_eq!((frame.width(), frame.height()), (8, 6));
        assert_eq!(frame.pixel(7, 5), [1, 2, 3]);

        source.release();
        source.release();
        assert!(matches!(source.read(), Err(MonitorError::FrameRead(_))));
    }

    #[test]
    fn test_guard_releases_on_drop() {
        struct Probe<'a>(&'a std::sync::atomic::AtomicUsize);
        impl FrameSource for Probe<'_> {
            fn read(&mut self) -> Result<Frame> {
                Ok(Frame::default())
            }
            fn release(&mut self) {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        }

        let released = std::sync::atomic::AtomicUsize::new(0);
        {
            let mut guard = SourceGuard::new(Probe(&released));
            guard.read().unwrap();
        }
        assert_eq!(released.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_directory_source() {
        let dir = tempfile::tempdir().unwrap();
        for (name, shade) in [("b.png", 200u8), ("a.png", 10u8)] {
            image::RgbImage::from_pixel(4, 3, image::Rgb([shade, shade, shade]))
                .save(dir.path().join(name))
                .unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut source = DirectorySource::open(dir.path()).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.read().unwrap().pixel(0, 0), [10, 10, 10]);
        assert_eq!(source.read().unwrap().pixel(0, 0), [200, 200, 200]);
        assert!(matches!(source.read(), Err(MonitorError::SourceExhausted)));
    }

    #[test]
    fn test_directory_source_startup_failures() {
        let empty = tempfile::tempdir().unwrap();
        assert!(matches!(DirectorySource::open(empty.path()), Err(MonitorError::Startup(_))));
        assert!(matches!(
            DirectorySource::open("/nonexistent/frames"),
            Err(MonitorError::Startup(_))
        ));
    }

    #[test]
    fn test_undecodable_frame_is_transient() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.png"), b"not a png").unwrap();
        let mut source = DirectorySource::open(dir.path()).unwrap().looping(true);
        assert!(matches!(source.read(), Err(MonitorError::FrameRead(_))));
        assert!(matches!(source.read(), Err(MonitorError::FrameRead(_))));
    }
}
