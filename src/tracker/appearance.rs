//! Appearance descriptors for re-identification.
//!
//! A descriptor is the L2-normalised per-channel colour histogram of the
//! detection crop. It is cheap, deterministic and good enough to keep two
//! differently coloured objects apart when their boxes come close.

use std::collections::VecDeque;

use ndarray::Array1;

use crate::frame::Frame;
use crate::tracker::rect::Rect;

pub const HISTOGRAM_BINS: usize = 8;
pub const DESCRIPTOR_LEN: usize = HISTOGRAM_BINS * 3;

pub type Descriptor = Array1<f32>;

/// Describe the crop of `frame` under `bbox`. Returns `None` for frames
/// without pixels or boxes lying entirely outside the frame.
pub fn describe(frame: &Frame, bbox: &Rect) -> Option<Descriptor> {
    if frame.is_empty() {
        return None;
    }
    let (x0, y0, x1, y1) = bbox.pixel_bounds(frame.width(), frame.height())?;

    let mut hist = Array1::<f32>::zeros(DESCRIPTOR_LEN);
    for y in y0..y1 {
        for x in x0..x1 {
            for (channel, value) in frame.pixel(x, y).into_iter().enumerate() {
                let bin = value as usize * HISTOGRAM_BINS / 256;
                hist[channel * HISTOGRAM_BINS + bin] += 1.0;
            }
        }
    }

    let norm = hist.dot(&hist).sqrt();
    if norm == 0.0 {
        return None;
    }
    Some(hist / norm)
}

/// Cosine distance between two L2-normalised descriptors, in `[0, 2]`.
#[inline]
pub fn cosine_distance(a: &Descriptor, b: &Descriptor) -> f32 {
    (1.0 - a.dot(b)).max(0.0)
}

/// Recent descriptors of one track.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    samples: VecDeque<Descriptor>,
    budget: Option<usize>,
}

impl Gallery {
    /// `budget` caps the number of retained samples; `None` keeps all of them.
    pub fn new(budget: Option<usize>) -> Self {
        Self {
            samples: VecDeque::new(),
            budget,
        }
    }

    pub fn push(&mut self, descriptor: Descriptor) {
        if self.budget == Some(0) {
            return;
        }
        self.samples.push_back(descriptor);
        if let Some(budget) = self.budget {
            while self.samples.len() > budget {
                self.samples.pop_front();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Smallest cosine distance from `query` to any retained sample.
    pub fn min_distance(&self, query: &Descriptor) -> Option<f32> {
        self.samples
            .iter()
            .map(|s| cosine_distance(s, query))
            .min_by(|a, b| a.total_cmp(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_is_normalised() {
        let frame = Frame::filled(20, 20, [200, 30, 90]);
        let d = describe(&frame, &Rect::new(2.0, 2.0, 10.0, 10.0)).unwrap();
        assert_eq!(d.len(), DESCRIPTOR_LEN);
        assert!((d.dot(&d) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_describe_without_pixels() {
        assert!(describe(&Frame::default(), &Rect::new(0.0, 0.0, 5.0, 5.0)).is_none());
        let frame = Frame::filled(10, 10, [0, 0, 0]);
        assert!(describe(&frame, &Rect::new(50.0, 50.0, 5.0, 5.0)).is_none());
    }

    #[test]
    fn test_colours_are_told_apart() {
        let mut frame = Frame::filled(40, 20, [0, 0, 0]);
        frame.fill_region(0, 0, 20, 20, [250, 10, 10]);
        frame.fill_region(20, 0, 40, 20, [10, 10, 250]);
        let red = describe(&frame, &Rect::new(0.0, 0.0, 20.0, 20.0)).unwrap();
        let blue = describe(&frame, &Rect::new(20.0, 0.0, 20.0, 20.0)).unwrap();
        let red_again = describe(&frame, &Rect::new(2.0, 2.0, 15.0, 15.0)).unwrap();

        assert!(cosine_distance(&red, &red_again) < 1e-5);
        assert!(cosine_distance(&red, &blue) > 0.4);
    }

    #[test]
    fn test_gallery_budget() {
        let mut gallery = Gallery::new(Some(2));
        for v in [0.0f32, 1.0, 2.0] {
            gallery.push(Array1::from_elem(DESCRIPTOR_LEN, v));
        }
        assert_eq!(gallery.len(), 2);

        let empty = Gallery::new(Some(0));
        assert!(empty.min_distance(&Array1::zeros(DESCRIPTOR_LEN)).is_none());
    }
}
