// Audiofile
// Copyright (c) 2026 The Audiofile Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `audio` module provides the de-interleaved frame buffer exchanged with applications.

/// `Frames` is a de-interleaved, channel-major buffer of double-precision samples: one plane of
/// `[frame]` per channel.
///
/// Individual channel planes may be absent. An absent plane is skipped when reading (the
/// channel's samples are discarded) and is an error when writing.
#[derive(Clone, Debug, Default)]
pub struct Frames {
    planes: Vec<Option<Vec<f64>>>,
}

impl Frames {
    /// Allocates a buffer of `num_frames` frames for `num_channels` channels, all planes present
    /// and zeroed.
    pub fn new(num_channels: usize, num_frames: usize) -> Self {
        Frames { planes: vec![Some(vec![0.0; num_frames]); num_channels] }
    }

    /// The number of channels, present or absent.
    pub fn num_channels(&self) -> usize {
        self.planes.len()
    }

    /// The per-channel frame capacity: the length of the longest present plane.
    pub fn num_frames(&self) -> usize {
        self.planes.iter().flatten().map(|p| p.len()).max().unwrap_or(0)
    }

    /// Gets the plane for a channel, or `None` if the channel is absent.
    pub fn plane(&self, channel: usize) -> Option<&[f64]> {
        self.planes.get(channel).and_then(|p| p.as_deref())
    }

    /// Gets the mutable plane for a channel, or `None` if the channel is absent.
    pub fn plane_mut(&mut self, channel: usize) -> Option<&mut [f64]> {
        self.planes.get_mut(channel).and_then(|p| p.as_deref_mut())
    }

    /// Marks a channel absent. Samples for the channel will be discarded on read.
    pub fn clear_plane(&mut self, channel: usize) {
        if let Some(plane) = self.planes.get_mut(channel) {
            *plane = None;
        }
    }

    /// Restores an absent channel with a zeroed plane of `num_frames` frames.
    pub fn reset_plane(&mut self, channel: usize, num_frames: usize) {
        if let Some(plane) = self.planes.get_mut(channel) {
            *plane = Some(vec![0.0; num_frames]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_allocates_zeroed_planes() {
        let frames = Frames::new(2, 64);
        assert_eq!(frames.num_channels(), 2);
        assert_eq!(frames.num_frames(), 64);
        assert!(frames.plane(0).unwrap().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn cleared_plane_is_absent() {
        let mut frames = Frames::new(3, 8);
        frames.clear_plane(1);
        assert!(frames.plane(1).is_none());
        assert_eq!(frames.num_frames(), 8);

        frames.reset_plane(1, 8);
        assert!(frames.plane(1).is_some());
    }
}
