use bytes::{Buf, BufMut, BytesMut};

use crate::wire::{BlockLayout, VALUE_WIDTH};

/// Decoded samples of one data channel, indexed by (channel, sample).
///
/// Storage is channel-major: all samples of channel 0, then channel 1, and so
/// on. On the wire the order is the transpose (one block per instant).
#[derive(Debug, Clone, PartialEq)]
pub struct SampleMatrix {
    channels: usize,
    samples: usize,
    data: Vec<f32>,
}

impl SampleMatrix {
    /// A matrix with `channels` rows and no samples.
    pub fn empty(channels: usize) -> Self {
        Self {
            channels,
            samples: 0,
            data: Vec::new(),
        }
    }

    /// `(channels, samples)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.channels, self.samples)
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }

    /// All samples of one channel, or `None` if out of range.
    pub fn channel(&self, channel: usize) -> Option<&[f32]> {
        if channel >= self.channels {
            return None;
        }
        let start = channel * self.samples;
        Some(&self.data[start..start + self.samples])
    }

    /// One value, or `None` if out of range.
    pub fn get(&self, channel: usize, sample: usize) -> Option<f32> {
        if sample >= self.samples {
            return None;
        }
        self.channel(channel).map(|row| row[sample])
    }

    /// Iterate over channel rows.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        (0..self.channels).filter_map(move |channel| self.channel(channel))
    }

    /// The values of one sample instant across all channels.
    pub fn block(&self, sample: usize) -> Option<Vec<f32>> {
        if sample >= self.samples {
            return None;
        }
        Some(
            (0..self.channels)
                .map(|channel| self.data[channel * self.samples + sample])
                .collect(),
        )
    }

    /// Channel-major backing storage.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

/// Encode one block (one value per channel) into the wire format.
pub fn encode_block(values: &[f32], dst: &mut BytesMut) {
    dst.reserve(values.len() * VALUE_WIDTH);
    for &value in values {
        dst.put_f32_le(value);
    }
}

/// Decode whole blocks into a channel-major matrix.
///
/// `bytes.len()` must be a multiple of the layout's block size; any trailing
/// partial block is ignored.
pub fn decode_blocks(bytes: &[u8], layout: BlockLayout) -> SampleMatrix {
    let channels = layout.channels();
    let samples = bytes.len() / layout.block_size();
    let mut data = vec![0.0f32; channels * samples];

    let mut src = &bytes[..samples * layout.block_size()];
    for sample in 0..samples {
        for channel in 0..channels {
            data[channel * samples + sample] = src.get_f32_le();
        }
    }

    SampleMatrix {
        channels,
        samples,
        data,
    }
}
