//! Frames - batches of series keyed by channel.

use crate::error::{CoreError, CoreResult};
use crate::id::ChannelKey;
use crate::series::Series;
use serde::{Deserialize, Serialize};

/// One channel's series within a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameEntry {
    /// Channel the series belongs to
    pub channel: ChannelKey,
    /// The samples
    pub series: Series,
}

/// An ordered set of channel→series pairs with no repeated channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FrameEntry>", into = "Vec<FrameEntry>")]
pub struct Frame {
    entries: Vec<FrameEntry>,
}

impl Frame {
    /// Create an empty frame
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame holding a single series
    #[must_use]
    pub fn unary(channel: ChannelKey, series: Series) -> Self {
        Self {
            entries: vec![FrameEntry { channel, series }],
        }
    }

    /// Add a series for a channel not yet in the frame
    ///
    /// # Errors
    ///
    /// Returns error if the channel is already present
    pub fn push(&mut self, channel: ChannelKey, series: Series) -> CoreResult<()> {
        if self.contains(channel) {
            return Err(CoreError::DuplicateChannel { key: channel });
        }
        self.entries.push(FrameEntry { channel, series });
        Ok(())
    }

    /// Builder form of [`Frame::push`]
    ///
    /// # Errors
    ///
    /// Returns error if the channel is already present
    pub fn with(mut self, channel: ChannelKey, series: Series) -> CoreResult<Self> {
        self.push(channel, series)?;
        Ok(self)
    }

    /// Add a series, joining it onto an existing entry for the same channel
    ///
    /// # Errors
    ///
    /// Returns error if the existing entry cannot be extended contiguously
    pub fn merge(&mut self, channel: ChannelKey, series: Series) -> CoreResult<()> {
        match self.entries.iter_mut().find(|e| e.channel == channel) {
            Some(entry) => entry.series.extend(series),
            None => {
                self.entries.push(FrameEntry { channel, series });
                Ok(())
            }
        }
    }

    /// Series for a channel
    #[must_use]
    pub fn get(&self, channel: ChannelKey) -> Option<&Series> {
        self.entries
            .iter()
            .find(|e| e.channel == channel)
            .map(|e| &e.series)
    }

    /// Check if a channel is present
    #[must_use]
    pub fn contains(&self, channel: ChannelKey) -> bool {
        self.entries.iter().any(|e| e.channel == channel)
    }

    /// Channels in insertion order
    pub fn keys(&self) -> impl Iterator<Item = ChannelKey> + '_ {
        self.entries.iter().map(|e| e.channel)
    }

    /// Iterate over entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (ChannelKey, &Series)> + '_ {
        self.entries.iter().map(|e| (e.channel, &e.series))
    }

    /// Number of channels
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the frame has no channels
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

type EntryPair = (ChannelKey, Series);

fn entry_pair(entry: FrameEntry) -> EntryPair {
    (entry.channel, entry.series)
}

impl IntoIterator for Frame {
    type Item = EntryPair;
    type IntoIter = std::iter::Map<std::vec::IntoIter<FrameEntry>, fn(FrameEntry) -> EntryPair>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries
            .into_iter()
            .map(entry_pair as fn(FrameEntry) -> EntryPair)
    }
}

impl TryFrom<Vec<FrameEntry>> for Frame {
    type Error = CoreError;

    fn try_from(entries: Vec<FrameEntry>) -> CoreResult<Self> {
        let mut frame = Self::new();
        for entry in entries {
            frame.push(entry.channel, entry.series)?;
        }
        Ok(frame)
    }
}

impl From<Frame> for Vec<FrameEntry> {
    fn from(frame: Frame) -> Self {
        frame.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::Alignment;
    use serde_json::json;

    fn series(start: u64, values: &[i32]) -> Series {
        Series::from_values(Alignment::from_raw(start), values.iter().copied()).unwrap()
    }

    #[test]
    fn test_frame_push_and_get() {
        let mut frame = Frame::new();
        frame.push(ChannelKey::new(1), series(0, &[1, 2])).unwrap();
        frame.push(ChannelKey::new(2), series(0, &[3])).unwrap();

        assert_eq!(frame.len(), 2);
        assert_eq!(frame.get(ChannelKey::new(2)).unwrap().len(), 1);
        assert!(frame.get(ChannelKey::new(3)).is_none());
        assert_eq!(frame.keys().collect::<Vec<_>>(), vec![ChannelKey::new(1), ChannelKey::new(2)]);
    }

    #[test]
    fn test_frame_rejects_duplicate_channel() {
        let mut frame = Frame::unary(ChannelKey::new(1), series(0, &[1]));
        let result = frame.push(ChannelKey::new(1), series(1, &[2]));
        assert_eq!(result, Err(CoreError::DuplicateChannel { key: ChannelKey::new(1) }));
    }

    #[test]
    fn test_frame_merge_extends_existing() {
        let mut frame = Frame::new();
        frame.merge(ChannelKey::new(5), series(0, &[1, 2])).unwrap();
        frame.merge(ChannelKey::new(5), series(2, &[3])).unwrap();
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.get(ChannelKey::new(5)).unwrap().len(), 3);
    }

    #[test]
    fn test_frame_deserialize_rejects_duplicates() {
        let raw = json!([
            {"channel": 1, "series": {"data_type": "i32", "alignment": 0, "values": [1]}},
            {"channel": 1, "series": {"data_type": "i32", "alignment": 1, "values": [2]}}
        ]);
        let result: Result<Frame, _> = serde_json::from_value(raw);
        assert!(result.is_err());
    }

    #[test]
    fn test_frame_into_iter_preserves_order() {
        let frame = Frame::new()
            .with(ChannelKey::new(9), series(0, &[1]))
            .unwrap()
            .with(ChannelKey::new(3), series(0, &[2]))
            .unwrap();
        let keys: Vec<_> = frame.into_iter().map(|(k, _)| k.as_u32()).collect();
        assert_eq!(keys, vec![9, 3]);
    }

    proptest::proptest! {
        #[test]
        fn prop_merge_joins_contiguous_pieces(
            start in 0u64..1000,
            values in proptest::collection::vec(proptest::num::i32::ANY, 1..32),
            cuts in proptest::collection::vec(0usize..32, 0..6),
        ) {
            let mut cuts: Vec<_> = cuts.into_iter().map(|c| c % values.len()).collect();
            cuts.push(0);
            cuts.push(values.len());
            cuts.sort_unstable();
            cuts.dedup();

            let mut frame = Frame::new();
            for bounds in cuts.windows(2) {
                let piece = series(start + bounds[0] as u64, &values[bounds[0]..bounds[1]]);
                frame.merge(ChannelKey::new(1), piece).unwrap();
            }
            let whole = series(start, &values);
            proptest::prop_assert_eq!(frame.len(), 1);
            proptest::prop_assert_eq!(frame.get(ChannelKey::new(1)), Some(&whole));
        }
    }
}
