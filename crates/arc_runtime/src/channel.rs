//! Per-channel runtime state.

use arc_core::{Alignment, ChannelKey, DataType, Series, Value};
use std::collections::VecDeque;
use tracing::warn;

/// A node reading a channel, and which of its read slots the channel fills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Subscriber {
    pub node: usize,
    pub slot: usize,
}

/// Buffered data and static wiring of one channel
#[derive(Debug)]
pub(crate) struct ChannelState {
    pub key: ChannelKey,
    pub data_type: DataType,
    /// Buffered series, ordered by alignment
    pub series: VecDeque<Series>,
    pub latest: Option<Value>,
    /// Survives GC, so writes keep extending the alignment sequence
    pub last_alignment: Option<Alignment>,
    pub has_data: bool,
    pub last_frame: Option<u64>,
    pub subscribers: Vec<Subscriber>,
    pub writers: Vec<usize>,
}

impl ChannelState {
    pub fn new(key: ChannelKey, data_type: DataType) -> Self {
        Self {
            key,
            data_type,
            series: VecDeque::new(),
            latest: None,
            last_alignment: None,
            has_data: false,
            last_frame: None,
            subscribers: Vec::new(),
            writers: Vec::new(),
        }
    }

    /// Alignment the next written series starts at
    pub fn next_alignment(&self) -> Alignment {
        self.last_alignment
            .and_then(|a| a.next())
            .unwrap_or_else(Alignment::zero)
    }

    /// Append a series, dropping samples at or before the last buffered
    /// alignment. Returns whether any sample was kept.
    pub fn append(&mut self, mut series: Series, frame: u64) -> bool {
        if let Some(last) = self.last_alignment {
            if series.alignment() <= last {
                let before = series.len();
                series.trim_through(last);
                warn!(
                    channel = %self.key,
                    dropped = before - series.len(),
                    last = %last,
                    "dropping out-of-order samples"
                );
            }
        }
        let Some(last_alignment) = series.last_alignment() else {
            return false;
        };

        self.latest = series.last_value().cloned();
        self.last_alignment = Some(last_alignment);
        self.has_data = true;
        self.last_frame = Some(frame);
        self.series.push_back(series);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f64s(start: u64, values: &[f64]) -> Series {
        Series::from_values(Alignment::from_raw(start), values.iter().copied()).unwrap()
    }

    #[test]
    fn test_append_tracks_latest() {
        let mut ch = ChannelState::new(ChannelKey::new(1), DataType::F64);
        assert_eq!(ch.next_alignment(), Alignment::zero());

        assert!(ch.append(f64s(0, &[1.0, 2.0]), 1));
        assert!(ch.has_data);
        assert_eq!(ch.latest, Some(Value::F64(2.0)));
        assert_eq!(ch.last_alignment, Some(Alignment::from_raw(1)));
        assert_eq!(ch.last_frame, Some(1));
        assert_eq!(ch.next_alignment(), Alignment::from_raw(2));
    }

    #[test]
    fn test_append_drops_stale_samples() {
        let mut ch = ChannelState::new(ChannelKey::new(1), DataType::F64);
        ch.append(f64s(0, &[1.0, 2.0, 3.0]), 1);

        // Entirely stale
        assert!(!ch.append(f64s(1, &[9.0]), 2));
        assert_eq!(ch.series.len(), 1);
        assert_eq!(ch.last_frame, Some(1));

        // Partially stale: only alignment 3 survives
        assert!(ch.append(f64s(2, &[8.0, 4.0]), 2));
        assert_eq!(ch.series.len(), 2);
        assert_eq!(ch.series[1].alignment(), Alignment::from_raw(3));
        assert_eq!(ch.latest, Some(Value::F64(4.0)));
    }

    #[test]
    fn test_append_allows_gaps() {
        let mut ch = ChannelState::new(ChannelKey::new(1), DataType::F64);
        ch.append(f64s(0, &[1.0]), 1);
        assert!(ch.append(f64s(10, &[2.0]), 2));
        assert_eq!(ch.next_alignment(), Alignment::from_raw(11));
    }
}
