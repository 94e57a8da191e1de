//! Garbage collection of consumed series.

use crate::channel::ChannelState;
use crate::node::NodeState;
use arc_core::ChannelKey;
use indexmap::IndexMap;
use tracing::trace;

/// Trim every channel down to the series some subscriber still needs.
///
/// A subscribed channel keeps only series whose last sample lies beyond the
/// slowest subscriber's watermark. An unsubscribed channel keeps its newest
/// `retain_unsubscribed` series. Returns the number of series dropped.
pub(crate) fn collect(
    channels: &mut IndexMap<ChannelKey, ChannelState>,
    nodes: &IndexMap<String, NodeState>,
    retain_unsubscribed: usize,
) -> usize {
    let mut collected = 0;
    for channel in channels.values_mut() {
        let before = channel.series.len();
        if channel.subscribers.is_empty() {
            let excess = before.saturating_sub(retain_unsubscribed);
            channel.series.drain(..excess);
        } else {
            // `None` sorts first, so one subscriber that has consumed nothing
            // pins every series
            let floor = channel
                .subscribers
                .iter()
                .map(|s| nodes[s.node].watermarks[s.slot])
                .min()
                .flatten();
            if let Some(floor) = floor {
                channel
                    .series
                    .retain(|series| series.last_alignment().is_some_and(|last| last > floor));
            }
        }

        let removed = before - channel.series.len();
        if removed > 0 {
            trace!(channel = %channel.key, removed, kept = channel.series.len(), "collected series");
        }
        collected += removed;
    }
    collected
}
