//! JSONL frame codec.
//!
//! Each input line is a JSON array of series, each output line the array of
//! series the graph wrote while processing one input frame:
//!
//! ```json
//! [{"channel": 1, "alignment": 0, "values": [1.5, 2.5]}]
//! ```

use arc_core::{Alignment, ChannelKey, CoreError, DataType, Frame, FrameEntry, Series, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One series on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSeries {
    /// Channel key
    pub channel: u32,
    /// Alignment of the first value
    pub alignment: u64,
    /// Bare JSON literals
    pub values: Vec<serde_json::Value>,
}

/// Codec errors
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The line is not a JSON array of series
    #[error("Malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    /// A value does not fit the channel's type
    #[error("Channel {channel}: {source}")]
    Value {
        channel: u32,
        #[source]
        source: CoreError,
    },
}

/// A decoded input line
#[derive(Debug)]
pub struct Decoded {
    /// Series to hand to the runtime
    pub frame: Frame,
    /// Series for channels outside the graph whose type could not be inferred
    pub skipped: usize,
}

/// Decode one input line into a frame, typing values by `types`
///
/// Series for channels outside the graph are typed from their literals so
/// the runtime can account for them. When no type fits, the series is
/// skipped and counted.
///
/// # Errors
///
/// Returns error if the line is malformed or a value does not fit its channel
pub fn decode_frame(line: &str, types: &IndexMap<ChannelKey, DataType>) -> Result<Decoded, WireError> {
    let entries: Vec<WireSeries> = serde_json::from_str(line)?;
    let mut frame = Frame::new();
    let mut skipped = 0;
    for entry in entries {
        let key = ChannelKey::new(entry.channel);
        let data_type = match types.get(&key) {
            Some(&data_type) => data_type,
            None => match infer_type(&entry.values) {
                Some(data_type) => {
                    debug!(channel = entry.channel, "series for channel outside the graph");
                    data_type
                }
                None => {
                    debug!(channel = entry.channel, "skipping untyped series outside the graph");
                    skipped += 1;
                    continue;
                }
            },
        };
        let series = decode_series(&entry, data_type).map_err(|source| WireError::Value {
            channel: entry.channel,
            source,
        })?;
        frame.merge(key, series).map_err(|source| WireError::Value {
            channel: entry.channel,
            source,
        })?;
    }
    Ok(Decoded { frame, skipped })
}

fn decode_series(entry: &WireSeries, data_type: DataType) -> Result<Series, CoreError> {
    let values = entry
        .values
        .iter()
        .map(|literal| Value::from_json(data_type, literal))
        .collect::<Result<Vec<_>, _>>()?;
    Series::new(data_type, Alignment::from_raw(entry.alignment), values)
}

fn infer_type(values: &[serde_json::Value]) -> Option<DataType> {
    if values.iter().all(serde_json::Value::is_number) {
        Some(DataType::F64)
    } else if values.iter().all(serde_json::Value::is_string) {
        Some(DataType::String)
    } else {
        None
    }
}

/// Encode flushed writes as one output line
#[must_use]
pub fn encode_writes(writes: &[FrameEntry]) -> Vec<WireSeries> {
    writes
        .iter()
        .map(|entry| WireSeries {
            channel: entry.channel.as_u32(),
            alignment: entry.series.alignment().as_u64(),
            values: entry.series.values().iter().map(Value::to_json).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types() -> IndexMap<ChannelKey, DataType> {
        let mut types = IndexMap::new();
        types.insert(ChannelKey::new(1), DataType::F64);
        types.insert(ChannelKey::new(2), DataType::U8);
        types
    }

    #[test]
    fn test_decode_typed_frame() {
        let frame = decode_frame(
            r#"[{"channel": 1, "alignment": 4, "values": [1.5, 2]},
                {"channel": 2, "alignment": 0, "values": [7]}]"#,
            &types(),
        )
        .unwrap()
        .frame;
        let series = frame.get(ChannelKey::new(1)).unwrap();
        assert_eq!(series.values(), &[Value::F64(1.5), Value::F64(2.0)]);
        assert_eq!(series.alignment(), Alignment::from_raw(4));
        assert_eq!(
            frame.get(ChannelKey::new(2)).unwrap().values(),
            &[Value::U8(7)]
        );
    }

    #[test]
    fn test_decode_merges_repeated_channel() {
        let frame = decode_frame(
            r#"[{"channel": 1, "alignment": 0, "values": [1]},
                {"channel": 1, "alignment": 1, "values": [2]}]"#,
            &types(),
        )
        .unwrap()
        .frame;
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.get(ChannelKey::new(1)).unwrap().len(), 2);
    }

    #[test]
    fn test_decode_out_of_range_value() {
        let err = decode_frame(
            r#"[{"channel": 2, "alignment": 0, "values": [300]}]"#,
            &types(),
        )
        .unwrap_err();
        assert!(matches!(err, WireError::Value { channel: 2, .. }));
    }

    #[test]
    fn test_decode_infers_unknown_channels() {
        let decoded = decode_frame(
            r#"[{"channel": 9, "alignment": 0, "values": ["a", "b"]}]"#,
            &types(),
        )
        .unwrap();
        assert_eq!(decoded.skipped, 0);
        assert_eq!(
            decoded.frame.get(ChannelKey::new(9)).unwrap().data_type(),
            DataType::String
        );
    }

    #[test]
    fn test_decode_skips_untyped_unknown_channels() {
        let decoded = decode_frame(
            r#"[{"channel": 1, "alignment": 0, "values": [1.0]},
                {"channel": 99, "alignment": 0, "values": [true]},
                {"channel": 98, "alignment": 0, "values": ["a", 1]},
                {"channel": 97, "alignment": 0, "values": [null]}]"#,
            &types(),
        )
        .unwrap();
        assert_eq!(decoded.skipped, 3);
        assert_eq!(decoded.frame.len(), 1);
        assert_eq!(
            decoded.frame.get(ChannelKey::new(1)).unwrap().values(),
            &[Value::F64(1.0)]
        );
    }

    #[test]
    fn test_decode_malformed_line() {
        assert!(matches!(
            decode_frame(r#"{"channel": 1}"#, &types()),
            Err(WireError::Json(_))
        ));
    }

    #[test]
    fn test_encode_writes() {
        let series = Series::from_values(Alignment::from_raw(3), [1.0f64, 2.0]).unwrap();
        let writes = vec![FrameEntry {
            channel: ChannelKey::new(5),
            series,
        }];
        let encoded = serde_json::to_string(&encode_writes(&writes)).unwrap();
        assert_eq!(encoded, r#"[{"channel":5,"alignment":3,"values":[1.0,2.0]}]"#);
    }
}
