//! Series - typed, aligned batches of samples.

use crate::alignment::Alignment;
use crate::error::{CoreError, CoreResult};
use crate::value::{DataType, Value};
use serde::{Deserialize, Serialize};

/// An ordered, typed batch of samples
///
/// Sample `i` sits at alignment `alignment + i`, so a series always covers a
/// contiguous alignment range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SeriesRepr", into = "SeriesRepr")]
pub struct Series {
    data_type: DataType,
    alignment: Alignment,
    values: Vec<Value>,
}

impl Series {
    /// Create a series, checking every value against the declared type
    ///
    /// # Errors
    ///
    /// Returns error if a value has a different type, or the alignment range
    /// would overflow
    pub fn new(data_type: DataType, alignment: Alignment, values: Vec<Value>) -> CoreResult<Self> {
        if let Some(bad) = values.iter().find(|v| v.data_type() != data_type) {
            return Err(CoreError::TypeMismatch {
                expected: data_type,
                actual: bad.data_type(),
            });
        }
        if !values.is_empty() && alignment.checked_add(values.len() as u64 - 1).is_none() {
            return Err(CoreError::AlignmentOverflow);
        }
        Ok(Self {
            data_type,
            alignment,
            values,
        })
    }

    /// Create a series from primitives that convert into [`Value`]
    ///
    /// The data type is taken from the first value; an empty input yields an
    /// empty `Unit` series.
    ///
    /// # Errors
    ///
    /// Returns error if values have mixed types
    pub fn from_values<T, I>(alignment: Alignment, values: I) -> CoreResult<Self>
    where
        T: Into<Value>,
        I: IntoIterator<Item = T>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let data_type = values.first().map_or(DataType::Unit, Value::data_type);
        Self::new(data_type, alignment, values)
    }

    /// Empty series of the given type
    #[must_use]
    pub fn empty(data_type: DataType, alignment: Alignment) -> Self {
        Self {
            data_type,
            alignment,
            values: Vec::new(),
        }
    }

    /// Declared data type
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Alignment of the first sample
    #[must_use]
    pub const fn alignment(&self) -> Alignment {
        self.alignment
    }

    /// Alignment of the last sample, `None` when empty
    #[must_use]
    pub fn last_alignment(&self) -> Option<Alignment> {
        let len = self.values.len() as u64;
        len.checked_sub(1).and_then(|n| self.alignment.checked_add(n))
    }

    /// Alignment of sample `index`
    #[must_use]
    pub fn alignment_of(&self, index: usize) -> Option<Alignment> {
        if index < self.values.len() {
            self.alignment.checked_add(index as u64)
        } else {
            None
        }
    }

    /// Number of samples
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sample at `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Last sample
    #[must_use]
    pub fn last_value(&self) -> Option<&Value> {
        self.values.last()
    }

    /// All samples
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Iterate over `(alignment, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (Alignment, &Value)> + '_ {
        let start = self.alignment.as_u64();
        self.values
            .iter()
            .enumerate()
            .map(move |(i, v)| (Alignment::from_raw(start + i as u64), v))
    }

    /// Samples strictly after `watermark`, or all samples when `None`
    pub fn after(&self, watermark: Option<Alignment>) -> impl Iterator<Item = (Alignment, &Value)> + '_ {
        let skip = match watermark {
            None => 0,
            Some(w) if w < self.alignment => 0,
            Some(w) => usize::try_from(w.as_u64() - self.alignment.as_u64())
                .map_or(self.values.len(), |n| n.saturating_add(1)),
        };
        self.iter().skip(skip)
    }

    /// Drop every sample at or before `watermark`
    pub fn trim_through(&mut self, watermark: Alignment) {
        let kept: Vec<Value> = self.after(Some(watermark)).map(|(_, v)| v.clone()).collect();
        if kept.len() != self.values.len() {
            if let Some(next) = watermark.next() {
                self.alignment = self.alignment.max(next);
            }
            self.values = kept;
        }
    }

    /// Append a contiguous series to the end of this one
    ///
    /// # Errors
    ///
    /// Returns error on type mismatch or when `other` does not start right
    /// after this series
    pub fn extend(&mut self, other: Series) -> CoreResult<()> {
        if other.data_type != self.data_type {
            return Err(CoreError::TypeMismatch {
                expected: self.data_type,
                actual: other.data_type,
            });
        }
        if self.values.is_empty() {
            *self = other;
            return Ok(());
        }
        let expected = self.last_alignment().and_then(|a| a.next());
        if expected != Some(other.alignment) {
            return Err(CoreError::NonContiguous {
                expected,
                actual: other.alignment,
            });
        }
        self.values.extend(other.values);
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct SeriesRepr {
    data_type: DataType,
    alignment: Alignment,
    values: Vec<serde_json::Value>,
}

impl TryFrom<SeriesRepr> for Series {
    type Error = CoreError;

    fn try_from(repr: SeriesRepr) -> CoreResult<Self> {
        let values = repr
            .values
            .iter()
            .map(|literal| Value::from_json(repr.data_type, literal))
            .collect::<CoreResult<Vec<_>>>()?;
        Self::new(repr.data_type, repr.alignment, values)
    }
}

impl From<Series> for SeriesRepr {
    fn from(series: Series) -> Self {
        Self {
            data_type: series.data_type,
            alignment: series.alignment,
            values: series.values.iter().map(Value::to_json).collect(),
        }
    }
}
