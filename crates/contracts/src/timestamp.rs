//! TimestampKey - logical synchronization time
//!
//! Keys are compared lexicographically by coordinate. The top key sorts
//! before every coordinate key.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical timestamp identifying a synchronization point across streams.
///
/// # Examples
/// ```
/// use contracts::TimestampKey;
///
/// let early = TimestampKey::from_millis(100);
/// let late = TimestampKey::new([100, 1]);
/// assert!(TimestampKey::Top < early);
/// assert!(early < late);
/// assert_eq!(late.primary(), Some(100));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampKey {
    /// Stream initialization marker, never carries data
    Top,
    /// Ordered logical coordinates
    At(Vec<u64>),
}

impl TimestampKey {
    /// Create a key from its coordinates
    #[inline]
    pub fn new(coordinates: impl Into<Vec<u64>>) -> Self {
        Self::At(coordinates.into())
    }

    /// Single-coordinate key in milliseconds
    #[inline]
    pub fn from_millis(millis: u64) -> Self {
        Self::At(vec![millis])
    }

    /// Convert a simulator capture time (seconds) into a millisecond key.
    ///
    /// Fractional milliseconds are truncated; negative times clamp to zero.
    #[inline]
    pub fn from_seconds(seconds: f64) -> Self {
        Self::from_millis((seconds * 1000.0) as u64)
    }

    /// Whether this is the initialization key
    #[inline]
    pub fn is_top(&self) -> bool {
        matches!(self, Self::Top)
    }

    /// Coordinates of the key (empty for top)
    #[inline]
    pub fn coordinates(&self) -> &[u64] {
        match self {
            Self::Top => &[],
            Self::At(coordinates) => coordinates,
        }
    }

    /// First coordinate, used as the simulation time
    #[inline]
    pub fn primary(&self) -> Option<u64> {
        self.coordinates().first().copied()
    }

    /// Difference of primary coordinates (`self - earlier`).
    ///
    /// Returns `None` if either key is top or `earlier` is later than `self`.
    pub fn elapsed_since(&self, earlier: &TimestampKey) -> Option<u64> {
        self.primary()?.checked_sub(earlier.primary()?)
    }
}

impl From<u64> for TimestampKey {
    fn from(millis: u64) -> Self {
        Self::from_millis(millis)
    }
}

impl fmt::Display for TimestampKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Top => write!(f, "top"),
            Self::At(coordinates) => write!(f, "{:?}", coordinates),
        }
    }
}
