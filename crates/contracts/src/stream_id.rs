//! StreamId - name of one logical stream

use std::fmt;
use std::sync::Arc;

/// Logical stream name
///
/// Built once when a gate, buffer or synchronizer is wired, then cloned into
/// every aligned tuple. Ordering is the string ordering; tuples list their
/// records in it.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct StreamId(Arc<str>);

impl StreamId {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StreamId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&StreamId> for StreamId {
    fn from(s: &StreamId) -> Self {
        s.clone()
    }
}

impl PartialEq<str> for StreamId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuple_records_share_the_name() {
        let wired: StreamId = "tracking".into();
        let in_tuple = StreamId::from(&wired);
        assert_eq!(wired.as_str().as_ptr(), in_tuple.as_str().as_ptr());
        assert!(in_tuple == *"tracking");
    }

    #[test]
    fn test_sorts_like_stream_names() {
        let mut ids: Vec<StreamId> = ["tracking", "pose", "prediction"]
            .into_iter()
            .map(StreamId::from)
            .collect();
        ids.sort();
        let names: Vec<String> = ids.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["pose", "prediction", "tracking"]);
    }
}
