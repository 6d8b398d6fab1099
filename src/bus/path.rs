use std::fmt;

use smallvec::SmallVec;

/// Location inside the bus: a message key followed by nested field/entry names.
///
/// Notification routing is prefix-based: a write at `cursor.state.a` reaches
/// subscribers of `cursor`, `cursor.state` and `cursor.state.a`, but not
/// `cursor.state.b` or `cursor.source_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BusPath {
    segments: SmallVec<[String; 4]>,
}

impl BusPath {
    #[must_use]
    pub fn key(name: &str) -> Self {
        let mut segments = SmallVec::new();
        segments.push(name.to_owned());
        Self { segments }
    }

    #[must_use]
    pub fn new(key: &str, path: &[&str]) -> Self {
        path.iter()
            .fold(Self::key(key), |acc, segment| acc.child(*segment))
    }

    #[must_use]
    pub fn child(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    #[must_use]
    pub fn key_name(&self) -> &str {
        &self.segments[0]
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.segments.len() <= other.segments.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|(a, b)| a == b)
    }

    /// `true` when a write at one path can change the value seen at the other.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }
}

impl fmt::Display for BusPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}
