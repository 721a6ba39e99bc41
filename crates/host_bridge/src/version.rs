//! Dotted host-version parsing and comparison.

use std::cmp::Ordering;

#[derive(Debug, Clone)]
/// Host protocol version made of dot-separated numeric components.
///
/// Missing trailing components compare as zero, so `6.1` equals `6.1.0`.
pub struct HostVersion {
    components: Vec<u64>,
}

impl HostVersion {
    /// Parses a dotted numeric version such as `6.1` or `6.10.2`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        raw.split('.')
            .map(|part| part.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()
            .map(|components| Self { components })
    }

    fn component(&self, index: usize) -> u64 {
        self.components.get(index).copied().unwrap_or(0)
    }
}

impl PartialEq for HostVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HostVersion {}

impl PartialOrd for HostVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HostVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|index| self.component(index).cmp(&other.component(index)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

/// Compares two raw version strings; `None` when either side is unparsable.
pub fn compare_versions(left: &str, right: &str) -> Option<Ordering> {
    Some(HostVersion::parse(left)?.cmp(&HostVersion::parse(right)?))
}
