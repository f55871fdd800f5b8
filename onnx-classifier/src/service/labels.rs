/// Classes of the produce quality model, in the order of its output scores.
pub const PRODUCE_LABELS: [&str; 45] = include!("labels/produce_labels.in");

/// The table shipped with the crate.
pub const PRODUCE: LabelTable = LabelTable::new("produce-v1", &PRODUCE_LABELS);

/// An immutable, versioned list of class names.
///
/// The i-th score of the model output belongs to the i-th label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LabelTable {
    version: &'static str,
    labels: &'static [&'static str],
}

impl LabelTable {
    pub const fn new(version: &'static str, labels: &'static [&'static str]) -> Self {
        Self { version, labels }
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'static str> {
        self.labels.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.labels.iter().copied()
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        PRODUCE
    }
}
