/// One published input/expected-output pair. Identity is its position in the
/// owning [`SampleSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub input: String,
    pub output: String,
}

/// Samples of one problem, in document (or file) order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleSet {
    samples: Vec<Sample>,
}

impl Sample {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

impl SampleSet {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    /// Samples paired with their 1-based index.
    pub fn numbered(&self) -> impl Iterator<Item = (usize, &Sample)> {
        self.samples.iter().enumerate().map(|(i, s)| (i + 1, s))
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        index.checked_sub(1).and_then(|i| self.samples.get(i))
    }
}

impl FromIterator<Sample> for SampleSet {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a SampleSet {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

impl From<Vec<Sample>> for SampleSet {
    fn from(samples: Vec<Sample>) -> Self {
        Self::new(samples)
    }
}
