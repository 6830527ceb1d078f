use std::num::NonZeroUsize;
use std::ops::Range;

/// One contiguous window of the article sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    /// 1-based position among all batches
    pub number: usize,
    pub total: usize,
    pub start: usize,
    pub len: usize,
}

impl Batch {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    /// Whether an echoed idx names an article of this window. Negative never does.
    pub fn contains(&self, idx: i64) -> bool {
        usize::try_from(idx).is_ok_and(|idx| self.range().contains(&idx))
    }
}

/// Split `count` items into windows of `window`; only the last may be shorter.
pub fn partition(count: usize, window: NonZeroUsize) -> Vec<Batch> {
    let window = window.get();
    let total = count.div_ceil(window);
    (0..total)
        .map(|i| {
            let start = i * window;
            Batch {
                number: i + 1,
                total,
                start,
                len: window.min(count - start),
            }
        })
        .collect()
}
