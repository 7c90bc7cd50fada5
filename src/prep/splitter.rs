use serde::Serialize;

pub const INPUT_WINDOW: usize = 6;
pub const OUTPUT_HORIZON: usize = 3;
pub const DEFAULT_VAL_RATIO: f64 = 0.1;
pub const DEFAULT_TEST_RATIO: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequencePair<T> {
    pub input: Vec<T>,
    pub output: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceSplit<T> {
    pub train: Vec<SequencePair<T>>,
    pub val: Vec<SequencePair<T>>,
    pub test: Vec<SequencePair<T>>,
}

impl<T> Default for SequenceSplit<T> {
    fn default() -> Self {
        Self {
            train: Vec::new(),
            val: Vec::new(),
            test: Vec::new(),
        }
    }
}

impl<T> SequenceSplit<T> {
    pub fn len(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn extend(&mut self, other: SequenceSplit<T>) {
        self.train.extend(other.train);
        self.val.extend(other.val);
        self.test.extend(other.test);
    }
}

/// Window start indices for each partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitRanges {
    pub train: std::ops::Range<usize>,
    pub val: std::ops::Range<usize>,
    pub test: std::ops::Range<usize>,
}

/// `val = floor(n * val_ratio)`, `test = floor(n * test_ratio)` and the training
/// windows take what is left: `n - val - test - input - output + 1`. The three
/// ranges are adjacent, so every window start belongs to exactly one partition.
/// Short series shrink train first, then val, then test, so that no window
/// reads past the end of the series.
pub fn split_ranges(n: usize, input: usize, output: usize, val_ratio: f64, test_ratio: f64) -> SplitRanges {
    let windows = (n + 1).saturating_sub(input + output);
    let val = ((n as f64 * val_ratio).floor() as usize).min(windows);
    let test = ((n as f64 * test_ratio).floor() as usize).min(windows - val);
    let train = windows - val - test;
    SplitRanges {
        train: 0..train,
        val: train..train + val,
        test: train + val..train + val + test,
    }
}

/// Slides an `input`-row window followed by its `output`-row horizon over one
/// series and partitions the windows by start index.
pub fn split_sequences<T: Clone>(
    rows: &[T],
    input: usize,
    output: usize,
    val_ratio: f64,
    test_ratio: f64,
) -> SequenceSplit<T> {
    let ranges = split_ranges(rows.len(), input, output, val_ratio, test_ratio);
    let window = |start: usize| SequencePair {
        input: rows[start..start + input].to_vec(),
        output: rows[start + input..start + input + output].to_vec(),
    };
    SequenceSplit {
        train: ranges.train.map(window).collect(),
        val: ranges.val.map(window).collect(),
        test: ranges.test.map(window).collect(),
    }
}

/// Splits each series on its own and concatenates the partitions, so windows
/// never span two sensors.
pub fn split_many<'a, T: Clone + 'a>(
    series: impl IntoIterator<Item = &'a [T]>,
    input: usize,
    output: usize,
    val_ratio: f64,
    test_ratio: f64,
) -> SequenceSplit<T> {
    let mut combined = SequenceSplit::default();
    for rows in series {
        combined.extend(split_sequences(rows, input, output, val_ratio, test_ratio));
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn training_window_count_follows_the_formula() {
        let rows: Vec<usize> = (0..100).collect();
        let split = split_sequences(&rows, INPUT_WINDOW, OUTPUT_HORIZON, 0.1, 0.1);
        // 100 - 10 - 10 - 6 - 3 + 1
        assert_eq!(split.train.len(), 72);
        assert_eq!(split.val.len(), 10);
        assert_eq!(split.test.len(), 10);
    }

    #[test]
    fn ranges_are_contiguous_and_non_overlapping() {
        let ranges = split_ranges(240, 6, 3, 0.1, 0.1);
        assert_eq!(ranges.train, 0..184);
        assert_eq!(ranges.val, 184..208);
        assert_eq!(ranges.test, 208..232);
        assert_eq!(ranges.train.end, ranges.val.start);
        assert_eq!(ranges.val.end, ranges.test.start);
        assert_eq!(ranges.test.end + 6 + 3 - 1, 240);
    }

    #[test]
    fn windows_pair_input_with_following_horizon() {
        let rows: Vec<usize> = (0..30).collect();
        let split = split_sequences(&rows, 6, 3, 0.1, 0.1);
        let first = &split.train[0];
        assert_eq!(first.input, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(first.output, vec![6, 7, 8]);

        let last_test = split.test.last().unwrap();
        assert_eq!(last_test.output.last(), Some(&29));
        assert_eq!(split.val[0].input[0], split.train.len());
    }

    #[test]
    fn short_series_yields_nothing_instead_of_panicking() {
        let rows: Vec<u8> = vec![1, 2, 3, 4, 5, 6, 7, 8];
        assert!(split_sequences(&rows, 6, 3, 0.1, 0.1).is_empty());

        let rows: Vec<u8> = (0..12).collect();
        let split = split_sequences(&rows, 6, 3, 0.1, 0.1);
        assert_eq!((split.train.len(), split.val.len(), split.test.len()), (2, 1, 1));
    }

    #[test]
    fn many_series_do_not_share_windows() {
        let a: Vec<u32> = (0..20).collect();
        let b: Vec<u32> = (100..120).collect();
        let split = split_many([a.as_slice(), b.as_slice()], 6, 3, 0.1, 0.1);
        assert_eq!(split.train.len(), 2 * (20 - 2 - 2 - 6 - 3 + 1));
        assert!(split
            .train
            .iter()
            .all(|pair| pair.input[0] / 100 == pair.output[2] / 100));
    }
}
