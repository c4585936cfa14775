/// Separator between the fields of a source line; the value is the last field.
pub const FIELD_SEPARATOR: char = ':';

/// An immutable, ordered run of samples loaded from one named source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSeries {
    name: String,
    values: Vec<f64>,
}

impl SampleSeries {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        SampleSeries { name: name.into(), values }
    }

    /// Parses source text and min-max normalizes whatever survives parsing.
    pub fn from_text(name: impl Into<String>, text: &str) -> Self {
        SampleSeries::new(name, normalize(parse_values(text)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Extracts the trailing numeric field of each line.
/// Lines without one, and values that are not finite, are skipped.
pub fn parse_values(text: &str) -> Vec<f64> {
    text.lines()
        .filter_map(|line| line.trim().rsplit(FIELD_SEPARATOR).next())
        .filter_map(|field| field.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .collect()
}

/// Maps values onto [0, 1] with `(v - min) / (max - min)`.
/// Empty and constant inputs are returned unchanged.
pub fn normalize(values: Vec<f64>) -> Vec<f64> {
    let Some((min, max)) = min_max(&values) else {
        return values;
    };
    if max == min {
        return values;
    }
    let span = max - min;
    values.into_iter().map(|v| (v - min) / span).collect()
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_values_takes_trailing_field() {
        let text = "ch0: 12.5\nts:3:-4\n  7  \nheader line\n\nadc:abc\n";
        assert_eq!(parse_values(text), vec![12.5, -4.0, 7.0]);
    }

    #[test]
    fn test_parse_values_strips_non_finite() {
        let text = "a:NaN\nb:1\nc:inf\nd:-infinity\ne:2\n";
        assert_eq!(parse_values(text), vec![1.0, 2.0]);
    }

    #[test]
    fn test_normalize_ramp() {
        let ramp: Vec<f64> = (0..100).map(|v| v as f64).collect();
        let out = normalize(ramp);
        assert_eq!(out.len(), 100);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[99], 1.0);
        assert!(out.iter().all(|&v| (0.0..=1.0).contains(&v)));
        let lo = out.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = out.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!((lo, hi), (0.0, 1.0));
    }

    #[test]
    fn test_normalize_is_idempotent_on_unit_range() {
        let values = vec![0.0, 0.25, 1.0, 0.5, 0.125];
        assert_eq!(normalize(values.clone()), values);
    }

    #[test]
    fn test_normalize_degenerate_inputs() {
        assert!(normalize(Vec::new()).is_empty());
        assert_eq!(normalize(vec![3.0, 3.0, 3.0]), vec![3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_from_text_end_to_end() {
        let text: String = (0..100).map(|v| format!("sample:{}\n", v)).collect();
        let series = SampleSeries::from_text("ramp.txt", &text);
        assert_eq!(series.name(), "ramp.txt");
        assert_eq!(series.len(), 100);
        assert_eq!(series.get(0), Some(0.0));
        assert_eq!(series.get(99), Some(1.0));
        assert_eq!(series.get(100), None);
    }

    #[test]
    fn test_from_text_nothing_parses() {
        let series = SampleSeries::from_text("junk.txt", "no\nnumbers:here\n");
        assert!(series.is_empty());
    }
}
