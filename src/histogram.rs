use crate::model::ValueDistribution;

/// Danger banding of a value range against a pair of ordered thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinClass {
    Good,
    Warning,
    Critical,
}

/// Two ordered thresholds plus the direction in which values are dangerous.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub warning: f64,
    pub critical: f64,
    /// When set, low values are dangerous (energy); otherwise high values
    /// are (hunger, thirst).
    pub low_is_bad: bool,
}

impl Thresholds {
    pub fn low_is_bad(warning: f64, critical: f64) -> Self {
        Self {
            warning,
            critical,
            low_is_bad: true,
        }
    }

    pub fn high_is_bad(warning: f64, critical: f64) -> Self {
        Self {
            warning,
            critical,
            low_is_bad: false,
        }
    }

    /// Classification for a bin, judged by its lower bound.
    pub fn classify(&self, lower_bound: f64) -> BinClass {
        if self.low_is_bad {
            if lower_bound <= self.critical {
                BinClass::Critical
            } else if lower_bound <= self.warning {
                BinClass::Warning
            } else {
                BinClass::Good
            }
        } else if lower_bound >= self.critical {
            BinClass::Critical
        } else if lower_bound >= self.warning {
            BinClass::Warning
        } else {
            BinClass::Good
        }
    }
}

/// One fixed-width histogram bin, recomputed on every dashboard refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub label: String,
    pub lower: i64,
    pub count: u64,
    pub class: BinClass,
}

/// Converts a sparse value -> count map into ordered fixed-width bins over
/// `[0, upper_bound)`. Values outside the domain are dropped (documented
/// data loss, not an error). A zero bin width yields no bins; callers show
/// an empty panel.
pub fn bin_distribution(
    distribution: &ValueDistribution,
    bin_width: u32,
    upper_bound: u32,
    thresholds: Option<Thresholds>,
) -> Vec<HistogramBin> {
    if bin_width == 0 || upper_bound == 0 {
        return Vec::new();
    }

    let width = bin_width as i64;
    let upper = upper_bound as i64;
    let bin_count = upper_bound.div_ceil(bin_width) as usize;

    let mut bins: Vec<HistogramBin> = (0..bin_count)
        .map(|index| {
            let lower = index as i64 * width;
            let high = (lower + width).min(upper) - 1;
            let class = thresholds
                .map(|t| t.classify(lower as f64))
                .unwrap_or(BinClass::Good);
            HistogramBin {
                label: format!("{lower}-{high}"),
                lower,
                count: 0,
                class,
            }
        })
        .collect();

    for (&value, &count) in distribution {
        if value < 0 || value >= upper {
            continue;
        }
        bins[(value / width) as usize].count += count;
    }

    bins
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distribution(pairs: &[(i64, u64)]) -> ValueDistribution {
        pairs.iter().copied().collect()
    }

    #[test]
    fn bins_cover_the_domain_in_fixed_steps() {
        let input = distribution(&[(5, 2), (15, 3), (95, 1)]);
        let bins = bin_distribution(&input, 10, 101, None);
        assert_eq!(bins.len(), 11);
        assert_eq!(bins[0].label, "0-9");
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[1].label, "10-19");
        assert_eq!(bins[1].count, 3);
        assert_eq!(bins[9].label, "90-99");
        assert_eq!(bins[9].count, 1);
        assert_eq!(bins[10].label, "100-100");
        let others: u64 = bins
            .iter()
            .enumerate()
            .filter(|(i, _)| ![0, 1, 9].contains(i))
            .map(|(_, b)| b.count)
            .sum();
        assert_eq!(others, 0);
    }

    #[test]
    fn values_outside_the_domain_are_dropped() {
        let input = distribution(&[(-3, 9), (101, 4), (250, 2), (99, 1)]);
        let bins = bin_distribution(&input, 10, 101, None);
        let total: u64 = bins.iter().map(|b| b.count).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn zero_bin_width_yields_empty_set() {
        let input = distribution(&[(5, 2)]);
        assert!(bin_distribution(&input, 0, 101, None).is_empty());
    }

    #[test]
    fn low_is_bad_classifies_by_lower_bound() {
        let thresholds = Thresholds::low_is_bad(30.0, 10.0);
        assert_eq!(thresholds.classify(5.0), BinClass::Critical);
        assert_eq!(thresholds.classify(10.0), BinClass::Critical);
        assert_eq!(thresholds.classify(20.0), BinClass::Warning);
        assert_eq!(thresholds.classify(30.0), BinClass::Warning);
        assert_eq!(thresholds.classify(50.0), BinClass::Good);
    }

    #[test]
    fn high_is_bad_flips_the_direction() {
        let thresholds = Thresholds::high_is_bad(50.0, 80.0);
        assert_eq!(thresholds.classify(5.0), BinClass::Good);
        assert_eq!(thresholds.classify(50.0), BinClass::Warning);
        assert_eq!(thresholds.classify(79.0), BinClass::Warning);
        assert_eq!(thresholds.classify(80.0), BinClass::Critical);
    }

    #[test]
    fn binning_and_classification_compose() {
        let input = distribution(&[(5, 1), (25, 1), (55, 1)]);
        let bins = bin_distribution(&input, 10, 101, Some(Thresholds::low_is_bad(30.0, 10.0)));
        assert_eq!(bins[0].class, BinClass::Critical);
        assert_eq!(bins[2].class, BinClass::Warning);
        assert_eq!(bins[5].class, BinClass::Good);
    }
}
