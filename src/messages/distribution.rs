use error::Error;
use std::f64;

/// RangeWithCount represents the number of values within a particular
/// range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeWithCount {
    /// The inclusive lower bound of the range. Meaningless for the lowest
    /// range, which has no lower bound.
    pub lower: f64,
    /// The exclusive upper bound of the range. Meaningless for the highest
    /// range, which has no upper bound.
    pub upper: f64,
    /// The number of values falling within the range.
    pub count: u64,
}

/// A summary of a stream of values.
///
/// The distribution keeps its bookkeeping consistent across every mutation:
/// `count` is always the sum of the range counts and `generation` advances by
/// exactly one per change. Ranges are sorted, contiguous and half-open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub(crate) min: f64,
    pub(crate) max: f64,
    pub(crate) average: f64,
    pub(crate) median: f64,
    pub(crate) sum: f64,
    pub(crate) count: u64,
    pub(crate) generation: u64,
    #[serde(rename = "isNotCumulative", default, skip_serializing_if = "is_false")]
    pub(crate) is_not_cumulative: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) ranges: Vec<RangeWithCount>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// `n` bucket bounds `start, start + step, ...`.
pub fn linear_bounds(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

/// `n` bucket bounds `start, start * factor, start * factor^2, ...`.
pub fn exponential_bounds(start: f64, factor: f64, n: usize) -> Vec<f64> {
    let mut bounds = Vec::with_capacity(n);
    let mut bound = start;
    for _ in 0..n {
        bounds.push(bound);
        bound *= factor;
    }
    bounds
}

impl Distribution {
    /// Create an empty cumulative distribution bucketed by `bounds`.
    ///
    /// `n` bounds produce `n + 1` ranges. The bounds must be finite and
    /// strictly increasing.
    pub fn new(bounds: &[f64]) -> Result<Distribution, Error> {
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(Error::InvalidDistribution("bounds must be finite"));
        }
        if bounds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::InvalidDistribution(
                "bounds must be strictly increasing",
            ));
        }
        let mut ranges = Vec::with_capacity(bounds.len() + 1);
        let mut lower = 0.0;
        for bound in bounds {
            ranges.push(RangeWithCount {
                lower: lower,
                upper: *bound,
                count: 0,
            });
            lower = *bound;
        }
        ranges.push(RangeWithCount {
            lower: lower,
            upper: 0.0,
            count: 0,
        });
        Ok(Distribution {
            min: 0.0,
            max: 0.0,
            average: 0.0,
            median: 0.0,
            sum: 0.0,
            count: 0,
            generation: 0,
            is_not_cumulative: false,
            ranges: ranges,
        })
    }

    /// Create an empty non-cumulative distribution. Values may be removed
    /// from and updated within a non-cumulative distribution.
    pub fn new_non_cumulative(bounds: &[f64]) -> Result<Distribution, Error> {
        let mut dist = Distribution::new(bounds)?;
        dist.is_not_cumulative = true;
        Ok(dist)
    }

    /// The smallest value ever added.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// The largest value ever added.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// The mean of the values currently held.
    pub fn average(&self) -> f64 {
        self.average
    }

    /// The approximate median of the values currently held.
    pub fn median(&self) -> f64 {
        self.median
    }

    /// The sum of the values currently held.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// The number of values currently held.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Incremented by one each time the distribution changes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True if values may be removed from this distribution.
    pub fn is_not_cumulative(&self) -> bool {
        self.is_not_cumulative
    }

    /// The bucketed counts, ascending.
    pub fn ranges(&self) -> &[RangeWithCount] {
        &self.ranges
    }

    /// Add a value.
    pub fn add(&mut self, value: f64) -> Result<(), Error> {
        check_sample(value)?;
        if self.ranges.is_empty() {
            return Err(Error::InvalidDistribution("no ranges"));
        }
        self.check_generation()?;
        if self.count == u64::max_value() {
            return Err(Error::InvalidDistribution("count exhausted"));
        }
        self.insert(value);
        self.changed();
        Ok(())
    }

    /// Remove a previously added value. Only non-cumulative distributions
    /// support removal.
    pub fn remove(&mut self, value: f64) -> Result<(), Error> {
        let idx = self.removable(value)?;
        self.check_generation()?;
        self.take(idx, value);
        self.changed();
        Ok(())
    }

    /// Replace `old` with `new` as a single change.
    pub fn update(&mut self, old: f64, new: f64) -> Result<(), Error> {
        let idx = self.removable(old)?;
        check_sample(new)?;
        self.check_generation()?;
        self.take(idx, old);
        self.insert(new);
        self.changed();
        Ok(())
    }

    /// Check that the distribution's bookkeeping holds: ranges sorted and
    /// contiguous, counts summing to `count`.
    pub fn validate(&self) -> Result<(), Error> {
        let last = self.ranges.len().saturating_sub(1);
        for (i, r) in self.ranges.iter().enumerate() {
            let lower_used = i > 0;
            let upper_used = i < last;
            if (lower_used && !r.lower.is_finite()) || (upper_used && !r.upper.is_finite()) {
                return Err(Error::InvalidDistribution("range bounds must be finite"));
            }
            if lower_used && upper_used && r.lower >= r.upper {
                return Err(Error::InvalidDistribution("empty or inverted range"));
            }
            if lower_used && self.ranges[i - 1].upper != r.lower {
                return Err(Error::InvalidDistribution(
                    "ranges must be sorted and contiguous",
                ));
            }
        }
        let total = self.ranges
            .iter()
            .fold(Some(0u64), |acc, r| acc.and_then(|a| a.checked_add(r.count)));
        if total != Some(self.count) {
            return Err(Error::InvalidDistribution(
                "count does not match range counts",
            ));
        }
        Ok(())
    }

    fn bucket(&self, value: f64) -> usize {
        if self.ranges.len() < 2 {
            return 0;
        }
        self.ranges[1..].partition_point(|r| r.lower <= value)
    }

    fn removable(&self, value: f64) -> Result<usize, Error> {
        if !self.is_not_cumulative {
            return Err(Error::CumulativeDistribution);
        }
        check_sample(value)?;
        let idx = self.bucket(value);
        match self.ranges.get(idx) {
            Some(r) if r.count > 0 => Ok(idx),
            _ => Err(Error::InvalidDistribution("no value to remove in range")),
        }
    }

    fn insert(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        let idx = self.bucket(value);
        self.ranges[idx].count += 1;
        self.count += 1;
        self.sum += value;
    }

    fn take(&mut self, idx: usize, value: f64) {
        self.ranges[idx].count -= 1;
        self.count -= 1;
        self.sum -= value;
        if self.count == 0 {
            self.min = 0.0;
            self.max = 0.0;
            self.sum = 0.0;
        }
    }

    fn check_generation(&self) -> Result<(), Error> {
        match self.generation.checked_add(1) {
            Some(_) => Ok(()),
            None => Err(Error::InvalidDistribution("generation exhausted")),
        }
    }

    fn changed(&mut self) {
        self.average = if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        };
        self.median = self.approximate_median();
        self.generation += 1;
    }

    fn approximate_median(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let half = self.count as f64 / 2.0;
        let last = self.ranges.len() - 1;
        let mut seen = 0u64;
        for (i, r) in self.ranges.iter().enumerate() {
            if r.count == 0 {
                continue;
            }
            if (seen + r.count) as f64 >= half {
                let lower = if i == 0 { self.min } else { r.lower.max(self.min) };
                let upper = if i == last { self.max } else { r.upper.min(self.max) };
                let frac = (half - seen as f64) / r.count as f64;
                let median = lower + (upper - lower) * frac;
                return median.max(self.min).min(self.max);
            }
            seen += r.count;
        }
        self.max
    }
}

fn check_sample(value: f64) -> Result<(), Error> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidSample(value))
    }
}
