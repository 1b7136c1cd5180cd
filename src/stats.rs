use std::fmt;

#[derive(Clone)]
pub struct Stats {
    sum: f64,
    count: u32,
    max: f64,
    min: f64
}

impl fmt::Debug for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), std::fmt::Error> {
        f.debug_struct("Stats")
            .field("count", &self.count)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("sum", &self.sum)
            .field("mean", &self.mean())
            .finish()
    }
}

impl Default for Stats {
    fn default() -> Self {
        Stats::new()
    }
}

impl Stats {

    pub fn new() -> Self {
        Stats {
            sum: 0.0,
            count: 0,
            max: f64::NAN,
            min: f64::NAN
        }
    }

    #[inline]
    pub fn report(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
        if self.min.is_nan() || self.min > value {
            self.min = value;
        }
        if self.max.is_nan() || self.max < value {
            self.max = value;
        }
    }

    /// Folds another accumulator into this one, as if every value it saw had
    /// been reported here.
    pub fn merge(&mut self, other: &Stats) {
        if other.count == 0 {
            return;
        }
        self.sum += other.sum;
        self.count += other.count;
        if self.min.is_nan() || self.min > other.min {
            self.min = other.min;
        }
        if self.max.is_nan() || self.max < other.max {
            self.max = other.max;
        }
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }

    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[inline]
    pub fn sum(&self) -> f64 {
        self.sum
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }
}
