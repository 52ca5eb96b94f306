use std::collections::VecDeque;

use fos_core::config::AOA_HISTORY_SIZE;

/// Spike rejection followed by a moving average.
///
/// A sample that jumps more than `max_change` degrees away from the last
/// accepted value is replaced by that value. The (possibly substituted)
/// sample then joins a FIFO window of [`AOA_HISTORY_SIZE`] entries whose mean
/// is the output.
///
/// # Example
/// ```
/// use fos_audio::filter::AoaFilter;
/// let mut filter = AoaFilter::new(6.0);
/// assert_eq!(filter.filter(5.0), 5.0);
/// ```
pub struct AoaFilter {
    max_change: f32,
    /// Last sample that passed the spike test. Always finite.
    last_valid: f32,
    /// Admitted values, oldest first (VecDeque for O(1) pop_front).
    history: VecDeque<f32>,
    initialized: bool,
}

impl AoaFilter {
    #[must_use]
    pub fn new(max_change: f32) -> Self {
        Self {
            max_change,
            last_valid: 0.0,
            history: VecDeque::with_capacity(AOA_HISTORY_SIZE),
            initialized: false,
        }
    }

    /// Filter one raw AOA reading and return the smoothed value.
    pub fn filter(&mut self, raw: f32) -> f32 {
        let admitted = self.reject_spike(raw);

        if self.history.len() >= AOA_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history.push_back(admitted);

        self.history.iter().sum::<f32>() / self.history.len() as f32
    }

    /// Value admitted in place of `raw`.
    fn reject_spike(&mut self, raw: f32) -> f32 {
        if !raw.is_finite() {
            log::debug!("Non-finite AOA reading dropped");
            return self.last_valid;
        }
        // The first finite reading seeds the reference.
        if !self.initialized {
            self.initialized = true;
            self.last_valid = raw;
            return raw;
        }
        if (raw - self.last_valid).abs() > self.max_change {
            log::debug!("AOA spike {raw:.2} rejected, holding {:.2}", self.last_valid);
            self.last_valid
        } else {
            self.last_valid = raw;
            raw
        }
    }

    /// Last sample that passed the spike test.
    #[must_use]
    pub fn last_valid(&self) -> f32 {
        self.last_valid
    }

    /// Number of values currently averaged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Forget all history; the next reading re-seeds the spike reference.
    pub fn reset(&mut self) {
        self.history.clear();
        self.last_valid = 0.0;
        self.initialized = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admitted(filter: &AoaFilter) -> Vec<f32> {
        filter.history.iter().copied().collect()
    }

    #[test]
    fn spike_is_replaced_by_last_valid_value() {
        let mut filter = AoaFilter::new(6.0);
        for raw in [5.0, 5.2, 40.0, 5.3] {
            filter.filter(raw);
        }
        assert_eq!(admitted(&filter), vec![5.0, 5.2, 5.2, 5.3]);
        assert_eq!(filter.last_valid(), 5.3);
    }

    #[test]
    fn history_never_exceeds_capacity() {
        let mut filter = AoaFilter::new(6.0);
        for i in 0..100 {
            filter.filter((i % 7) as f32);
            assert!(filter.len() <= AOA_HISTORY_SIZE);
        }
        assert_eq!(filter.len(), AOA_HISTORY_SIZE);
    }

    #[test]
    fn oldest_value_is_evicted_first() {
        let mut filter = AoaFilter::new(100.0);
        for i in 0..=AOA_HISTORY_SIZE {
            filter.filter(i as f32);
        }
        let values = admitted(&filter);
        assert_eq!(values.first().copied(), Some(1.0));
        assert_eq!(values.last().copied(), Some(AOA_HISTORY_SIZE as f32));
    }

    #[test]
    fn output_stays_within_admitted_values() {
        let mut filter = AoaFilter::new(6.0);
        let inputs = [2.0, 3.5, 30.0, 4.0, -20.0, 1.0, 6.5, 9.0, 80.0, 8.0];
        for raw in inputs {
            let out = filter.filter(raw);
            let values = admitted(&filter);
            let lo = values.iter().copied().fold(f32::INFINITY, f32::min);
            let hi = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            assert!(out >= lo - 1e-5 && out <= hi + 1e-5, "{out} outside [{lo}, {hi}]");
            assert!(!values.contains(&30.0) && !values.contains(&80.0));
        }
    }

    #[test]
    fn constant_input_converges() {
        let mut filter = AoaFilter::new(6.0);
        filter.filter(0.5);
        let mut out = 0.0;
        for _ in 0..AOA_HISTORY_SIZE {
            out = filter.filter(4.0);
        }
        assert!((out - 4.0).abs() < f32::EPSILON);
    }

    #[test]
    fn non_finite_readings_hold_last_valid() {
        let mut filter = AoaFilter::new(6.0);
        filter.filter(7.0);
        let out = filter.filter(f32::NAN);
        assert!((out - 7.0).abs() < f32::EPSILON);
        assert!(filter.last_valid().is_finite());
        filter.filter(f32::INFINITY);
        assert_eq!(admitted(&filter), vec![7.0, 7.0, 7.0]);
    }

    #[test]
    fn first_reading_seeds_reference() {
        let mut filter = AoaFilter::new(6.0);
        assert_eq!(filter.filter(15.0), 15.0);
        assert_eq!(filter.filter(16.0), 15.5);

        filter.reset();
        assert!(filter.is_empty());
        assert_eq!(filter.filter(-3.0), -3.0);
    }
}
