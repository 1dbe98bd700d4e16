use std::collections::VecDeque;

/// fixed-capacity ring buffer of the most recent samples. pushing onto a full
/// window evicts the oldest sample.
#[derive(Debug, Clone)]
pub struct SampleWindow<T> {
    capacity: usize,
    samples: VecDeque<T>,
}

impl<T> SampleWindow<T> {
    /// a window holding at most `capacity` samples. a zero capacity is raised to one.
    pub fn new(capacity: usize) -> SampleWindow<T> {
        let capacity = capacity.max(1);
        SampleWindow {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// appends a sample, returning the evicted sample if the window was full.
    pub fn push(&mut self, sample: T) -> Option<T> {
        let evicted = if self.samples.len() == self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&T> {
        self.samples.back()
    }

    /// samples from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::SampleWindow;

    #[test]
    fn test_evicts_oldest_when_full() {
        let mut window = SampleWindow::new(3);
        assert_eq!(window.push(1), None);
        assert_eq!(window.push(2), None);
        assert_eq!(window.push(3), None);
        assert_eq!(window.push(4), Some(1));
        assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(window.latest(), Some(&4));
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut window = SampleWindow::new(0);
        window.push("a");
        window.push("b");
        assert_eq!(window.capacity(), 1);
        assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec!["b"]);
    }
}
