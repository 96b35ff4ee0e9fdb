//! Plateau detection over a trailing window of epoch errors.

use std::collections::VecDeque;

pub const DEFAULT_WINDOW: usize = 10;
pub const DEFAULT_STD_THRESHOLD: f32 = 1e-5;

/// Flags stagnation once the last `window` epoch errors have a population
/// standard deviation at or below `std_threshold`.
///
/// Each call to [`PlateauDetector::observe`] moves the window by one error, so
/// the detector can fire at most once per window position.
#[derive(Debug, Clone)]
pub struct PlateauDetector {
    window: usize,
    std_threshold: f32,
    errors: VecDeque<f32>,
}

impl Default for PlateauDetector {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_STD_THRESHOLD)
    }
}

impl PlateauDetector {
    /// `window` is clamped to at least 1.
    pub fn new(window: usize, std_threshold: f32) -> Self {
        let window = window.max(1);
        Self {
            window,
            std_threshold,
            errors: VecDeque::with_capacity(window + 1),
        }
    }

    /// Push `error` into the window and report whether training has plateaued.
    pub fn observe(&mut self, error: f32) -> bool {
        self.errors.push_back(error);
        while self.errors.len() > self.window {
            self.errors.pop_front();
        }

        match self.std_dev() {
            Some(std) => (0.0..=self.std_threshold).contains(&std),
            None => false,
        }
    }

    /// Population standard deviation of the window, once it is full.
    pub fn std_dev(&self) -> Option<f32> {
        if !self.is_full() {
            return None;
        }
        let n = self.errors.len() as f32;
        let mean = self.errors.iter().sum::<f32>() / n;
        let var = self
            .errors
            .iter()
            .map(|e| (e - mean) * (e - mean))
            .sum::<f32>()
            / n;
        Some(var.sqrt())
    }

    /// Forget every observed error.
    pub fn reset(&mut self) {
        self.errors.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.errors.len() == self.window
    }

    #[inline]
    pub fn window(&self) -> usize {
        self.window
    }

    #[inline]
    pub fn std_threshold(&self) -> f32 {
        self.std_threshold
    }
}
