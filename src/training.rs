//! Training options, callbacks, and results.

/// Progress callback type for training.
///
/// Called after each epoch with (epoch, accuracy on the training set).
/// Return `false` to stop training early.
pub type ProgressCallback = Box<dyn FnMut(usize, f32) -> bool + Send>;

/// Options for [`fit_with_options`](crate::GraphTsetlinMachine::fit_with_options).
///
/// Examples are always visited in order; the automata learn online, so the
/// order is part of the result.
pub struct FitOptions {
    pub epochs:      usize,
    pub incremental: bool,
    pub early_stop:  Option<EarlyStop>,
    pub callback:    Option<ProgressCallback>
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            epochs:      100,
            incremental: false,
            early_stop:  None,
            callback:    None
        }
    }
}

impl core::fmt::Debug for FitOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FitOptions")
            .field("epochs", &self.epochs)
            .field("incremental", &self.incremental)
            .field("early_stop", &self.early_stop)
            .field("callback", &self.callback.as_ref().map(|_| "..."))
            .finish()
    }
}

impl FitOptions {
    /// Creates options for `epochs` epochs starting from a fresh model.
    #[must_use]
    pub fn new(epochs: usize) -> Self {
        Self {
            epochs,
            ..Self::default()
        }
    }

    /// Continues from the current automata and weights instead of
    /// re-initializing them.
    #[must_use]
    pub fn incremental(mut self) -> Self {
        self.incremental = true;
        self
    }

    /// Enables early stopping with patience.
    ///
    /// Training stops if accuracy doesn't improve by `min_delta`
    /// for `patience` consecutive epochs.
    #[must_use]
    pub fn with_early_stop(mut self, patience: usize, min_delta: f32) -> Self {
        self.early_stop = Some(EarlyStop {
            patience,
            min_delta
        });
        self
    }

    /// Sets progress callback.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let opts = FitOptions::new(20).with_callback(|epoch, acc| {
    ///     println!("Epoch {}: {:.1}%", epoch, acc * 100.0);
    ///     true
    /// });
    /// ```
    #[must_use]
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: FnMut(usize, f32) -> bool + Send + 'static
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Whether per-epoch accuracy has to be measured.
    #[inline]
    pub(crate) fn monitored(&self) -> bool {
        self.early_stop.is_some() || self.callback.is_some()
    }
}

/// Early stopping configuration.
#[derive(Debug, Clone, Copy)]
pub struct EarlyStop {
    /// Number of epochs without improvement before stopping.
    pub patience:  usize,
    /// Minimum improvement required to reset patience counter.
    pub min_delta: f32
}

/// Result of training.
#[derive(Debug, Clone, Default)]
pub struct FitResult {
    /// Number of epochs actually run.
    pub epochs_run:     usize,
    /// Accuracy on the training set after the last epoch, when monitored.
    pub final_accuracy: Option<f32>,
    /// Whether training stopped before the epoch budget.
    pub stopped_early:  bool,
    /// Accuracy history per epoch, when monitored.
    pub history:        Vec<f32>
}

/// Tracks early stopping state during training.
#[derive(Debug)]
pub struct EarlyStopTracker {
    patience:  usize,
    min_delta: f32,
    best:      f32,
    wait:      usize
}

impl EarlyStopTracker {
    #[must_use]
    pub fn new(config: &EarlyStop) -> Self {
        Self {
            patience:  config.patience,
            min_delta: config.min_delta,
            best:      0.0,
            wait:      0
        }
    }

    /// Returns `true` once accuracy failed to improve for `patience` epochs.
    pub fn update(&mut self, accuracy: f32) -> bool {
        if accuracy > self.best + self.min_delta {
            self.best = accuracy;
            self.wait = 0;
            false
        } else {
            self.wait += 1;
            self.wait >= self.patience
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let opts = FitOptions::default();
        assert_eq!(opts.epochs, 100);
        assert!(!opts.incremental);
        assert!(!opts.monitored());
    }

    #[test]
    fn early_stop_tracker() {
        let config = EarlyStop {
            patience:  3,
            min_delta: 0.01
        };
        let mut tracker = EarlyStopTracker::new(&config);

        assert!(!tracker.update(0.5));
        assert!(!tracker.update(0.6));
        assert!(!tracker.update(0.6));
        assert!(!tracker.update(0.6));
        assert!(tracker.update(0.6));
    }

    #[test]
    fn fit_options_builders() {
        let opts = FitOptions::new(50).incremental().with_early_stop(5, 0.001);
        assert_eq!(opts.epochs, 50);
        assert!(opts.incremental);
        let es = opts.early_stop.unwrap();
        assert_eq!(es.patience, 5);
        assert!(opts.monitored());
    }

    #[test]
    fn fit_options_with_callback() {
        let opts = FitOptions::new(10).with_callback(|_epoch, _acc| true);
        assert!(opts.callback.is_some());
        assert!(opts.monitored());
        assert!(format!("{opts:?}").contains("..."));
    }
}
