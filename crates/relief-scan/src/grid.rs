//! Scan grid model: bounds, derived step counts, and the sample grid.

/// Rectangular scan area. All lengths in millimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    /// Grid pitch. Must be positive.
    pub step: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum BoundsError {
    #[error("step must be positive, got {0}")]
    StepNotPositive(f64),

    #[error("bounds yield a degenerate grid ({steps_x} × {steps_y} points)")]
    Degenerate { steps_x: i64, steps_y: i64 },
}

impl ScanBounds {
    /// Grid points along x: `floor((x_max - x_min) / step) - 1`.
    pub fn steps_x(&self) -> i64 {
        ((self.x_max - self.x_min) / self.step).floor() as i64 - 1
    }

    /// Grid points along y: `floor((y_max - y_min) / step) - 1`.
    pub fn steps_y(&self) -> i64 {
        ((self.y_max - self.y_min) / self.step).floor() as i64 - 1
    }

    /// A scannable grid needs a positive step and at least one point per axis.
    pub fn validate(&self) -> Result<(), BoundsError> {
        if !(self.step > 0.0) {
            return Err(BoundsError::StepNotPositive(self.step));
        }
        let (steps_x, steps_y) = (self.steps_x(), self.steps_y());
        if steps_x < 1 || steps_y < 1 {
            return Err(BoundsError::Degenerate { steps_x, steps_y });
        }
        Ok(())
    }
}

/// One measured grid point: stage position plus measured distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Rectangular sample grid.
///
/// Populated row by row in acquisition order — ascending y rows, ascending x
/// within a row — and read-only afterwards. Storage is flat, row-major by y,
/// so acquisition order and storage order coincide.
#[derive(Debug, Clone)]
pub struct SampleGrid {
    steps_x: usize,
    steps_y: usize,
    samples: Vec<Sample>,
}

impl SampleGrid {
    pub fn with_dimensions(steps_x: usize, steps_y: usize) -> Self {
        Self {
            steps_x,
            steps_y,
            samples: Vec::with_capacity(steps_x * steps_y),
        }
    }

    pub fn steps_x(&self) -> usize {
        self.steps_x
    }

    pub fn steps_y(&self) -> usize {
        self.steps_y
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Every cell holds a sample.
    pub fn is_complete(&self) -> bool {
        self.samples.len() == self.steps_x * self.steps_y
    }

    /// Append the next sample in acquisition order.
    pub fn push(&mut self, sample: Sample) {
        debug_assert!(self.samples.len() < self.steps_x * self.steps_y);
        self.samples.push(sample);
    }

    /// The sample at grid cell (ix, iy). Panics if out of range or not yet
    /// acquired — indices are producer-controlled.
    pub fn get(&self, ix: usize, iy: usize) -> &Sample {
        assert!(ix < self.steps_x && iy < self.steps_y);
        &self.samples[iy * self.steps_x + ix]
    }

    /// All samples with their cell indices, in acquisition order.
    pub fn samples(&self) -> impl Iterator<Item = (usize, usize, &Sample)> {
        self.samples
            .iter()
            .enumerate()
            .map(|(i, s)| (i % self.steps_x, i / self.steps_x, s))
    }
}
