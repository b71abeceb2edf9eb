use std::fmt;

use ndarray::ArrayView2;

use crate::error::{Error, Result};

/// Placeholder for samples of a fixed number of features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    width: usize,
}

impl Input {
    pub fn new(width: usize) -> Result<Self> {
        if width == 0 {
            return Err(Error::Configuration(
                "input width must be at least 1".to_string(),
            ));
        }
        Ok(Self { width })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Check a batch before anything downstream touches it.
    pub fn check(&self, samples: ArrayView2<f64>) -> Result<()> {
        if samples.ncols() != self.width {
            return Err(Error::shape(
                format!("{} features", self.width),
                format!("{} features", samples.ncols()),
            ));
        }
        if samples.nrows() == 0 {
            return Err(Error::shape("at least 1 sample", "0 samples"));
        }
        Ok(())
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Input (width: {})", self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::Array2;

    #[test]
    fn check_width() {
        let input = Input::new(3).unwrap();
        assert!(input.check(Array2::zeros((2, 3)).view()).is_ok());
        assert!(matches!(
            input.check(Array2::zeros((2, 4)).view()),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn empty_batch_is_rejected() {
        let input = Input::new(3).unwrap();
        assert!(input.check(Array2::zeros((0, 3)).view()).is_err());
    }

    #[test]
    fn zero_width_is_rejected() {
        assert!(matches!(Input::new(0), Err(Error::Configuration(_))));
    }
}
