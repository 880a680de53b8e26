//! Normalization of summary statistics before distances are taken.

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

use crate::error::{AbcError, CollaboratorError, Result};

/// Maps a summary statistic into the normalized space the observed statistic lives in.
pub trait Scaler: Send + Sync {
    fn transform(&self, stat: ArrayView1<f64>) -> Result<Array1<f64>, CollaboratorError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityScaler;

impl Scaler for IdentityScaler {
    fn transform(&self, stat: ArrayView1<f64>) -> Result<Array1<f64>, CollaboratorError> {
        Ok(stat.to_owned())
    }
}

/// Per-column standardization `(x - mean) / std` fitted on a reference table.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    pub mean: Array1<f64>,
    pub scale: Array1<f64>,
}

impl StandardScaler {
    /// Fits on `reference`, one summary statistic per row.
    ///
    /// Columns with zero variance get a scale of one so they are only centred.
    ///
    /// ```rust
    /// use abc_mcmc::scaler::{Scaler, StandardScaler};
    /// use ndarray::array;
    ///
    /// let scaler = StandardScaler::fit(array![[1.0, 5.0], [3.0, 5.0]].view()).unwrap();
    /// let scaled = scaler.transform(array![3.0, 6.0].view()).unwrap();
    /// assert_eq!(scaled, array![1.0, 1.0]);
    /// ```
    pub fn fit(reference: ArrayView2<f64>) -> Result<Self> {
        if reference.nrows() == 0 {
            return Err(AbcError::InvalidConfig(
                "cannot fit a scaler on an empty reference table".into(),
            ));
        }
        let mean = reference
            .mean_axis(Axis(0))
            .ok_or_else(|| AbcError::InvalidConfig("reference table has no rows".into()))?;
        let scale = reference
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 0.0 && s.is_finite() { s } else { 1.0 });
        Ok(Self { mean, scale })
    }
}

impl Scaler for StandardScaler {
    fn transform(&self, stat: ArrayView1<f64>) -> Result<Array1<f64>, CollaboratorError> {
        if stat.len() != self.mean.len() {
            return Err(format!(
                "statistic has {} entries, scaler was fitted on {}",
                stat.len(),
                self.mean.len()
            )
            .into());
        }
        Ok((&stat - &self.mean) / &self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn standard_scaler_centres_and_scales() {
        let reference = array![[0.0, 10.0], [2.0, 10.0], [4.0, 10.0]];
        let scaler = StandardScaler::fit(reference.view()).unwrap();
        assert_eq!(scaler.mean, array![2.0, 10.0]);
        let std0 = (8.0f64 / 3.0).sqrt();
        assert_abs_diff_eq!(scaler.scale, array![std0, 1.0], epsilon = 1e-12);

        let scaled = scaler.transform(array![4.0, 12.0].view()).unwrap();
        assert_abs_diff_eq!(scaled, array![2.0 / std0, 2.0], epsilon = 1e-12);
    }

    #[test]
    fn length_mismatch_fails() {
        let scaler = StandardScaler::fit(array![[1.0, 2.0]].view()).unwrap();
        assert!(scaler.transform(array![1.0].view()).is_err());
    }

    #[test]
    fn empty_reference_fails() {
        let empty = ndarray::Array2::<f64>::zeros((0, 2));
        assert!(StandardScaler::fit(empty.view()).is_err());
    }
}
