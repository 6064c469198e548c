/*!

Per-patient random number streams.

Every patient owns a private [`PatientRng`] seeded with nothing but its [`PatientId`]. Two
simulations of the same patient under the same scenario and horizon therefore draw the
same numbers in the same order, regardless of which thread runs them or how many other
patients ran before. The mapping from a patient's position in a cohort to its id lives in
exactly one place, [`patient_id`].

*/

use crate::{
    PatientId,
    error::{MicrosimError, Result},
};
use rand::{Rng, SeedableRng, distr::Open01, rngs::StdRng};

/// The generator type behind every patient stream.
pub type PatientRng = StdRng;

/// Creates the random stream for `id`.
#[must_use]
pub fn patient_rng(id: PatientId) -> PatientRng {
    PatientRng::seed_from_u64(id.0)
}

/// The id of the `index`-th patient in cohort `cohort_id` of size `pop_size`:
/// `cohort_id * pop_size + index`.
///
/// Cohorts of the same size with different ids occupy disjoint id ranges, so cohorts run in
/// the same process never share a seed. Fails if `index` is not below `pop_size` or the id
/// does not fit in a `u64`.
pub fn patient_id(cohort_id: u64, pop_size: u64, index: u64) -> Result<PatientId> {
    if index >= pop_size {
        return Err(MicrosimError::invariant(format!(
            "patient index {index} is outside a cohort of {pop_size}"
        )));
    }
    cohort_id
        .checked_mul(pop_size)
        .and_then(|base| base.checked_add(index))
        .map(PatientId)
        .ok_or_else(|| {
            MicrosimError::invariant(format!(
                "patient id for cohort {cohort_id}, size {pop_size}, index {index} overflows u64"
            ))
        })
}

/// Sampling helpers used by the trajectory simulator. Implemented for every `Rng`.
pub trait RandomStreamExt: Rng {
    /// A uniform draw from the open interval `(0, 1)`. Never returns exactly 0 or 1, so its
    /// logarithm is always finite and negative.
    fn sample_open_unit(&mut self) -> f64 {
        self.sample(Open01)
    }

    /// A uniform draw from `[0, 1)`.
    fn sample_unit(&mut self) -> f64 {
        self.random::<f64>()
    }

    /// An exponential waiting time with the given `rate` by inversion, `-ln(u) / rate`.
    /// The result is strictly positive for any positive, finite rate.
    fn sample_exponential(&mut self, rate: f64) -> f64 {
        -self.sample_open_unit().ln() / rate
    }
}

impl<R: Rng> RandomStreamExt for R {}
