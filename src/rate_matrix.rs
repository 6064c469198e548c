/*!

Transition intensities between health states.

`rate[i][j]` is the instantaneous rate of moving from state `i` to state `j`. The diagonal
is ignored, so both a plain intensity table (zero diagonal) and a generator matrix
(diagonal equal to minus the row sum) are accepted. A row's off-diagonal sum is the
state's total exit rate, and a state is absorbing exactly when that sum is zero. The
matrix is validated against its [`StateSpace`] once, at construction.

*/

use crate::{
    error::{MicrosimError, Result},
    state::{HealthState, StateSpace},
};

#[derive(Clone, Debug)]
pub struct RateMatrix {
    rates: Vec<Vec<f64>>,
    total_exit_rates: Vec<f64>,
    /// Nonzero `(target, rate)` pairs for each row, ascending by target index.
    outgoing: Vec<Vec<(HealthState, f64)>>,
}

impl RateMatrix {
    /// Validates `rates` against `states`.
    ///
    /// Fails with a configuration error naming the offending row or entry if the matrix
    /// is not square with one row per state, an off-diagonal entry is negative or not
    /// finite, a row has no exits but its state is not declared absorbing, or a state
    /// declared absorbing has exits.
    pub fn new(states: &StateSpace, rates: Vec<Vec<f64>>) -> Result<Self> {
        let n = states.len();
        if rates.len() != n {
            return Err(MicrosimError::configuration(
                "rate",
                format!("expected {n} rows (one per state), found {}", rates.len()),
            ));
        }

        let mut total_exit_rates = Vec::with_capacity(n);
        let mut outgoing = Vec::with_capacity(n);

        for (i, row) in rates.iter().enumerate() {
            if row.len() != n {
                return Err(MicrosimError::configuration(
                    format!("rate[{i}]"),
                    format!("expected {n} entries, found {}", row.len()),
                ));
            }

            let mut total = 0.0;
            let mut weights = Vec::new();
            for (j, &rate) in row.iter().enumerate() {
                if j == i {
                    continue;
                }
                if !rate.is_finite() || rate < 0.0 {
                    return Err(MicrosimError::configuration(
                        format!("rate[{i}][{j}]"),
                        format!("transition rate must be finite and non-negative, found {rate}"),
                    ));
                }
                if rate > 0.0 {
                    total += rate;
                    weights.push((HealthState(j), rate));
                }
            }

            let state = HealthState(i);
            let declared_absorbing = states.is_declared_absorbing(state);
            if total == 0.0 && !declared_absorbing {
                return Err(MicrosimError::configuration(
                    format!("rate[{i}]"),
                    format!(
                        "state `{}` has no exits but is not declared absorbing",
                        states.name(state)
                    ),
                ));
            }
            if total > 0.0 && declared_absorbing {
                return Err(MicrosimError::configuration(
                    format!("rate[{i}]"),
                    format!(
                        "state `{}` is declared absorbing but has total exit rate {total}",
                        states.name(state)
                    ),
                ));
            }

            total_exit_rates.push(total);
            outgoing.push(weights);
        }

        Ok(RateMatrix {
            rates,
            total_exit_rates,
            outgoing,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    #[must_use]
    #[inline]
    pub fn rate(&self, from: HealthState, to: HealthState) -> f64 {
        if from == to { 0.0 } else { self.rates[from.0][to.0] }
    }

    #[must_use]
    #[inline]
    pub fn total_exit_rate(&self, state: HealthState) -> f64 {
        self.total_exit_rates[state.0]
    }

    #[must_use]
    #[inline]
    pub fn is_absorbing(&self, state: HealthState) -> bool {
        self.total_exit_rates[state.0] == 0.0
    }

    #[must_use]
    #[inline]
    pub fn outgoing_weights(&self, state: HealthState) -> &[(HealthState, f64)] {
        &self.outgoing[state.0]
    }

    /// The largest total exit rate over all states. The expected number of events in a
    /// trajectory of length `horizon` is bounded by `horizon * max_exit_rate()`.
    #[must_use]
    pub fn max_exit_rate(&self) -> f64 {
        self.total_exit_rates.iter().copied().fold(0.0, f64::max)
    }

    /// Row-major copy of the raw table, diagonal included as given.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rates
    }
}
