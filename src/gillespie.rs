/*!

Next-event sampling for a continuous-time Markov chain (the Gillespie direct method).

From a state with total exit rate `λ`, the time to the next transition is exponential with
rate `λ`, and the destination is chosen with probability proportional to its individual
rate. Both draws come from the caller's stream, holding time first.

*/

use crate::{
    log::trace,
    random::RandomStreamExt,
    rate_matrix::RateMatrix,
    state::HealthState,
};
use rand::Rng;

/// The outcome of one [`next_event`] call.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct NextEvent {
    /// Time until the transition, or `None` if `current` is absorbing.
    pub dt: Option<f64>,
    /// Destination of the transition; equals the current state when `dt` is `None`.
    pub next_state: HealthState,
}

/// Samples the holding time in `current` and the state entered after it.
///
/// An absorbing state (total exit rate zero) returns `dt: None` and consumes no randomness.
/// Otherwise `u1` on `(0, 1)` gives `dt = -ln(u1) / total`, which is strictly positive, and
/// an independent `u2` on `[0, 1)` selects the first target, in ascending index order,
/// whose cumulative normalized rate exceeds `u2`.
pub fn next_event<R: Rng>(rates: &RateMatrix, current: HealthState, rng: &mut R) -> NextEvent {
    let total = rates.total_exit_rate(current);
    if total == 0.0 {
        return NextEvent {
            dt: None,
            next_state: current,
        };
    }

    let dt = rng.sample_exponential(total);
    let next_state = select_target(rates.outgoing_weights(current), total, rng.sample_unit());
    trace!("{current} -> {next_state} after {dt}");

    NextEvent {
        dt: Some(dt),
        next_state,
    }
}

/// Categorical draw over `weights` normalized by `total`. `weights` is nonempty whenever
/// `total > 0`.
fn select_target(weights: &[(HealthState, f64)], total: f64, u: f64) -> HealthState {
    let mut cumulative = 0.0;
    for &(target, rate) in weights {
        cumulative += rate / total;
        if cumulative > u {
            return target;
        }
    }
    // Rounding can leave the final cumulative sum a hair below `u`.
    weights[weights.len() - 1].0
}
