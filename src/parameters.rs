/*!

`ScenarioParameters`: everything a patient simulation reads, validated once and then
shared read-only by every patient in every cohort that uses it.

Parameters are normally built from a [`ScenarioConfig`](crate::config::ScenarioConfig),
either deserialized from JSON or produced by one of the builders in
[`scenarios`](crate::scenarios). Construction has no side effects; call
[`ScenarioParameters::log_summary`] to log the tables.

*/

use crate::{
    log::debug,
    rate_matrix::RateMatrix,
    state::{HealthState, StateSpace},
};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// A one-time payment made when a patient enters a particular state, discounted as a point
/// payment at the time of entry.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct LumpCost {
    pub amount: f64,
    pub discount_rate: f64,
}

impl LumpCost {
    /// Present value of this payment made at `time`.
    #[must_use]
    pub fn present_value(&self, time: f64) -> f64 {
        crate::accrual::pv_single_payment(self.amount, self.discount_rate, time)
    }
}

#[derive(Clone, Debug)]
pub struct ScenarioParameters {
    pub(crate) name: String,
    pub(crate) states: StateSpace,
    pub(crate) rates: RateMatrix,
    pub(crate) initial_state: HealthState,
    pub(crate) annual_state_costs: Vec<f64>,
    pub(crate) annual_state_utilities: Vec<f64>,
    pub(crate) discount_rate: f64,
    pub(crate) treatment_overlay_cost: f64,
    /// States in which `treatment_overlay_cost` is added to the state's own annual cost.
    pub(crate) overlay_states: FxHashSet<HealthState>,
    /// Entries into these states are counted as polyps (intermediate lesions).
    pub(crate) lesion_states: FxHashSet<HealthState>,
    /// Entries into these states are counted as treatments.
    pub(crate) treatment_states: FxHashSet<HealthState>,
    pub(crate) lump_costs: FxHashMap<HealthState, LumpCost>,
}

impl ScenarioParameters {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn states(&self) -> &StateSpace {
        &self.states
    }

    #[must_use]
    pub fn rates(&self) -> &RateMatrix {
        &self.rates
    }

    #[must_use]
    pub fn initial_state(&self) -> HealthState {
        self.initial_state
    }

    #[must_use]
    pub fn discount_rate(&self) -> f64 {
        self.discount_rate
    }

    #[must_use]
    pub fn treatment_overlay_cost(&self) -> f64 {
        self.treatment_overlay_cost
    }

    /// Annual cost of occupying `state`, including the treatment overlay where it applies.
    #[must_use]
    #[inline]
    pub fn annual_flow_cost(&self, state: HealthState) -> f64 {
        let base = self.annual_state_costs[state.0];
        if self.overlay_states.contains(&state) {
            base + self.treatment_overlay_cost
        } else {
            base
        }
    }

    #[must_use]
    #[inline]
    pub fn annual_utility(&self, state: HealthState) -> f64 {
        self.annual_state_utilities[state.0]
    }

    #[must_use]
    #[inline]
    pub fn is_lesion_state(&self, state: HealthState) -> bool {
        self.lesion_states.contains(&state)
    }

    #[must_use]
    #[inline]
    pub fn is_treatment_state(&self, state: HealthState) -> bool {
        self.treatment_states.contains(&state)
    }

    #[must_use]
    #[inline]
    pub fn is_overlay_state(&self, state: HealthState) -> bool {
        self.overlay_states.contains(&state)
    }

    #[must_use]
    #[inline]
    pub fn lump_cost(&self, state: HealthState) -> Option<&LumpCost> {
        self.lump_costs.get(&state)
    }

    /// Logs the scenario's tables at `debug` level.
    pub fn log_summary(&self) {
        debug!(
            "scenario `{}`: {} states, initial state `{}`, discount rate {}",
            self.name,
            self.states.len(),
            self.states.name(self.initial_state),
            self.discount_rate
        );
        for state in self.states.iter() {
            debug!(
                "  {:<20} exit rate {:<12.6} cost {:<10} utility {:<6} rates {:?}",
                self.states.name(state),
                self.rates.total_exit_rate(state),
                self.annual_flow_cost(state),
                self.annual_utility(state),
                self.rates.rows()[state.0]
            );
        }
        let mut lumps: Vec<_> = self.lump_costs.iter().collect();
        lumps.sort_by_key(|(state, _)| **state);
        for (state, lump) in lumps {
            debug!(
                "  entering `{}` costs {} discounted at {}",
                self.states.name(*state),
                lump.amount,
                lump.discount_rate
            );
        }
    }
}
