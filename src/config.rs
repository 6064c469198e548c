/*!

The serializable description of a scenario.

A [`ScenarioConfig`] names states rather than indexing them, so it can be written by hand
as JSON:

```json
{
  "name": "well_death",
  "states": [
    { "name": "WELL",  "kind": "transient" },
    { "name": "DEATH", "kind": "absorbing" }
  ],
  "initial_state": "WELL",
  "rates": [[0.0, 0.1], [0.0, 0.0]],
  "annual_state_costs": [100.0, 0.0],
  "annual_state_utilities": [1.0, 0.0],
  "discount_rate": 0.03,
  "lump_costs": [{ "state": "DEATH", "amount": 5000.0 }]
}
```

[`ScenarioConfig::build`] resolves the names, validates every table against the state
space, and returns immutable [`ScenarioParameters`]. All checks happen there, so a bad
scenario is rejected before any patient is simulated.

*/

use crate::{
    error::{MicrosimError, Result},
    parameters::{LumpCost, ScenarioParameters},
    rate_matrix::RateMatrix,
    state::{HealthState, StateKind, StateSpace},
};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateConfig {
    pub name: String,
    pub kind: StateKind,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LumpCostConfig {
    /// The state whose entry triggers the payment.
    pub state: String,
    pub amount: f64,
    /// Defaults to the scenario's discount rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_rate: Option<f64>,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    pub name: String,
    pub states: Vec<StateConfig>,
    pub initial_state: String,
    pub rates: Vec<Vec<f64>>,
    pub annual_state_costs: Vec<f64>,
    pub annual_state_utilities: Vec<f64>,
    #[serde(default)]
    pub discount_rate: f64,
    #[serde(default)]
    pub treatment_overlay_cost: f64,
    #[serde(default)]
    pub overlay_states: Vec<String>,
    #[serde(default)]
    pub lesion_states: Vec<String>,
    #[serde(default)]
    pub treatment_states: Vec<String>,
    #[serde(default)]
    pub lump_costs: Vec<LumpCostConfig>,
}

impl ScenarioConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validates the description and builds the parameters.
    pub fn build(&self) -> Result<ScenarioParameters> {
        let states = StateSpace::new(
            self.states
                .iter()
                .map(|state| (state.name.clone(), state.kind)),
        )?;
        let rates = RateMatrix::new(&states, self.rates.clone())?;
        let initial_state = states.state(&self.initial_state)?;

        check_table("annual_state_costs", &self.annual_state_costs, states.len())?;
        check_table("annual_state_utilities", &self.annual_state_utilities, states.len())?;
        check_rate("discount_rate", self.discount_rate)?;
        if !self.treatment_overlay_cost.is_finite() {
            return Err(MicrosimError::configuration(
                "treatment_overlay_cost",
                format!("must be finite, found {}", self.treatment_overlay_cost),
            ));
        }

        let overlay_states = resolve_states(&states, &self.overlay_states)?;
        let lesion_states = resolve_states(&states, &self.lesion_states)?;
        let treatment_states = resolve_states(&states, &self.treatment_states)?;

        let mut lump_costs = FxHashMap::default();
        for (index, lump) in self.lump_costs.iter().enumerate() {
            let location = format!("lump_costs[{index}]");
            let state = states.state(&lump.state)?;
            if !lump.amount.is_finite() {
                return Err(MicrosimError::configuration(
                    location,
                    format!("amount must be finite, found {}", lump.amount),
                ));
            }
            let discount_rate = lump.discount_rate.unwrap_or(self.discount_rate);
            check_rate(&location, discount_rate)?;
            let lump_cost = LumpCost {
                amount: lump.amount,
                discount_rate,
            };
            if lump_costs.insert(state, lump_cost).is_some() {
                return Err(MicrosimError::configuration(
                    location,
                    format!("state `{}` already has a lump cost", lump.state),
                ));
            }
        }

        Ok(ScenarioParameters {
            name: self.name.clone(),
            states,
            rates,
            initial_state,
            annual_state_costs: self.annual_state_costs.clone(),
            annual_state_utilities: self.annual_state_utilities.clone(),
            discount_rate: self.discount_rate,
            treatment_overlay_cost: self.treatment_overlay_cost,
            overlay_states,
            lesion_states,
            treatment_states,
            lump_costs,
        })
    }
}

fn check_table(field: &str, values: &[f64], expected_len: usize) -> Result<()> {
    if values.len() != expected_len {
        return Err(MicrosimError::configuration(
            field,
            format!("expected {expected_len} values (one per state), found {}", values.len()),
        ));
    }
    if let Some((index, value)) = values.iter().enumerate().find(|(_, value)| !value.is_finite()) {
        return Err(MicrosimError::configuration(
            format!("{field}[{index}]"),
            format!("must be finite, found {value}"),
        ));
    }
    Ok(())
}

fn check_rate(field: &str, rate: f64) -> Result<()> {
    if rate.is_finite() && rate >= 0.0 {
        Ok(())
    } else {
        Err(MicrosimError::configuration(
            field,
            format!("discount rate must be finite and non-negative, found {rate}"),
        ))
    }
}

fn resolve_states(states: &StateSpace, names: &[String]) -> Result<FxHashSet<HealthState>> {
    names.iter().map(|name| states.state(name)).collect()
}
