/*!

Continuous-time Markov microsimulation of patient cohorts.

Each patient walks a continuous-time Markov chain of health states from time zero until an
absorbing state or the simulation horizon, accruing continuously discounted cost and
utility along the way. A [`Cohort`] runs many independent patients under one immutable
[`ScenarioParameters`] and reduces their records into [`CohortOutcomes`]: per-patient
arrays, summary statistics, and a survival curve.

```rust
use cohort_microsim::{Cohort, ScenarioRegistry, scenarios::{STUDY_HORIZON, STUDY_POP_SIZE}};

# fn main() -> cohort_microsim::Result<()> {
let registry = ScenarioRegistry::builtin();
let parameters = registry.build("fit_annual_45")?;
let outcomes = Cohort::new(1, STUDY_POP_SIZE, &parameters)?.simulate_parallel(STUDY_HORIZON)?;
let (low, high) = outcomes.cost_stat().confidence_interval(0.05);
assert!(low <= high);
# Ok(())
# }
```

*/

pub mod accrual;
pub mod cohort;
pub mod config;
pub mod error;
pub mod gillespie;
pub mod log;
pub mod outcomes;
pub mod parameters;
pub mod patient;
pub mod random;
pub mod rate_matrix;
pub mod report;
pub mod scenarios;
pub mod state;
pub mod stats;

pub use cohort::Cohort;
pub use config::ScenarioConfig;
pub use error::{MicrosimError, Result};
pub use outcomes::{CohortOutcomes, ComparativeOutcomes, OutcomeAccumulator, SurvivalCurve};
pub use parameters::{LumpCost, ScenarioParameters};
pub use patient::{PatientRecord, simulate_patient};
pub use rate_matrix::RateMatrix;
pub use scenarios::ScenarioRegistry;
pub use state::{HealthState, StateKind, StateSpace};
pub use stats::{DifferenceStat, SummaryStat};

/// Identifies a patient within a run. The id is also the seed of the patient's random
/// stream.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct PatientId(pub u64);
