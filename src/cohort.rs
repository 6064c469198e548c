/*!

Running a cohort: many independent patients under one scenario.

Patient `i` of cohort `c` with `n` members gets id `c * n + i` (see
[`patient_id`](crate::random::patient_id)), which is also its only source of randomness.
Patients share nothing but the read-only [`ScenarioParameters`], so
[`Cohort::simulate_parallel`] can spread them over the `rayon` thread pool. Records are
always extracted in patient-index order, so the sequential and parallel runners return
identical outcomes.

*/

use crate::{
    error::{MicrosimError, Result},
    log::info,
    outcomes::{CohortOutcomes, OutcomeAccumulator},
    parameters::ScenarioParameters,
    patient::{PatientRecord, simulate_patient},
    random::patient_id,
};
use rayon::prelude::*;

#[derive(Debug)]
pub struct Cohort<'a> {
    id: u64,
    pop_size: usize,
    parameters: &'a ScenarioParameters,
}

impl<'a> Cohort<'a> {
    /// A cohort of `pop_size` patients. Different cohorts run in the same process should use
    /// different ids so their patients draw from different streams.
    pub fn new(id: u64, pop_size: usize, parameters: &'a ScenarioParameters) -> Result<Self> {
        if pop_size == 0 {
            return Err(MicrosimError::configuration(
                "pop_size",
                "a cohort needs at least one patient",
            ));
        }
        Ok(Cohort {
            id,
            pop_size,
            parameters,
        })
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn pop_size(&self) -> usize {
        self.pop_size
    }

    #[must_use]
    pub fn parameters(&self) -> &'a ScenarioParameters {
        self.parameters
    }

    /// Simulates patient `index` of this cohort.
    pub fn simulate_member(&self, index: usize, horizon: f64) -> Result<PatientRecord> {
        let id = patient_id(self.id, self.pop_size as u64, index as u64)?;
        simulate_patient(self.parameters, id, horizon)
    }

    /// Simulates every patient on the calling thread, one after another.
    pub fn simulate(&self, horizon: f64) -> Result<CohortOutcomes> {
        self.log_start(horizon, "sequentially");
        let mut accumulator = OutcomeAccumulator::new();
        for index in 0..self.pop_size {
            let record = self.simulate_member(index, horizon)?;
            accumulator.extract(&record)?;
        }
        self.finish(accumulator)
    }

    /// Simulates the patients on the `rayon` thread pool. The outcomes are identical to
    /// [`Cohort::simulate`].
    pub fn simulate_parallel(&self, horizon: f64) -> Result<CohortOutcomes> {
        self.log_start(horizon, "in parallel");
        let records = (0..self.pop_size)
            .into_par_iter()
            .map(|index| self.simulate_member(index, horizon))
            .collect::<Result<Vec<_>>>()?;

        let mut accumulator = OutcomeAccumulator::new();
        for record in &records {
            accumulator.extract(record)?;
        }
        self.finish(accumulator)
    }

    fn log_start(&self, horizon: f64, mode: &str) {
        info!(
            "simulating cohort {} of {} patients under `{}` for {horizon} years {mode}",
            self.id,
            self.pop_size,
            self.parameters.name()
        );
    }

    fn finish(&self, accumulator: OutcomeAccumulator) -> Result<CohortOutcomes> {
        let outcomes = accumulator.finalize(self.pop_size)?;
        info!(
            "cohort {} finished: {} absorbed, {} censored, mean discounted cost {:.2}, mean discounted utility {:.4}",
            self.id,
            outcomes.survival_times().len(),
            outcomes.censored_count(),
            outcomes.cost_stat().mean,
            outcomes.utility_stat().mean
        );
        Ok(outcomes)
    }
}
