/*!

Reduction of patient records into cohort-level outcomes.

An [`OutcomeAccumulator`] collects the scalar fields of each [`PatientRecord`] as it is
extracted. [`OutcomeAccumulator::finalize`] consumes it and returns the read-only
[`CohortOutcomes`]: the per-patient arrays, their summary statistics, and the survival
curve. Every derived quantity depends only on the multiset of extracted records, never on
the order they arrived in.

[`ComparativeOutcomes`] sets one cohort's outcomes against a reference cohort's, treating
the two as independent samples.

*/

use crate::{
    PatientId,
    error::{MicrosimError, Result},
    patient::PatientRecord,
    stats::{DifferenceStat, SummaryStat},
};
use rustc_hash::FxHashSet;
use serde::Serialize;

#[derive(Default, Debug)]
pub struct OutcomeAccumulator {
    costs: Vec<f64>,
    utilities: Vec<f64>,
    polyp_counts: Vec<u32>,
    treatment_counts: Vec<u32>,
    survival_times: Vec<f64>,
    seen_ids: FxHashSet<PatientId>,
}

impl OutcomeAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records extracted so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.costs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    /// Appends the record's cost, utility, and counts, and its survival time if it was
    /// absorbed. A second record with the same id is an invariant violation.
    pub fn extract(&mut self, record: &PatientRecord) -> Result<()> {
        if !self.seen_ids.insert(record.id) {
            return Err(MicrosimError::invariant(format!(
                "patient id {} was extracted twice",
                record.id.0
            )));
        }

        self.costs.push(record.total_discounted_cost);
        self.utilities.push(record.total_discounted_utility);
        self.polyp_counts.push(record.polyp_count);
        self.treatment_counts.push(record.treatment_count);
        if let Some(survival_time) = record.survival_time {
            self.survival_times.push(survival_time);
        }
        Ok(())
    }

    /// Computes summary statistics and the survival curve for a cohort that started with
    /// `initial_pop_size` patients.
    pub fn finalize(self, initial_pop_size: usize) -> Result<CohortOutcomes> {
        let survival_curve = SurvivalCurve::new(initial_pop_size, &self.survival_times)?;

        Ok(CohortOutcomes {
            initial_pop_size,
            cost_stat: SummaryStat::new("Discounted cost", self.costs.iter().copied()),
            utility_stat: SummaryStat::new("Discounted utility", self.utilities.iter().copied()),
            polyp_stat: SummaryStat::new(
                "Number of polyps",
                self.polyp_counts.iter().copied().map(f64::from),
            ),
            treatment_stat: SummaryStat::new(
                "Number of treatments",
                self.treatment_counts.iter().copied().map(f64::from),
            ),
            survival_stat: SummaryStat::new("Survival time", self.survival_times.iter().copied()),
            costs: self.costs,
            utilities: self.utilities,
            polyp_counts: self.polyp_counts,
            treatment_counts: self.treatment_counts,
            survival_times: self.survival_times,
            survival_curve,
        })
    }
}

/// Step function of the number of patients still alive (not yet absorbed) over time.
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct SurvivalCurve {
    breakpoints: Vec<(f64, usize)>,
}

impl SurvivalCurve {
    /// Builds the curve for `initial_pop_size` patients from their absorption times.
    ///
    /// The first breakpoint is `(0, initial_pop_size)`. Each distinct absorption time adds a
    /// breakpoint whose level drops by the number of patients absorbed at that time. Patients
    /// without an absorption time stay alive forever. More absorptions than patients is an
    /// invariant violation.
    pub fn new(initial_pop_size: usize, survival_times: &[f64]) -> Result<Self> {
        if survival_times.len() > initial_pop_size {
            return Err(MicrosimError::invariant(format!(
                "{} absorptions recorded for a cohort of {initial_pop_size}",
                survival_times.len()
            )));
        }

        let mut sorted = survival_times.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mut breakpoints = Vec::with_capacity(sorted.len() + 1);
        breakpoints.push((0.0, initial_pop_size));

        let mut alive = initial_pop_size;
        let mut i = 0;
        while i < sorted.len() {
            let time = sorted[i];
            let multiplicity = sorted[i..].iter().take_while(|&&t| t == time).count();
            alive -= multiplicity;
            breakpoints.push((time, alive));
            i += multiplicity;
        }

        Ok(SurvivalCurve { breakpoints })
    }

    /// `(time, alive_count)` pairs in increasing time order.
    #[must_use]
    pub fn breakpoints(&self) -> &[(f64, usize)] {
        &self.breakpoints
    }

    /// Number alive at time `t`. Absorptions at exactly `t` are already counted as gone.
    /// Times before zero report the initial population.
    #[must_use]
    pub fn alive_at(&self, t: f64) -> usize {
        let after = self.breakpoints.partition_point(|&(time, _)| time <= t);
        if after == 0 {
            self.breakpoints[0].1
        } else {
            self.breakpoints[after - 1].1
        }
    }

    /// The level after the last absorption: the number of censored patients.
    #[must_use]
    pub fn final_level(&self) -> usize {
        self.breakpoints[self.breakpoints.len() - 1].1
    }
}

/// Finalized, read-only outcomes of one cohort.
#[derive(Clone, Debug)]
pub struct CohortOutcomes {
    initial_pop_size: usize,
    costs: Vec<f64>,
    utilities: Vec<f64>,
    polyp_counts: Vec<u32>,
    treatment_counts: Vec<u32>,
    survival_times: Vec<f64>,
    survival_curve: SurvivalCurve,
    cost_stat: SummaryStat,
    utility_stat: SummaryStat,
    polyp_stat: SummaryStat,
    treatment_stat: SummaryStat,
    survival_stat: SummaryStat,
}

impl CohortOutcomes {
    #[must_use]
    pub fn initial_pop_size(&self) -> usize {
        self.initial_pop_size
    }

    #[must_use]
    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    #[must_use]
    pub fn utilities(&self) -> &[f64] {
        &self.utilities
    }

    #[must_use]
    pub fn polyp_counts(&self) -> &[u32] {
        &self.polyp_counts
    }

    #[must_use]
    pub fn treatment_counts(&self) -> &[u32] {
        &self.treatment_counts
    }

    /// Absorption times of the patients who were not censored.
    #[must_use]
    pub fn survival_times(&self) -> &[f64] {
        &self.survival_times
    }

    #[must_use]
    pub fn survival_curve(&self) -> &SurvivalCurve {
        &self.survival_curve
    }

    #[must_use]
    pub fn censored_count(&self) -> usize {
        self.initial_pop_size - self.survival_times.len()
    }

    #[must_use]
    pub fn cost_stat(&self) -> &SummaryStat {
        &self.cost_stat
    }

    #[must_use]
    pub fn utility_stat(&self) -> &SummaryStat {
        &self.utility_stat
    }

    #[must_use]
    pub fn polyp_stat(&self) -> &SummaryStat {
        &self.polyp_stat
    }

    #[must_use]
    pub fn treatment_stat(&self) -> &SummaryStat {
        &self.treatment_stat
    }

    #[must_use]
    pub fn survival_stat(&self) -> &SummaryStat {
        &self.survival_stat
    }
}

/// Differences in mean outcomes between an alternative strategy and a reference strategy,
/// each simulated as its own cohort.
#[derive(Clone, Debug, Serialize)]
pub struct ComparativeOutcomes {
    /// Alternative minus reference.
    pub survival_time_increase: DifferenceStat,
    pub cost_increase: DifferenceStat,
    pub utility_increase: DifferenceStat,
    pub treatment_increase: DifferenceStat,
    /// Reference minus alternative, so fewer polyps under the alternative is positive.
    pub polyp_decrease: DifferenceStat,
}

impl ComparativeOutcomes {
    #[must_use]
    pub fn new(alternative: &CohortOutcomes, reference: &CohortOutcomes) -> Self {
        ComparativeOutcomes {
            survival_time_increase: DifferenceStat::independent(
                "Increase in mean survival time",
                alternative.survival_times.iter().copied(),
                reference.survival_times.iter().copied(),
            ),
            cost_increase: DifferenceStat::independent(
                "Increase in mean discounted cost",
                alternative.costs.iter().copied(),
                reference.costs.iter().copied(),
            ),
            utility_increase: DifferenceStat::independent(
                "Increase in mean discounted utility",
                alternative.utilities.iter().copied(),
                reference.utilities.iter().copied(),
            ),
            treatment_increase: DifferenceStat::independent(
                "Increase in expected number of treatments",
                alternative.treatment_counts.iter().copied().map(f64::from),
                reference.treatment_counts.iter().copied().map(f64::from),
            ),
            polyp_decrease: DifferenceStat::independent(
                "Decrease in expected number of polyps",
                reference.polyp_counts.iter().copied().map(f64::from),
                alternative.polyp_counts.iter().copied().map(f64::from),
            ),
        }
    }

    /// All five comparisons, in reporting order.
    #[must_use]
    pub fn differences(&self) -> [&DifferenceStat; 5] {
        [
            &self.survival_time_increase,
            &self.cost_increase,
            &self.utility_increase,
            &self.polyp_decrease,
            &self.treatment_increase,
        ]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state::HealthState;

    fn record(id: u64, survival_time: Option<f64>, cost: f64) -> PatientRecord {
        PatientRecord {
            id: PatientId(id),
            survival_time,
            polyp_count: (id % 3) as u32,
            treatment_count: (id % 2) as u32,
            total_discounted_cost: cost,
            total_discounted_utility: cost / 100.0,
            final_state: HealthState(0),
            event_count: 1,
        }
    }

    fn records() -> Vec<PatientRecord> {
        vec![
            record(0, Some(2.0), 100.0),
            record(1, None, 250.0),
            record(2, Some(0.5), 75.0),
            record(3, Some(2.0), 300.0),
            record(4, Some(7.25), 10.0),
            record(5, None, 42.0),
        ]
    }

    fn sorted<T: Copy>(values: &[T], cmp: impl FnMut(&T, &T) -> std::cmp::Ordering) -> Vec<T> {
        let mut values = values.to_vec();
        values.sort_by(cmp);
        values
    }

    #[test]
    fn extract_appends_all_and_survival_only_if_absorbed() {
        let mut accumulator = OutcomeAccumulator::new();
        for record in &records() {
            accumulator.extract(record).unwrap();
        }
        assert_eq!(accumulator.len(), 6);

        let outcomes = accumulator.finalize(6).unwrap();
        assert_eq!(outcomes.costs(), &[100.0, 250.0, 75.0, 300.0, 10.0, 42.0]);
        assert_eq!(outcomes.polyp_counts(), &[0, 1, 2, 0, 1, 2]);
        assert_eq!(outcomes.treatment_counts(), &[0, 1, 0, 1, 0, 1]);
        assert_eq!(outcomes.survival_times(), &[2.0, 0.5, 2.0, 7.25]);
        assert_eq!(outcomes.censored_count(), 2);
        assert_eq!(outcomes.cost_stat().count, 6);
        assert_eq!(outcomes.survival_stat().count, 4);
        assert!((outcomes.survival_stat().mean - 11.75 / 4.0).abs() < 1e-12);
        assert!((outcomes.polyp_stat().mean - 1.0).abs() < 1e-12);
    }

    #[test]
    fn survival_curve_drops_by_multiplicity() {
        let curve = SurvivalCurve::new(6, &[2.0, 0.5, 2.0, 7.25]).unwrap();
        assert_eq!(
            curve.breakpoints(),
            &[(0.0, 6), (0.5, 5), (2.0, 3), (7.25, 2)]
        );
        assert_eq!(curve.alive_at(0.0), 6);
        assert_eq!(curve.alive_at(0.49), 6);
        assert_eq!(curve.alive_at(0.5), 5);
        assert_eq!(curve.alive_at(1.99), 5);
        assert_eq!(curve.alive_at(2.0), 3);
        assert_eq!(curve.alive_at(100.0), 2);
        assert_eq!(curve.alive_at(-1.0), 6);
        assert_eq!(curve.final_level(), 2);
    }

    #[test]
    fn survival_curve_is_non_increasing() {
        let times = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0, 5.0, 3.0];
        let curve = SurvivalCurve::new(12, &times).unwrap();
        for pair in curve.breakpoints().windows(2) {
            assert!(pair[0].0 < pair[1].0 || (pair[0].0 == 0.0 && pair[1].0 == 0.0));
            assert!(pair[0].1 > pair[1].1);
        }
        let mut previous = curve.alive_at(0.0);
        for step in 0..200 {
            let level = curve.alive_at(f64::from(step) * 0.05);
            assert!(level <= previous);
            previous = level;
        }
        assert_eq!(curve.final_level(), 12 - times.len());
    }

    #[test]
    fn absorption_at_time_zero_adds_second_origin_breakpoint() {
        let curve = SurvivalCurve::new(3, &[0.0, 0.0]).unwrap();
        assert_eq!(curve.breakpoints(), &[(0.0, 3), (0.0, 1)]);
        assert_eq!(curve.alive_at(0.0), 1);
        assert_eq!(curve.final_level(), 1);
    }

    #[test]
    fn empty_cohort_curve_is_flat() {
        let curve = SurvivalCurve::new(10, &[]).unwrap();
        assert_eq!(curve.breakpoints(), &[(0.0, 10)]);
        assert_eq!(curve.alive_at(1e9), 10);
    }

    #[test]
    fn curve_with_more_absorptions_than_patients_is_rejected() {
        let error = SurvivalCurve::new(1, &[1.0, 2.0]).unwrap_err();
        assert!(error.is_invariant_violation());
        assert!(SurvivalCurve::new(2, &[1.0, 2.0]).is_ok());
    }

    #[test]
    fn aggregation_is_order_independent() {
        let forward = records();
        let mut reversed = records();
        reversed.reverse();
        let mut rotated = records();
        rotated.rotate_left(2);

        let finalize = |records: &[PatientRecord]| {
            let mut accumulator = OutcomeAccumulator::new();
            for record in records {
                accumulator.extract(record).unwrap();
            }
            accumulator.finalize(records.len()).unwrap()
        };

        let expected = finalize(&forward);
        for permutation in [reversed, rotated] {
            let outcomes = finalize(&permutation);
            assert_eq!(
                sorted(outcomes.costs(), f64::total_cmp),
                sorted(expected.costs(), f64::total_cmp)
            );
            assert_eq!(
                sorted(outcomes.utilities(), f64::total_cmp),
                sorted(expected.utilities(), f64::total_cmp)
            );
            assert_eq!(
                sorted(outcomes.polyp_counts(), u32::cmp),
                sorted(expected.polyp_counts(), u32::cmp)
            );
            assert_eq!(
                sorted(outcomes.treatment_counts(), u32::cmp),
                sorted(expected.treatment_counts(), u32::cmp)
            );
            assert_eq!(
                sorted(outcomes.survival_times(), f64::total_cmp),
                sorted(expected.survival_times(), f64::total_cmp)
            );
            assert_eq!(outcomes.survival_curve(), expected.survival_curve());
            assert_eq!(outcomes.survival_stat().count, expected.survival_stat().count);
        }
    }

    #[test]
    fn duplicate_patient_id_is_rejected() {
        let mut accumulator = OutcomeAccumulator::new();
        accumulator.extract(&record(7, None, 1.0)).unwrap();
        let error = accumulator.extract(&record(7, Some(1.0), 2.0)).unwrap_err();
        assert!(error.is_invariant_violation());
        assert_eq!(accumulator.len(), 1);
    }

    #[test]
    fn more_absorptions_than_patients_is_rejected() {
        let mut accumulator = OutcomeAccumulator::new();
        accumulator.extract(&record(0, Some(1.0), 1.0)).unwrap();
        accumulator.extract(&record(1, Some(2.0), 1.0)).unwrap();
        assert!(accumulator.finalize(1).unwrap_err().is_invariant_violation());
    }

    #[test]
    fn comparing_screening_against_natural_history() {
        use crate::{
            cohort::Cohort,
            scenarios::{STUDY_ALPHA, STUDY_HORIZON, ScenarioRegistry},
        };

        let registry = ScenarioRegistry::builtin();
        let natural_history = registry.build("natural_history_45").unwrap();
        let screening = registry.build("fit_annual_45_six_state").unwrap();
        let reference = Cohort::new(0, 300, &natural_history)
            .unwrap()
            .simulate_parallel(STUDY_HORIZON)
            .unwrap();
        let alternative = Cohort::new(1, 300, &screening)
            .unwrap()
            .simulate_parallel(STUDY_HORIZON)
            .unwrap();

        let comparison = ComparativeOutcomes::new(&alternative, &reference);
        let expected_cost = alternative.cost_stat().mean - reference.cost_stat().mean;
        assert!((comparison.cost_increase.mean - expected_cost).abs() < 1e-6);
        let expected_utility = alternative.utility_stat().mean - reference.utility_stat().mean;
        assert!((comparison.utility_increase.mean - expected_utility).abs() < 1e-9);
        let expected_polyps = reference.polyp_stat().mean - alternative.polyp_stat().mean;
        assert!((comparison.polyp_decrease.mean - expected_polyps).abs() < 1e-9);
        let expected_survival = alternative.survival_stat().mean - reference.survival_stat().mean;
        assert!((comparison.survival_time_increase.mean - expected_survival).abs() < 1e-9);

        assert_eq!(comparison.differences()[3].name, "Decrease in expected number of polyps");
        // Costs and utilities vary across patients in both cohorts.
        for difference in [&comparison.cost_increase, &comparison.utility_increase] {
            let (low, high) = difference.confidence_interval(STUDY_ALPHA);
            assert!(low < difference.mean && difference.mean < high, "{difference:?}");
        }
    }

    #[test]
    fn cohort_compared_with_itself_shows_no_difference() {
        let mut accumulator = OutcomeAccumulator::new();
        for record in &records() {
            accumulator.extract(record).unwrap();
        }
        let outcomes = accumulator.finalize(6).unwrap();

        let comparison = ComparativeOutcomes::new(&outcomes, &outcomes);
        for difference in comparison.differences() {
            assert_eq!(difference.mean, 0.0, "{}", difference.name);
            let (low, high) = difference.confidence_interval(0.05);
            assert!(low < 0.0 && 0.0 < high, "{}", difference.name);
        }
    }
}
