/*!

Simulation of a single patient from time zero to absorption or the horizon.

*/

use crate::{
    PatientId,
    accrual::Accountant,
    error::{MicrosimError, Result},
    gillespie::next_event,
    log::{debug, trace},
    parameters::ScenarioParameters,
    random::patient_rng,
    state::HealthState,
};

/// Everything that survives of one simulated life-history.
#[derive(Clone, PartialEq, Debug)]
pub struct PatientRecord {
    pub id: PatientId,
    /// Time of absorption, or `None` if the patient was censored at the horizon.
    pub survival_time: Option<f64>,
    /// Number of entries into lesion (polyp) states.
    pub polyp_count: u32,
    /// Number of entries into treatment states.
    pub treatment_count: u32,
    pub total_discounted_cost: f64,
    pub total_discounted_utility: f64,
    /// State occupied when the simulation stopped.
    pub final_state: HealthState,
    /// Number of transitions taken.
    pub event_count: u32,
}

impl PatientRecord {
    #[must_use]
    pub fn is_censored(&self) -> bool {
        self.survival_time.is_none()
    }
}

/// Simulates patient `id` under `parameters` until it is absorbed or `horizon` is reached.
///
/// The patient starts in the initial state at time zero. Each step samples the holding
/// time and destination of the current state. If the state is absorbing the patient's
/// survival time is the current time. If the next event would fall after the horizon, the
/// flow of the current state is accrued up to the horizon and the patient is censored.
/// Otherwise the flow up to the event time is accrued, together with any lump cost of the
/// state being entered, and the patient moves on.
///
/// The result depends only on `(id, parameters, horizon)`.
pub fn simulate_patient(
    parameters: &ScenarioParameters,
    id: PatientId,
    horizon: f64,
) -> Result<PatientRecord> {
    if !(horizon.is_finite() && horizon > 0.0) {
        return Err(MicrosimError::invariant(format!(
            "simulation horizon must be positive and finite, found {horizon}"
        )));
    }

    let rates = parameters.rates();
    let mut rng = patient_rng(id);
    let mut accountant = Accountant::new(parameters);

    let mut current = parameters.initial_state();
    let mut t = 0.0;
    let mut survival_time = None;
    let mut polyp_count = 0;
    let mut treatment_count = 0;
    let mut event_count = 0;

    loop {
        let event = next_event(rates, current, &mut rng);
        let Some(dt) = event.dt else {
            survival_time = Some(t);
            break;
        };

        let event_time = t + dt;
        if event_time > horizon {
            accountant.accrue(current, horizon, None)?;
            break;
        }
        if event_time <= t {
            return Err(MicrosimError::invariant(format!(
                "patient {} stalled at t = {t}: holding time {dt} in `{}` is below the clock resolution",
                id.0,
                parameters.states().name(current)
            )));
        }

        let candidate = event.next_state;
        accountant.accrue(current, event_time, Some(candidate))?;
        if parameters.is_lesion_state(candidate) {
            polyp_count = increment(polyp_count, "polyp", id)?;
        }
        if parameters.is_treatment_state(candidate) {
            treatment_count = increment(treatment_count, "treatment", id)?;
        }
        current = candidate;
        t = event_time;
        event_count = increment(event_count, "event", id)?;
        trace!(
            "patient {} entered `{}` at {t}",
            id.0,
            parameters.states().name(current)
        );
    }

    let record = PatientRecord {
        id,
        survival_time,
        polyp_count,
        treatment_count,
        total_discounted_cost: accountant.total_discounted_cost(),
        total_discounted_utility: accountant.total_discounted_utility(),
        final_state: current,
        event_count,
    };
    debug!(
        "patient {} finished in `{}` after {} events: survival {:?}, cost {:.2}, utility {:.4}",
        id.0,
        parameters.states().name(current),
        record.event_count,
        record.survival_time,
        record.total_discounted_cost,
        record.total_discounted_utility
    );
    Ok(record)
}

fn increment(count: u32, counter: &str, id: PatientId) -> Result<u32> {
    count.checked_add(1).ok_or_else(|| {
        MicrosimError::invariant(format!("{counter} count of patient {} overflowed", id.0))
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        accrual::{pv_continuous_payment, pv_single_payment},
        config::test_support::{three_state_config, well_death_config},
    };

    #[test]
    fn same_id_gives_identical_records() {
        let parameters = three_state_config().build().unwrap();
        for id in 0..50 {
            let first = simulate_patient(&parameters, PatientId(id), 30.0).unwrap();
            let second = simulate_patient(&parameters, PatientId(id), 30.0).unwrap();
            assert_eq!(first, second);
            assert_eq!(
                first.total_discounted_cost.to_bits(),
                second.total_discounted_cost.to_bits()
            );
        }
    }

    #[test]
    fn absorbing_initial_state_is_immediate_death() {
        let mut config = three_state_config();
        config.initial_state = "DEAD".to_string();
        let parameters = config.build().unwrap();

        let record = simulate_patient(&parameters, PatientId(3), 30.0).unwrap();
        assert_eq!(record.survival_time, Some(0.0));
        assert_eq!(record.polyp_count, 0);
        assert_eq!(record.treatment_count, 0);
        assert_eq!(record.event_count, 0);
        // No transition happened, so no lump was triggered.
        assert_eq!(record.total_discounted_cost, 0.0);
        assert_eq!(record.total_discounted_utility, 0.0);
    }

    #[test]
    fn absorbing_initial_state_never_pays_its_lump() {
        let mut config = three_state_config();
        config.initial_state = "DEAD".to_string();
        config.lump_costs.push(crate::config::LumpCostConfig {
            state: "DEAD".to_string(),
            amount: 10_000.0,
            discount_rate: None,
        });
        let parameters = config.build().unwrap();
        let dead = parameters.states().state("DEAD").unwrap();
        assert!(parameters.lump_cost(dead).is_some());

        // The lump is paid on entering DEAD, and a patient who starts there never enters it.
        let record = simulate_patient(&parameters, PatientId(11), 30.0).unwrap();
        assert_eq!(record.survival_time, Some(0.0));
        assert_eq!(record.final_state, dead);
        assert_eq!(record.total_discounted_cost, 0.0);
    }

    #[test]
    fn holding_times_below_clock_resolution_are_an_error() {
        use crate::{config::StateConfig, state::StateKind};

        let mut config = three_state_config();
        config.states.insert(
            2,
            StateConfig {
                name: "FLARE".to_string(),
                kind: StateKind::Transient,
            },
        );
        // After about a year in WELL, SICK and FLARE swap at a rate whose holding times are
        // far smaller than the spacing of doubles near t = 1.
        config.rates = vec![
            vec![0.0, 1.0, 0.0, 0.0],
            vec![0.0, 0.0, 1e300, 0.0],
            vec![0.0, 1e300, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0],
        ];
        config.annual_state_costs = vec![0.0; 4];
        config.annual_state_utilities = vec![1.0, 1.0, 1.0, 0.0];
        let parameters = config.build().unwrap();

        for id in 0..10 {
            let error = simulate_patient(&parameters, PatientId(id), 1e6).unwrap_err();
            assert!(error.is_invariant_violation(), "{error}");
        }
    }

    #[test]
    fn censored_patient_accrues_up_to_horizon() {
        // An exit rate this small is never realized within a year for these ids.
        let parameters = well_death_config(1e-12, 0.0).build().unwrap();
        for id in 0..20 {
            let record = simulate_patient(&parameters, PatientId(id), 10.0).unwrap();
            assert!(record.is_censored());
            assert_eq!(record.final_state, parameters.initial_state());
            assert_eq!(record.total_discounted_cost, 1000.0);
            assert_eq!(record.total_discounted_utility, 10.0);
        }
    }

    #[test]
    fn absorbed_patient_accrues_until_death() {
        let parameters = well_death_config(0.5, 0.03).build().unwrap();
        let death = parameters.states().state("DEATH").unwrap();
        let mut absorbed = 0;
        for id in 0..200 {
            let record = simulate_patient(&parameters, PatientId(id), 100.0).unwrap();
            let Some(survival_time) = record.survival_time else {
                continue;
            };
            absorbed += 1;
            assert!(survival_time > 0.0 && survival_time <= 100.0);
            assert_eq!(record.final_state, death);
            assert_eq!(record.event_count, 1);
            let cost = pv_continuous_payment(100.0, 0.03, 0.0, survival_time);
            assert!((record.total_discounted_cost - cost).abs() < 1e-9);
        }
        // P(survive 100 years at rate 0.5) is negligible.
        assert_eq!(absorbed, 200);
    }

    #[test]
    fn lesion_entries_are_counted_and_charged() {
        let mut config = three_state_config();
        // No flow costs, so the cost is exactly the lumps paid on entering SICK.
        config.annual_state_costs = vec![0.0, 0.0, 0.0];
        config.treatment_overlay_cost = 0.0;
        config.discount_rate = 0.0;
        config.lump_costs[0].discount_rate = Some(0.0);
        config.treatment_states = vec!["SICK".to_string()];
        let parameters = config.build().unwrap();

        let mut saw_lesion = false;
        for id in 0..100 {
            let record = simulate_patient(&parameters, PatientId(id), 50.0).unwrap();
            assert_eq!(record.polyp_count, record.treatment_count);
            assert!((record.total_discounted_cost - 500.0 * f64::from(record.polyp_count)).abs() < 1e-9);
            saw_lesion |= record.polyp_count > 0;
        }
        assert!(saw_lesion);
    }

    #[test]
    fn discounted_lump_matches_entry_time() {
        let mut config = well_death_config(0.2, 0.0);
        config.annual_state_costs = vec![0.0, 0.0];
        config.lump_costs.push(crate::config::LumpCostConfig {
            state: "DEATH".to_string(),
            amount: 1000.0,
            discount_rate: Some(0.03),
        });
        let parameters = config.build().unwrap();

        for id in 0..50 {
            let record = simulate_patient(&parameters, PatientId(id), 1000.0).unwrap();
            let survival_time = record.survival_time.unwrap();
            let expected = pv_single_payment(1000.0, 0.03, survival_time);
            assert!((record.total_discounted_cost - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn invalid_horizon_is_rejected() {
        let parameters = three_state_config().build().unwrap();
        for horizon in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(
                simulate_patient(&parameters, PatientId(0), horizon)
                    .unwrap_err()
                    .is_invariant_violation()
            );
        }
    }

    #[test]
    fn survival_times_never_exceed_horizon() {
        let parameters = three_state_config().build().unwrap();
        for id in 0..300 {
            let record = simulate_patient(&parameters, PatientId(id), 5.0).unwrap();
            if let Some(survival_time) = record.survival_time {
                assert!(survival_time <= 5.0);
                assert!(parameters.rates().is_absorbing(record.final_state));
            } else {
                assert!(!parameters.rates().is_absorbing(record.final_state));
            }
        }
    }
}
