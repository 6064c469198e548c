/*!

Built-in colorectal-cancer screening scenarios and the registry that looks them up by name.

There are two model families. The six-state natural-history model has no explicit
screening states; its screening variant scales transition rates by the positive
predictive values of a fecal immunochemical test (FIT) and adds the annual test cost to
every living state. The nine-state model represents screening explicitly: every living
state exits to a screening state at the screening frequency, screening resolves to a
return to WELL, a detected lesion, or treatment, and the test cost is paid while in the
screening states. Both families use the same lump costs for entering a polyp, cancer, or
treatment state, discounted at a fixed 3%.

A [`ScenarioRegistry`] maps names to builder functions. [`ScenarioRegistry::builtin`]
registers the study's strategies; [`ScenarioRegistry::register`] adds more.

*/

use crate::{
    config::{LumpCostConfig, ScenarioConfig, StateConfig},
    error::{MicrosimError, Result},
    parameters::ScenarioParameters,
    state::StateKind,
};
use rustc_hash::FxHashMap;

/// Cohort size used throughout the study.
pub const STUDY_POP_SIZE: usize = 1000;
/// Simulation horizon of the study, in years.
pub const STUDY_HORIZON: f64 = 30.0;
/// Significance level for the study's confidence intervals.
pub const STUDY_ALPHA: f64 = 0.05;
/// Annual discount rate for flow payments.
pub const STUDY_DISCOUNT_RATE: f64 = 0.03;
/// Fixed discount rate of the one-time costs triggered by entering a state.
pub const LUMP_DISCOUNT_RATE: f64 = 0.03;

/// Annual cost of FIT screening.
pub const FIT_COST: f64 = 17.7;
/// Annual cost of multi-target stool DNA screening.
pub const MT_SDNA_COST: f64 = 600.0;

const POLYP_REMOVAL_COST: f64 = 1823.0;
const CRC_DIAGNOSIS_COST: f64 = 64986.0;
const TREATMENT_COST: f64 = 1278.0;

/// Positive predictive values of FIT for small polyps, large polyps, and cancer.
const PPV_SMALL: f64 = 0.1857;
const PPV_LARGE: f64 = 0.0163;
const PPV_CRC: f64 = 0.007_820_3;

/// Background (non-cancer) mortality at 45 and 50.
const NATURAL_DEATH_45: f64 = 0.002_660_5;
const NATURAL_DEATH_50: f64 = 0.004_175_7;

pub type ScenarioBuilder = fn() -> ScenarioConfig;

pub struct ScenarioRegistry {
    builders: FxHashMap<String, ScenarioBuilder>,
}

impl Default for ScenarioRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ScenarioRegistry {
    /// A registry with no scenarios.
    #[must_use]
    pub fn empty() -> Self {
        ScenarioRegistry {
            builders: FxHashMap::default(),
        }
    }

    /// A registry holding the study's strategies.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        let builtins: [(&str, ScenarioBuilder); 5] = [
            ("natural_history_45", natural_history_45),
            ("fit_annual_45_six_state", fit_annual_45_six_state),
            ("fit_annual_45", fit_annual_45),
            ("fit_annual_50", fit_annual_50),
            ("mt_sdna_triennial_45", mt_sdna_triennial_45),
        ];
        for (name, builder) in builtins {
            registry.builders.insert(name.to_string(), builder);
        }
        registry
    }

    /// Adds or replaces the builder for `name`. Returns the builder it replaced.
    pub fn register(&mut self, name: impl Into<String>, builder: ScenarioBuilder) -> Option<ScenarioBuilder> {
        self.builders.insert(name.into(), builder)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }

    /// Registered names in alphabetical order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.builders.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The unvalidated description of scenario `name`.
    pub fn config(&self, name: &str) -> Result<ScenarioConfig> {
        self.builders
            .get(name)
            .map(|builder| builder())
            .ok_or_else(|| {
                MicrosimError::configuration("scenario", format!("unknown scenario `{name}`"))
            })
    }

    /// Builds and validates scenario `name`.
    pub fn build(&self, name: &str) -> Result<ScenarioParameters> {
        self.config(name)?.build()
    }
}

fn states(names: &[(&str, StateKind)]) -> Vec<StateConfig> {
    names
        .iter()
        .map(|&(name, kind)| StateConfig {
            name: name.to_string(),
            kind,
        })
        .collect()
}

fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_string()).collect()
}

fn lump(state: &str, amount: f64) -> LumpCostConfig {
    LumpCostConfig {
        state: state.to_string(),
        amount,
        discount_rate: Some(LUMP_DISCOUNT_RATE),
    }
}

// Six-state family: WELL SMALL LARGE CRC CRC_DEATH NATURAL_DEATH

fn six_state(name: &str, rates: Vec<Vec<f64>>, overlay_cost: f64) -> ScenarioConfig {
    use StateKind::{Absorbing, Transient};
    ScenarioConfig {
        name: name.to_string(),
        states: states(&[
            ("WELL", Transient),
            ("SMALL", Transient),
            ("LARGE", Transient),
            ("CRC", Transient),
            ("CRC_DEATH", Absorbing),
            ("NATURAL_DEATH", Absorbing),
        ]),
        initial_state: "WELL".to_string(),
        rates,
        annual_state_costs: vec![0.0, 256.0, 426.0, 4497.0, 0.0, 0.0],
        annual_state_utilities: vec![1.0, 0.0, 0.0, 0.82, 0.0, 0.0],
        discount_rate: STUDY_DISCOUNT_RATE,
        treatment_overlay_cost: overlay_cost,
        overlay_states: if overlay_cost > 0.0 {
            names(&["WELL", "SMALL", "LARGE", "CRC"])
        } else {
            vec![]
        },
        lesion_states: names(&["SMALL", "LARGE"]),
        treatment_states: vec![],
        lump_costs: vec![
            lump("SMALL", POLYP_REMOVAL_COST),
            lump("LARGE", POLYP_REMOVAL_COST),
            lump("CRC", CRC_DIAGNOSIS_COST),
        ],
    }
}

/// No screening, entering the model at 45.
pub fn natural_history_45() -> ScenarioConfig {
    let m = NATURAL_DEATH_45;
    six_state(
        "natural_history_45",
        vec![
            vec![0.0, 0.011, 0.0, 0.00044, 0.0, m],
            vec![0.0, 0.0, 0.01, 0.0, 0.0, m],
            vec![0.0, 0.0, 0.0, 0.05, 0.0, m],
            vec![0.0, 0.0, 0.0, 0.0, 0.04395, m],
            vec![0.0; 6],
            vec![0.0; 6],
        ],
        0.0,
    )
}

/// Annual FIT from 45, with screening folded into the natural-history rates.
pub fn fit_annual_45_six_state() -> ScenarioConfig {
    let m = NATURAL_DEATH_45;
    // Mortality multipliers for screened patients with and without lesions.
    let lesion = 1.075;
    let other = 1.02;
    six_state(
        "fit_annual_45_six_state",
        vec![
            vec![0.0, 0.011, 0.0, 0.00044 * (1.0 - PPV_CRC), 0.0, m * other],
            vec![0.0, 0.0, 0.01 * (1.0 - PPV_SMALL), 0.0, 0.0, m * lesion],
            vec![0.0, 0.0, 0.0, 0.05 * (1.0 - PPV_LARGE), 0.0, m * lesion],
            vec![0.0, 0.0, 0.0, 0.0, 0.011_061, m * other],
            vec![0.0; 6],
            vec![0.0; 6],
        ],
        FIT_COST,
    )
}

// Nine-state family:
// WELL SMALL LARGE CRC CRC_DEATH NATURAL_DEATH SCREEN_NO_DISEASE SCREEN_DISEASE TREATMENT

struct NineStateRates {
    /// Natural history out of WELL, SMALL, LARGE: onset of small polyps, small-to-large
    /// growth, large-to-cancer progression, direct cancer onset from WELL.
    small_onset: f64,
    small_growth: f64,
    large_progression: f64,
    crc_onset: f64,
    crc_death: f64,
    natural_death: f64,
    /// Rate at which living patients are screened (1 / interval in years).
    screening: f64,
    /// Exits of SCREEN_NO_DISEASE: back to WELL, to TREATMENT.
    negative_to_well: f64,
    negative_to_treatment: f64,
    /// Exits of SCREEN_DISEASE: to SMALL, LARGE, CRC, TREATMENT.
    positive_to_small: f64,
    positive_to_large: f64,
    positive_to_crc: f64,
    positive_to_treatment: f64,
}

impl NineStateRates {
    fn matrix(&self) -> Vec<Vec<f64>> {
        let m = self.natural_death;
        let screened = m * 1.02;
        let s = self.screening;
        vec![
            vec![0.0, self.small_onset, 0.0, self.crc_onset, 0.0, m, s, 0.0, 0.0],
            vec![0.0, 0.0, self.small_growth, 0.0, 0.0, m, 0.0, s, 0.0],
            vec![0.0, 0.0, 0.0, self.large_progression, 0.0, m, 0.0, s, 0.0],
            vec![0.0, 0.0, 0.0, 0.0, self.crc_death, m, 0.0, s, 0.0],
            vec![0.0; 9],
            vec![0.0; 9],
            vec![self.negative_to_well, 0.0, 0.0, 0.0, 0.0, screened, 0.0, 0.0, self.negative_to_treatment],
            vec![
                0.0,
                self.positive_to_small,
                self.positive_to_large,
                self.positive_to_crc,
                0.0,
                screened,
                0.0,
                0.0,
                self.positive_to_treatment,
            ],
            vec![3.92, 0.0, 0.0, 0.0, 0.0, screened, 0.0, 0.0, 0.0],
        ]
    }
}

fn nine_state(name: &str, rates: &NineStateRates, screening_cost: f64) -> ScenarioConfig {
    use StateKind::{Absorbing, Transient};
    ScenarioConfig {
        name: name.to_string(),
        states: states(&[
            ("WELL", Transient),
            ("SMALL", Transient),
            ("LARGE", Transient),
            ("CRC", Transient),
            ("CRC_DEATH", Absorbing),
            ("NATURAL_DEATH", Absorbing),
            ("SCREEN_NO_DISEASE", Transient),
            ("SCREEN_DISEASE", Transient),
            ("TREATMENT", Transient),
        ]),
        initial_state: "WELL".to_string(),
        rates: rates.matrix(),
        annual_state_costs: vec![0.0, 256.0, 426.0, 4497.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        annual_state_utilities: vec![1.0, 0.9, 0.85, 0.70, 0.0, 0.0, 1.0, 0.95, 0.82],
        discount_rate: STUDY_DISCOUNT_RATE,
        treatment_overlay_cost: screening_cost,
        overlay_states: names(&["SCREEN_NO_DISEASE", "SCREEN_DISEASE"]),
        lesion_states: names(&["SMALL", "LARGE"]),
        treatment_states: names(&["TREATMENT"]),
        lump_costs: vec![
            lump("SMALL", POLYP_REMOVAL_COST),
            lump("LARGE", POLYP_REMOVAL_COST),
            lump("CRC", CRC_DIAGNOSIS_COST),
            lump("TREATMENT", TREATMENT_COST),
        ],
    }
}

const FIT_SCREENING_OUTCOMES: NineStateRates = NineStateRates {
    small_onset: 0.011_22,
    small_growth: 0.0102,
    large_progression: 0.051,
    crc_onset: 0.000_448_8,
    crc_death: 0.011_172,
    natural_death: NATURAL_DEATH_45,
    screening: 1.0,
    negative_to_well: 351.86,
    negative_to_treatment: 13.14,
    positive_to_small: 337.26,
    positive_to_large: 278.13,
    positive_to_crc: 97.455,
    positive_to_treatment: 382.155,
};

/// Annual FIT from 45.
pub fn fit_annual_45() -> ScenarioConfig {
    nine_state("fit_annual_45", &FIT_SCREENING_OUTCOMES, FIT_COST)
}

/// Annual FIT from 50.
pub fn fit_annual_50() -> ScenarioConfig {
    let rates = NineStateRates {
        small_onset: 0.011,
        small_growth: 0.01,
        large_progression: 0.05,
        crc_onset: 0.00044,
        crc_death: 0.011_061,
        natural_death: NATURAL_DEATH_50,
        ..FIT_SCREENING_OUTCOMES
    };
    nine_state("fit_annual_50", &rates, FIT_COST)
}

/// Multi-target stool DNA test every three years from 45.
pub fn mt_sdna_triennial_45() -> ScenarioConfig {
    let rates = NineStateRates {
        crc_death: 0.013_347,
        screening: 1.0 / 3.0,
        negative_to_well: 327.77,
        negative_to_treatment: 37.23,
        positive_to_small: 302.22,
        positive_to_large: 210.24,
        positive_to_crc: 24.455,
        positive_to_treatment: 558.085,
        ..FIT_SCREENING_OUTCOMES
    };
    nine_state("mt_sdna_triennial_45", &rates, MT_SDNA_COST)
}
