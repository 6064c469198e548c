/*!

CSV export of finalized cohort outcomes.

*/

use crate::{
    error::Result,
    outcomes::{CohortOutcomes, SurvivalCurve},
};
use serde::Serialize;
use std::{io, path::Path};

#[derive(Serialize)]
struct PatientOutcomeRow {
    patient: usize,
    discounted_cost: f64,
    discounted_utility: f64,
    polyps: u32,
    treatments: u32,
}

#[derive(Serialize)]
struct SurvivalCurveRow {
    time: f64,
    alive: usize,
}

/// Writes one row per patient: index within the cohort, discounted cost and utility, and the
/// polyp and treatment counts.
pub fn write_outcomes<W: io::Write>(writer: W, outcomes: &CohortOutcomes) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for patient in 0..outcomes.costs().len() {
        writer.serialize(PatientOutcomeRow {
            patient,
            discounted_cost: outcomes.costs()[patient],
            discounted_utility: outcomes.utilities()[patient],
            polyps: outcomes.polyp_counts()[patient],
            treatments: outcomes.treatment_counts()[patient],
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the `(time, alive)` breakpoints of the survival curve.
pub fn write_survival_curve<W: io::Write>(writer: W, curve: &SurvivalCurve) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for &(time, alive) in curve.breakpoints() {
        writer.serialize(SurvivalCurveRow { time, alive })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_outcomes_csv(path: impl AsRef<Path>, outcomes: &CohortOutcomes) -> Result<()> {
    write_outcomes(std::fs::File::create(path)?, outcomes)
}

pub fn write_survival_curve_csv(path: impl AsRef<Path>, curve: &SurvivalCurve) -> Result<()> {
    write_survival_curve(std::fs::File::create(path)?, curve)
}
