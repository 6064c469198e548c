/*!

Continuous-time discounted accounting of cost and utility for one patient.

While a patient occupies a state it pays the state's annual cost (plus the treatment
overlay in overlay states) and earns the state's annual utility as a continuous flow. A
flow of `a` per year over `[t0, t1)` discounted continuously at rate `r` is worth

```text
    a / r * (exp(-r t0) - exp(-r t1))     if r > 0
    a * (t1 - t0)                         if r = 0
```

Entering a state with a [`LumpCost`](crate::parameters::LumpCost) additionally pays a
point amount discounted once at the time of entry, `amount * exp(-r t)`.

*/

use crate::{
    error::{MicrosimError, Result},
    parameters::ScenarioParameters,
    state::HealthState,
};

/// Present value at time zero of a continuous flow of `payment` per unit time over
/// `[start, end)`, discounted continuously at `discount_rate`.
#[must_use]
pub fn pv_continuous_payment(payment: f64, discount_rate: f64, start: f64, end: f64) -> f64 {
    if discount_rate == 0.0 {
        payment * (end - start)
    } else {
        payment / discount_rate * ((-discount_rate * start).exp() - (-discount_rate * end).exp())
    }
}

/// Present value at time zero of a single `payment` made at `time`, discounted continuously.
#[must_use]
pub fn pv_single_payment(payment: f64, discount_rate: f64, time: f64) -> f64 {
    payment * (-discount_rate * time).exp()
}

/// Running totals for one patient.
#[derive(Debug)]
pub struct Accountant<'a> {
    parameters: &'a ScenarioParameters,
    t_last_recorded: f64,
    running_cost: f64,
    running_utility: f64,
}

impl<'a> Accountant<'a> {
    #[must_use]
    pub fn new(parameters: &'a ScenarioParameters) -> Self {
        Accountant {
            parameters,
            t_last_recorded: 0.0,
            running_cost: 0.0,
            running_utility: 0.0,
        }
    }

    /// Accrues the flow of `occupied` from the last recorded time up to `to_time`, then,
    /// if `entering` is `Some`, the lump cost (if any) of entering that state at `to_time`.
    ///
    /// `entering` is `None` when the patient stays put, as at the censoring horizon.
    /// `to_time` must not be earlier than the previous call's.
    pub fn accrue(
        &mut self,
        occupied: HealthState,
        to_time: f64,
        entering: Option<HealthState>,
    ) -> Result<()> {
        if to_time.is_nan() || to_time < self.t_last_recorded {
            return Err(MicrosimError::invariant(format!(
                "accrual time moved backwards from {} to {to_time}",
                self.t_last_recorded
            )));
        }

        let rate = self.parameters.discount_rate();
        self.running_cost += pv_continuous_payment(
            self.parameters.annual_flow_cost(occupied),
            rate,
            self.t_last_recorded,
            to_time,
        );
        self.running_utility += pv_continuous_payment(
            self.parameters.annual_utility(occupied),
            rate,
            self.t_last_recorded,
            to_time,
        );

        if let Some(lump) = entering.and_then(|state| self.parameters.lump_cost(state)) {
            self.running_cost += lump.present_value(to_time);
        }

        self.t_last_recorded = to_time;
        Ok(())
    }

    #[must_use]
    pub fn t_last_recorded(&self) -> f64 {
        self.t_last_recorded
    }

    #[must_use]
    pub fn total_discounted_cost(&self) -> f64 {
        self.running_cost
    }

    #[must_use]
    pub fn total_discounted_utility(&self) -> f64 {
        self.running_utility
    }
}
