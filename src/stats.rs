/*!

Summary statistics of outcome arrays.

[`SummaryStat`] describes one array: the mean, spread, and a t-based confidence interval for
the mean of independent observations. [`DifferenceStat`] compares two independently
simulated arrays, such as the costs of two screening strategies, through the difference of
their means with a Welch t interval.

*/

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct SummaryStat {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (`n - 1` denominator); NaN for fewer than two observations.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl SummaryStat {
    /// Summarizes `data`. An empty array gives a zero count and NaN for everything else.
    pub fn new(name: impl Into<String>, data: impl IntoIterator<Item = f64>) -> Self {
        let mut count = 0usize;
        let mut mean = 0.0;
        let mut m2 = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        // Welford's update keeps the variance accurate for large cost arrays.
        for x in data {
            count += 1;
            let delta = x - mean;
            mean += delta / count as f64;
            m2 += delta * (x - mean);
            min = min.min(x);
            max = max.max(x);
        }

        if count == 0 {
            return SummaryStat {
                name: name.into(),
                count,
                mean: f64::NAN,
                std_dev: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
            };
        }

        let std_dev = if count > 1 {
            (m2 / (count - 1) as f64).sqrt()
        } else {
            f64::NAN
        };

        SummaryStat {
            name: name.into(),
            count,
            mean,
            std_dev,
            min,
            max,
        }
    }

    /// Standard error of the mean.
    #[must_use]
    pub fn standard_error(&self) -> f64 {
        self.std_dev / (self.count as f64).sqrt()
    }

    /// Two-sided `1 - alpha` confidence interval for the mean, from Student's t with
    /// `count - 1` degrees of freedom. NaN for fewer than two observations.
    #[must_use]
    pub fn confidence_interval(&self, alpha: f64) -> (f64, f64) {
        let degrees_of_freedom = self.count.saturating_sub(1) as f64;
        t_interval(self.mean, self.standard_error(), degrees_of_freedom, alpha)
    }
}

/// Difference between the means of two independent samples, `mean(x) - mean(y_ref)`.
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct DifferenceStat {
    pub name: String,
    pub mean: f64,
    /// `sqrt(s_x² / n_x + s_y² / n_y)`.
    pub standard_error: f64,
    /// Welch–Satterthwaite degrees of freedom.
    pub degrees_of_freedom: f64,
}

impl DifferenceStat {
    /// Compares `x` against the reference sample `y_ref`. The samples may differ in size.
    /// Either sample having fewer than two observations leaves the spread NaN.
    pub fn independent(
        name: impl Into<String>,
        x: impl IntoIterator<Item = f64>,
        y_ref: impl IntoIterator<Item = f64>,
    ) -> Self {
        let x = SummaryStat::new("x", x);
        let y_ref = SummaryStat::new("y_ref", y_ref);

        let x_term = x.std_dev.powi(2) / x.count as f64;
        let y_term = y_ref.std_dev.powi(2) / y_ref.count as f64;
        let variance = x_term + y_term;
        let welch_denominator = x_term.powi(2) / (x.count as f64 - 1.0)
            + y_term.powi(2) / (y_ref.count as f64 - 1.0);

        DifferenceStat {
            name: name.into(),
            mean: x.mean - y_ref.mean,
            standard_error: variance.sqrt(),
            degrees_of_freedom: variance.powi(2) / welch_denominator,
        }
    }

    /// Two-sided `1 - alpha` Welch t interval for the difference of means.
    #[must_use]
    pub fn confidence_interval(&self, alpha: f64) -> (f64, f64) {
        t_interval(
            self.mean,
            self.standard_error,
            self.degrees_of_freedom,
            alpha,
        )
    }
}

fn t_interval(mean: f64, standard_error: f64, degrees_of_freedom: f64, alpha: f64) -> (f64, f64) {
    // Constant samples have no spread; the t distribution is undefined there.
    if standard_error == 0.0 {
        return (mean, mean);
    }
    let half_width = match StudentsT::new(0.0, 1.0, degrees_of_freedom) {
        Ok(t) => t.inverse_cdf(1.0 - alpha / 2.0) * standard_error,
        Err(_) => f64::NAN,
    };
    (mean - half_width, mean + half_width)
}
