use serde::Serialize;

use super::error::CoreError;

pub const MIN_WITHDRAWAL_AGE: u32 = 55;
pub const MONTHS_PER_YEAR: u32 = 12;
/// Upper bound on any age a plan may use; keeps horizons to a few hundred months.
pub const MAX_PLAN_AGE: u32 = 150;

#[derive(Debug, Clone, PartialEq)]
pub struct PlanInputs {
    pub birth_year: i32,
    /// Calendar year the plan is evaluated in; supplied by a `Clock`.
    pub reference_year: i32,
    pub retirement_age: u32,
    pub life_expectancy: u32,
    pub current_assets: f64,
    /// Carried for interface parity, the model does not read it.
    pub current_salary: f64,
    pub monthly_investment: f64,
    /// Net monthly pension wanted once withdrawals begin.
    pub required_pension: f64,
    /// Annual percentage, e.g. 3.0 for 3%.
    pub salary_growth_rate: f64,
    pub continue_investment: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanHorizon {
    pub current_age: u32,
    pub withdrawal_start_age: u32,
    pub total_months: u32,
    pub monthly_salary_growth: f64,
}

impl PlanInputs {
    pub fn horizon(&self) -> Result<PlanHorizon, CoreError> {
        for (name, value) in [
            ("current_assets", self.current_assets),
            ("current_salary", self.current_salary),
            ("monthly_investment", self.monthly_investment),
            ("required_pension", self.required_pension),
            ("salary_growth_rate", self.salary_growth_rate),
        ] {
            if !value.is_finite() {
                return Err(CoreError::InvalidPlan(format!("{name} must be finite")));
            }
        }
        if self.salary_growth_rate <= -100.0 {
            return Err(CoreError::InvalidPlan(
                "salary_growth_rate must be > -100".to_string(),
            ));
        }

        let age = i64::from(self.reference_year) - i64::from(self.birth_year);
        let current_age = u32::try_from(age).map_err(|_| {
            CoreError::InvalidPlan(format!(
                "birth year {} is after reference year {}",
                self.birth_year, self.reference_year
            ))
        })?;
        for (name, value) in [
            ("current age", current_age),
            ("retirement age", self.retirement_age),
            ("life expectancy", self.life_expectancy),
        ] {
            if value > MAX_PLAN_AGE {
                return Err(CoreError::InvalidPlan(format!(
                    "{name} {value} exceeds {MAX_PLAN_AGE}"
                )));
            }
        }
        if self.life_expectancy < current_age {
            return Err(CoreError::InvalidPlan(format!(
                "life expectancy {} is below current age {current_age}",
                self.life_expectancy
            )));
        }

        let total_months = (self.life_expectancy - current_age)
            .checked_add(1)
            .and_then(|years| years.checked_mul(MONTHS_PER_YEAR))
            .ok_or_else(|| CoreError::InvalidPlan("plan horizon overflows".to_string()))?;

        Ok(PlanHorizon {
            current_age,
            withdrawal_start_age: self.retirement_age.max(MIN_WITHDRAWAL_AGE),
            total_months,
            monthly_salary_growth: annual_percent_to_monthly_rate(self.salary_growth_rate),
        })
    }
}

pub fn annual_percent_to_monthly_rate(annual_percent: f64) -> f64 {
    (1.0 + annual_percent / 100.0).powf(1.0 / 12.0) - 1.0
}

pub fn monthly_rate_to_annual_percent(monthly_rate: f64) -> f64 {
    ((1.0 + monthly_rate).powf(12.0) - 1.0) * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyFlow {
    pub investment: f64,
    pub gross_withdrawal: f64,
    pub tax: f64,
    pub after_tax_withdrawal: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyRecord {
    pub age: u32,
    pub year: i32,
    pub starting_assets: i64,
    pub annual_investment: i64,
    pub annual_profit: i64,
    pub annual_withdrawal: i64,
    pub annual_tax: i64,
    pub annual_after_tax_withdrawal: i64,
    pub ending_assets: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateSolution {
    Solved {
        /// Annual percentage rounded to two decimals.
        annual_rate_percent: f64,
        /// Converged monthly rate, unrounded.
        monthly_rate: f64,
    },
    Unsolvable,
}

impl RateSolution {
    pub fn annual_rate_percent(self) -> Option<f64> {
        match self {
            RateSolution::Solved {
                annual_rate_percent,
                ..
            } => Some(annual_rate_percent),
            RateSolution::Unsolvable => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateSearchConfig {
    pub low: f64,
    pub high: f64,
    pub tolerance: f64,
}

impl Default for RateSearchConfig {
    fn default() -> Self {
        Self {
            low: 0.0,
            high: 0.05,
            tolerance: 1e-7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_rate: f64,
    pub feasible: bool,
}

#[derive(Debug, Clone)]
pub struct RateSolveReport {
    pub solution: RateSolution,
    pub config: RateSearchConfig,
    pub iterations: Vec<RateSolveIteration>,
    pub converged: bool,
    pub message: String,
}
