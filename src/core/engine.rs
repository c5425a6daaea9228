use tracing::debug;

use super::cashflow::SimulationState;
use super::error::CoreError;
use super::types::{
    MONTHS_PER_YEAR, PlanHorizon, PlanInputs, YearlyRecord, annual_percent_to_monthly_rate,
};

/// Runs the full lifetime at `monthly_rate` and reports whether assets stay
/// non-negative every month.
pub fn is_feasible_at(plan: &PlanInputs, monthly_rate: f64) -> Result<bool, CoreError> {
    let horizon = plan.horizon()?;
    simulate_feasibility(plan, horizon, monthly_rate)
}

pub(crate) fn simulate_feasibility(
    plan: &PlanInputs,
    horizon: PlanHorizon,
    monthly_rate: f64,
) -> Result<bool, CoreError> {
    let mut state = SimulationState::new(plan, horizon, monthly_rate);
    while !state.is_finished() {
        let outcome = state.advance()?;
        if outcome.assets < 0.0 {
            return Ok(false);
        }
    }
    Ok(true)
}

pub fn project_yearly(
    plan: &PlanInputs,
    annual_rate_percent: f64,
) -> Result<Vec<YearlyRecord>, CoreError> {
    project_yearly_at_monthly_rate(plan, annual_percent_to_monthly_rate(annual_rate_percent))
}

#[derive(Debug, Default)]
struct YearAccumulator {
    starting_assets: f64,
    investment: f64,
    profit: f64,
    withdrawal: f64,
    tax: f64,
}

impl YearAccumulator {
    fn into_record(self, age: u32, year: i32, ending_assets: f64) -> YearlyRecord {
        YearlyRecord {
            age,
            year,
            starting_assets: round_units(self.starting_assets),
            annual_investment: round_units(self.investment),
            annual_profit: round_units(self.profit),
            annual_withdrawal: round_units(self.withdrawal),
            annual_tax: round_units(self.tax),
            annual_after_tax_withdrawal: round_units(self.withdrawal - self.tax),
            ending_assets: round_units(ending_assets),
        }
    }
}

pub fn project_yearly_at_monthly_rate(
    plan: &PlanInputs,
    monthly_rate: f64,
) -> Result<Vec<YearlyRecord>, CoreError> {
    let horizon = plan.horizon()?;
    let mut records = Vec::with_capacity((horizon.total_months / MONTHS_PER_YEAR) as usize);
    let mut state = SimulationState::new(plan, horizon, monthly_rate);
    let mut year = YearAccumulator::default();

    while !state.is_finished() {
        let outcome = state.advance()?;
        let month_of_year = outcome.month % MONTHS_PER_YEAR + 1;
        if month_of_year == 1 {
            year = YearAccumulator {
                starting_assets: outcome.previous_assets,
                ..YearAccumulator::default()
            };
        }

        year.investment += outcome.flow.investment;
        year.profit += outcome.profit;
        year.withdrawal += outcome.flow.gross_withdrawal;
        year.tax += outcome.flow.tax;

        let depleted = outcome.assets < 0.0;
        if month_of_year == MONTHS_PER_YEAR || state.is_finished() || depleted {
            let calendar_year = plan.reference_year + (outcome.month / MONTHS_PER_YEAR) as i32;
            records.push(std::mem::take(&mut year).into_record(
                outcome.age,
                calendar_year,
                outcome.assets,
            ));
        }

        if depleted {
            debug!(
                month = outcome.month,
                age = outcome.age,
                assets = outcome.assets,
                "projection depleted assets; stopping"
            );
            break;
        }
    }

    Ok(records)
}

/// Halves go to the even neighbour, as banker's rounding does.
fn round_units(value: f64) -> i64 {
    value.round_ties_even() as i64
}
