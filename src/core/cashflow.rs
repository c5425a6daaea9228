use super::error::CoreError;
use super::tax::withdrawal_tax_rate;
use super::types::{MONTHS_PER_YEAR, MonthlyFlow, PlanHorizon, PlanInputs};

pub fn step(
    age: u32,
    monthly_investment_amount: f64,
    plan: &PlanInputs,
    horizon: &PlanHorizon,
) -> Result<MonthlyFlow, CoreError> {
    let investment = if age < plan.retirement_age || plan.continue_investment {
        monthly_investment_amount
    } else {
        0.0
    };

    if age < horizon.withdrawal_start_age {
        return Ok(MonthlyFlow {
            investment,
            gross_withdrawal: 0.0,
            tax: 0.0,
            after_tax_withdrawal: 0.0,
        });
    }

    let tax_rate = withdrawal_tax_rate(age)?;
    let gross_withdrawal = plan.required_pension / (1.0 - tax_rate);
    Ok(MonthlyFlow {
        investment,
        gross_withdrawal,
        tax: gross_withdrawal * tax_rate,
        after_tax_withdrawal: plan.required_pension,
    })
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct MonthOutcome {
    pub month: u32,
    pub age: u32,
    pub previous_assets: f64,
    pub assets: f64,
    pub flow: MonthlyFlow,
    pub profit: f64,
}

/// Per-run simulation state. Each solver candidate and each projection owns
/// a fresh one.
#[derive(Debug)]
pub(crate) struct SimulationState<'a> {
    plan: &'a PlanInputs,
    horizon: PlanHorizon,
    monthly_rate: f64,
    assets: f64,
    monthly_investment_amount: f64,
    month: u32,
}

impl<'a> SimulationState<'a> {
    pub fn new(plan: &'a PlanInputs, horizon: PlanHorizon, monthly_rate: f64) -> Self {
        Self {
            plan,
            horizon,
            monthly_rate,
            assets: plan.current_assets,
            monthly_investment_amount: plan.monthly_investment,
            month: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.month >= self.horizon.total_months
    }

    /// Invest at the start of the month, grow, then withdraw at month end.
    pub fn advance(&mut self) -> Result<MonthOutcome, CoreError> {
        let month = self.month;
        let age = self.horizon.current_age + month / MONTHS_PER_YEAR;
        let flow = step(age, self.monthly_investment_amount, self.plan, &self.horizon)?;

        let previous_assets = self.assets;
        self.assets += flow.investment;
        self.assets *= 1.0 + self.monthly_rate;
        let profit = (previous_assets + flow.investment) * self.monthly_rate;
        self.assets -= flow.gross_withdrawal;

        self.monthly_investment_amount *= 1.0 + self.horizon.monthly_salary_growth;
        self.month += 1;

        Ok(MonthOutcome {
            month,
            age,
            previous_assets,
            assets: self.assets,
            flow,
            profit,
        })
    }
}
