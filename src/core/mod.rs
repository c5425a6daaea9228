mod cashflow;
mod clock;
mod engine;
mod error;
mod solver;
mod tax;
mod types;

pub use cashflow::step;
pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{is_feasible_at, project_yearly, project_yearly_at_monthly_rate};
pub use error::CoreError;
pub use solver::{solve_required_return_rate, solve_with_config};
pub use tax::withdrawal_tax_rate;
pub use types::{
    MAX_PLAN_AGE, MonthlyFlow, PlanHorizon, PlanInputs, RateSearchConfig, RateSolution, RateSolveIteration,
    RateSolveReport, YearlyRecord, annual_percent_to_monthly_rate, monthly_rate_to_annual_percent,
};
