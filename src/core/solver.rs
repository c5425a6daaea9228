use tracing::debug;

use super::engine::simulate_feasibility;
use super::error::CoreError;
use super::types::{
    PlanInputs, RateSearchConfig, RateSolution, RateSolveIteration, RateSolveReport,
    monthly_rate_to_annual_percent,
};

pub fn solve_required_return_rate(plan: &PlanInputs) -> Result<RateSolution, CoreError> {
    solve_with_config(plan, RateSearchConfig::default()).map(|report| report.solution)
}

/// Bisects the monthly return rate for the lowest value whose lifetime
/// simulation never goes negative. Assumes feasibility is monotonic in rate.
pub fn solve_with_config(
    plan: &PlanInputs,
    config: RateSearchConfig,
) -> Result<RateSolveReport, CoreError> {
    validate_config(config)?;
    let horizon = plan.horizon()?;

    if !simulate_feasibility(plan, horizon, config.high)? {
        debug!(high = config.high, "plan infeasible at upper rate bound");
        return Ok(RateSolveReport {
            solution: RateSolution::Unsolvable,
            config,
            iterations: Vec::new(),
            converged: false,
            message: "No achievable return rate found within the search bounds.".to_string(),
        });
    }

    if simulate_feasibility(plan, horizon, config.low)? {
        debug!(low = config.low, "plan already feasible at lower rate bound");
        return Ok(RateSolveReport {
            solution: solved(config.low),
            config,
            iterations: Vec::new(),
            converged: true,
            message: "Already feasible at the lower rate bound.".to_string(),
        });
    }

    let mut lo = config.low;
    let mut hi = config.high;
    let mut iterations = Vec::new();
    let mut it = 0;
    while hi - lo > config.tolerance {
        it += 1;
        let mid = (lo + hi) * 0.5;
        let feasible = simulate_feasibility(plan, horizon, mid)?;
        iterations.push(RateSolveIteration {
            iteration: it,
            lower_bound: lo,
            upper_bound: hi,
            candidate_rate: mid,
            feasible,
        });

        if feasible {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    debug!(
        monthly_rate = hi,
        iterations = it,
        "solved required monthly return rate"
    );
    Ok(RateSolveReport {
        solution: solved(hi),
        config,
        iterations,
        converged: true,
        message: "Solved required return rate.".to_string(),
    })
}

fn solved(monthly_rate: f64) -> RateSolution {
    RateSolution::Solved {
        annual_rate_percent: round_to_cents(monthly_rate_to_annual_percent(monthly_rate)),
        monthly_rate,
    }
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

fn validate_config(config: RateSearchConfig) -> Result<(), CoreError> {
    if !config.low.is_finite() || !config.high.is_finite() {
        return Err(CoreError::InvalidPlan(
            "rate search bounds must be finite".to_string(),
        ));
    }
    if config.low < 0.0 {
        return Err(CoreError::InvalidPlan(
            "rate search lower bound must be >= 0".to_string(),
        ));
    }
    if config.high <= config.low {
        return Err(CoreError::InvalidPlan(
            "rate search upper bound must be greater than lower bound".to_string(),
        ));
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(CoreError::InvalidPlan(
            "rate search tolerance must be > 0".to_string(),
        ));
    }
    Ok(())
}
