use clap::{Args, Parser, Subcommand};
use std::net::Ipv4Addr;

use super::input::{parse_birth_year, parse_decimal, validate_plan};
use super::{PlanResponse, evaluate_plan, run_http_server};
use crate::core::{Clock, PlanInputs, SystemClock};

#[derive(Parser, Debug)]
#[command(
    name = "fire-plan",
    about = "Required-return estimator for a savings and pension withdrawal plan"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the web form and JSON API.
    Serve(ServeArgs),
    /// Solve a plan and print the yearly projection.
    Plan(PlanArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, env = "FIRE_PLAN_HOST", default_value_t = Ipv4Addr::UNSPECIFIED)]
    pub host: Ipv4Addr,
    #[arg(long, env = "FIRE_PLAN_PORT", default_value_t = 8080)]
    pub port: u16,
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    #[arg(long, help = "Date of birth, YYYY-MM-DD (only the year is used)")]
    pub dob: String,
    #[arg(long)]
    pub retirement_age: u32,
    #[arg(long)]
    pub life_expectancy: u32,
    #[arg(long, value_parser = decimal_arg, help = "Current invested assets")]
    pub current_assets: f64,
    #[arg(long, value_parser = decimal_arg, default_value = "0")]
    pub current_salary: f64,
    #[arg(long, value_parser = decimal_arg, help = "Monthly contribution today")]
    pub monthly_investment: f64,
    #[arg(
        long,
        value_parser = decimal_arg,
        help = "After-tax monthly pension wanted once withdrawals start"
    )]
    pub required_pension: f64,
    #[arg(
        long,
        value_parser = decimal_arg,
        default_value = "0",
        help = "Annual contribution growth in percent, e.g. 3 or 2,5"
    )]
    pub salary_growth_rate: f64,
    #[arg(long, help = "Keep contributing after the retirement age")]
    pub continue_investment: bool,
    #[arg(long, help = "Evaluate as if the current year were this one")]
    pub reference_year: Option<i32>,
    #[arg(long, help = "Print the response as JSON instead of a table")]
    pub json: bool,
}

fn decimal_arg(raw: &str) -> Result<f64, String> {
    parse_decimal("value", raw).map_err(|e| e.to_string())
}

pub fn build_plan_from_args(args: &PlanArgs, clock: &dyn Clock) -> Result<PlanInputs, String> {
    let birth_year = parse_birth_year(&args.dob).map_err(|e| e.to_string())?;
    let plan = PlanInputs {
        birth_year,
        reference_year: args.reference_year.unwrap_or_else(|| clock.current_year()),
        retirement_age: args.retirement_age,
        life_expectancy: args.life_expectancy,
        current_assets: args.current_assets,
        current_salary: args.current_salary,
        monthly_investment: args.monthly_investment,
        required_pension: args.required_pension,
        salary_growth_rate: args.salary_growth_rate,
        continue_investment: args.continue_investment,
    };
    if plan.birth_year > plan.reference_year {
        return Err(format!("--dob year {birth_year} is in the future"));
    }
    validate_plan(&plan).map_err(|e| e.to_string())?;
    Ok(plan)
}

pub async fn run_cli(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Serve(args) => run_http_server(args.host.octets(), args.port)
            .await
            .map_err(|e| format!("Server error: {e}")),
        Command::Plan(args) => {
            let plan = build_plan_from_args(&args, &SystemClock)?;
            let response = evaluate_plan(&plan).map_err(|e| e.to_string())?;
            if args.json {
                let json = serde_json::to_string_pretty(&response)
                    .map_err(|e| format!("failed to encode response: {e}"))?;
                println!("{json}");
            } else {
                print!("{}", render_table(&response));
            }
            Ok(())
        }
    }
}

pub fn render_table(response: &PlanResponse) -> String {
    let mut out = String::new();
    match response.required_return_rate {
        Some(rate) => out.push_str(&format!("Required annual return: {rate:.2}%\n\n")),
        None => {
            out.push_str(&response.message);
            out.push('\n');
            return out;
        }
    }

    out.push_str(&format!(
        "{:>4} {:>5} {:>14} {:>12} {:>12} {:>12} {:>10} {:>12} {:>14}\n",
        "Age", "Year", "Start", "Invested", "Profit", "Withdrawn", "Tax", "Net", "End"
    ));
    out.push_str(&"-".repeat(105));
    out.push('\n');
    for r in &response.years {
        out.push_str(&format!(
            "{:>4} {:>5} {:>14} {:>12} {:>12} {:>12} {:>10} {:>12} {:>14}\n",
            r.age,
            r.year,
            r.starting_assets,
            r.annual_investment,
            r.annual_profit,
            r.annual_withdrawal,
            r.annual_tax,
            r.annual_after_tax_withdrawal,
            r.ending_assets
        ));
    }
    out
}
