use serde::Deserialize;
use thiserror::Error;

use crate::core::{Clock, MAX_PLAN_AGE, PlanInputs};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{field} must be a number, got {value:?}")]
    NotANumber { field: &'static str, value: String },

    #[error("{field} must be a whole number of years, got {value:?}")]
    NotAnAge { field: &'static str, value: String },

    #[error("dob must look like YYYY-MM-DD, got {0:?}")]
    BadDateOfBirth(String),

    #[error("{0}")]
    OutOfRange(String),
}

/// Raw field value as it arrives from JSON, a query string or a form post.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlanPayload {
    pub dob: Option<String>,
    #[serde(alias = "birth_year")]
    pub birth_year: Option<FieldValue>,
    #[serde(alias = "retirement_age")]
    pub retirement_age: Option<FieldValue>,
    #[serde(alias = "life_expectancy")]
    pub life_expectancy: Option<FieldValue>,
    #[serde(alias = "current_assets")]
    pub current_assets: Option<FieldValue>,
    #[serde(alias = "current_salary")]
    pub current_salary: Option<FieldValue>,
    #[serde(alias = "monthly_investment")]
    pub monthly_investment: Option<FieldValue>,
    #[serde(alias = "required_pension")]
    pub required_pension: Option<FieldValue>,
    #[serde(alias = "salary_growth_rate")]
    pub salary_growth_rate: Option<FieldValue>,
    #[serde(alias = "continue_investment")]
    pub continue_investment: Option<FieldValue>,
}

/// Parses a decimal that may use a comma as the separator: "1234,56" and
/// "1234.56" are both 1234.56.
pub fn parse_decimal(field: &'static str, raw: &str) -> Result<f64, InputError> {
    let normalized = raw.trim().replace(',', ".");
    match normalized.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(InputError::NotANumber {
            field,
            value: raw.to_string(),
        }),
    }
}

pub fn parse_age(field: &'static str, raw: &str) -> Result<u32, InputError> {
    raw.trim().parse::<u32>().map_err(|_| InputError::NotAnAge {
        field,
        value: raw.to_string(),
    })
}

/// Takes the year from an ISO date of birth. A bare year is accepted too.
pub fn parse_birth_year(raw: &str) -> Result<i32, InputError> {
    let trimmed = raw.trim();
    let year = trimmed.split('-').next().unwrap_or_default();
    if year.len() != 4 {
        return Err(InputError::BadDateOfBirth(raw.to_string()));
    }
    year.parse::<i32>()
        .map_err(|_| InputError::BadDateOfBirth(raw.to_string()))
}

pub fn parse_checkbox(value: Option<&FieldValue>) -> bool {
    match value {
        None => false,
        Some(FieldValue::Flag(b)) => *b,
        Some(FieldValue::Number(n)) => *n != 0.0,
        Some(FieldValue::Text(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "on" | "true" | "1" | "yes"
        ),
    }
}

fn decimal_field(field: &'static str, value: Option<&FieldValue>) -> Result<f64, InputError> {
    match value {
        None => Err(InputError::Missing(field)),
        Some(FieldValue::Number(n)) if n.is_finite() => Ok(*n),
        Some(FieldValue::Text(s)) => parse_decimal(field, s),
        Some(other) => Err(InputError::NotANumber {
            field,
            value: format!("{other:?}"),
        }),
    }
}

fn age_field(field: &'static str, value: Option<&FieldValue>) -> Result<u32, InputError> {
    match value {
        None => Err(InputError::Missing(field)),
        Some(FieldValue::Number(n)) if n.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(n) => {
            Ok(*n as u32)
        }
        Some(FieldValue::Text(s)) => parse_age(field, s),
        Some(other) => Err(InputError::NotAnAge {
            field,
            value: format!("{other:?}"),
        }),
    }
}

fn birth_year_field(payload: &PlanPayload) -> Result<i32, InputError> {
    if let Some(dob) = payload.dob.as_deref().filter(|s| !s.trim().is_empty()) {
        return parse_birth_year(dob);
    }
    match payload.birth_year.as_ref() {
        None => Err(InputError::Missing("dob")),
        Some(FieldValue::Number(n))
            if n.fract() == 0.0 && (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(n) =>
        {
            Ok(*n as i32)
        }
        Some(FieldValue::Text(s)) => parse_birth_year(s),
        Some(other) => Err(InputError::BadDateOfBirth(format!("{other:?}"))),
    }
}

pub fn build_plan(payload: &PlanPayload, clock: &dyn Clock) -> Result<PlanInputs, InputError> {
    let birth_year = birth_year_field(payload)?;
    let reference_year = clock.current_year();
    if birth_year > reference_year {
        return Err(InputError::OutOfRange(format!(
            "dob year {birth_year} is in the future"
        )));
    }

    let plan = PlanInputs {
        birth_year,
        reference_year,
        retirement_age: age_field("retirementAge", payload.retirement_age.as_ref())?,
        life_expectancy: age_field("lifeExpectancy", payload.life_expectancy.as_ref())?,
        current_assets: decimal_field("currentAssets", payload.current_assets.as_ref())?,
        current_salary: match payload.current_salary.as_ref() {
            None => 0.0,
            Some(FieldValue::Text(s)) if s.trim().is_empty() => 0.0,
            value => decimal_field("currentSalary", value)?,
        },
        monthly_investment: decimal_field(
            "monthlyInvestment",
            payload.monthly_investment.as_ref(),
        )?,
        required_pension: decimal_field("requiredPension", payload.required_pension.as_ref())?,
        salary_growth_rate: decimal_field(
            "salaryGrowthRate",
            payload.salary_growth_rate.as_ref(),
        )?,
        continue_investment: parse_checkbox(payload.continue_investment.as_ref()),
    };
    validate_plan(&plan)?;
    Ok(plan)
}

pub fn validate_plan(plan: &PlanInputs) -> Result<(), InputError> {
    let current_age = i64::from(plan.reference_year) - i64::from(plan.birth_year);
    let max_age = i64::from(MAX_PLAN_AGE);
    if current_age > max_age {
        return Err(InputError::OutOfRange(format!(
            "dob must be within {MAX_PLAN_AGE} years of {}",
            plan.reference_year
        )));
    }
    for (name, value) in [
        ("retirementAge", plan.retirement_age),
        ("lifeExpectancy", plan.life_expectancy),
    ] {
        if i64::from(value) > max_age {
            return Err(InputError::OutOfRange(format!(
                "{name} must be <= {MAX_PLAN_AGE}"
            )));
        }
    }
    if i64::from(plan.life_expectancy) < current_age {
        return Err(InputError::OutOfRange(format!(
            "lifeExpectancy must be >= current age {current_age}"
        )));
    }
    for (name, value) in [
        ("currentAssets", plan.current_assets),
        ("monthlyInvestment", plan.monthly_investment),
        ("requiredPension", plan.required_pension),
    ] {
        if value < 0.0 {
            return Err(InputError::OutOfRange(format!("{name} must be >= 0")));
        }
    }
    if plan.salary_growth_rate <= -100.0 {
        return Err(InputError::OutOfRange(
            "salaryGrowthRate must be > -100".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FixedClock;

    fn text(s: &str) -> Option<FieldValue> {
        Some(FieldValue::Text(s.to_string()))
    }

    fn sample_payload() -> PlanPayload {
        PlanPayload {
            dob: Some("1985-06-15".to_string()),
            birth_year: None,
            retirement_age: text("65"),
            life_expectancy: text("90"),
            current_assets: text("0"),
            current_salary: text("45000"),
            monthly_investment: text("500"),
            required_pension: text("2000"),
            salary_growth_rate: text("3"),
            continue_investment: None,
        }
    }

    #[test]
    fn decimal_accepts_comma_or_period() {
        assert_eq!(parse_decimal("x", "1234,56"), Ok(1234.56));
        assert_eq!(parse_decimal("x", "1234.56"), Ok(1234.56));
        assert_eq!(parse_decimal("x", " 7 "), Ok(7.0));
    }

    #[test]
    fn decimal_rejects_garbage() {
        for raw in ["", "abc", "1,2,3", "inf", "NaN"] {
            assert!(
                matches!(parse_decimal("x", raw), Err(InputError::NotANumber { .. })),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn birth_year_comes_from_iso_date() {
        assert_eq!(parse_birth_year("1985-06-15"), Ok(1985));
        assert_eq!(parse_birth_year("1990"), Ok(1990));
        assert!(parse_birth_year("85-06-15").is_err());
        assert!(parse_birth_year("").is_err());
    }

    #[test]
    fn checkbox_is_on_only_when_ticked() {
        assert!(!parse_checkbox(None));
        assert!(parse_checkbox(text("on").as_ref()));
        assert!(parse_checkbox(Some(&FieldValue::Flag(true))));
        assert!(!parse_checkbox(text("off").as_ref()));
    }

    #[test]
    fn build_plan_uses_injected_year() {
        let plan = build_plan(&sample_payload(), &FixedClock(2025)).expect("valid plan");
        assert_eq!(plan.birth_year, 1985);
        assert_eq!(plan.reference_year, 2025);
        assert_eq!(plan.retirement_age, 65);
        assert_eq!(plan.current_salary, 45_000.0);
        assert!(!plan.continue_investment);
    }

    #[test]
    fn build_plan_reports_missing_fields() {
        let mut payload = sample_payload();
        payload.required_pension = None;
        assert_eq!(
            build_plan(&payload, &FixedClock(2025)),
            Err(InputError::Missing("requiredPension"))
        );
    }

    #[test]
    fn build_plan_rejects_life_expectancy_below_current_age() {
        let mut payload = sample_payload();
        payload.life_expectancy = text("30");
        let err = build_plan(&payload, &FixedClock(2025)).expect_err("must reject");
        assert!(err.to_string().contains("lifeExpectancy"));
    }

    #[test]
    fn build_plan_rejects_fractional_ages() {
        let mut payload = sample_payload();
        payload.retirement_age = text("65.5");
        assert!(matches!(
            build_plan(&payload, &FixedClock(2025)),
            Err(InputError::NotAnAge { .. })
        ));
    }

    #[test]
    fn payload_accepts_json_numbers_and_snake_case_keys() {
        let json = r#"{
            "dob": "1985-01-01",
            "retirement_age": 65,
            "lifeExpectancy": "90",
            "currentAssets": "1000,50",
            "monthlyInvestment": 500,
            "requiredPension": 2000.0,
            "salaryGrowthRate": "3,5",
            "continueInvestment": true
        }"#;
        let payload: PlanPayload = serde_json::from_str(json).expect("payload parses");
        let plan = build_plan(&payload, &FixedClock(2025)).expect("valid plan");
        assert_eq!(plan.retirement_age, 65);
        assert_eq!(plan.current_assets, 1000.5);
        assert_eq!(plan.salary_growth_rate, 3.5);
        assert!(plan.continue_investment);
    }

    #[test]
    fn extreme_ages_and_birth_years_are_rejected_not_overflowed() {
        let base = r#""dob": "", "retirementAge": 65, "currentAssets": 0,
            "monthlyInvestment": 500, "requiredPension": 2000, "salaryGrowthRate": 3"#;
        for extra in [
            r#""birthYear": -2147483648, "lifeExpectancy": 90"#,
            r#""birthYear": -1e12, "lifeExpectancy": 90"#,
            r#""birthYear": 1800, "lifeExpectancy": 300"#,
            r#""birthYear": 1985, "lifeExpectancy": 4294967295"#,
            r#""birthYear": 1985, "lifeExpectancy": 200000000"#,
        ] {
            let json = format!("{{{base}, {extra}}}");
            let payload: PlanPayload = serde_json::from_str(&json).expect("payload parses");
            assert!(
                build_plan(&payload, &FixedClock(2025)).is_err(),
                "{extra} should be rejected"
            );
        }
    }

    #[test]
    fn oldest_accepted_plan_sits_at_the_age_cap() {
        let mut payload = sample_payload();
        payload.dob = Some(format!("{}-01-01", 2025 - MAX_PLAN_AGE as i32));
        payload.life_expectancy = Some(FieldValue::Number(f64::from(MAX_PLAN_AGE)));
        let plan = build_plan(&payload, &FixedClock(2025)).expect("valid plan");
        assert_eq!(plan.horizon().expect("valid horizon").total_months, 12);

        payload.retirement_age = Some(FieldValue::Number(f64::from(MAX_PLAN_AGE + 1)));
        assert!(matches!(
            build_plan(&payload, &FixedClock(2025)),
            Err(InputError::OutOfRange(_))
        ));
    }
}
