use super::error::CoreError;
use super::types::MIN_WITHDRAWAL_AGE;

/// Withdrawal tax rate for the saver's age: 5.5% in [55, 70), 4.4% in
/// [70, 80), 3.3% from 80 on.
pub fn withdrawal_tax_rate(age: u32) -> Result<f64, CoreError> {
    match age {
        a if a < MIN_WITHDRAWAL_AGE => Err(CoreError::InvalidAge { age }),
        55..=69 => Ok(0.055),
        70..=79 => Ok(0.044),
        _ => Ok(0.033),
    }
}
