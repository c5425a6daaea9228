use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("no withdrawal tax bracket covers age {age}; withdrawals start at 55")]
    InvalidAge { age: u32 },

    #[error("invalid plan: {0}")]
    InvalidPlan(String),
}
