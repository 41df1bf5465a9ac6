// crates/seig-economics/src/fixed.rs
//
// Fixed-point helpers for ledger math.
//
// Factors are u128 values scaled by FACTOR_ONE (10^27, "ray"). Products of
// two u128 values are formed in 256 bits so intermediate results never wrap;
// only a final quotient above u128::MAX is reported as overflow.

use primitive_types::U256;

use seig_core::ArithmeticError;

/// 1.0 in factor precision (10^27).
pub const FACTOR_ONE: u128 = 1_000_000_000_000_000_000_000_000_000;

/// Rounding direction for `mul_div`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
}

/// Compute `a * b / denom` with the given rounding.
///
/// `context` names the calling operation in the error.
pub fn mul_div(
    a: u128,
    b: u128,
    denom: u128,
    rounding: Rounding,
    context: &'static str,
) -> Result<u128, ArithmeticError> {
    if denom == 0 {
        return Err(ArithmeticError::DivisionByZero(context));
    }
    let product = U256::from(a) * U256::from(b);
    let (mut quotient, remainder) = product.div_mod(U256::from(denom));
    if rounding == Rounding::Up && !remainder.is_zero() {
        quotient = quotient + U256::one();
    }
    if quotient.bits() > 128 {
        return Err(ArithmeticError::Overflow(context));
    }
    Ok(quotient.low_u128())
}

/// `principal * factor / FACTOR_ONE`, rounded down.
pub fn to_effective(principal: u128, factor: u128) -> Result<u128, ArithmeticError> {
    mul_div(principal, factor, FACTOR_ONE, Rounding::Down, "to_effective")
}

/// `amount * FACTOR_ONE / factor` with the given rounding.
pub fn to_principal(amount: u128, factor: u128, rounding: Rounding) -> Result<u128, ArithmeticError> {
    mul_div(amount, FACTOR_ONE, factor, rounding, "to_principal")
}

/// Checked addition reporting the operation on overflow.
pub fn checked_add(a: u128, b: u128, context: &'static str) -> Result<u128, ArithmeticError> {
    a.checked_add(b).ok_or(ArithmeticError::Overflow(context))
}

/// Checked subtraction reporting the operation on underflow.
pub fn checked_sub(a: u128, b: u128, context: &'static str) -> Result<u128, ArithmeticError> {
    a.checked_sub(b).ok_or(ArithmeticError::Underflow(context))
}
