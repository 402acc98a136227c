//! What other modules need to talk to the calculator module
//!
//! Callers depend on this crate, never on the calculator module itself, so
//! their libraries carry no copy of the calculator's declaration or
//! descriptor:
//!
//! ```ignore
//! let calc = ctx.get::<dyn CalculatorApi>(calculator_interface::NAME)?;
//! let sum = calc.add(2, 3);
//! ```

pub const NAME: &str = "calculator";

/// Interface the calculator registers for other modules
pub trait CalculatorApi {
    /// `None` on overflow
    fn add(&self, a: i64, b: i64) -> Option<i64>;

    fn subtract(&self, a: i64, b: i64) -> Option<i64>;

    fn echo(&self, message: &str) -> String;
}
