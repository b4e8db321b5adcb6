use std::fmt::Display;
use thiserror::Error;

/// An argument that violates its contract.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("The parameter {name} has the value {value} which is illegal! {explanation}")]
pub struct IllegalArgument {
    pub name: &'static str,
    pub value: String,
    pub explanation: &'static str,
}

impl IllegalArgument {
    pub fn new(name: &'static str, value: impl Display, explanation: &'static str) -> Self {
        Self { name, value: value.to_string(), explanation }
    }
}

/// A number that knows if it is positive or non-negative.
/// Floats additionally have to be finite.
pub trait CheckableNumber: Copy + Display {
    fn is_positive_number(self) -> bool;
    fn is_non_negative_number(self) -> bool;
}

macro_rules! impl_checkable_number {
    (for unsigned: $($t:ident),*) => {
        $(
            impl CheckableNumber for $t {
                #[inline(always)]
                fn is_positive_number(self) -> bool {
                    self > 0
                }

                #[inline(always)]
                fn is_non_negative_number(self) -> bool {
                    true
                }
            }
        )*
    };
    (for signed: $($t:ident),*) => {
        $(
            impl CheckableNumber for $t {
                #[inline(always)]
                fn is_positive_number(self) -> bool {
                    self > 0
                }

                #[inline(always)]
                fn is_non_negative_number(self) -> bool {
                    self >= 0
                }
            }
        )*
    };
    (for float: $($t:ident),*) => {
        $(
            impl CheckableNumber for $t {
                #[inline(always)]
                fn is_positive_number(self) -> bool {
                    self.is_finite() && self > 0.0
                }

                #[inline(always)]
                fn is_non_negative_number(self) -> bool {
                    self.is_finite() && self >= 0.0
                }
            }
        )*
    };
}

impl_checkable_number!(for unsigned: u8, u16, u32, u64, u128, usize);
impl_checkable_number!(for signed: i8, i16, i32, i64, i128, isize);
impl_checkable_number!(for float: f32, f64);

/// Fails if `value` is not strictly greater than zero.
pub fn assert_is_positive<N: CheckableNumber>(name: &'static str, value: N) -> Result<N, IllegalArgument> {
    if value.is_positive_number() {
        Ok(value)
    } else {
        Err(IllegalArgument::new(name, value, "Must be positive."))
    }
}

/// Fails if `value` is smaller than zero.
pub fn assert_is_non_negative<N: CheckableNumber>(name: &'static str, value: N) -> Result<N, IllegalArgument> {
    if value.is_non_negative_number() {
        Ok(value)
    } else {
        Err(IllegalArgument::new(name, value, "Must be non-negative."))
    }
}
