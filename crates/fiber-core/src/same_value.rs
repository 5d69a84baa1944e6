//! Strict identity comparison used for state bail-out and effect dependencies.
//!
//! Scalars compare by value, floats follow "same value" rules (`NaN` equals
//! `NaN`, `0.0` differs from `-0.0`), strings compare by content, and shared
//! pointers compare by address. Owned collections have no implementation on
//! purpose: wrap them in an `Rc` to get reference semantics.

use std::rc::Rc;
use std::sync::Arc;

pub trait SameValue {
    fn same_value(&self, other: &Self) -> bool;
}

macro_rules! same_value_by_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl SameValue for $ty {
                #[inline]
                fn same_value(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

same_value_by_eq!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    String,
    &'static str,
);

impl SameValue for f64 {
    fn same_value(&self, other: &Self) -> bool {
        if self.is_nan() && other.is_nan() {
            return true;
        }
        self.to_bits() == other.to_bits()
    }
}

impl SameValue for f32 {
    fn same_value(&self, other: &Self) -> bool {
        if self.is_nan() && other.is_nan() {
            return true;
        }
        self.to_bits() == other.to_bits()
    }
}

impl<T: ?Sized> SameValue for Rc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> SameValue for Arc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: SameValue> SameValue for Option<T> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_value(b),
            (None, None) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_follow_same_value_rules() {
        assert!(f64::NAN.same_value(&f64::NAN));
        assert!(!0.0f64.same_value(&-0.0));
        assert!(1.5f64.same_value(&1.5));
        assert!(f32::NAN.same_value(&f32::NAN));
    }

    #[test]
    fn shared_pointers_compare_by_address() {
        let a = Rc::new(vec![1, 2]);
        let b = Rc::new(vec![1, 2]);
        assert!(a.same_value(&a.clone()));
        assert!(!a.same_value(&b));
    }

    #[test]
    fn strings_compare_by_content() {
        assert!(String::from("x").same_value(&"x".to_string()));
        assert!(Some(3).same_value(&Some(3)));
        assert!(!Some(3).same_value(&None));
    }
}
