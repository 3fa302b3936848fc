//! `Value`/native-Rust-type conversion for the handful of primitives
//! [`barewire_derive::BareValue`] generates code against. Lets
//! `#[derive(BareValue)]` emit `<FieldType as BareValue>::bare_type()` /
//! `into_value()` / `from_value()` calls uniformly whether a field is a
//! primitive, an `Option<T>`, a `Vec<T>`, or another derived type.
//!
//! `Vec<T>` maps to `list(T)` for every `T: BareValue`, `Vec<u8>` included
//! (there is no special-cased `data` mapping: a blanket `Vec<T>` impl and a
//! concrete `Vec<u8>` impl would be overlapping impls under Rust's
//! coherence rules, since `u8: BareValue`). A caller that wants the
//! compact `data` wire representation for a byte buffer encodes that field
//! as a `Value::Data` directly rather than going through `derive`.

use crate::error::{error, Result};
use crate::schema::Type;
use crate::value::Value;

pub trait BareValue: Sized {
    fn bare_type() -> Type;
    fn into_value(self) -> Value;
    fn from_value(value: &Value) -> Result<Self>;
}

macro_rules! scalar_impl {
    ($rust:ty, $variant:ident, $ty:ident) => {
        impl BareValue for $rust {
            fn bare_type() -> Type {
                Type::$ty
            }
            fn into_value(self) -> Value {
                Value::$variant(self)
            }
            fn from_value(value: &Value) -> Result<Self> {
                match value {
                    Value::$variant(n) => Ok(*n),
                    other => Err(error!(
                        InvalidValue,
                        "expected {}, got {:?}",
                        stringify!($variant),
                        other
                    )),
                }
            }
        }
    };
}

scalar_impl!(u8, U8, U8);
scalar_impl!(u16, U16, U16);
scalar_impl!(u32, U32, U32);
scalar_impl!(u64, U64, U64);
scalar_impl!(i8, I8, I8);
scalar_impl!(i16, I16, I16);
scalar_impl!(i32, I32, I32);
scalar_impl!(i64, I64, I64);
scalar_impl!(f32, F32, F32);
scalar_impl!(f64, F64, F64);
scalar_impl!(bool, Bool, Bool);

impl BareValue for String {
    fn bare_type() -> Type {
        Type::String
    }
    fn into_value(self) -> Value {
        Value::String(self)
    }
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(error!(InvalidValue, "expected string, got {:?}", other)),
        }
    }
}

impl<T: BareValue> BareValue for Option<T> {
    fn bare_type() -> Type {
        Type::Optional(Box::new(T::bare_type()))
    }
    fn into_value(self) -> Value {
        Value::Optional(self.map(|v| Box::new(v.into_value())))
    }
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Optional(None) => Ok(None),
            Value::Optional(Some(inner)) => Ok(Some(T::from_value(inner)?)),
            other => Err(error!(InvalidValue, "expected optional, got {:?}", other)),
        }
    }
}

impl<T: BareValue> BareValue for Vec<T> {
    fn bare_type() -> Type {
        Type::List(Box::new(T::bare_type()))
    }
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(BareValue::into_value).collect())
    }
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::List(items) | Value::FixedList(items) => {
                items.iter().map(T::from_value).collect()
            }
            other => Err(error!(InvalidValue, "expected list, got {:?}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_roundtrip() {
        let v = Some(7u32).into_value();
        assert_eq!(Option::<u32>::from_value(&v).unwrap(), Some(7));
    }

    #[test]
    fn vec_u8_maps_to_list_of_u8() {
        assert_eq!(<Vec<u8> as BareValue>::bare_type(), Type::List(Box::new(Type::U8)));
    }

    #[test]
    fn vec_t_maps_to_list() {
        assert_eq!(<Vec<u32> as BareValue>::bare_type(), Type::List(Box::new(Type::U32)));
    }
}
