//! Streaming encoder (C5): walks a [`Value`] against a [`Type`] and writes
//! its BARE wire representation. The whole value tree is always in hand
//! (unlike a `serde`-style push encoder driven by a caller's own types),
//! so there is no state machine tracking "what comes next" — the
//! recursion over `Type` *is* the state.

use crate::error::{bail, ensure, error, Result};
use crate::primitive;
use crate::schema::{Schema, Type, Validated};
use crate::value::Value;
use crate::var_len::{write_var_len_sint, write_var_len_uint};
use std::io::Write;

pub fn encode<W: Write>(
    schema: &Schema<Validated>,
    ty: &Type,
    value: &Value,
    write: &mut W,
) -> Result<()> {
    encode_at(schema, ty, value, write, "")
}

/// Encode `value` against the schema's root type.
pub fn encode_root<W: Write>(schema: &Schema<Validated>, value: &Value, write: &mut W) -> Result<()> {
    encode(schema, schema.root_type(), value, write)
}

fn encode_at<W: Write>(
    schema: &Schema<Validated>,
    ty: &Type,
    value: &Value,
    write: &mut W,
    path: &str,
) -> Result<()> {
    match (ty, value) {
        (Type::Uint, Value::Uint(n)) => write_var_len_uint(write, *n),
        (Type::Int, Value::Int(n)) => write_var_len_sint(write, *n),
        (Type::U8, Value::U8(n)) => primitive::write_u8(write, *n),
        (Type::U16, Value::U16(n)) => primitive::write_u16(write, *n),
        (Type::U32, Value::U32(n)) => primitive::write_u32(write, *n),
        (Type::U64, Value::U64(n)) => primitive::write_u64(write, *n),
        (Type::I8, Value::I8(n)) => primitive::write_i8(write, *n),
        (Type::I16, Value::I16(n)) => primitive::write_i16(write, *n),
        (Type::I32, Value::I32(n)) => primitive::write_i32(write, *n),
        (Type::I64, Value::I64(n)) => primitive::write_i64(write, *n),
        (Type::F32, Value::F32(n)) => primitive::write_f32(write, *n),
        (Type::F64, Value::F64(n)) => primitive::write_f64(write, *n),
        (Type::Bool, Value::Bool(b)) => primitive::write_bool(write, *b),
        (Type::String, Value::String(s)) => primitive::write_string(write, s),
        (Type::Data, Value::Data(d)) => primitive::write_data(write, d),
        (Type::FixedData(n), Value::FixedData(d)) => primitive::write_fixed_data(write, *n, d),
        (Type::Void, Value::Void) => Ok(()),
        (Type::Enum(_), Value::Enum(n)) => write_var_len_uint(write, *n),
        (Type::Optional(inner), Value::Optional(opt)) => match opt {
            None => primitive::write_bool(write, false),
            Some(v) => {
                primitive::write_bool(write, true)?;
                encode_at(schema, inner, v, write, &format!("{path}.some"))
            }
        },
        (Type::List(inner), Value::List(items)) => {
            write_var_len_uint(write, items.len() as u64)?;
            for (i, item) in items.iter().enumerate() {
                encode_at(schema, inner, item, write, &format!("{path}[{i}]"))?;
            }
            Ok(())
        }
        (Type::FixedList(inner, n), Value::FixedList(items)) => {
            ensure!(
                items.len() == *n,
                Encoding,
                "fixed_list expects {} elements, value has {}",
                n,
                items.len(),
            );
            for (i, item) in items.iter().enumerate() {
                encode_at(schema, inner, item, write, &format!("{path}[{i}]"))?;
            }
            Ok(())
        }
        (Type::Map(key_ty, val_ty), Value::Map(pairs)) => {
            write_var_len_uint(write, pairs.len() as u64)?;
            for (k, v) in pairs {
                encode_at(schema, key_ty, k, write, &format!("{path}.key"))?;
                encode_at(schema, val_ty, v, write, &format!("{path}.value"))?;
            }
            Ok(())
        }
        (Type::Union(cases), Value::Union { tag, value }) => {
            let case = cases
                .iter()
                .find(|c| c.tag == *tag)
                .ok_or_else(|| error!(Encoding, "union tag {} not declared at {}", tag, path))?;
            write_var_len_uint(write, *tag)?;
            encode_at(schema, &case.ty, value, write, &format!("{path}.case({tag})"))
        }
        (Type::Struct(fields), Value::Struct(values)) => {
            ensure!(
                fields.len() == values.len(),
                Encoding,
                "struct at {} expects {} fields, value has {}",
                path,
                fields.len(),
                values.len(),
            );
            for (field, (name, value)) in fields.iter().zip(values.iter()) {
                ensure!(
                    &field.name == name,
                    Encoding,
                    "struct field order mismatch at {}: expected {:?}, got {:?}",
                    path,
                    field.name,
                    name,
                );
                encode_at(schema, &field.ty, value, write, &format!("{path}.{name}"))?;
            }
            Ok(())
        }
        (Type::UserDefined(name), _) => encode_at(schema, schema.resolve(name), value, write, path),
        (expected, got) => bail!(
            Encoding,
            "value {:?} does not match type {} at {}",
            got,
            expected.short_name(),
            path,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bare_type;

    fn schema() -> Schema<Validated> {
        let mut s = Schema::new("Msg");
        s.define(
            "Msg",
            bare_type!(struct {
                (id: u32),
                (name: string),
                (tags: list(string)),
            }),
        );
        s.validate().unwrap()
    }

    #[test]
    fn encodes_struct() {
        let schema = schema();
        let value = Value::strukt([
            ("id", Value::U32(7)),
            ("name", Value::string("x")),
            ("tags", Value::list([Value::string("a"), Value::string("b")])),
        ]);
        let mut buf = Vec::new();
        encode_root(&schema, &value, &mut buf).unwrap();
        assert!(!buf.is_empty());
    }

    #[test]
    fn field_order_mismatch_rejected() {
        let schema = schema();
        let value = Value::strukt([
            ("name", Value::string("x")),
            ("id", Value::U32(7)),
            ("tags", Value::List(vec![])),
        ]);
        let mut buf = Vec::new();
        assert!(encode_root(&schema, &value, &mut buf).is_err());
    }

    #[test]
    fn union_unknown_tag_rejected() {
        let mut schema = Schema::new("U");
        schema.define("U", bare_type!(union { 0: (u8) }));
        let schema = schema.validate().unwrap();
        let value = Value::union(1, Value::U8(1));
        let mut buf = Vec::new();
        assert!(encode_root(&schema, &value, &mut buf).is_err());
    }
}
