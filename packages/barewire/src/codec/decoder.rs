//! Streaming decoder (C5): the mirror of [`crate::codec::encoder`], walking
//! a [`Type`] and producing a [`Value`] tree directly from the bytes read,
//! rather than decoding into a caller-provided Rust type.

use crate::error::{ensure, error, Result};
use crate::primitive;
use crate::schema::{Schema, Type, Validated};
use crate::value::Value;
use crate::var_len::{read_var_len_sint, read_var_len_uint};
use std::io::Read;

pub fn decode<R: Read>(schema: &Schema<Validated>, ty: &Type, read: &mut R) -> Result<Value> {
    decode_at(schema, ty, read, "")
}

pub fn decode_root<R: Read>(schema: &Schema<Validated>, read: &mut R) -> Result<Value> {
    decode(schema, schema.root_type(), read)
}

fn decode_at<R: Read>(
    schema: &Schema<Validated>,
    ty: &Type,
    read: &mut R,
    path: &str,
) -> Result<Value> {
    Ok(match ty {
        Type::Uint => Value::Uint(read_var_len_uint(read)?.0),
        Type::Int => Value::Int(read_var_len_sint(read)?.0),
        Type::U8 => Value::U8(primitive::read_u8(read)?.0),
        Type::U16 => Value::U16(primitive::read_u16(read)?.0),
        Type::U32 => Value::U32(primitive::read_u32(read)?.0),
        Type::U64 => Value::U64(primitive::read_u64(read)?.0),
        Type::I8 => Value::I8(primitive::read_i8(read)?.0),
        Type::I16 => Value::I16(primitive::read_i16(read)?.0),
        Type::I32 => Value::I32(primitive::read_i32(read)?.0),
        Type::I64 => Value::I64(primitive::read_i64(read)?.0),
        Type::F32 => Value::F32(primitive::read_f32(read)?.0),
        Type::F64 => Value::F64(primitive::read_f64(read)?.0),
        Type::Bool => Value::Bool(primitive::read_bool(read)?.0),
        Type::String => Value::String(primitive::read_string(read)?.0),
        Type::Data => Value::Data(primitive::read_data(read)?.0),
        Type::FixedData(n) => Value::FixedData(primitive::read_fixed_data(read, *n)?.0),
        Type::Void => Value::Void,
        Type::Enum(_) => Value::Enum(read_var_len_uint(read)?.0),
        Type::Optional(inner) => {
            let (present, _) = primitive::read_bool(read)?;
            if present {
                Value::Optional(Some(Box::new(decode_at(
                    schema,
                    inner,
                    read,
                    &format!("{path}.some"),
                )?)))
            } else {
                Value::Optional(None)
            }
        }
        Type::List(inner) => {
            let (len, _) = read_var_len_uint(read)?;
            let len = usize::try_from(len)
                .map_err(|_| error!(Decoding, "list length {} out of range at {}", len, path))?;
            let mut items = Vec::with_capacity(len.min(1 << 16));
            for i in 0..len {
                items.push(decode_at(schema, inner, read, &format!("{path}[{i}]"))?);
            }
            Value::List(items)
        }
        Type::FixedList(inner, n) => {
            let mut items = Vec::with_capacity(*n);
            for i in 0..*n {
                items.push(decode_at(schema, inner, read, &format!("{path}[{i}]"))?);
            }
            Value::FixedList(items)
        }
        Type::Map(key_ty, val_ty) => {
            let (len, _) = read_var_len_uint(read)?;
            let len = usize::try_from(len)
                .map_err(|_| error!(Decoding, "map length {} out of range at {}", len, path))?;
            let mut pairs = Vec::with_capacity(len.min(1 << 16));
            for _ in 0..len {
                let k = decode_at(schema, key_ty, read, &format!("{path}.key"))?;
                let v = decode_at(schema, val_ty, read, &format!("{path}.value"))?;
                pairs.push((k, v));
            }
            // Last-write-wins per repeated key, matching the natural
            // iteration-order map semantics chosen for this format.
            Value::map(pairs)
        }
        Type::Union(cases) => {
            let (tag, _) = read_var_len_uint(read)?;
            let case = cases.iter().find(|c| c.tag == tag).ok_or_else(|| {
                error!(Decoding, "union tag {} not declared at {}", tag, path)
            })?;
            let inner = decode_at(schema, &case.ty, read, &format!("{path}.case({tag})"))?;
            Value::Union {
                tag,
                value: Box::new(inner),
            }
        }
        Type::Struct(fields) => {
            let mut values = Vec::with_capacity(fields.len());
            for field in fields {
                let v = decode_at(schema, &field.ty, read, &format!("{path}.{}", field.name))?;
                values.push((field.name.clone(), v));
            }
            Value::Struct(values)
        }
        Type::UserDefined(name) => decode_at(schema, schema.resolve(name), read, path)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bare_type;
    use crate::codec::encoder::encode_root;

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
    fn roundtrip_struct() {
        let schema = schema();
        let value = Value::strukt([
            ("id", Value::U32(7)),
            ("name", Value::string("x")),
            ("tags", Value::list([Value::string("a"), Value::string("b")])),
        ]);
        let mut buf = Vec::new();
        encode_root(&schema, &value, &mut buf).unwrap();
        let decoded = decode_root(&schema, &mut buf.as_slice()).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn unknown_union_tag_rejected_on_decode() {
        let mut schema = Schema::new("U");
        schema.define("U", bare_type!(union { 0: (u8) }));
        let schema = schema.validate().unwrap();
        let buf = [0x05, 0x00];
        ensure_decode_fails(&schema, &buf);
    }

    fn ensure_decode_fails(schema: &Schema<Validated>, buf: &[u8]) {
        assert!(decode_root(schema, &mut &buf[..]).is_err());
    }

    /// Scenario 1: `Person { name: string; age: i32; tags: list<string> }`
    /// with `{name="Ada", age=37, tags=["x","y"]}` encodes to the exact
    /// byte sequence the spec's test matrix gives.
    #[test]
    fn person_struct_matches_expected_wire_bytes() {
        let mut schema = Schema::new("Person");
        schema.define(
            "Person",
            bare_type!(struct {
                (name: string),
                (age: i32),
                (tags: list(string)),
            }),
        );
        let schema = schema.validate().unwrap();
        let value = Value::strukt([
            ("name", Value::string("Ada")),
            ("age", Value::I32(37)),
            ("tags", Value::list([Value::string("x"), Value::string("y")])),
        ]);
        let mut buf = Vec::new();
        encode_root(&schema, &value, &mut buf).unwrap();
        assert_eq!(
            buf,
            vec![
                0x03, 0x41, 0x64, 0x61, // len=3, "Ada"
                0x25, 0x00, 0x00, 0x00, // age=37 LE i32
                0x02, // tags count=2
                0x01, 0x78, // len=1, "x"
                0x01, 0x79, // len=1, "y"
            ]
        );
        let decoded = decode_root(&schema, &mut buf.as_slice()).unwrap();
        assert_eq!(decoded, value);
    }

    /// Scenario 4: `Result = union { 0: i32, 1: string, 2: void }`;
    /// selecting case 2 (`void`) encodes as a single byte with no payload.
    #[test]
    fn union_void_case_is_single_byte() {
        let mut schema = Schema::new("Result");
        schema.define(
            "Result",
            bare_type!(union { 0: (i32), 1: (string), 2: (void) }),
        );
        let schema = schema.validate().unwrap();
        let value = Value::union(2, Value::Void);
        let mut buf = Vec::new();
        encode_root(&schema, &value, &mut buf).unwrap();
        assert_eq!(buf, vec![0x02]);
        let decoded = decode_root(&schema, &mut buf.as_slice()).unwrap();
        assert_eq!(decoded, Value::union(2, Value::Void));
    }

    #[test]
    fn map_roundtrip_preserves_last_write_wins() {
        let mut schema = Schema::new("M");
        schema.define("M", bare_type!(map(string)(u8)));
        let schema = schema.validate().unwrap();
        let value = Value::map([(Value::string("a"), Value::U8(1))]);
        let mut buf = Vec::new();
        encode_root(&schema, &value, &mut buf).unwrap();
        let decoded = decode_root(&schema, &mut buf.as_slice()).unwrap();
        assert_eq!(decoded, value);
    }
}
