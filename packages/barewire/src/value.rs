//! Dynamic representation of a BARE value (C5), analogous to
//! `serde_json::Value`. A `Value` tree is checked against a [`crate::schema::Type`]
//! at encode time and produced fresh from one at decode time; there is no
//! reflection step and no intermediate "is this conformant" pass separate
//! from the encode/decode walk itself.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Uint(u64),
    Int(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Bool(bool),
    String(String),
    Data(Vec<u8>),
    FixedData(Vec<u8>),
    /// Zero-size value; only legal where a union case's type is `void`.
    Void,
    /// An enum value records the numeric tag; the name is not carried
    /// since it is not part of the wire format.
    Enum(u64),
    Optional(Option<Box<Value>>),
    List(Vec<Value>),
    FixedList(Vec<Value>),
    /// Entries in iteration order. Construction helpers de-duplicate by
    /// last-write-wins, matching the map semantics chosen in `SPEC_FULL.md`.
    Map(Vec<(Value, Value)>),
    Union { tag: u64, value: Box<Value> },
    /// Fields in declaration order, matching the struct type they were
    /// built against.
    Struct(Vec<(String, Value)>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Value {
        Value::String(s.into())
    }

    pub fn data(bytes: impl Into<Vec<u8>>) -> Value {
        Value::Data(bytes.into())
    }

    pub fn some(value: Value) -> Value {
        Value::Optional(Some(Box::new(value)))
    }

    pub const NONE: Value = Value::Optional(None);

    pub fn list(values: impl IntoIterator<Item = Value>) -> Value {
        Value::List(values.into_iter().collect())
    }

    pub fn union(tag: u64, value: Value) -> Value {
        Value::Union {
            tag,
            value: Box::new(value),
        }
    }

    pub fn strukt(fields: impl IntoIterator<Item = (impl Into<String>, Value)>) -> Value {
        Value::Struct(fields.into_iter().map(|(n, v)| (n.into(), v)).collect())
    }

    /// Build a map `Value`, keeping only the last entry for any repeated
    /// key, matching the decode-time semantics.
    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Value {
        let mut dedup: BTreeMap<ValueKey, Value> = BTreeMap::new();
        let mut order: Vec<Value> = Vec::new();
        for (k, v) in entries {
            let key = ValueKey(k.clone());
            if !dedup.contains_key(&key) {
                order.push(k.clone());
            }
            dedup.insert(key, v);
        }
        let pairs = order
            .into_iter()
            .map(|k| {
                let v = dedup.remove(&ValueKey(k.clone())).unwrap();
                (k, v)
            })
            .collect();
        Value::Map(pairs)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_struct_fields(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Struct(fields) => Some(fields.as_slice()),
            _ => None,
        }
    }

    pub fn struct_field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) | Value::FixedList(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::Uint(n) | Value::U64(n) => Some(n),
            Value::U8(n) => Some(n as u64),
            Value::U16(n) => Some(n as u64),
            Value::U32(n) => Some(n as u64),
            _ => None,
        }
    }
}

/// Total order over `Value` for use as a `BTreeMap` key in
/// [`Value::map`]'s de-duplication pass. Floats use their bit pattern;
/// this is only ever compared against other encoded-value bits, never
/// surfaced as float ordering semantics.
#[derive(Debug, Clone)]
struct ValueKey(Value);

impl ValueKey {
    fn rank_bytes(&self) -> Vec<u8> {
        fn go(v: &Value, out: &mut Vec<u8>) {
            match v {
                Value::Uint(n) | Value::U64(n) => {
                    out.push(0);
                    out.extend_from_slice(&n.to_be_bytes());
                }
                Value::Int(n) | Value::I64(n) => {
                    out.push(1);
                    out.extend_from_slice(&n.to_be_bytes());
                }
                Value::U8(n) => {
                    out.push(2);
                    out.push(*n);
                }
                Value::U16(n) => {
                    out.push(3);
                    out.extend_from_slice(&n.to_be_bytes());
                }
                Value::U32(n) => {
                    out.push(4);
                    out.extend_from_slice(&n.to_be_bytes());
                }
                Value::I8(n) => {
                    out.push(5);
                    out.push(*n as u8);
                }
                Value::I16(n) => {
                    out.push(6);
                    out.extend_from_slice(&n.to_be_bytes());
                }
                Value::I32(n) => {
                    out.push(7);
                    out.extend_from_slice(&n.to_be_bytes());
                }
                Value::F32(n) => {
                    out.push(8);
                    out.extend_from_slice(&n.to_bits().to_be_bytes());
                }
                Value::F64(n) => {
                    out.push(9);
                    out.extend_from_slice(&n.to_bits().to_be_bytes());
                }
                Value::Bool(b) => {
                    out.push(10);
                    out.push(*b as u8);
                }
                Value::String(s) => {
                    out.push(11);
                    out.extend_from_slice(s.as_bytes());
                }
                Value::Data(d) | Value::FixedData(d) => {
                    out.push(12);
                    out.extend_from_slice(d);
                }
                Value::Enum(n) => {
                    out.push(13);
                    out.extend_from_slice(&n.to_be_bytes());
                }
                other => {
                    out.push(255);
                    out.extend_from_slice(format!("{other:?}").as_bytes());
                }
            }
        }
        let mut out = Vec::new();
        go(&self.0, &mut out);
        out
    }
}

impl PartialEq for ValueKey {
    fn eq(&self, other: &Self) -> bool {
        self.rank_bytes() == other.rank_bytes()
    }
}
impl Eq for ValueKey {}
impl PartialOrd for ValueKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ValueKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank_bytes().cmp(&other.rank_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_field_lookup() {
        let v = Value::strukt([("a", Value::U8(1)), ("b", Value::string("x"))]);
        assert_eq!(v.struct_field("b").unwrap().as_str(), Some("x"));
        assert!(v.struct_field("missing").is_none());
    }

    #[test]
    fn map_dedups_last_write_wins() {
        let v = Value::map([
            (Value::string("k"), Value::U8(1)),
            (Value::string("k"), Value::U8(2)),
        ]);
        match v {
            Value::Map(pairs) => {
                assert_eq!(pairs.len(), 1);
                assert_eq!(pairs[0].1, Value::U8(2));
            }
            _ => panic!("expected map"),
        }
    }

    #[test]
    fn optional_constructors() {
        assert_eq!(Value::some(Value::U8(1)), Value::Optional(Some(Box::new(Value::U8(1)))));
        assert_eq!(Value::NONE, Value::Optional(None));
    }
}
