//! BAREWire implements the BARE binary encoding (RFC-adjacent
//! "Binary Application Record Encoding") for Rust values addressed as an
//! explicit [`value::Value`] tree rather than through a `serde`-style
//! derive, plus the schema-evolution and memory-layout machinery that
//! sits on top of a closed, runtime-manipulable type algebra:
//!
//! - a [`schema`] module describing the type algebra itself, phantom-
//!   typed so a schema's validation status ([`schema::Draft`] vs
//!   [`schema::Validated`]) is enforced by the type checker rather than a
//!   runtime flag;
//! - a two-phase [`validate`] pass (structural checks, then cycle
//!   detection over directly-composed type references) that is the only
//!   way to produce a `Schema<Validated>`;
//! - an [`analyze`] module computing per-type wire size bounds and
//!   alignment, and comparing two validated schemas for backward/forward/
//!   full compatibility, for schema-evolution checks;
//! - a [`value`] module holding the dynamic [`value::Value`], the data
//!   this crate moves around, checked against a schema's types as it is
//!   walked rather than reflected over;
//! - a [`codec`] module streaming a `Value` to/from bytes against a
//!   validated schema;
//! - a [`region`] module giving bounds-checked access to a borrowed byte
//!   buffer (the substrate IPC transports hand in);
//! - a [`layout`] module computing fixed in-memory offsets for a struct
//!   type, and a [`view`] module addressing fields by dotted path
//!   directly over region bytes using that layout, without a codec pass.
//!
//! `var_len` and `primitive` are the wire-level building blocks the codec
//! and view modules share; `error` is this crate's uniform failure type.

pub mod analyze;
pub mod codec;
pub mod convert;
pub mod error;
pub mod layout;
pub mod primitive;
pub mod region;
pub mod schema;
pub mod validate;
pub mod value;
pub mod var_len;
pub mod view;

pub use analyze::{alignment, analyze, size_bounds, Compatibility, CompatibilityReport, SizeBounds};
pub use convert::BareValue;
pub use error::{Error, ErrorKind, Result};
pub use layout::{layout_struct, FieldKind, FieldLayout, StructLayout};
pub use region::{Region, RegionMut};
pub use schema::{Draft, Schema, Type, Validated};
pub use validate::ValidationError;
pub use value::Value;
pub use view::{View, ViewMut};

#[cfg(feature = "derive")]
pub use barewire_derive::BareValue;

/// Encode `value` against `schema`'s root type into a freshly allocated
/// buffer.
pub fn encode_to_vec(schema: &Schema<Validated>, value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    codec::encode_root(schema, value, &mut buf)?;
    Ok(buf)
}

/// Decode a `Value` of `schema`'s root type from `bytes`.
pub fn decode_from_slice(schema: &Schema<Validated>, bytes: &[u8]) -> Result<Value> {
    codec::decode_root(schema, &mut &bytes[..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bare_type;

    #[test]
    fn end_to_end_roundtrip() {
        let mut schema = Schema::new("Point");
        schema.define("Point", bare_type!(struct { (x: i32), (y: i32) }));
        let schema = schema.validate().unwrap();

        let value = Value::strukt([("x", Value::I32(3)), ("y", Value::I32(-4))]);
        let bytes = encode_to_vec(&schema, &value).unwrap();
        let decoded = decode_from_slice(&schema, &bytes).unwrap();
        assert_eq!(decoded, value);
    }
}
