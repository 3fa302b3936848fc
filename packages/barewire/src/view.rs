//! Typed view (C8): path-addressed access to a fixed-layout struct's
//! primitive fields directly over region bytes (per [`crate::layout`]),
//! without going through the streaming codec.
//!
//! Only primitive (fixed-kind) fields and inline nested structs are
//! addressable here, per §4.8: `get`/`set`/`update` operate on a
//! primitive field at a path, and `nested_view` scopes down into an
//! inline sub-struct. A field whose type is variable-length (`string`,
//! `data`, `list`, `map`, `optional`, `union`) is laid out as a reserved,
//! aligned handle slot (see [`crate::layout`]) but is deliberately *not*
//! readable or writable through this API: doing so would require an
//! allocator living inside the region to hold the out-of-line payload,
//! which §4.7 rules out ("deliberately not part of this specification").
//! A caller that needs such a field encodes/decodes it with [`crate::codec`]
//! against its own storage and keeps only a handle (offset/length) of its
//! own design in the slot.

use crate::error::{ensure, error, Result};
use crate::layout::{self, FieldKind, FieldLayout, StructLayout};
use crate::region::{Region, RegionMut};
use crate::schema::{Schema, Type, Validated};
use crate::value::Value;

pub struct View<'r> {
    schema: &'r Schema<Validated>,
    ty: Type,
    layout: StructLayout,
    region: Region<'r>,
}

pub struct ViewMut<'r> {
    schema: &'r Schema<Validated>,
    ty: Type,
    layout: StructLayout,
    region: RegionMut<'r>,
}

impl<'r> View<'r> {
    pub fn new(schema: &'r Schema<Validated>, ty: &Type, region: Region<'r>) -> Result<Self> {
        let layout = layout::layout_struct(schema, ty)?;
        layout::check_fits(&layout, 0, region.len())?;
        Ok(View {
            schema,
            ty: ty.clone(),
            layout,
            region,
        })
    }

    pub fn root_field_names(&self) -> Vec<&str> {
        self.layout.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn field_exists(&self, name: &str) -> bool {
        self.layout.fields.iter().any(|f| f.name == name)
    }

    pub fn get(&self, path: &str) -> Result<Value> {
        let (head, rest) = split_path(path);
        let field = self.field(head)?;
        if rest.is_none() {
            ensure!(
                field.kind == FieldKind::Fixed,
                InvalidState,
                "field {:?} is variable-length; not readable through a view (§4.7)",
                head,
            );
            let ty = self.field_type(head)?;
            let bytes = self.region.slice(field.offset, field.size)?;
            read_fixed_value(resolve(self.schema, &ty), bytes)
        } else {
            let sub = self.nested_view(head)?;
            sub.get(rest.unwrap())
        }
    }

    pub fn nested_view(&self, name: &str) -> Result<View<'_>> {
        let field = self.field(name)?;
        ensure!(
            field.kind == FieldKind::Fixed,
            InvalidState,
            "field {:?} is not an inline fixed-size struct",
            name,
        );
        let field_ty = self.field_type(name)?;
        let sub_region = self.region.sub_region(field.offset, field.size)?;
        View::new(self.schema, &field_ty, sub_region)
    }

    fn field(&self, name: &str) -> Result<&FieldLayout> {
        self.layout
            .fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| error!(InvalidValue, "no such field {:?}", name).with_path(name.to_string()))
    }

    fn field_type(&self, name: &str) -> Result<Type> {
        self.struct_fields()
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.ty.clone())
            .ok_or_else(|| error!(InvalidValue, "no such field {:?}", name))
    }

    fn struct_fields(&self) -> Vec<crate::schema::StructField> {
        match resolve(self.schema, &self.ty) {
            Type::Struct(fields) => fields.clone(),
            _ => Vec::new(),
        }
    }
}

impl<'r> ViewMut<'r> {
    pub fn new(schema: &'r Schema<Validated>, ty: &Type, region: RegionMut<'r>) -> Result<Self> {
        let layout = layout::layout_struct(schema, ty)?;
        layout::check_fits(&layout, 0, region.len())?;
        Ok(ViewMut {
            schema,
            ty: ty.clone(),
            layout,
            region,
        })
    }

    pub fn root_field_names(&self) -> Vec<&str> {
        self.layout.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn field_exists(&self, name: &str) -> bool {
        self.layout.fields.iter().any(|f| f.name == name)
    }

    pub fn get(&self, path: &str) -> Result<Value> {
        self.as_view().get(path)
    }

    pub fn as_view(&self) -> View<'_> {
        View {
            schema: self.schema,
            ty: self.ty.clone(),
            layout: self.layout.clone(),
            region: self.region.as_ref(),
        }
    }

    pub fn set(&mut self, path: &str, value: &Value) -> Result<()> {
        let (head, rest) = split_path(path);
        if let Some(rest) = rest {
            let field = self.field(head)?.clone();
            ensure!(
                field.kind == FieldKind::Fixed,
                InvalidState,
                "field {:?} is not an inline fixed-size struct",
                head,
            );
            let field_ty = self.field_type(head)?;
            let sub_region = self.region.slice_mut(field.offset, field.size)?;
            let mut sub = ViewMut::new(self.schema, &field_ty, RegionMut::new(sub_region))?;
            sub.set(rest, value)?;
            return Ok(());
        }
        let field = self.field(head)?.clone();
        ensure!(
            field.kind == FieldKind::Fixed,
            InvalidState,
            "field {:?} is variable-length; not writable through a view (§4.7)",
            head,
        );
        let field_ty = self.field_type(head)?;
        let bytes = write_fixed_value(resolve(self.schema, &field_ty), value, field.size)?;
        self.region.write_at(field.offset, &bytes)
    }

    pub fn update(&mut self, path: &str, f: impl FnOnce(Value) -> Value) -> Result<()> {
        let current = self.get(path)?;
        let next = f(current);
        self.set(path, &next)
    }

    fn field(&self, name: &str) -> Result<&FieldLayout> {
        self.layout
            .fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| error!(InvalidValue, "no such field {:?}", name).with_path(name.to_string()))
    }

    fn field_type(&self, name: &str) -> Result<Type> {
        match resolve(self.schema, &self.ty) {
            Type::Struct(fields) => fields
                .iter()
                .find(|f| f.name == name)
                .map(|f| f.ty.clone())
                .ok_or_else(|| error!(InvalidValue, "no such field {:?}", name)),
            _ => Err(error!(InvalidState, "view root is not a struct")),
        }
    }
}

fn resolve<'s>(schema: &'s Schema<Validated>, ty: &'s Type) -> &'s Type {
    match ty {
        Type::UserDefined(name) => resolve(schema, schema.resolve(name)),
        other => other,
    }
}

fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}

fn read_fixed_value(ty: &Type, bytes: &[u8]) -> Result<Value> {
    Ok(match ty {
        Type::U8 => Value::U8(bytes[0]),
        Type::I8 => Value::I8(bytes[0] as i8),
        Type::Bool => Value::Bool(bytes[0] != 0),
        Type::U16 => Value::U16(u16::from_le_bytes(bytes.try_into().unwrap())),
        Type::I16 => Value::I16(i16::from_le_bytes(bytes.try_into().unwrap())),
        Type::U32 => Value::U32(u32::from_le_bytes(bytes.try_into().unwrap())),
        Type::I32 => Value::I32(i32::from_le_bytes(bytes.try_into().unwrap())),
        Type::F32 => Value::F32(f32::from_le_bytes(bytes.try_into().unwrap())),
        Type::U64 => Value::U64(u64::from_le_bytes(bytes.try_into().unwrap())),
        Type::I64 => Value::I64(i64::from_le_bytes(bytes.try_into().unwrap())),
        Type::F64 => Value::F64(f64::from_le_bytes(bytes.try_into().unwrap())),
        Type::Enum(_) => Value::Enum(u64::from_le_bytes(bytes.try_into().unwrap())),
        Type::FixedData(_) => Value::FixedData(bytes.to_vec()),
        Type::Void => Value::Void,
        other => {
            return Err(error!(
                InvalidState,
                "unsupported fixed-layout type {}",
                other.short_name()
            ))
        }
    })
}

fn write_fixed_value(ty: &Type, value: &Value, size: usize) -> Result<Vec<u8>> {
    let bytes = match (ty, value) {
        (Type::U8, Value::U8(n)) => vec![*n],
        (Type::I8, Value::I8(n)) => vec![*n as u8],
        (Type::Bool, Value::Bool(b)) => vec![*b as u8],
        (Type::U16, Value::U16(n)) => n.to_le_bytes().to_vec(),
        (Type::I16, Value::I16(n)) => n.to_le_bytes().to_vec(),
        (Type::U32, Value::U32(n)) => n.to_le_bytes().to_vec(),
        (Type::I32, Value::I32(n)) => n.to_le_bytes().to_vec(),
        (Type::F32, Value::F32(n)) => n.to_le_bytes().to_vec(),
        (Type::U64, Value::U64(n)) => n.to_le_bytes().to_vec(),
        (Type::I64, Value::I64(n)) => n.to_le_bytes().to_vec(),
        (Type::F64, Value::F64(n)) => n.to_le_bytes().to_vec(),
        (Type::Enum(_), Value::Enum(n)) => n.to_le_bytes().to_vec(),
        (Type::FixedData(n), Value::FixedData(d)) => {
            ensure!(d.len() == *n, Encoding, "fixed_data({}) given {} bytes", n, d.len());
            d.clone()
        }
        (Type::Void, Value::Void) => Vec::new(),
        (expected, got) => {
            return Err(error!(
                Encoding,
                "value {:?} does not match fixed-layout type {}",
                got,
                expected.short_name()
            ))
        }
    };
    ensure!(
        bytes.len() == size,
        InvalidState,
        "layout size {} does not match encoded size {}",
        size,
        bytes.len(),
    );
    Ok(bytes)
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
                (active: bool),
            }),
        );
        s.validate().unwrap()
    }

    #[test]
    fn set_and_get_fixed_field() {
        let schema = schema();
        let mut buf = [0u8; 256];
        let mut view = ViewMut::new(&schema, schema.root_type(), RegionMut::new(&mut buf)).unwrap();
        view.set("id", &Value::U32(42)).unwrap();
        assert_eq!(view.get("id").unwrap(), Value::U32(42));
    }

    #[test]
    fn variable_length_field_is_not_addressable() {
        let schema = schema();
        let mut buf = [0u8; 256];
        let mut view = ViewMut::new(&schema, schema.root_type(), RegionMut::new(&mut buf)).unwrap();
        assert!(view.set("name", &Value::string("hello")).is_err());
        assert!(view.get("name").is_err());
        // but it's still visible in the field listing, with a reserved slot
        assert!(view.field_exists("name"));
    }

    #[test]
    fn field_exists_and_names() {
        let schema = schema();
        let buf = [0u8; 256];
        let view = View::new(&schema, schema.root_type(), Region::new(&buf)).unwrap();
        assert!(view.field_exists("id"));
        assert!(!view.field_exists("nope"));
        assert_eq!(view.root_field_names(), vec!["id", "name", "active"]);
    }

    #[test]
    fn update_round_trips_through_get_set() {
        let schema = schema();
        let mut buf = [0u8; 256];
        let mut view = ViewMut::new(&schema, schema.root_type(), RegionMut::new(&mut buf)).unwrap();
        view.set("id", &Value::U32(1)).unwrap();
        view.update("id", |v| match v {
            Value::U32(n) => Value::U32(n + 1),
            other => other,
        })
        .unwrap();
        assert_eq!(view.get("id").unwrap(), Value::U32(2));
    }

    #[test]
    fn set_does_not_disturb_bytes_outside_field() {
        let schema = schema();
        let mut buf = [0xAAu8; 256];
        let mut view = ViewMut::new(&schema, schema.root_type(), RegionMut::new(&mut buf)).unwrap();
        view.set("id", &Value::U32(0x1020_3040)).unwrap();
        // `id` occupies offset 0..4; everything else must be untouched.
        assert!(buf[4..].iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn nested_struct_field_is_addressable_in_place() {
        let mut schema = Schema::new("Outer");
        schema
            .define("Outer", bare_type!(struct { (point: user("Point")), (flag: bool) }))
            .define("Point", bare_type!(struct { (x: i32), (y: i32) }));
        let schema = schema.validate().unwrap();

        let mut buf = [0u8; 256];
        let mut view = ViewMut::new(&schema, schema.root_type(), RegionMut::new(&mut buf)).unwrap();
        view.set("point.x", &Value::I32(7)).unwrap();
        view.set("point.y", &Value::I32(-7)).unwrap();
        assert_eq!(view.get("point.x").unwrap(), Value::I32(7));
        assert_eq!(view.get("point.y").unwrap(), Value::I32(-7));
    }

    #[test]
    fn region_too_small_rejected() {
        let schema = schema();
        let mut buf = [0u8; 2];
        assert!(ViewMut::new(&schema, schema.root_type(), RegionMut::new(&mut buf)).is_err());
    }
}
