//! Fixed-layout engine (C7): computes per-field byte offsets and
//! alignments for a struct type laid out directly in memory, rather than
//! the length-prefixed/streamed representation the codec produces. This
//! is what [`crate::view`] walks to address fields without a decode pass.
//!
//! Fixed-width scalars get their natural size and alignment. Variable-
//! length fields (`string`, `data`, `list`, `map`, unions with
//! differently-sized cases, and any nested type that itself needs one)
//! do not have a fixed in-memory size, so they are laid out as a 16-byte,
//! 8-byte-aligned "handle slot": enough room for an offset/length pair
//! (or an offset/capacity pair) pointing at out-of-line storage elsewhere
//! in the region. The handle's own interpretation is owned by
//! [`crate::view`], not by this module.

use crate::error::{ensure, Result};
use crate::schema::{Schema, Type, Validated};

/// Size and alignment, in bytes, of a handle slot used for any field
/// whose value is not fixed-size.
pub const HANDLE_SIZE: usize = 16;
pub const HANDLE_ALIGN: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldLayout {
    pub name: String,
    pub offset: usize,
    pub size: usize,
    pub align: usize,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Laid out in place at its natural size.
    Fixed,
    /// Laid out as a handle slot; actual data lives out-of-line.
    Handle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructLayout {
    pub fields: Vec<FieldLayout>,
    pub size: usize,
    pub align: usize,
}

/// Compute the layout of `ty` (which must be a `struct`, possibly reached
/// through `user_defined` references) within `schema`.
pub fn layout_struct(schema: &Schema<Validated>, ty: &Type) -> Result<StructLayout> {
    let ty = resolve(schema, ty);
    let fields = match ty {
        Type::Struct(fields) => fields,
        other => {
            return Err(crate::error::error!(
                InvalidValue,
                "layout_struct requires a struct type, got {}",
                other.short_name()
            ))
        }
    };

    let mut offset = 0usize;
    let mut struct_align = 1usize;
    let mut laid_out = Vec::with_capacity(fields.len());

    for field in fields {
        let (size, align, kind) = field_shape(schema, &field.ty);
        offset = align_up(offset, align);
        laid_out.push(FieldLayout {
            name: field.name.clone(),
            offset,
            size,
            align,
            kind,
        });
        offset += size;
        struct_align = struct_align.max(align);
    }

    let total = align_up(offset, struct_align);
    Ok(StructLayout {
        fields: laid_out,
        size: total,
        align: struct_align,
    })
}

fn resolve<'s>(schema: &'s Schema<Validated>, ty: &'s Type) -> &'s Type {
    match ty {
        Type::UserDefined(name) => resolve(schema, schema.resolve(name)),
        other => other,
    }
}

/// (size, align, layout kind) for a field's type, used both by the outer
/// struct layout and recursively by fixed-length aggregates of fixed
/// fields (a `fixed_list` of `u32`, say, can itself be laid out inline).
fn field_shape(schema: &Schema<Validated>, ty: &Type) -> (usize, usize, FieldKind) {
    let ty = resolve(schema, ty);
    match ty {
        Type::U8 | Type::I8 | Type::Bool => (1, 1, FieldKind::Fixed),
        Type::U16 | Type::I16 => (2, 2, FieldKind::Fixed),
        Type::U32 | Type::I32 | Type::F32 => (4, 4, FieldKind::Fixed),
        Type::U64 | Type::I64 | Type::F64 => (8, 8, FieldKind::Fixed),
        Type::FixedData(n) => (*n, 1, FieldKind::Fixed),
        Type::Void => (0, 1, FieldKind::Fixed),
        Type::Enum(_) => (8, 8, FieldKind::Fixed),
        Type::FixedList(inner, n) => {
            let (elem_size, elem_align, elem_kind) = field_shape(schema, inner);
            if elem_kind == FieldKind::Fixed {
                let stride = align_up(elem_size, elem_align);
                (stride * n, elem_align, FieldKind::Fixed)
            } else {
                (HANDLE_SIZE, HANDLE_ALIGN, FieldKind::Handle)
            }
        }
        Type::Struct(fields) => {
            let mut offset = 0usize;
            let mut align = 1usize;
            let mut all_fixed = true;
            for f in fields {
                let (fs, fa, fk) = field_shape(schema, &f.ty);
                if fk != FieldKind::Fixed {
                    all_fixed = false;
                }
                offset = align_up(offset, fa) + fs;
                align = align.max(fa);
            }
            if all_fixed {
                (align_up(offset, align), align, FieldKind::Fixed)
            } else {
                (HANDLE_SIZE, HANDLE_ALIGN, FieldKind::Handle)
            }
        }
        // uint/int/string/data/list/map/optional/union all vary in size
        // (optional adds a presence tag on top of a variable inner, union
        // cases may differ in size): always out-of-line.
        _ => (HANDLE_SIZE, HANDLE_ALIGN, FieldKind::Handle),
    }
}

fn align_up(offset: usize, align: usize) -> usize {
    (offset + align - 1) / align * align
}

/// Validate that a region of `region_len` bytes is large enough and
/// sufficiently aligned to host `layout` starting at `base`.
pub fn check_fits(layout: &StructLayout, base: usize, region_len: usize) -> Result<()> {
    ensure!(
        base % layout.align == 0,
        InvalidValue,
        "base offset {} is not aligned to {}",
        base,
        layout.align,
    );
    let end = base
        .checked_add(layout.size)
        .ok_or_else(|| crate::error::error!(OutOfBounds, "layout size overflow"))?;
    ensure!(
        end <= region_len,
        OutOfBounds,
        "layout of size {} at base {} exceeds region of length {}",
        layout.size,
        base,
        region_len,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bare_type;

    fn schema(ty: Type) -> Schema<Validated> {
        let mut s = Schema::new("Root");
        s.define("Root", ty);
        s.validate().unwrap()
    }

    #[test]
    fn fixed_fields_pack_with_alignment() {
        let schema = schema(bare_type!(struct {
            (a: u8),
            (b: u32),
            (c: u8),
        }));
        let layout = layout_struct(&schema, schema.root_type()).unwrap();
        assert_eq!(layout.fields[0].offset, 0);
        assert_eq!(layout.fields[1].offset, 4); // padded up to u32 alignment
        assert_eq!(layout.fields[2].offset, 8);
        assert_eq!(layout.size, 12); // padded up to struct align (4)
        assert_eq!(layout.align, 4);
    }

    #[test]
    fn variable_field_becomes_handle_slot() {
        let schema = schema(bare_type!(struct {
            (id: u32),
            (name: string),
        }));
        let layout = layout_struct(&schema, schema.root_type()).unwrap();
        assert_eq!(layout.fields[1].kind, FieldKind::Handle);
        assert_eq!(layout.fields[1].size, HANDLE_SIZE);
        assert_eq!(layout.fields[1].offset, HANDLE_ALIGN); // aligned up from 4
    }

    #[test]
    fn fixed_list_of_fixed_elements_is_inline() {
        let schema = schema(bare_type!(struct {
            (xs: fixed_list(3)(u16)),
        }));
        let layout = layout_struct(&schema, schema.root_type()).unwrap();
        assert_eq!(layout.fields[0].kind, FieldKind::Fixed);
        assert_eq!(layout.fields[0].size, 6);
    }

    #[test]
    fn check_fits_rejects_misaligned_base() {
        let schema = schema(bare_type!(struct { (x: u32) }));
        let layout = layout_struct(&schema, schema.root_type()).unwrap();
        assert!(check_fits(&layout, 1, 64).is_err());
        assert!(check_fits(&layout, 0, 64).is_ok());
    }
}
