//! The closed BARE type algebra (C2) and the schema container that maps
//! type names to types under a designated root.
//!
//! A schema's validation status is tracked in its own type rather than a
//! runtime flag (spec's "measure-type / phantom state" redesign note):
//! [`Schema<Draft>`] is built with the draft-mode mutators, then
//! [`Schema::validate`] consumes it and returns [`Schema<Validated>`] (or a
//! list of [`crate::validate::ValidationError`]s). Only `Schema<Validated>`
//! is accepted by the codec ([`crate::codec`]) and the layout engine
//! ([`crate::layout`]).

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::marker::PhantomData;

/// A BARE type. Equality is structural; a `UserDefined` reference is
/// identified by name only (it is not inlined for comparison purposes).
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Uint,
    Int,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Bool,
    String,
    Data,
    /// `fixed_data(n)`, n >= 1.
    FixedData(usize),
    /// Zero bytes on the wire. Only legal as a direct union case type.
    Void,
    /// name -> numeric value. Open on the wire: the codec does not check
    /// a decoded value against the declared entries.
    Enum(Vec<EnumEntry>),
    Optional(Box<Type>),
    List(Box<Type>),
    /// `fixed_list(T, n)`, n >= 1.
    FixedList(Box<Type>, usize),
    Map(Box<Type>, Box<Type>),
    /// tag (non-negative integer) -> case type.
    Union(Vec<UnionCase>),
    Struct(Vec<StructField>),
    /// Named reference into the enclosing schema's type map.
    UserDefined(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumEntry {
    pub name: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionCase {
    pub tag: u64,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub ty: Type,
}

impl Type {
    pub(crate) fn short_name(&self) -> &'static str {
        match self {
            Type::Uint => "uint",
            Type::Int => "int",
            Type::U8 => "u8",
            Type::U16 => "u16",
            Type::U32 => "u32",
            Type::U64 => "u64",
            Type::I8 => "i8",
            Type::I16 => "i16",
            Type::I32 => "i32",
            Type::I64 => "i64",
            Type::F32 => "f32",
            Type::F64 => "f64",
            Type::Bool => "bool",
            Type::String => "string",
            Type::Data => "data",
            Type::FixedData(_) => "fixed_data(..)",
            Type::Void => "void",
            Type::Enum(_) => "enum",
            Type::Optional(_) => "optional(..)",
            Type::List(_) => "list(..)",
            Type::FixedList(_, _) => "fixed_list(.., ..)",
            Type::Map(_, _) => "map(.., ..)",
            Type::Union(_) => "union",
            Type::Struct(_) => "struct",
            Type::UserDefined(_) => "user_defined(..)",
        }
    }

    fn describe_into(&self, out: &mut String, indent: usize) {
        let pad = "  ".repeat(indent);
        match self {
            Type::Optional(inner) => {
                let _ = writeln!(out, "{pad}optional:");
                inner.describe_into(out, indent + 1);
            }
            Type::List(inner) => {
                let _ = writeln!(out, "{pad}list:");
                inner.describe_into(out, indent + 1);
            }
            Type::FixedList(inner, n) => {
                let _ = writeln!(out, "{pad}fixed_list(len={}):", n);
                inner.describe_into(out, indent + 1);
            }
            Type::Map(k, v) => {
                let _ = writeln!(out, "{pad}map:");
                let _ = writeln!(out, "{pad}  key:");
                k.describe_into(out, indent + 2);
                let _ = writeln!(out, "{pad}  value:");
                v.describe_into(out, indent + 2);
            }
            Type::Struct(fields) => {
                let _ = writeln!(out, "{pad}struct:");
                for field in fields {
                    let _ = writeln!(out, "{pad}  field {:?}:", field.name);
                    field.ty.describe_into(out, indent + 2);
                }
            }
            Type::Union(cases) => {
                let _ = writeln!(out, "{pad}union:");
                for case in cases {
                    let _ = writeln!(out, "{pad}  case {}:", case.tag);
                    case.ty.describe_into(out, indent + 2);
                }
            }
            Type::Enum(entries) => {
                let _ = writeln!(out, "{pad}enum:");
                for entry in entries {
                    let _ = writeln!(out, "{pad}  {} = {}", entry.name, entry.value);
                }
            }
            Type::UserDefined(name) => {
                let _ = writeln!(out, "{pad}-> {}", name);
            }
            Type::FixedData(n) => {
                let _ = writeln!(out, "{pad}fixed_data({})", n);
            }
            other => {
                let _ = writeln!(out, "{pad}{}", other.short_name());
            }
        }
    }
}

/// Phantom marker for a schema that has not yet passed validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Draft;

/// Phantom marker for a schema that has passed [`Schema::validate`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Validated;

/// A mapping from type name to [`Type`], plus a designated root name.
///
/// `Status` is either [`Draft`] (freely mutable, never accepted by the
/// codec or layout engine) or [`Validated`] (immutable, value-like, freely
/// shared).
#[derive(Debug, Clone)]
pub struct Schema<Status = Draft> {
    types: BTreeMap<String, Type>,
    root: String,
    _status: PhantomData<Status>,
}

impl Schema<Draft> {
    pub fn new(root: impl Into<String>) -> Self {
        Schema {
            types: BTreeMap::new(),
            root: root.into(),
            _status: PhantomData,
        }
    }

    /// Declare or replace a named type. Draft-mode only.
    pub fn define(&mut self, name: impl Into<String>, ty: Type) -> &mut Self {
        self.types.insert(name.into(), ty);
        self
    }

    /// Run the two-phase validator (§4.3) and, on success, produce an
    /// immutable [`Schema<Validated>`] carrying the same data under a new
    /// status tag. On failure, returns every error found rather than
    /// stopping at the first.
    pub fn validate(self) -> Result<Schema<Validated>, Vec<crate::validate::ValidationError>> {
        crate::validate::validate(self)
    }
}

impl<Status> Schema<Status> {
    pub fn root_name(&self) -> &str {
        &self.root
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(|s| s.as_str())
    }

    pub fn root_type(&self) -> &Type {
        self.types
            .get(&self.root)
            .expect("root must resolve on a constructed schema")
    }

    /// Dereference a `user_defined` reference. Panics if `name` is not in
    /// the map: on a `Validated` schema this cannot happen; on a `Draft`
    /// schema, callers that need resolution should validate first.
    pub(crate) fn resolve(&self, name: &str) -> &Type {
        self.types
            .get(name)
            .unwrap_or_else(|| panic!("unresolvable user_defined reference {:?}", name))
    }

    pub(crate) fn try_resolve(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }

    pub(crate) fn types(&self) -> &BTreeMap<String, Type> {
        &self.types
    }

    /// Re-tag with a different status marker, carrying the same data.
    /// Crate-private: only [`crate::validate::validate`] and
    /// [`Schema::into_draft`] are allowed to change a schema's status.
    pub(crate) fn retag<NewStatus>(self) -> Schema<NewStatus> {
        Schema {
            types: self.types,
            root: self.root,
            _status: PhantomData,
        }
    }
}

impl Schema<Validated> {
    /// Render a human-readable tree of the schema's root type. Debugging
    /// aid only; not part of the wire format.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        self.root_type().describe_into(&mut out, 0);
        out
    }

    /// SHA-256 fingerprint of the schema's structure, for callers that want
    /// to derive or verify a frame's schema id (§4.9) from schema content.
    pub fn sha256(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for (name, ty) in self.types.iter() {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
            hash_type(&mut hasher, ty);
        }
        hasher.update(self.root.as_bytes());
        hasher.finalize().into()
    }

    /// Downgrade back to a mutable draft, e.g. to build a new schema that
    /// extends this one. The result must be re-validated.
    pub fn into_draft(self) -> Schema<Draft> {
        self.retag()
    }
}

fn hash_type(hasher: &mut Sha256, ty: &Type) {
    hasher.update([type_discriminant(ty)]);
    match ty {
        Type::FixedData(n) => hasher.update((*n as u64).to_le_bytes()),
        Type::FixedList(inner, n) => {
            hasher.update((*n as u64).to_le_bytes());
            hash_type(hasher, inner);
        }
        Type::Optional(inner) | Type::List(inner) => hash_type(hasher, inner),
        Type::Map(k, v) => {
            hash_type(hasher, k);
            hash_type(hasher, v);
        }
        Type::Enum(entries) => {
            for entry in entries {
                hasher.update(entry.name.as_bytes());
                hasher.update(entry.value.to_le_bytes());
            }
        }
        Type::Union(cases) => {
            for case in cases {
                hasher.update(case.tag.to_le_bytes());
                hash_type(hasher, &case.ty);
            }
        }
        Type::Struct(fields) => {
            for field in fields {
                hasher.update(field.name.as_bytes());
                hash_type(hasher, &field.ty);
            }
        }
        Type::UserDefined(name) => hasher.update(name.as_bytes()),
        _ => {}
    }
}

fn type_discriminant(ty: &Type) -> u8 {
    match ty {
        Type::Uint => 0,
        Type::Int => 1,
        Type::U8 => 2,
        Type::U16 => 3,
        Type::U32 => 4,
        Type::U64 => 5,
        Type::I8 => 6,
        Type::I16 => 7,
        Type::I32 => 8,
        Type::I64 => 9,
        Type::F32 => 10,
        Type::F64 => 11,
        Type::Bool => 12,
        Type::String => 13,
        Type::Data => 14,
        Type::FixedData(_) => 15,
        Type::Void => 16,
        Type::Enum(_) => 17,
        Type::Optional(_) => 18,
        Type::List(_) => 19,
        Type::FixedList(_, _) => 20,
        Type::Map(_, _) => 21,
        Type::Union(_) => 22,
        Type::Struct(_) => 23,
        Type::UserDefined(_) => 24,
    }
}

/// Terse construction of [`Type`] values, mirroring the shape of a schema
/// written by hand. `%expr` splices in an already-built `Type`.
#[macro_export]
macro_rules! bare_type {
    (uint) => { $crate::schema::Type::Uint };
    (int) => { $crate::schema::Type::Int };
    (u8) => { $crate::schema::Type::U8 };
    (u16) => { $crate::schema::Type::U16 };
    (u32) => { $crate::schema::Type::U32 };
    (u64) => { $crate::schema::Type::U64 };
    (i8) => { $crate::schema::Type::I8 };
    (i16) => { $crate::schema::Type::I16 };
    (i32) => { $crate::schema::Type::I32 };
    (i64) => { $crate::schema::Type::I64 };
    (f32) => { $crate::schema::Type::F32 };
    (f64) => { $crate::schema::Type::F64 };
    (bool) => { $crate::schema::Type::Bool };
    (string) => { $crate::schema::Type::String };
    (data) => { $crate::schema::Type::Data };
    (void) => { $crate::schema::Type::Void };
    (fixed_data($n:expr)) => { $crate::schema::Type::FixedData($n) };
    (optional($($inner:tt)*)) => {
        $crate::schema::Type::Optional(::std::boxed::Box::new($crate::bare_type!($($inner)*)))
    };
    (list($($inner:tt)*)) => {
        $crate::schema::Type::List(::std::boxed::Box::new($crate::bare_type!($($inner)*)))
    };
    (fixed_list($n:expr)($($inner:tt)*)) => {
        $crate::schema::Type::FixedList(::std::boxed::Box::new($crate::bare_type!($($inner)*)), $n)
    };
    (map($($k:tt)*)($($v:tt)*)) => {
        $crate::schema::Type::Map(
            ::std::boxed::Box::new($crate::bare_type!($($k)*)),
            ::std::boxed::Box::new($crate::bare_type!($($v)*)),
        )
    };
    (struct { $(($name:ident: $($field:tt)*)),*$(,)? }) => {
        $crate::schema::Type::Struct(::std::vec![$(
            $crate::schema::StructField {
                name: ::std::string::String::from(::core::stringify!($name)),
                ty: $crate::bare_type!($($field)*),
            },
        )*])
    };
    (union { $($tag:literal: ($($case:tt)*)),*$(,)? }) => {
        $crate::schema::Type::Union(::std::vec![$(
            $crate::schema::UnionCase { tag: $tag, ty: $crate::bare_type!($($case)*) },
        )*])
    };
    (enum { $($name:ident = $val:literal),*$(,)? }) => {
        $crate::schema::Type::Enum(::std::vec![$(
            $crate::schema::EnumEntry { name: ::std::string::String::from(::core::stringify!($name)), value: $val },
        )*])
    };
    (user($name:expr)) => {
        $crate::schema::Type::UserDefined(::std::string::String::from($name))
    };
    (%$ty:expr) => { $ty };
}

pub use bare_type;
