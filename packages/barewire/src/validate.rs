//! Two-phase schema validation (C3): structural well-formedness, then
//! cycle detection over directly-composed (non-indirect) type references.
//!
//! Phase one walks every declared type checking each node in isolation:
//! referenced names exist, `void` only appears as a union case, and
//! enums/unions/structs/fixed aggregates are non-empty/non-zero as
//! required. Phase two treats the schema as a graph where a struct field
//! or union case that names another type directly (not through
//! `optional`/`list`/`fixed_list`/`map`, each of which is a wire-level
//! indirection that bounds recursion) is an edge, and rejects any cycle in
//! that graph with classic DFS white/gray/black coloring — a direct cycle
//! would require infinite storage to lay out.

use crate::schema::{Draft, Schema, Type, Validated};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub path: String,
    pub kind: ValidationErrorKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationErrorKind {
    RootNotFound,
    UndefinedReference(String),
    CyclicTypeReference(String),
    VoidOutsideUnionCase,
    EmptyEnum,
    EmptyUnion,
    EmptyStruct,
    InvalidMapKeyType,
    InvalidFixedListLength,
    InvalidFixedDataLength,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?} at {}", self.kind, self.path)
    }
}

pub(crate) fn validate(schema: Schema<Draft>) -> Result<Schema<Validated>, Vec<ValidationError>> {
    let mut errors = Vec::new();

    if schema.try_resolve(schema.root_name()).is_none() {
        errors.push(ValidationError {
            path: schema.root_name().to_string(),
            kind: ValidationErrorKind::RootNotFound,
        });
    }

    for (name, ty) in schema.types() {
        check_structure(&schema, ty, name, false, &mut errors);
    }

    if errors.is_empty() {
        check_cycles(&schema, &mut errors);
    }

    if errors.is_empty() {
        Ok(schema.retag())
    } else {
        Err(errors)
    }
}

fn check_structure(
    schema: &Schema<Draft>,
    ty: &Type,
    path: &str,
    inside_union_case: bool,
    errors: &mut Vec<ValidationError>,
) {
    match ty {
        Type::Void if !inside_union_case => {
            errors.push(ValidationError {
                path: path.to_string(),
                kind: ValidationErrorKind::VoidOutsideUnionCase,
            });
        }
        Type::FixedData(n) if *n == 0 => {
            errors.push(ValidationError {
                path: path.to_string(),
                kind: ValidationErrorKind::InvalidFixedDataLength,
            });
        }
        Type::FixedList(inner, n) => {
            if *n == 0 {
                errors.push(ValidationError {
                    path: path.to_string(),
                    kind: ValidationErrorKind::InvalidFixedListLength,
                });
            }
            check_structure(schema, inner, &format!("{path}.item"), false, errors);
        }
        Type::Optional(inner) => {
            check_structure(schema, inner, &format!("{path}.some"), false, errors);
        }
        Type::List(inner) => {
            check_structure(schema, inner, &format!("{path}.item"), false, errors);
        }
        Type::Map(key, value) => {
            if !is_valid_map_key(schema, key) {
                errors.push(ValidationError {
                    path: format!("{path}.key"),
                    kind: ValidationErrorKind::InvalidMapKeyType,
                });
            }
            check_structure(schema, key, &format!("{path}.key"), false, errors);
            check_structure(schema, value, &format!("{path}.value"), false, errors);
        }
        Type::Enum(entries) => {
            if entries.is_empty() {
                errors.push(ValidationError {
                    path: path.to_string(),
                    kind: ValidationErrorKind::EmptyEnum,
                });
            }
        }
        Type::Union(cases) => {
            if cases.is_empty() {
                errors.push(ValidationError {
                    path: path.to_string(),
                    kind: ValidationErrorKind::EmptyUnion,
                });
            }
            for case in cases {
                check_structure(
                    schema,
                    &case.ty,
                    &format!("{path}.case({})", case.tag),
                    true,
                    errors,
                );
            }
        }
        Type::Struct(fields) => {
            if fields.is_empty() {
                errors.push(ValidationError {
                    path: path.to_string(),
                    kind: ValidationErrorKind::EmptyStruct,
                });
            }
            for field in fields {
                check_structure(schema, &field.ty, &format!("{path}.{}", field.name), false, errors);
            }
        }
        Type::UserDefined(name) => {
            if schema.try_resolve(name).is_none() {
                errors.push(ValidationError {
                    path: path.to_string(),
                    kind: ValidationErrorKind::UndefinedReference(name.clone()),
                });
            }
        }
        _ => {}
    }
}

/// A map key must be a primitive other than `f32`/`f64`/`data`/`fixed_data`/
/// `void`. `user_defined` is resolved through (guarding against a
/// self-referential chain, which `check_cycles` hasn't run yet to reject)
/// so `map(user("SomeStruct"), V)` is judged by what `SomeStruct` actually
/// is, not accepted as an opaque reference.
fn is_valid_map_key(schema: &Schema<Draft>, ty: &Type) -> bool {
    is_valid_map_key_seen(schema, ty, &mut HashSet::new())
}

fn is_valid_map_key_seen(schema: &Schema<Draft>, ty: &Type, seen: &mut HashSet<String>) -> bool {
    match ty {
        Type::UserDefined(name) => {
            if !seen.insert(name.clone()) {
                return false;
            }
            match schema.try_resolve(name) {
                Some(resolved) => is_valid_map_key_seen(schema, resolved, seen),
                None => false,
            }
        }
        _ => !matches!(
            ty,
            Type::Optional(_)
                | Type::List(_)
                | Type::FixedList(_, _)
                | Type::Map(_, _)
                | Type::Union(_)
                | Type::Struct(_)
                | Type::Void
                | Type::Data
                | Type::FixedData(_)
                | Type::F32
                | Type::F64
        ),
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

fn check_cycles(schema: &Schema<Draft>, errors: &mut Vec<ValidationError>) {
    let mut colors: HashMap<String, Color> = schema
        .type_names()
        .map(|n| (n.to_string(), Color::White))
        .collect();

    let names: Vec<String> = schema.type_names().map(String::from).collect();
    for name in names {
        if colors.get(&name).copied() == Some(Color::White) {
            let mut path = Vec::new();
            visit(schema, &name, &mut colors, &mut path, errors);
        }
    }
}

fn visit(
    schema: &Schema<Draft>,
    name: &str,
    colors: &mut HashMap<String, Color>,
    path: &mut Vec<String>,
    errors: &mut Vec<ValidationError>,
) {
    colors.insert(name.to_string(), Color::Gray);
    path.push(name.to_string());

    if let Some(ty) = schema.try_resolve(name) {
        let mut refs = Vec::new();
        direct_refs(ty, &mut refs);
        for r in refs {
            match colors.get(&r).copied() {
                Some(Color::Gray) => {
                    let mut cycle = path.clone();
                    cycle.push(r.clone());
                    errors.push(ValidationError {
                        path: name.to_string(),
                        kind: ValidationErrorKind::CyclicTypeReference(cycle.join(" -> ")),
                    });
                }
                Some(Color::White) => visit(schema, &r, colors, path, errors),
                Some(Color::Black) | None => {}
            }
        }
    }

    path.pop();
    colors.insert(name.to_string(), Color::Black);
}

/// Names reachable from `ty` without crossing an `optional`/`list`/
/// `fixed_list`/`map` boundary: the set of type names whose storage is
/// directly embedded in `ty`'s own layout.
fn direct_refs(ty: &Type, out: &mut Vec<String>) {
    match ty {
        Type::UserDefined(name) => out.push(name.clone()),
        Type::Struct(fields) => {
            for field in fields {
                direct_refs(&field.ty, out);
            }
        }
        Type::Union(cases) => {
            for case in cases {
                direct_refs(&case.ty, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bare_type;

    #[test]
    fn undefined_reference_rejected() {
        let mut schema = Schema::new("Root");
        schema.define("Root", bare_type!(user("Missing")));
        let errors = schema.validate().unwrap_err();
        assert!(matches!(
            errors[0].kind,
            ValidationErrorKind::UndefinedReference(ref n) if n == "Missing"
        ));
    }

    #[test]
    fn direct_self_reference_is_cyclic() {
        let mut schema = Schema::new("Node");
        schema.define(
            "Node",
            crate::schema::Type::Struct(vec![crate::schema::StructField {
                name: "next".into(),
                ty: crate::schema::Type::UserDefined("Node".into()),
            }]),
        );
        let errors = schema.validate().unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e.kind, ValidationErrorKind::CyclicTypeReference(_))));
    }

    #[test]
    fn recursion_through_optional_is_allowed() {
        let mut schema = Schema::new("Node");
        schema.define(
            "Node",
            bare_type!(struct {
                (value: i32),
                (next: optional(user("Node"))),
            }),
        );
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn void_only_legal_in_union_case() {
        let mut schema = Schema::new("Root");
        schema.define(
            "Root",
            crate::schema::Type::Struct(vec![crate::schema::StructField {
                name: "x".into(),
                ty: crate::schema::Type::Void,
            }]),
        );
        let errors = schema.validate().unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::VoidOutsideUnionCase));
    }

    #[test]
    fn empty_struct_rejected() {
        let mut schema = Schema::new("Root");
        schema.define("Root", crate::schema::Type::Struct(vec![]));
        let errors = schema.validate().unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::EmptyStruct));
    }

    #[test]
    fn map_with_aggregate_key_rejected() {
        let mut schema = Schema::new("Root");
        schema.define(
            "Root",
            bare_type!(map(list(u8))(string)),
        );
        let errors = schema.validate().unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::InvalidMapKeyType));
    }

    #[test]
    fn map_with_float_key_rejected() {
        let mut schema = Schema::new("Root");
        schema.define("Root", bare_type!(map(f32)(u8)));
        let errors = schema.validate().unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::InvalidMapKeyType));
    }

    #[test]
    fn map_with_user_defined_struct_key_rejected() {
        let mut schema = Schema::new("Root");
        schema.define("Root", bare_type!(map(user("Point"))(u8)));
        schema.define("Point", bare_type!(struct { (x: u8) }));
        let errors = schema.validate().unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::InvalidMapKeyType));
    }

    #[test]
    fn map_with_user_defined_primitive_alias_key_accepted() {
        let mut schema = Schema::new("Root");
        schema.define("Root", bare_type!(map(user("Id"))(u8)));
        schema.define("Id", bare_type!(u64));
        let errors = schema.validate();
        assert!(errors.is_ok());
    }

    #[test]
    fn valid_schema_passes() {
        let mut schema = Schema::new("Message");
        schema.define(
            "Message",
            bare_type!(struct {
                (id: u64),
                (body: string),
                (tags: list(string)),
            }),
        );
        assert!(schema.validate().is_ok());
    }
}
