//! Schema analysis (C4): wire-encoded size bounds and alignment per type
//! ([`size_bounds`], [`alignment`]), and compatibility analysis between
//! two validated schemas, determining whether data written under one can
//! be decoded under the other, in either or both directions.
//!
//! Two levels of comparison are at play. Nested types (struct fields,
//! union case payloads, list/map/optional elements) are compared with a
//! single symmetric [`compatible`] predicate: either they line up
//! structurally or they don't, with no notion of direction. Root types get
//! an additional, asymmetric rule layered on top, per §4.4:
//!
//! - **Struct roots** are compared by field *prefix*: if `new`'s fields
//!   start with exactly `old`'s fields (by name, order, and pairwise
//!   compatible type), `new` is backward-compatible with `old`. This is a
//!   one-way rule — swapping old and new does not yield forward
//!   compatibility, it yields incompatible, because the rule only ever
//!   checks whether the *longer* side's prefix covers the *shorter* side.
//!   See the `struct_prefix_is_one_way` test and `DESIGN.md`.
//! - **Union roots** are compared by case-tag coverage in each direction
//!   independently, which can yield any of the four verdicts.
//! - **Everything else** collapses to the symmetric [`compatible`] check:
//!   either fully compatible or incompatible, never a partial direction.

use crate::schema::{Schema, Type, Validated};
use crate::var_len::var_len_uint_len;
use std::collections::HashSet;

/// Wire-encoded size bounds for a type: the smallest and (if bounded)
/// largest number of bytes an encoding of it can take, and whether every
/// encoding is exactly the same size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeBounds {
    pub min_bytes: u64,
    pub max_bytes: Option<u64>,
    pub is_fixed: bool,
}

impl SizeBounds {
    const fn exact(n: u64) -> Self {
        SizeBounds {
            min_bytes: n,
            max_bytes: Some(n),
            is_fixed: true,
        }
    }

    /// Sentinel returned when computation loops back onto a type already
    /// being sized further up the recursion — only possible through a
    /// chain of `optional`/`list`/`map` indirections (struct fields and
    /// union cases can't reference themselves directly; `validate`
    /// rejects that). Such a type has no finite upper bound.
    const fn recursive() -> Self {
        SizeBounds {
            min_bytes: 0,
            max_bytes: None,
            is_fixed: false,
        }
    }
}

/// Variable-length `uint`/`int`/`enum` span 1 to [`crate::var_len::MAX_UINT_LEN`] bytes.
const VARINT_BOUNDS: SizeBounds = SizeBounds {
    min_bytes: 1,
    max_bytes: Some(crate::var_len::MAX_UINT_LEN as u64),
    is_fixed: false,
};

/// Compute [`SizeBounds`] for `ty` within `schema`, per §4.4.
pub fn size_bounds(schema: &Schema<Validated>, ty: &Type) -> SizeBounds {
    size_bounds_inner(schema, ty, &mut HashSet::new())
}

fn size_bounds_inner(schema: &Schema<Validated>, ty: &Type, visiting: &mut HashSet<String>) -> SizeBounds {
    use Type::*;
    match ty {
        Uint | Int | Enum(_) => VARINT_BOUNDS,
        U8 | I8 | Bool => SizeBounds::exact(1),
        U16 | I16 => SizeBounds::exact(2),
        U32 | I32 | F32 => SizeBounds::exact(4),
        U64 | I64 | F64 => SizeBounds::exact(8),
        Void => SizeBounds::exact(0),
        FixedData(n) => SizeBounds::exact(*n as u64),
        String | Data => SizeBounds {
            min_bytes: 1,
            max_bytes: None,
            is_fixed: false,
        },
        Optional(inner) => {
            let i = size_bounds_inner(schema, inner, visiting);
            SizeBounds {
                min_bytes: 1,
                max_bytes: i.max_bytes.map(|m| m + 1),
                is_fixed: false,
            }
        }
        List(_) => SizeBounds {
            min_bytes: 1,
            max_bytes: None,
            is_fixed: false,
        },
        FixedList(inner, n) => {
            let i = size_bounds_inner(schema, inner, visiting);
            let n = *n as u64;
            if i.is_fixed {
                SizeBounds::exact(i.min_bytes * n)
            } else {
                SizeBounds {
                    min_bytes: i.min_bytes * n,
                    max_bytes: None,
                    is_fixed: false,
                }
            }
        }
        Map(_, _) => SizeBounds {
            min_bytes: 1,
            max_bytes: None,
            is_fixed: false,
        },
        Union(cases) => {
            let mut min = u64::MAX;
            let mut max = Some(0u64);
            for case in cases {
                let c = size_bounds_inner(schema, &case.ty, visiting);
                min = min.min(c.min_bytes);
                let tag_len = var_len_uint_len(case.tag) as u64;
                max = match (max, c.max_bytes) {
                    (Some(acc), Some(m)) => Some(acc.max(tag_len + m)),
                    _ => None,
                };
            }
            SizeBounds {
                min_bytes: 1 + min,
                max_bytes: max,
                is_fixed: false,
            }
        }
        Struct(fields) => {
            let mut min = 0u64;
            let mut max = Some(0u64);
            let mut all_fixed = true;
            for field in fields {
                let f = size_bounds_inner(schema, &field.ty, visiting);
                min += f.min_bytes;
                max = match (max, f.max_bytes) {
                    (Some(acc), Some(m)) => Some(acc + m),
                    _ => None,
                };
                all_fixed &= f.is_fixed;
            }
            SizeBounds {
                min_bytes: min,
                max_bytes: max,
                is_fixed: all_fixed,
            }
        }
        UserDefined(name) => {
            if !visiting.insert(name.clone()) {
                return SizeBounds::recursive();
            }
            let bounds = size_bounds_inner(schema, schema.resolve(name), visiting);
            visiting.remove(name);
            bounds
        }
    }
}

/// Natural alignment, in bytes, of `ty`'s wire-adjacent in-memory shape:
/// fixed-width primitives align to their size, variable-width primitives
/// align to 1, and aggregates take the max alignment of their components
/// (see [`crate::layout`] for where records actually get laid out).
pub fn alignment(schema: &Schema<Validated>, ty: &Type) -> usize {
    alignment_inner(schema, ty, &mut HashSet::new())
}

fn alignment_inner(schema: &Schema<Validated>, ty: &Type, visiting: &mut HashSet<String>) -> usize {
    use Type::*;
    match ty {
        U8 | I8 | Bool | Void | FixedData(_) => 1,
        U16 | I16 => 2,
        U32 | I32 | F32 => 4,
        U64 | I64 | F64 => 8,
        Uint | Int | Enum(_) | String | Data => 1,
        Optional(inner) | List(inner) | FixedList(inner, _) => alignment_inner(schema, inner, visiting),
        Map(k, v) => alignment_inner(schema, k, visiting).max(alignment_inner(schema, v, visiting)),
        Union(cases) => cases
            .iter()
            .map(|c| alignment_inner(schema, &c.ty, visiting))
            .max()
            .unwrap_or(1),
        Struct(fields) => fields
            .iter()
            .map(|f| alignment_inner(schema, &f.ty, visiting))
            .max()
            .unwrap_or(1),
        UserDefined(name) => {
            if !visiting.insert(name.clone()) {
                return 1;
            }
            let a = alignment_inner(schema, schema.resolve(name), visiting);
            visiting.remove(name);
            a
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    FullyCompatible,
    BackwardCompatible,
    ForwardCompatible,
    Incompatible,
}

/// Result of [`analyze`]: the overall verdict plus the structural paths
/// where reader and writer diverge, for diagnostics.
#[derive(Debug, Clone)]
pub struct CompatibilityReport {
    pub compatibility: Compatibility,
    pub backward_issues: Vec<String>,
    pub forward_issues: Vec<String>,
}

impl CompatibilityReport {
    /// Render a short human-readable explanation, e.g. for a CLI or log
    /// line reporting a schema migration's safety.
    pub fn explain(&self) -> String {
        match self.compatibility {
            Compatibility::FullyCompatible => "fully compatible".to_string(),
            Compatibility::BackwardCompatible => {
                format!(
                    "backward compatible only; forward issues: {}",
                    self.forward_issues.join("; ")
                )
            }
            Compatibility::ForwardCompatible => {
                format!(
                    "forward compatible only; backward issues: {}",
                    self.backward_issues.join("; ")
                )
            }
            Compatibility::Incompatible => format!(
                "incompatible; backward issues: {}; forward issues: {}",
                self.backward_issues.join("; "),
                self.forward_issues.join("; "),
            ),
        }
    }
}

type Seen = HashSet<(String, String)>;

/// Compare `old` and `new` and classify their compatibility, over their
/// respective root types.
pub fn analyze(old: &Schema<Validated>, new: &Schema<Validated>) -> CompatibilityReport {
    let old_root = resolve_root(old);
    let new_root = resolve_root(new);

    match (old_root, new_root) {
        (Type::Struct(old_fields), Type::Struct(new_fields)) => {
            analyze_struct_roots(old, old_fields, new, new_fields)
        }
        (Type::Union(old_cases), Type::Union(new_cases)) => {
            analyze_union_roots(old, old_cases, new, new_cases)
        }
        (old_ty, new_ty) => {
            let mut issues = Vec::new();
            let ok = compatible(old, old_ty, new, new_ty, "", &mut HashSet::new(), &mut issues);
            if ok {
                CompatibilityReport {
                    compatibility: Compatibility::FullyCompatible,
                    backward_issues: Vec::new(),
                    forward_issues: Vec::new(),
                }
            } else {
                CompatibilityReport {
                    compatibility: Compatibility::Incompatible,
                    backward_issues: issues.clone(),
                    forward_issues: issues,
                }
            }
        }
    }
}

fn resolve_root(schema: &Schema<Validated>) -> &Type {
    let mut ty = schema.root_type();
    while let Type::UserDefined(name) = ty {
        ty = schema.resolve(name);
    }
    ty
}

fn analyze_struct_roots(
    old: &Schema<Validated>,
    old_fields: &[crate::schema::StructField],
    new: &Schema<Validated>,
    new_fields: &[crate::schema::StructField],
) -> CompatibilityReport {
    let prefix_matches = |shorter: &[crate::schema::StructField],
                           longer: &[crate::schema::StructField],
                           issues: &mut Vec<String>|
     -> bool {
        let mut ok = true;
        for (a, b) in shorter.iter().zip(longer.iter()) {
            if a.name != b.name {
                issues.push(format!("field name {:?} vs {:?}", a.name, b.name));
                ok = false;
                continue;
            }
            if !compatible(old, &a.ty, new, &b.ty, &a.name, &mut HashSet::new(), issues) {
                ok = false;
            }
        }
        ok
    };

    if old_fields.len() == new_fields.len() {
        let mut issues = Vec::new();
        if prefix_matches(old_fields, new_fields, &mut issues) {
            return CompatibilityReport {
                compatibility: Compatibility::FullyCompatible,
                backward_issues: Vec::new(),
                forward_issues: Vec::new(),
            };
        }
        return CompatibilityReport {
            compatibility: Compatibility::Incompatible,
            backward_issues: issues.clone(),
            forward_issues: issues,
        };
    }

    if new_fields.len() > old_fields.len() {
        let mut issues = Vec::new();
        if prefix_matches(old_fields, &new_fields[..old_fields.len()], &mut issues) {
            return CompatibilityReport {
                compatibility: Compatibility::BackwardCompatible,
                backward_issues: Vec::new(),
                forward_issues: vec![
                    "new struct root has fields beyond old's prefix".to_string(),
                ],
            };
        }
        return CompatibilityReport {
            compatibility: Compatibility::Incompatible,
            backward_issues: issues.clone(),
            forward_issues: issues,
        };
    }

    // old_fields.len() > new_fields.len(): the rule only ever grants
    // backward compatibility to the side whose fields extend the other's,
    // so a shrinking "new" schema is incompatible rather than
    // forward-compatible, even though its fields are a prefix of old's.
    CompatibilityReport {
        compatibility: Compatibility::Incompatible,
        backward_issues: vec!["old struct root has fields new does not".to_string()],
        forward_issues: vec!["old struct root has fields new does not".to_string()],
    }
}

fn analyze_union_roots(
    old: &Schema<Validated>,
    old_cases: &[crate::schema::UnionCase],
    new: &Schema<Validated>,
    new_cases: &[crate::schema::UnionCase],
) -> CompatibilityReport {
    let mut backward_issues = Vec::new();
    let backward = old_cases.iter().all(|o| {
        match new_cases.iter().find(|n| n.tag == o.tag) {
            Some(n) => compatible(
                old,
                &o.ty,
                new,
                &n.ty,
                &format!("case({})", o.tag),
                &mut HashSet::new(),
                &mut backward_issues,
            ),
            None => {
                backward_issues.push(format!("old tag {} has no matching new case", o.tag));
                false
            }
        }
    });

    let mut forward_issues = Vec::new();
    let forward = new_cases.iter().all(|n| {
        match old_cases.iter().find(|o| o.tag == n.tag) {
            Some(o) => compatible(
                old,
                &o.ty,
                new,
                &n.ty,
                &format!("case({})", n.tag),
                &mut HashSet::new(),
                &mut forward_issues,
            ),
            None => {
                forward_issues.push(format!("new tag {} has no matching old case", n.tag));
                false
            }
        }
    });

    let compatibility = match (backward, forward) {
        (true, true) => Compatibility::FullyCompatible,
        (true, false) => Compatibility::BackwardCompatible,
        (false, true) => Compatibility::ForwardCompatible,
        (false, false) => Compatibility::Incompatible,
    };
    CompatibilityReport {
        compatibility,
        backward_issues,
        forward_issues,
    }
}

/// Symmetric structural compatibility: do `a` (in `a_schema`) and `b` (in
/// `b_schema`) describe the same shape closely enough that a value of one
/// could stand in for the other? Used for nested fields/cases/items, where
/// there is no directionality to speak of — only the two designated
/// root types get the asymmetric backward/forward treatment.
fn compatible(
    a_schema: &Schema<Validated>,
    a: &Type,
    b_schema: &Schema<Validated>,
    b: &Type,
    path: &str,
    seen: &mut Seen,
    issues: &mut Vec<String>,
) -> bool {
    use Type::*;

    if let (UserDefined(a_name), UserDefined(b_name)) = (a, b) {
        let key = (a_name.clone(), b_name.clone());
        if !seen.insert(key) {
            // Already comparing this pair further up the recursion:
            // assume compatible (coinductively) rather than loop forever
            // on a recursive structure like a linked list.
            return true;
        }
        return compatible(a_schema, a_schema.resolve(a_name), b_schema, b_schema.resolve(b_name), path, seen, issues);
    }
    if let UserDefined(name) = a {
        return compatible(a_schema, a_schema.resolve(name), b_schema, b, path, seen, issues);
    }
    if let UserDefined(name) = b {
        return compatible(a_schema, a, b_schema, b_schema.resolve(name), path, seen, issues);
    }

    match (a, b) {
        (Uint, Uint)
        | (Int, Int)
        | (U8, U8)
        | (U16, U16)
        | (U32, U32)
        | (U64, U64)
        | (I8, I8)
        | (I16, I16)
        | (I32, I32)
        | (I64, I64)
        | (F32, F32)
        | (F64, F64)
        | (Bool, Bool)
        | (String, String)
        | (Data, Data)
        | (Void, Void) => true,

        (FixedData(x), FixedData(y)) if x == y => true,
        (FixedData(x), FixedData(y)) => {
            issues.push(format!("{path}: fixed_data({x}) vs fixed_data({y})"));
            false
        }

        // Enum is a bare wire uint; declared entries are a schema-level
        // label, not a wire constraint, so any two enums are mutually
        // decodable.
        (Enum(_), Enum(_)) => true,

        (Optional(x), Optional(y)) => {
            compatible(a_schema, x, b_schema, y, &format!("{path}.some"), seen, issues)
        }
        (List(x), List(y)) => {
            compatible(a_schema, x, b_schema, y, &format!("{path}.item"), seen, issues)
        }
        (FixedList(x, xn), FixedList(y, yn)) if xn == yn => {
            compatible(a_schema, x, b_schema, y, &format!("{path}.item"), seen, issues)
        }
        (FixedList(_, xn), FixedList(_, yn)) => {
            issues.push(format!("{path}: fixed_list length {xn} vs {yn}"));
            false
        }
        (Map(xk, xv), Map(yk, yv)) => {
            let k = compatible(a_schema, xk, b_schema, yk, &format!("{path}.key"), seen, issues);
            let v = compatible(a_schema, xv, b_schema, yv, &format!("{path}.value"), seen, issues);
            k && v
        }

        (Union(x_cases), Union(y_cases)) => {
            if x_cases.len() != y_cases.len() {
                issues.push(format!(
                    "{path}: union case count {} vs {}",
                    x_cases.len(),
                    y_cases.len()
                ));
                return false;
            }
            let mut ok = true;
            for x_case in x_cases {
                match y_cases.iter().find(|c| c.tag == x_case.tag) {
                    Some(y_case) => {
                        if !compatible(
                            a_schema,
                            &x_case.ty,
                            b_schema,
                            &y_case.ty,
                            &format!("{path}.case({})", x_case.tag),
                            seen,
                            issues,
                        ) {
                            ok = false;
                        }
                    }
                    None => {
                        issues.push(format!("{path}: no matching case for tag {}", x_case.tag));
                        ok = false;
                    }
                }
            }
            ok
        }

        (Struct(x_fields), Struct(y_fields)) => {
            if x_fields.len() != y_fields.len() {
                issues.push(format!(
                    "{path}: struct field count {} vs {}",
                    x_fields.len(),
                    y_fields.len()
                ));
                return false;
            }
            let mut ok = true;
            for (x_field, y_field) in x_fields.iter().zip(y_fields.iter()) {
                if x_field.name != y_field.name {
                    issues.push(format!(
                        "{path}: field name {:?} vs {:?}",
                        x_field.name, y_field.name
                    ));
                    ok = false;
                    continue;
                }
                if !compatible(
                    a_schema,
                    &x_field.ty,
                    b_schema,
                    &y_field.ty,
                    &format!("{path}.{}", x_field.name),
                    seen,
                    issues,
                ) {
                    ok = false;
                }
            }
            ok
        }

        (x, y) => {
            issues.push(format!("{path}: {} vs {}", x.short_name(), y.short_name()));
            false
        }
    }
}
