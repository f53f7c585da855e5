//! Identifier derivation: type and field names to SQL table and column names.

/// Convert a single identifier to snake_case.
/// e.g. "TestDefaultName" -> "test_default_name", "userId" -> "user_id"
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Table name for an entity: explicit name wins, otherwise upper-cased
/// snake_case of the type's simple name.
pub fn derive_table_name(simple_name: &str, explicit: Option<&str>) -> String {
    match explicit {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => to_snake_case(simple_name).to_uppercase(),
    }
}

/// Column name for a field: explicit name wins, otherwise snake_case of the
/// field name.
pub fn derive_column_name(field_name: &str, explicit: Option<&str>) -> String {
    match explicit {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => to_snake_case(field_name),
    }
}
