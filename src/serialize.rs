//! Row and field serialization
//!
//! A skill's infos and stats are stored as `key=value` fields joined with
//! `|`; table cells are joined with `;` and rows with newlines.

use crate::codes::{CodeTableRegistry, FieldKind, UnknownLabelPolicy};
use crate::error::Result;
use crate::normalize::collapse_whitespace;
use crate::record::Field;

/// Separator between `key=value` fields inside one cell.
pub const FIELD_SEPARATOR: char = '|';

/// Separator between a field's key and value.
pub const KEY_VALUE_SEPARATOR: char = '=';

/// Separator between the cells of a row.
pub const ROW_DELIMITER: char = ';';

/// Render one field, substituting the code for categorical keys.
pub fn serialize_field(
    registry: &mut CodeTableRegistry,
    key: &str,
    value: &str,
    on_unknown: UnknownLabelPolicy,
) -> Result<String> {
    match FieldKind::from_key(key) {
        Some(kind) => {
            let code = registry.resolve_with(kind, value, on_unknown)?;
            Ok(format!("{key}{KEY_VALUE_SEPARATOR}{code}"))
        }
        None => Ok(format!(
            "{key}{KEY_VALUE_SEPARATOR}{}",
            sanitize_field_value(value)
        )),
    }
}

/// Render fields in order, joined with [`FIELD_SEPARATOR`].
pub fn serialize_joined_fields(
    registry: &mut CodeTableRegistry,
    fields: &[Field],
    on_unknown: UnknownLabelPolicy,
) -> Result<String> {
    let parts = fields
        .iter()
        .map(|f| serialize_field(registry, &f.key, &f.value, on_unknown))
        .collect::<Result<Vec<_>>>()?;
    Ok(join_fields(&parts))
}

/// Render stats; their values are never encoded.
pub fn serialize_stats(stats: &[Field]) -> String {
    let parts: Vec<String> = stats
        .iter()
        .map(|s| format!("{}{KEY_VALUE_SEPARATOR}{}", s.key, sanitize_field_value(&s.value)))
        .collect();
    join_fields(&parts)
}

pub(crate) fn join_fields(parts: &[String]) -> String {
    parts.join(&FIELD_SEPARATOR.to_string())
}

/// Join cells with [`ROW_DELIMITER`].
pub fn serialize_row<S: AsRef<str>>(cells: &[S]) -> String {
    cells
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<&str>>()
        .join(&ROW_DELIMITER.to_string())
}

/// Join rows with newlines, optionally preceded by a header line.
pub fn serialize_table(header: Option<&[&str]>, rows: &[Vec<String>]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    if let Some(header) = header {
        lines.push(serialize_row(header));
    }
    lines.extend(rows.iter().map(|r| serialize_row(r.as_slice())));
    lines.join("\n")
}

/// Split a row into trimmed cells.
pub fn split_row(line: &str) -> Vec<String> {
    line.split(ROW_DELIMITER)
        .map(|cell| cell.trim().to_string())
        .collect()
}

/// Parse a `key=value|key=value` cell. Empty segments and segments without a
/// separator are skipped.
pub fn parse_joined_fields(cell: &str) -> Vec<Field> {
    cell.split(FIELD_SEPARATOR)
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.split_once(KEY_VALUE_SEPARATOR))
        .map(|(key, value)| Field::new(key, value))
        .collect()
}

/// Make scraped text safe to store as a cell.
pub fn sanitize_cell(text: &str) -> String {
    collapse_whitespace(&text.replace(ROW_DELIMITER, ","))
}

fn sanitize_field_value(text: &str) -> String {
    sanitize_cell(&text.replace(FIELD_SEPARATOR, "/"))
}
