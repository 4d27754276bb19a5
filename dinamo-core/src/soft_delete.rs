/// Soft-delete overlay
///
/// Records are never physically removed by default: a delete stamps
/// `deletedAt`, and every filtered read path excludes records carrying it.

use crate::{entity::fields, Expressions, Fields};

/// Predicate appended to read-path filters
pub fn not_deleted_clause(alias: &str) -> String {
    format!("attribute_not_exists({})", alias)
}

/// Exclude soft-deleted records from a query or scan.
///
/// Registers the `deletedAt` alias and AND-combines the absence predicate with
/// any existing filter (or makes it the whole filter).
pub fn exclude_deleted(expressions: &mut Expressions) {
    let alias = expressions.add_name(fields::DELETED_AT);
    expressions.and_filter(&not_deleted_clause(&alias));
}

/// Update fields that mark a record as deleted at `now` (epoch ms)
pub fn deletion_marker(now: i64) -> Fields {
    Fields::new()
        .eq(fields::DELETED_AT, now)
        .eq(fields::UPDATED_AT, now)
}
