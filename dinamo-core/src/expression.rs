/// Expression compiler for DynamoDB-style key conditions, filters, and updates
///
/// Turns [`Fields`] into the three artifacts the store expects:
/// - an **alias table** (`#name -> name`), so reserved words are never used
///   directly in an expression
/// - a **value table** (`:name -> value`)
/// - the **expression strings** referencing both
///
/// # Examples
///
/// ```
/// use dinamo_core::{Expressions, Fields};
///
/// let key = Fields::new().eq("source", "user#1");
/// let filter = Fields::new().between("status", 1, 5);
///
/// let expr = Expressions::for_query(&key, Some(&filter));
/// assert_eq!(expr.key_condition.as_deref(), Some("#source = :source"));
/// assert_eq!(expr.filter.as_deref(), Some("#status BETWEEN :status0 AND :status1"));
/// ```

use crate::{Descriptor, Error, Fields, Result, Value};
use std::collections::{BTreeMap, HashMap};

/// Expression attribute names (#alias -> field name)
pub type AliasTable = BTreeMap<String, String>;

/// Expression attribute values (:placeholder -> value)
pub type ValueTable = BTreeMap<String, Value>;

/// Placeholder namespace for guard conditions compiled next to an update
const CONDITION_SCOPE: &str = "if";

/// Spelling used when a name has no ASCII letters or digits at all
const FALLBACK_TOKEN: &str = "attr";

/// Preferred placeholder spelling for a field name or dotted path.
///
/// Names made of ASCII letters, digits and underscores are used verbatim.
/// Anything else is split on the offending characters and camel-cased, so
/// `address.city` becomes `addressCity` and `first-name` becomes `firstName`.
/// Distinct names may share a spelling; [`Compiler`] resolves the clash.
fn token(path: &str) -> String {
    let is_plain = |c: char| c.is_ascii_alphanumeric() || c == '_';
    if !path.is_empty() && path.chars().all(is_plain) {
        return path.to_string();
    }

    let mut out = String::with_capacity(path.len());
    for segment in path.split(|c: char| !is_plain(c)).filter(|s| !s.is_empty()) {
        if out.is_empty() {
            out.push_str(segment);
            continue;
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }

    if out.is_empty() {
        FALLBACK_TOKEN.to_string()
    } else {
        out
    }
}

/// Field path inside an optional placeholder namespace
fn scoped(scope: Option<&str>, path: &str) -> String {
    match scope {
        Some(scope) => format!("{}.{}", scope, path),
        None => path.to_string(),
    }
}

/// First spelling not yet in `taken`: `candidate`, then `candidate_1`, ...
fn fresh<V>(taken: &BTreeMap<String, V>, candidate: String) -> String {
    if !taken.contains_key(&candidate) {
        return candidate;
    }
    let mut n = 1;
    loop {
        let next = format!("{}_{}", candidate, n);
        if !taken.contains_key(&next) {
            return next;
        }
        n += 1;
    }
}

/// One compilation: hands out aliases and placeholders and records them.
///
/// A field name always maps to the same alias; every bound value gets its own
/// placeholder, so two names never share an entry.
#[derive(Debug, Default)]
struct Compiler {
    names: AliasTable,
    aliases: HashMap<String, String>,
    values: ValueTable,
}

impl Compiler {
    fn alias(&mut self, field: &str) -> String {
        if let Some(alias) = self.aliases.get(field) {
            return alias.clone();
        }
        let alias = fresh(&self.names, format!("#{}", token(field)));
        self.names.insert(alias.clone(), field.to_string());
        self.aliases.insert(field.to_string(), alias.clone());
        alias
    }

    fn bind(&mut self, candidate: String, value: &Value) -> String {
        let placeholder = fresh(&self.values, candidate);
        self.values.insert(placeholder.clone(), value.clone());
        placeholder
    }

    fn bind_path(&mut self, path: &str, value: &Value) -> String {
        self.bind(format!(":{}", token(path)), value)
    }

    fn bind_indexed(&mut self, path: &str, index: usize, value: &Value) -> String {
        self.bind(format!(":{}{}", token(path), index), value)
    }

    /// `#k.#sub = :kSub` for every sub-field
    fn nested(&mut self, name: &str, path: &str, paths: &BTreeMap<String, Value>) -> Vec<String> {
        let alias = self.alias(name);
        paths
            .iter()
            .map(|(sub, value)| {
                let sub_alias = self.alias(sub);
                let placeholder = self.bind_path(&format!("{}.{}", path, sub), value);
                format!("{}.{} = {}", alias, sub_alias, placeholder)
            })
            .collect()
    }

    /// Render one field's clause
    fn clause(&mut self, name: &str, descriptor: &Descriptor, scope: Option<&str>) -> String {
        let path = scoped(scope, name);
        let alias = self.alias(name);
        match descriptor {
            Descriptor::BeginsWith(v) => format!("begins_with({}, {})", alias, self.bind_path(&path, v)),
            Descriptor::LessThan(v) => format!("{} < {}", alias, self.bind_path(&path, v)),
            Descriptor::LessOrEqual(v) => format!("{} <= {}", alias, self.bind_path(&path, v)),
            Descriptor::GreaterOrEqual(v) => format!("{} >= {}", alias, self.bind_path(&path, v)),
            Descriptor::Between(low, high) => format!(
                "{} BETWEEN {} AND {}",
                alias,
                self.bind_indexed(&path, 0, low),
                self.bind_indexed(&path, 1, high)
            ),
            // AND binds tighter than OR, so the pair must stay grouped
            Descriptor::Or(first, second) => format!(
                "({} = {} OR {} = {})",
                alias,
                self.bind_indexed(&path, 0, first),
                alias,
                self.bind_indexed(&path, 1, second)
            ),
            Descriptor::Equals(v) | Descriptor::Increment(v) => {
                format!("{} = {}", alias, self.bind_path(&path, v))
            }
            Descriptor::NestedPath(paths) => self.nested(name, &path, paths).join(" AND "),
        }
    }

    /// AND-joined clauses, absent for empty input
    fn condition(&mut self, fields: Option<&Fields>, scope: Option<&str>) -> Option<String> {
        let fields = fields.filter(|f| !f.is_empty())?;
        Some(
            fields
                .iter()
                .map(|(name, descriptor)| self.clause(name, descriptor, scope))
                .collect::<Vec<_>>()
                .join(" AND "),
        )
    }

    /// SET assignments, absent for empty input
    fn update(&mut self, fields: &Fields) -> Result<Option<String>> {
        if fields.is_empty() {
            return Ok(None);
        }

        let mut assignments = Vec::with_capacity(fields.len());
        for (name, descriptor) in fields.iter() {
            match descriptor {
                Descriptor::Equals(v) => {
                    let alias = self.alias(name);
                    assignments.push(format!("{} = {}", alias, self.bind_path(name, v)));
                }
                Descriptor::Increment(v) => {
                    let alias = self.alias(name);
                    assignments.push(format!("{} = {} + {}", alias, alias, self.bind_path(name, v)));
                }
                Descriptor::NestedPath(paths) => assignments.extend(self.nested(name, name, paths)),
                other => {
                    return Err(Error::InvalidArgument(format!(
                        "field '{}' cannot be assigned with {:?}",
                        name, other
                    )))
                }
            }
        }

        Ok(Some(format!("set {}", assignments.join(", "))))
    }

    fn tables(self) -> (Option<AliasTable>, Option<ValueTable>) {
        let names = Some(self.names).filter(|n| !n.is_empty());
        let values = Some(self.values).filter(|v| !v.is_empty());
        (names, values)
    }
}

/// Build the alias table for a descriptor set.
///
/// One entry per distinct field name; nested-path descriptors also register
/// every sub-field they touch.
pub fn alias_table(fields: Option<&Fields>) -> Option<AliasTable> {
    let mut compiler = Compiler::default();
    compiler.condition(fields, None);
    compiler.tables().0
}

/// Build the value table for a descriptor set.
///
/// `between` and `or` bind two placeholders (`:field0`, `:field1`), a nested
/// path binds one per sub-field, everything else binds exactly one.
pub fn value_table(fields: Option<&Fields>) -> Option<ValueTable> {
    let mut compiler = Compiler::default();
    compiler.condition(fields, None);
    compiler.tables().1
}

/// Compile a condition (key condition or filter). Absent for empty input.
pub fn condition_expression(fields: Option<&Fields>) -> Option<String> {
    Compiler::default().condition(fields, None)
}

/// Compile a SET update expression. Absent for empty input.
///
/// Only plain values, increments and nested paths can be assigned; any other
/// operator is an `InvalidArgument` error.
pub fn update_expression(fields: &Fields) -> Result<Option<String>> {
    Compiler::default().update(fields)
}

/// AND-combine an optional expression with one more clause
pub fn and(existing: Option<String>, clause: &str) -> String {
    match existing {
        Some(expr) => format!("{} AND {}", expr, clause),
        None => clause.to_string(),
    }
}

/// Compiled expression bundle handed to the store.
///
/// The key condition, filter, condition and update slots are kept apart but
/// share one alias table and one value table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expressions {
    pub names: Option<AliasTable>,
    pub values: Option<ValueTable>,
    pub key_condition: Option<String>,
    pub filter: Option<String>,
    pub condition: Option<String>,
    pub update: Option<String>,
}

impl Expressions {
    /// Key condition plus optional filter, for the query path.
    ///
    /// A field named in both keeps one alias but binds two placeholders
    /// (`:target`, `:target_1`), so each slot tests its own value.
    pub fn for_query(key: &Fields, filter: Option<&Fields>) -> Self {
        let mut compiler = Compiler::default();
        let key_condition = compiler.condition(Some(key), None);
        let filter = compiler.condition(filter, None);
        let (names, values) = compiler.tables();

        Self {
            names,
            values,
            key_condition,
            filter,
            ..Self::default()
        }
    }

    /// Filter only, for the scan path
    pub fn for_scan(filter: Option<&Fields>) -> Self {
        let mut compiler = Compiler::default();
        let filter = compiler.condition(filter, None);
        let (names, values) = compiler.tables();

        Self {
            names,
            values,
            filter,
            ..Self::default()
        }
    }

    /// SET update plus optional guard condition.
    ///
    /// Guard values bind `:if`-prefixed placeholders (`:ifStatus`), so a
    /// field can be both tested and overwritten in one request.
    pub fn for_update(item: &Fields, condition: Option<&Fields>) -> Result<Self> {
        let mut compiler = Compiler::default();
        let update = compiler.update(item)?;
        let condition = compiler.condition(condition, Some(CONDITION_SCOPE));
        let (names, values) = compiler.tables();

        Ok(Self {
            names,
            values,
            condition,
            update,
            ..Self::default()
        })
    }

    /// Alias for `field`, registering one if the table has none yet
    pub fn add_name(&mut self, field: &str) -> String {
        let names = self.names.get_or_insert_with(AliasTable::new);
        if let Some((alias, _)) = names.iter().find(|(_, name)| name.as_str() == field) {
            return alias.clone();
        }
        let alias = fresh(names, format!("#{}", token(field)));
        names.insert(alias.clone(), field.to_string());
        alias
    }

    /// AND one more clause onto the filter
    pub fn and_filter(&mut self, clause: &str) {
        self.filter = Some(and(self.filter.take(), clause));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token() {
        assert_eq!(token("status"), "status");
        assert_eq!(token("created_at"), "created_at");
        assert_eq!(token("address.city"), "addressCity");
        assert_eq!(token("first-name"), "firstName");
        assert_eq!(token("a..b"), "aB");
        assert_eq!(token("名前"), "attr");
        assert_eq!(token(""), "attr");
    }

    #[test]
    fn test_between() {
        let fields = Fields::new().between("status", 1, 5);

        assert_eq!(
            condition_expression(Some(&fields)).as_deref(),
            Some("#status BETWEEN :status0 AND :status1")
        );

        let values = value_table(Some(&fields)).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values.get(":status0"), Some(&Value::from(1)));
        assert_eq!(values.get(":status1"), Some(&Value::from(5)));
    }

    #[test]
    fn test_begins_with() {
        let fields = Fields::new().begins_with("name", "Al");
        assert_eq!(
            condition_expression(Some(&fields)).as_deref(),
            Some("begins_with(#name, :name)")
        );
        assert_eq!(
            value_table(Some(&fields)).unwrap().get(":name"),
            Some(&Value::from("Al"))
        );
    }

    #[test]
    fn test_comparisons() {
        let fields = Fields::new().lt("a", 1).lte("b", 2).gte("c", 3);
        assert_eq!(
            condition_expression(Some(&fields)).as_deref(),
            Some("#a < :a AND #b <= :b AND #c >= :c")
        );
    }

    #[test]
    fn test_or_binds_both_operands() {
        let fields = Fields::new().or("status", "draft", "live");

        assert_eq!(
            condition_expression(Some(&fields)).as_deref(),
            Some("(#status = :status0 OR #status = :status1)")
        );

        let values = value_table(Some(&fields)).unwrap();
        assert_eq!(values.get(":status0"), Some(&Value::from("draft")));
        assert_eq!(values.get(":status1"), Some(&Value::from("live")));
    }

    #[test]
    fn test_nested_path() {
        let fields = Fields::new().nested("address", [("city", "Lisbon"), ("zip", "1000")]);

        assert_eq!(
            condition_expression(Some(&fields)).as_deref(),
            Some("#address.#city = :addressCity AND #address.#zip = :addressZip")
        );

        let names = alias_table(Some(&fields)).unwrap();
        assert_eq!(names.get("#address").map(String::as_str), Some("address"));
        assert_eq!(names.get("#city").map(String::as_str), Some("city"));
        assert_eq!(names.get("#zip").map(String::as_str), Some("zip"));

        let values = value_table(Some(&fields)).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values.get(":addressCity"), Some(&Value::from("Lisbon")));
    }

    #[test]
    fn test_names_with_same_spelling_stay_apart() {
        let fields = Fields::new().eq("first-name", "Ann").eq("firstName", "Bob");

        let names = alias_table(Some(&fields)).unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names.get("#firstName").map(String::as_str), Some("first-name"));
        assert_eq!(names.get("#firstName_1").map(String::as_str), Some("firstName"));

        assert_eq!(
            condition_expression(Some(&fields)).as_deref(),
            Some("#firstName = :firstName AND #firstName_1 = :firstName_1")
        );
        let values = value_table(Some(&fields)).unwrap();
        assert_eq!(values.get(":firstName"), Some(&Value::from("Ann")));
        assert_eq!(values.get(":firstName_1"), Some(&Value::from("Bob")));
    }

    #[test]
    fn test_names_without_ascii_characters() {
        let fields = Fields::new().eq("名前", "Ann").eq("年齢", 30);

        let names = alias_table(Some(&fields)).unwrap();
        assert_eq!(names.len(), 2);
        assert!(names.keys().all(|alias| alias.len() > 1));

        let filter = condition_expression(Some(&fields)).unwrap();
        assert_eq!(filter, "#attr = :attr AND #attr_1 = :attr_1");
        assert_eq!(value_table(Some(&fields)).unwrap().len(), 2);
    }

    #[test]
    fn test_empty_and_absent_input() {
        assert_eq!(condition_expression(None), None);
        assert_eq!(condition_expression(Some(&Fields::new())), None);
        assert_eq!(alias_table(None), None);
        assert_eq!(value_table(Some(&Fields::new())), None);
        assert_eq!(update_expression(&Fields::new()).unwrap(), None);
    }

    #[test]
    fn test_update_expression() {
        let item = Fields::new().increment("score", 3);
        assert_eq!(
            update_expression(&item).unwrap().as_deref(),
            Some("set #score = #score + :score")
        );

        let item = Fields::new().eq("name", "Bob").increment("visits", 1);
        assert_eq!(
            update_expression(&item).unwrap().as_deref(),
            Some("set #name = :name, #visits = #visits + :visits")
        );
        assert_eq!(
            value_table(Some(&item)).unwrap().get(":visits"),
            Some(&Value::from(1))
        );
    }

    #[test]
    fn test_update_nested_assignment() {
        let item = Fields::new().nested("profile", [("tier", "gold")]);
        let expr = Expressions::for_update(&item, None).unwrap();

        assert_eq!(expr.update.as_deref(), Some("set #profile.#tier = :profileTier"));
        assert_eq!(expr.values.unwrap().get(":profileTier"), Some(&Value::from("gold")));
    }

    #[test]
    fn test_update_rejects_operators() {
        for item in [
            Fields::new().between("score", 1, 2),
            Fields::new().or("status", "a", "b"),
            Fields::new().gte("age", 18),
            Fields::new().begins_with("name", "Al"),
        ] {
            let err = Expressions::for_update(&item, None).unwrap_err();
            assert_eq!(err.code(), "INVALID_ARGUMENT");
        }
    }

    #[test]
    fn test_reserved_words_are_aliased() {
        let fields = Fields::new().eq("name", "x").eq("status", "y");
        let names = alias_table(Some(&fields)).unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(
            condition_expression(Some(&fields)).as_deref(),
            Some("#name = :name AND #status = :status")
        );
    }

    #[test]
    fn test_for_query_keeps_slots_apart() {
        let key = Fields::new().eq("source", "user#1").begins_with("target", "post#");
        let filter = Fields::new().gte("score", 10);

        let expr = Expressions::for_query(&key, Some(&filter));
        assert_eq!(
            expr.key_condition.as_deref(),
            Some("#source = :source AND begins_with(#target, :target)")
        );
        assert_eq!(expr.filter.as_deref(), Some("#score >= :score"));
        assert_eq!(expr.names.as_ref().map(|n| n.len()), Some(3));
        assert_eq!(expr.values.as_ref().map(|v| v.len()), Some(3));
        assert!(expr.update.is_none());
    }

    #[test]
    fn test_field_in_key_and_filter_binds_both_values() {
        let key = Fields::new().eq("source", "user#1").begins_with("target", "post#");
        let filter = Fields::new().lt("target", "post#05");

        let expr = Expressions::for_query(&key, Some(&filter));
        assert_eq!(
            expr.key_condition.as_deref(),
            Some("#source = :source AND begins_with(#target, :target)")
        );
        assert_eq!(expr.filter.as_deref(), Some("#target < :target_1"));

        let values = expr.values.unwrap();
        assert_eq!(values.get(":target"), Some(&Value::from("post#")));
        assert_eq!(values.get(":target_1"), Some(&Value::from("post#05")));
        assert_eq!(expr.names.unwrap().len(), 2);
    }

    #[test]
    fn test_for_update_with_condition() {
        let item = Fields::new().eq("status", "live");
        let condition = Fields::new().eq("version", 2);

        let expr = Expressions::for_update(&item, Some(&condition)).unwrap();
        assert_eq!(expr.update.as_deref(), Some("set #status = :status"));
        assert_eq!(expr.condition.as_deref(), Some("#version = :ifVersion"));
        assert_eq!(expr.values.as_ref().map(|v| v.len()), Some(2));
    }

    #[test]
    fn test_condition_on_updated_field() {
        let item = Fields::new().eq("status", "live");
        let condition = Fields::new().eq("status", "draft");

        let expr = Expressions::for_update(&item, Some(&condition)).unwrap();
        assert_eq!(expr.condition.as_deref(), Some("#status = :ifStatus"));

        let values = expr.values.unwrap();
        assert_eq!(values.get(":status"), Some(&Value::from("live")));
        assert_eq!(values.get(":ifStatus"), Some(&Value::from("draft")));
        assert_eq!(expr.names.unwrap().len(), 1);
    }

    #[test]
    fn test_and_filter() {
        let mut expr = Expressions::for_scan(None);
        assert!(expr.names.is_none());

        let alias = expr.add_name("deletedAt");
        expr.and_filter(&format!("attribute_not_exists({})", alias));

        assert_eq!(expr.filter.as_deref(), Some("attribute_not_exists(#deletedAt)"));
        assert_eq!(expr.names.unwrap().get("#deletedAt").map(String::as_str), Some("deletedAt"));
    }

    #[test]
    fn test_add_name_reuses_and_avoids_aliases() {
        let mut expr = Expressions::for_scan(Some(&Fields::new().eq("deleted-at", 1).eq("kind", "a")));
        assert_eq!(expr.add_name("kind"), "#kind");
        assert_eq!(expr.add_name("deletedAt"), "#deletedAt_1");

        let names = expr.names.unwrap();
        assert_eq!(names.get("#deletedAt").map(String::as_str), Some("deleted-at"));
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_idempotent() {
        let fields = Fields::new()
            .eq("source", "org#1")
            .between("age", 18, 65)
            .or("role", "admin", "owner")
            .nested("profile", [("tier", "gold")]);

        let first = Expressions::for_scan(Some(&fields));
        let second = Expressions::for_scan(Some(&fields.clone()));
        assert_eq!(first, second);
        assert_eq!(first.filter, second.filter);
    }
}
