/// Parser and evaluator for the expression dialect the compiler emits
///
/// Lets an in-process store answer the same key conditions, filters, guard
/// conditions and `set` updates a remote DynamoDB table would.
///
/// Supported:
/// - **Conditions**: `=`, `<>`, `<`, `<=`, `>`, `>=`, `BETWEEN .. AND ..`,
///   `AND`, `OR`, `NOT`, parentheses, `begins_with`, `attribute_exists`,
///   `attribute_not_exists`
/// - **Updates**: `SET path = operand`, `SET path = path + operand`,
///   `SET path = path - operand`
/// - Dotted paths (`#address.#city`) resolved through the alias table
///
/// A comparison against a missing attribute is false rather than an error,
/// matching how DynamoDB treats absent attributes in filters.
///
/// # Examples
///
/// ```
/// use dinamo_core::evaluator::{ConditionParser, ExpressionContext, Evaluator};
/// use dinamo_core::{Expressions, Fields, Item, Value};
///
/// let filter = Fields::new().gte("age", 18);
/// let expr = Expressions::for_scan(Some(&filter));
///
/// let condition = ConditionParser::parse(expr.filter.as_deref().unwrap()).unwrap();
/// let context = ExpressionContext::from_expressions(&expr);
///
/// let mut item = Item::new();
/// item.insert("age".to_string(), Value::number(30));
/// assert!(Evaluator::new(&item, &context).evaluate(&condition).unwrap());
/// ```

use crate::{AliasTable, Error, Expressions, Item, Result, Value, ValueTable};
use std::cmp::Ordering;

/// Attribute path: one or more segments, each a `#alias` or a raw name
pub type Path = Vec<String>;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
}

/// Comparison operand
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Path(Path),
    Placeholder(String),
}

/// Condition AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Compare(CompareOp, Operand, Operand),
    Between(Operand, Operand, Operand),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    AttributeExists(Path),
    AttributeNotExists(Path),
    BeginsWith(Operand, Operand),
}

/// Right-hand side of a SET action
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateValue {
    Operand(Operand),
    Add(Operand, Operand),
    Sub(Operand, Operand),
}

/// One `SET path = value` action
#[derive(Debug, Clone, PartialEq)]
pub struct SetAction {
    pub path: Path,
    pub value: UpdateValue,
}

/// Alias and value tables an expression is evaluated against
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionContext<'a> {
    names: Option<&'a AliasTable>,
    values: Option<&'a ValueTable>,
}

impl<'a> ExpressionContext<'a> {
    pub fn new(names: Option<&'a AliasTable>, values: Option<&'a ValueTable>) -> Self {
        Self { names, values }
    }

    pub fn from_expressions(expressions: &'a Expressions) -> Self {
        Self::new(expressions.names.as_ref(), expressions.values.as_ref())
    }

    fn attribute_name<'s>(&'s self, segment: &'s str) -> Result<&'s str> {
        if !segment.starts_with('#') {
            return Ok(segment);
        }
        self.names
            .and_then(|names| names.get(segment))
            .map(String::as_str)
            .ok_or_else(|| Error::InvalidExpression(format!("undefined attribute name '{}'", segment)))
    }

    fn value(&self, placeholder: &str) -> Result<&'a Value> {
        self.values
            .and_then(|values| values.get(placeholder))
            .ok_or_else(|| Error::InvalidExpression(format!("undefined value placeholder '{}'", placeholder)))
    }
}

/// Condition evaluator for a single item
pub struct Evaluator<'a> {
    item: &'a Item,
    context: &'a ExpressionContext<'a>,
}

impl<'a> Evaluator<'a> {
    pub fn new(item: &'a Item, context: &'a ExpressionContext<'a>) -> Self {
        Self { item, context }
    }

    /// Evaluate a condition against the item
    pub fn evaluate(&self, expr: &Expr) -> Result<bool> {
        match expr {
            Expr::Compare(op, left, right) => {
                let (Some(l), Some(r)) = (self.operand(left)?, self.operand(right)?) else {
                    return Ok(false);
                };
                Ok(compare(*op, l, r))
            }
            Expr::Between(subject, low, high) => {
                let (Some(v), Some(lo), Some(hi)) =
                    (self.operand(subject)?, self.operand(low)?, self.operand(high)?)
                else {
                    return Ok(false);
                };
                Ok(compare(CompareOp::GreaterOrEqual, v, lo) && compare(CompareOp::LessOrEqual, v, hi))
            }
            Expr::And(left, right) => Ok(self.evaluate(left)? && self.evaluate(right)?),
            Expr::Or(left, right) => Ok(self.evaluate(left)? || self.evaluate(right)?),
            Expr::Not(inner) => Ok(!self.evaluate(inner)?),
            Expr::AttributeExists(path) => Ok(self.lookup(path)?.is_some()),
            Expr::AttributeNotExists(path) => Ok(self.lookup(path)?.is_none()),
            Expr::BeginsWith(subject, prefix) => {
                match (self.operand(subject)?, self.operand(prefix)?) {
                    (Some(Value::S(s)), Some(Value::S(p))) => Ok(s.starts_with(p.as_str())),
                    (Some(Value::B(b)), Some(Value::B(p))) => Ok(b.starts_with(p.as_ref())),
                    _ => Ok(false),
                }
            }
        }
    }

    fn operand(&self, operand: &Operand) -> Result<Option<&'a Value>> {
        match operand {
            Operand::Path(path) => self.lookup(path),
            Operand::Placeholder(p) => self.context.value(p).map(Some),
        }
    }

    fn lookup(&self, path: &[String]) -> Result<Option<&'a Value>> {
        resolve(self.item, path, self.context)
    }
}

fn resolve<'i>(item: &'i Item, path: &[String], context: &ExpressionContext<'_>) -> Result<Option<&'i Value>> {
    let Some((first, rest)) = path.split_first() else {
        return Err(Error::InvalidExpression("empty attribute path".into()));
    };

    let mut current = item.get(context.attribute_name(first)?);
    for segment in rest {
        let name = context.attribute_name(segment)?;
        current = current.and_then(Value::as_map).and_then(|m| m.get(name));
    }
    Ok(current)
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> bool {
    let ordering = left.compare(right);
    match op {
        CompareOp::Equal => ordering.map_or(left == right, Ordering::is_eq),
        CompareOp::NotEqual => ordering.map_or(left != right, Ordering::is_ne),
        CompareOp::LessThan => ordering.is_some_and(Ordering::is_lt),
        CompareOp::LessOrEqual => ordering.is_some_and(Ordering::is_le),
        CompareOp::GreaterThan => ordering.is_some_and(Ordering::is_gt),
        CompareOp::GreaterOrEqual => ordering.is_some_and(Ordering::is_ge),
    }
}

/// Applies SET actions to a copy of an item
pub struct UpdateExecutor<'a> {
    context: &'a ExpressionContext<'a>,
}

impl<'a> UpdateExecutor<'a> {
    pub fn new(context: &'a ExpressionContext<'a>) -> Self {
        Self { context }
    }

    /// Execute the actions in order; each sees the effect of the previous ones
    pub fn execute(&self, item: &Item, actions: &[SetAction]) -> Result<Item> {
        let mut result = item.clone();

        for action in actions {
            let value = self.update_value(&action.value, &result)?;
            self.assign(&mut result, &action.path, value)?;
        }

        Ok(result)
    }

    fn update_value(&self, value: &UpdateValue, item: &Item) -> Result<Value> {
        match value {
            UpdateValue::Operand(operand) => self.operand(operand, item),
            UpdateValue::Add(left, right) => {
                arithmetic(self.operand(left, item)?, self.operand(right, item)?, |a, b| a + b)
            }
            UpdateValue::Sub(left, right) => {
                arithmetic(self.operand(left, item)?, self.operand(right, item)?, |a, b| a - b)
            }
        }
    }

    fn operand(&self, operand: &Operand, item: &Item) -> Result<Value> {
        match operand {
            Operand::Placeholder(p) => self.context.value(p).cloned(),
            Operand::Path(path) => resolve(item, path, self.context)?
                .cloned()
                .ok_or_else(|| {
                    Error::InvalidExpression(format!(
                        "update refers to missing attribute '{}'",
                        path.join(".")
                    ))
                }),
        }
    }

    fn assign(&self, item: &mut Item, path: &[String], value: Value) -> Result<()> {
        let Some((last, parents)) = path.split_last() else {
            return Err(Error::InvalidExpression("empty attribute path".into()));
        };
        let last = self.context.attribute_name(last)?.to_string();

        let Some((first, rest)) = parents.split_first() else {
            item.insert(last, value);
            return Ok(());
        };

        let mut target = item.get_mut(self.context.attribute_name(first)?);
        for segment in rest {
            let name = self.context.attribute_name(segment)?;
            target = match target {
                Some(Value::M(map)) => map.get_mut(name),
                _ => None,
            };
        }

        match target {
            Some(Value::M(map)) => {
                map.insert(last, value);
                Ok(())
            }
            _ => Err(Error::InvalidExpression(format!(
                "parent of '{}' is not a map",
                path.join(".")
            ))),
        }
    }
}

fn arithmetic(left: Value, right: Value, op: impl Fn(f64, f64) -> f64) -> Result<Value> {
    let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
        return Err(Error::InvalidExpression("arithmetic requires numbers".into()));
    };

    // keep integral results integral so "42" stays "42" rather than "42.0"
    let result = op(a, b);
    if result.fract() == 0.0 && result.abs() < MAX_EXACT_INTEGER {
        Ok(Value::number(result as i64))
    } else {
        Ok(Value::number(result))
    }
}

/// Largest magnitude an f64 holds without losing integer precision
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Compare(CompareOp),
    And,
    Or,
    Not,
    Between,
    Set,
    Plus,
    Minus,
    Identifier(String),
    NamePlaceholder(String),
    ValuePlaceholder(String),
    LeftParen,
    RightParen,
    Comma,
    Dot,
    Eof,
}

struct Lexer {
    input: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn tokenize(input: &str) -> Result<Vec<Token>> {
        let mut lexer = Self {
            input: input.chars().collect(),
            pos: 0,
        };
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let is_eof = token == Token::Eof;
            tokens.push(token);
            if is_eof {
                return Ok(tokens);
            }
        }
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn read_identifier(&mut self) -> String {
        let start = self.pos;
        while matches!(self.current(), Some(ch) if ch.is_alphanumeric() || ch == '_') {
            self.advance();
        }
        self.input[start..self.pos].iter().collect()
    }

    fn single(&mut self, token: Token) -> Result<Token> {
        self.advance();
        Ok(token)
    }

    fn next_token(&mut self) -> Result<Token> {
        while matches!(self.current(), Some(ch) if ch.is_whitespace()) {
            self.advance();
        }

        match self.current() {
            None => Ok(Token::Eof),
            Some('(') => self.single(Token::LeftParen),
            Some(')') => self.single(Token::RightParen),
            Some(',') => self.single(Token::Comma),
            Some('.') => self.single(Token::Dot),
            Some('+') => self.single(Token::Plus),
            Some('-') => self.single(Token::Minus),
            Some('=') => self.single(Token::Compare(CompareOp::Equal)),
            Some('<') => {
                self.advance();
                match self.current() {
                    Some('>') => self.single(Token::Compare(CompareOp::NotEqual)),
                    Some('=') => self.single(Token::Compare(CompareOp::LessOrEqual)),
                    _ => Ok(Token::Compare(CompareOp::LessThan)),
                }
            }
            Some('>') => {
                self.advance();
                match self.current() {
                    Some('=') => self.single(Token::Compare(CompareOp::GreaterOrEqual)),
                    _ => Ok(Token::Compare(CompareOp::GreaterThan)),
                }
            }
            Some(sigil @ ('#' | ':')) => {
                self.advance();
                let name = self.read_identifier();
                if name.is_empty() {
                    return Err(Error::InvalidExpression(format!("empty placeholder after '{}'", sigil)));
                }
                let placeholder = format!("{}{}", sigil, name);
                Ok(if sigil == '#' {
                    Token::NamePlaceholder(placeholder)
                } else {
                    Token::ValuePlaceholder(placeholder)
                })
            }
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();
                Ok(match ident.to_ascii_uppercase().as_str() {
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    "NOT" => Token::Not,
                    "BETWEEN" => Token::Between,
                    "SET" => Token::Set,
                    _ => Token::Identifier(ident),
                })
            }
            Some(ch) => Err(Error::InvalidExpression(format!("unexpected character '{}'", ch))),
        }
    }
}

struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    fn new(input: &str) -> Result<Self> {
        Ok(Self {
            tokens: Lexer::tokenize(input)?,
            pos: 0,
        })
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos + 1).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        if self.current() == &expected {
            self.advance();
            Ok(())
        } else {
            Err(Error::InvalidExpression(format!(
                "expected {:?}, got {:?}",
                expected,
                self.current()
            )))
        }
    }

    fn expect_end(&self) -> Result<()> {
        match self.current() {
            Token::Eof => Ok(()),
            other => Err(Error::InvalidExpression(format!("unexpected trailing token {:?}", other))),
        }
    }

    fn path(&mut self) -> Result<Path> {
        let mut path = vec![self.segment()?];
        while self.current() == &Token::Dot {
            self.advance();
            path.push(self.segment()?);
        }
        Ok(path)
    }

    fn segment(&mut self) -> Result<String> {
        match self.current().clone() {
            Token::Identifier(name) | Token::NamePlaceholder(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(Error::InvalidExpression(format!("expected attribute path, got {:?}", other))),
        }
    }

    fn operand(&mut self) -> Result<Operand> {
        match self.current().clone() {
            Token::ValuePlaceholder(p) => {
                self.advance();
                Ok(Operand::Placeholder(p))
            }
            _ => Ok(Operand::Path(self.path()?)),
        }
    }
}

/// Parses condition expressions (key conditions, filters, guards)
pub struct ConditionParser {
    stream: TokenStream,
}

impl ConditionParser {
    pub fn parse(input: &str) -> Result<Expr> {
        let mut parser = Self {
            stream: TokenStream::new(input)?,
        };
        let expr = parser.parse_or()?;
        parser.stream.expect_end()?;
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.stream.current() == &Token::Or {
            self.stream.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.stream.current() == &Token::And {
            self.stream.advance();
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.stream.current() == &Token::Not {
            self.stream.advance();
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.stream.current().clone() {
            Token::LeftParen => {
                self.stream.advance();
                let expr = self.parse_or()?;
                self.stream.expect(Token::RightParen)?;
                Ok(expr)
            }
            Token::Identifier(name) if self.stream.peek() == &Token::LeftParen => {
                self.parse_function(&name)
            }
            _ => self.parse_comparison(),
        }
    }

    fn parse_function(&mut self, name: &str) -> Result<Expr> {
        self.stream.advance();
        self.stream.expect(Token::LeftParen)?;

        let expr = match name.to_ascii_lowercase().as_str() {
            "attribute_exists" => Expr::AttributeExists(self.stream.path()?),
            "attribute_not_exists" => Expr::AttributeNotExists(self.stream.path()?),
            "begins_with" => {
                let subject = self.stream.operand()?;
                self.stream.expect(Token::Comma)?;
                let prefix = self.stream.operand()?;
                Expr::BeginsWith(subject, prefix)
            }
            other => {
                return Err(Error::InvalidExpression(format!("unknown function '{}'", other)));
            }
        };

        self.stream.expect(Token::RightParen)?;
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.stream.operand()?;

        match self.stream.current().clone() {
            Token::Compare(op) => {
                self.stream.advance();
                let right = self.stream.operand()?;
                Ok(Expr::Compare(op, left, right))
            }
            Token::Between => {
                self.stream.advance();
                let low = self.stream.operand()?;
                self.stream.expect(Token::And)?;
                let high = self.stream.operand()?;
                Ok(Expr::Between(left, low, high))
            }
            other => Err(Error::InvalidExpression(format!(
                "expected comparison operator, got {:?}",
                other
            ))),
        }
    }
}

/// Parses `SET` update expressions
pub struct UpdateParser {
    stream: TokenStream,
}

impl UpdateParser {
    pub fn parse(input: &str) -> Result<Vec<SetAction>> {
        let mut parser = Self {
            stream: TokenStream::new(input)?,
        };
        parser.stream.expect(Token::Set)?;

        let mut actions = Vec::new();
        loop {
            actions.push(parser.parse_action()?);
            if parser.stream.current() != &Token::Comma {
                break;
            }
            parser.stream.advance();
        }

        parser.stream.expect_end()?;
        Ok(actions)
    }

    fn parse_action(&mut self) -> Result<SetAction> {
        let path = self.stream.path()?;
        self.stream.expect(Token::Compare(CompareOp::Equal))?;

        let left = self.stream.operand()?;
        let value = match self.stream.current() {
            Token::Plus => {
                self.stream.advance();
                UpdateValue::Add(left, self.stream.operand()?)
            }
            Token::Minus => {
                self.stream.advance();
                UpdateValue::Sub(left, self.stream.operand()?)
            }
            _ => UpdateValue::Operand(left),
        };

        Ok(SetAction { path, value })
    }
}

/// Evaluate an optional condition string; an absent condition matches
pub fn matches(condition: Option<&str>, item: &Item, context: &ExpressionContext<'_>) -> Result<bool> {
    match condition {
        Some(condition) => {
            let expr = ConditionParser::parse(condition)?;
            Evaluator::new(item, context).evaluate(&expr)
        }
        None => Ok(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Fields;
    use std::collections::HashMap;

    fn item(pairs: &[(&str, Value)]) -> Item {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn eval(expr: &Expressions, condition: &str, item: &Item) -> bool {
        let context = ExpressionContext::from_expressions(expr);
        matches(Some(condition), item, &context).unwrap()
    }

    #[test]
    fn test_parse_precedence() {
        let expr = ConditionParser::parse("#a = :a OR #b = :b AND #c = :c").unwrap();
        assert!(matches!(expr, Expr::Or(_, ref right) if matches!(**right, Expr::And(..))));

        let expr = ConditionParser::parse("(#a = :a OR #b = :b) AND #c = :c").unwrap();
        assert!(matches!(expr, Expr::And(..)));
    }

    #[test]
    fn test_parse_between_and_functions() {
        let expr = ConditionParser::parse("#s BETWEEN :s0 AND :s1 AND begins_with(#t, :t)").unwrap();
        match expr {
            Expr::And(left, right) => {
                assert!(matches!(*left, Expr::Between(..)));
                assert!(matches!(*right, Expr::BeginsWith(..)));
            }
            other => panic!("unexpected {:?}", other),
        }

        let expr = ConditionParser::parse("attribute_not_exists(#deletedAt)").unwrap();
        assert_eq!(expr, Expr::AttributeNotExists(vec!["#deletedAt".to_string()]));
    }

    #[test]
    fn test_parse_errors() {
        assert!(ConditionParser::parse("#a =").is_err());
        assert!(ConditionParser::parse("#a = :a)").is_err());
        assert!(ConditionParser::parse("unknown_fn(#a)").is_err());
        assert!(ConditionParser::parse("#a ! :a").is_err());
        assert!(UpdateParser::parse("#a = :a").is_err());
    }

    #[test]
    fn test_compiled_query_matches() {
        let key = Fields::new().eq("source", "user#1").begins_with("target", "post#");
        let filter = Fields::new().between("score", 10, 20);
        let expr = Expressions::for_query(&key, Some(&filter));

        let hit = item(&[
            ("source", Value::string("user#1")),
            ("target", Value::string("post#9")),
            ("score", Value::number(15)),
        ]);
        let miss = item(&[
            ("source", Value::string("user#1")),
            ("target", Value::string("post#9")),
            ("score", Value::number(25)),
        ]);

        assert!(eval(&expr, expr.key_condition.as_deref().unwrap(), &hit));
        assert!(eval(&expr, expr.filter.as_deref().unwrap(), &hit));
        assert!(!eval(&expr, expr.filter.as_deref().unwrap(), &miss));
    }

    #[test]
    fn test_or_filter() {
        let filter = Fields::new().or("status", "draft", "live").eq("kind", "post");
        let expr = Expressions::for_scan(Some(&filter));
        let condition = expr.filter.clone().unwrap();

        let live = item(&[("status", Value::string("live")), ("kind", Value::string("post"))]);
        let archived = item(&[("status", Value::string("archived")), ("kind", Value::string("post"))]);
        // OR must not leak past the AND
        let live_page = item(&[("status", Value::string("live")), ("kind", Value::string("page"))]);

        assert!(eval(&expr, &condition, &live));
        assert!(!eval(&expr, &condition, &archived));
        assert!(!eval(&expr, &condition, &live_page));
    }

    #[test]
    fn test_nested_path() {
        let filter = Fields::new().nested("address", [("city", "Lisbon")]);
        let expr = Expressions::for_scan(Some(&filter));
        let condition = expr.filter.clone().unwrap();

        let mut address = HashMap::new();
        address.insert("city".to_string(), Value::string("Lisbon"));
        let hit = item(&[("address", Value::M(address))]);

        assert!(eval(&expr, &condition, &hit));
        assert!(!eval(&expr, &condition, &Item::new()));
    }

    #[test]
    fn test_missing_attribute_is_false() {
        let filter = Fields::new().lt("age", 30);
        let expr = Expressions::for_scan(Some(&filter));
        assert!(!eval(&expr, expr.filter.as_deref().unwrap(), &Item::new()));
    }

    #[test]
    fn test_numeric_comparison() {
        let filter = Fields::new().gte("age", 9);
        let expr = Expressions::for_scan(Some(&filter));
        let condition = expr.filter.clone().unwrap();

        // "10" < "9" as strings, but not as numbers
        assert!(eval(&expr, &condition, &item(&[("age", Value::number(10))])));
        assert!(eval(&expr, &condition, &item(&[("age", Value::N("9.0".into()))])));
        assert!(!eval(&expr, &condition, &item(&[("age", Value::number(8))])));
    }

    #[test]
    fn test_type_mismatch_is_false() {
        let filter = Fields::new().begins_with("name", "Al");
        let expr = Expressions::for_scan(Some(&filter));
        assert!(!eval(&expr, expr.filter.as_deref().unwrap(), &item(&[("name", Value::number(1))])));
    }

    #[test]
    fn test_undefined_placeholder_is_error() {
        let context = ExpressionContext::default();
        assert!(matches(Some("#a = :a"), &Item::new(), &context).is_err());
        assert!(matches(None, &Item::new(), &context).unwrap());
    }

    #[test]
    fn test_not_and_exists() {
        let mut expr = Expressions::for_scan(None);
        expr.add_name("deletedAt");
        let live = Item::new();
        let deleted = item(&[("deletedAt", Value::number(1))]);

        assert!(eval(&expr, "attribute_not_exists(#deletedAt)", &live));
        assert!(!eval(&expr, "attribute_not_exists(#deletedAt)", &deleted));
        assert!(eval(&expr, "NOT attribute_not_exists(#deletedAt)", &deleted));
        assert!(eval(&expr, "attribute_exists(#deletedAt)", &deleted));
    }

    #[test]
    fn test_update_set_and_increment() {
        let update = Fields::new().eq("name", "Bob").increment("visits", 2);
        let expr = Expressions::for_update(&update, None).unwrap();
        let context = ExpressionContext::from_expressions(&expr);

        let before = item(&[("name", Value::string("Al")), ("visits", Value::number(40))]);
        let actions = UpdateParser::parse(expr.update.as_deref().unwrap()).unwrap();
        let after = UpdateExecutor::new(&context).execute(&before, &actions).unwrap();

        assert_eq!(after.get("name"), Some(&Value::string("Bob")));
        assert_eq!(after.get("visits"), Some(&Value::number(42)));
    }

    #[test]
    fn test_update_decrement_and_fractions() {
        let values: ValueTable = [(":d".to_string(), Value::N("0.5".into()))].into_iter().collect();
        let context = ExpressionContext::new(None, Some(&values));

        let actions = UpdateParser::parse("SET balance = balance - :d").unwrap();
        let after = UpdateExecutor::new(&context)
            .execute(&item(&[("balance", Value::number(2))]), &actions)
            .unwrap();
        assert_eq!(after.get("balance").and_then(Value::as_f64), Some(1.5));
    }

    #[test]
    fn test_increment_missing_attribute_fails() {
        let update = Fields::new().increment("visits", 1);
        let expr = Expressions::for_update(&update, None).unwrap();
        let context = ExpressionContext::from_expressions(&expr);

        let actions = UpdateParser::parse(expr.update.as_deref().unwrap()).unwrap();
        let err = UpdateExecutor::new(&context).execute(&Item::new(), &actions).unwrap_err();
        assert_eq!(err.code(), "INVALID_EXPRESSION");
    }

    #[test]
    fn test_update_nested_path() {
        let names: AliasTable = [
            ("#profile".to_string(), "profile".to_string()),
            ("#tier".to_string(), "tier".to_string()),
        ]
        .into_iter()
        .collect();
        let values: ValueTable = [(":tier".to_string(), Value::string("gold"))].into_iter().collect();
        let context = ExpressionContext::new(Some(&names), Some(&values));

        let actions = UpdateParser::parse("set #profile.#tier = :tier").unwrap();
        let before = item(&[("profile", Value::M(HashMap::new()))]);
        let after = UpdateExecutor::new(&context).execute(&before, &actions).unwrap();
        let profile = after.get("profile").and_then(Value::as_map).unwrap();
        assert_eq!(profile.get("tier"), Some(&Value::string("gold")));

        assert!(UpdateExecutor::new(&context).execute(&Item::new(), &actions).is_err());
    }
}
