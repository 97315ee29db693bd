use serde_json::{Map, Number, Value};

use super::issues::{FieldIssue, IssueCode};

/// Declarative shape of a JSON value
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    String(StringRules),
    Number(NumberRules),
    Boolean,
    Array(ArrayRules),
    Object(ObjectSchema),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringRules {
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
    pub trim: bool,
    pub email: bool,
    pub uuid: bool,
    pub one_of: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberRules {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub integer: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayRules {
    pub items: Box<Schema>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    pub presence: Presence,
}

/// What happens when a declared field is absent (or null)
#[derive(Debug, Clone, PartialEq)]
pub enum Presence {
    Required,
    Optional,
    Default(Value),
}

impl Schema {
    pub fn string() -> Self {
        Self::String(StringRules::default())
    }

    pub fn number() -> Self {
        Self::Number(NumberRules::default())
    }

    pub fn integer() -> Self {
        Self::Number(NumberRules {
            integer: true,
            ..Default::default()
        })
    }

    pub fn boolean() -> Self {
        Self::Boolean
    }

    pub fn array(items: Schema) -> Self {
        Self::Array(ArrayRules {
            items: Box::new(items),
            min_items: None,
            max_items: None,
        })
    }

    pub fn object() -> Self {
        Self::Object(ObjectSchema::default())
    }

    pub fn min_len(mut self, n: usize) -> Self {
        if let Self::String(rules) = &mut self {
            rules.min_len = Some(n);
        }
        self
    }

    pub fn max_len(mut self, n: usize) -> Self {
        if let Self::String(rules) = &mut self {
            rules.max_len = Some(n);
        }
        self
    }

    pub fn trim(mut self) -> Self {
        if let Self::String(rules) = &mut self {
            rules.trim = true;
        }
        self
    }

    pub fn email(mut self) -> Self {
        if let Self::String(rules) = &mut self {
            rules.email = true;
        }
        self
    }

    pub fn uuid(mut self) -> Self {
        if let Self::String(rules) = &mut self {
            rules.uuid = true;
        }
        self
    }

    pub fn one_of(mut self, values: &[&str]) -> Self {
        if let Self::String(rules) = &mut self {
            rules.one_of = Some(values.iter().map(|v| v.to_string()).collect());
        }
        self
    }

    pub fn min(mut self, n: f64) -> Self {
        if let Self::Number(rules) = &mut self {
            rules.min = Some(n);
        }
        self
    }

    pub fn max(mut self, n: f64) -> Self {
        if let Self::Number(rules) = &mut self {
            rules.max = Some(n);
        }
        self
    }

    pub fn min_items(mut self, n: usize) -> Self {
        if let Self::Array(rules) = &mut self {
            rules.min_items = Some(n);
        }
        self
    }

    pub fn max_items(mut self, n: usize) -> Self {
        if let Self::Array(rules) = &mut self {
            rules.max_items = Some(n);
        }
        self
    }

    /// Declare a required field
    pub fn field(self, name: &str, schema: Schema) -> Self {
        self.declare(name, schema, Presence::Required)
    }

    pub fn optional(self, name: &str, schema: Schema) -> Self {
        self.declare(name, schema, Presence::Optional)
    }

    pub fn with_default(self, name: &str, schema: Schema, default: Value) -> Self {
        self.declare(name, schema, Presence::Default(default))
    }

    fn declare(mut self, name: &str, schema: Schema, presence: Presence) -> Self {
        if let Self::Object(object) = &mut self {
            object.fields.push(Field {
                name: name.to_string(),
                schema,
                presence,
            });
        }
        self
    }

    /// Validate `value`, returning the coerced value or every issue found
    ///
    /// With `coerce`, numeric and boolean strings are accepted where the shape
    /// expects numbers or booleans, and scalars are accepted where it expects
    /// arrays. Root-level issues carry an empty field path.
    pub fn validate(&self, value: &Value, coerce: bool) -> Result<Value, Vec<FieldIssue>> {
        let mut issues = Vec::new();
        let out = self.check(value, "", coerce, &mut issues);
        if issues.is_empty() {
            Ok(out)
        } else {
            Err(issues)
        }
    }

    fn check(&self, value: &Value, path: &str, coerce: bool, issues: &mut Vec<FieldIssue>) -> Value {
        match self {
            Self::String(rules) => check_string(rules, value, path, issues),
            Self::Number(rules) => check_number(rules, value, path, coerce, issues),
            Self::Boolean => match value {
                Value::Bool(_) => value.clone(),
                Value::String(s) if coerce && (s == "true" || s == "false") => {
                    Value::Bool(s == "true")
                }
                _ => type_issue(path, "boolean", value, issues),
            },
            Self::Array(rules) => {
                let single;
                let items: &[Value] = match value {
                    Value::Array(items) => items,
                    Value::Null | Value::Object(_) => {
                        return type_issue(path, "array", value, issues);
                    }
                    other if coerce => {
                        single = [other.clone()];
                        &single
                    }
                    _ => return type_issue(path, "array", value, issues),
                };

                if let Some(min) = rules.min_items {
                    if items.len() < min {
                        issues.push(FieldIssue::new(
                            path,
                            format!("Array must contain at least {min} element(s)"),
                            IssueCode::TooSmall,
                        ));
                    }
                }
                if let Some(max) = rules.max_items {
                    if items.len() > max {
                        issues.push(FieldIssue::new(
                            path,
                            format!("Array must contain at most {max} element(s)"),
                            IssueCode::TooBig,
                        ));
                    }
                }

                Value::Array(
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| rules.items.check(item, &format!("{path}[{i}]"), coerce, issues))
                        .collect(),
                )
            }
            Self::Object(object) => {
                let Value::Object(map) = value else {
                    return type_issue(path, "object", value, issues);
                };

                // Undeclared keys are dropped.
                let mut out = Map::new();
                for field in &object.fields {
                    let child = join_path(path, &field.name);
                    match map.get(&field.name).filter(|v| !v.is_null()) {
                        Some(v) => {
                            let checked = field.schema.check(v, &child, coerce, issues);
                            out.insert(field.name.clone(), checked);
                        }
                        None => match &field.presence {
                            Presence::Required => {
                                issues.push(FieldIssue::new(child, "Required", IssueCode::Required));
                            }
                            Presence::Optional => {}
                            Presence::Default(default) => {
                                out.insert(field.name.clone(), default.clone());
                            }
                        },
                    }
                }
                Value::Object(out)
            }
        }
    }
}

fn check_string(rules: &StringRules, value: &Value, path: &str, issues: &mut Vec<FieldIssue>) -> Value {
    let Value::String(raw) = value else {
        return type_issue(path, "string", value, issues);
    };
    let s = if rules.trim { raw.trim() } else { raw.as_str() };
    let len = s.chars().count();

    if let Some(min) = rules.min_len {
        if len < min {
            issues.push(FieldIssue::new(
                path,
                format!("String must contain at least {min} character(s)"),
                IssueCode::TooSmall,
            ));
        }
    }
    if let Some(max) = rules.max_len {
        if len > max {
            issues.push(FieldIssue::new(
                path,
                format!("String must contain at most {max} character(s)"),
                IssueCode::TooBig,
            ));
        }
    }
    if rules.email && !looks_like_email(s) {
        issues.push(FieldIssue::new(path, "Invalid email", IssueCode::InvalidString));
    }
    if rules.uuid && uuid::Uuid::parse_str(s).is_err() {
        issues.push(FieldIssue::new(path, "Invalid uuid", IssueCode::InvalidString));
    }
    if let Some(allowed) = &rules.one_of {
        if !allowed.iter().any(|a| a == s) {
            let expected = allowed
                .iter()
                .map(|a| format!("'{a}'"))
                .collect::<Vec<_>>()
                .join(" | ");
            issues.push(FieldIssue::new(
                path,
                format!("Invalid enum value. Expected {expected}, received '{s}'"),
                IssueCode::InvalidEnumValue,
            ));
        }
    }

    Value::String(s.to_string())
}

fn check_number(
    rules: &NumberRules,
    value: &Value,
    path: &str,
    coerce: bool,
    issues: &mut Vec<FieldIssue>,
) -> Value {
    let parsed = match value {
        Value::Number(n) => n.as_f64().map(|f| (f, value.clone())),
        Value::String(s) if coerce => parse_number(s).map(|f| (f, number_value(f))),
        _ => None,
    };
    let Some((n, out)) = parsed else {
        return type_issue(path, "number", value, issues);
    };

    if rules.integer && n.fract() != 0.0 {
        issues.push(FieldIssue::new(
            path,
            "Expected integer, received float",
            IssueCode::InvalidType,
        ));
    }
    if let Some(min) = rules.min {
        if n < min {
            issues.push(FieldIssue::new(
                path,
                format!("Number must be greater than or equal to {min}"),
                IssueCode::TooSmall,
            ));
        }
    }
    if let Some(max) = rules.max {
        if n > max {
            issues.push(FieldIssue::new(
                path,
                format!("Number must be less than or equal to {max}"),
                IssueCode::TooBig,
            ));
        }
    }

    out
}

fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn looks_like_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.contains('@')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !s.chars().any(char::is_whitespace)
}

fn type_issue(path: &str, expected: &str, value: &Value, issues: &mut Vec<FieldIssue>) -> Value {
    let received = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    issues.push(FieldIssue::new(
        path,
        format!("Expected {expected}, received {received}"),
        IssueCode::InvalidType,
    ));
    Value::Null
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}
