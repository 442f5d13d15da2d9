//! Query templates and their declared parameters.
//!
//! A template is SQL text with `{{name}}` placeholders. The text is split
//! into literal segments and placeholder slots once, at construction; after
//! that the template is immutable and can only be rendered into
//! backend-native markers. Caller values never touch the text.

use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::db::{PlaceholderStyle, Value};
use crate::error::{CatalogError, Result};
use crate::safety::{check_read_only, Verdict};

/// Semantic type of a template parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    String,
    Int,
    Float,
    Date,
    /// One of a fixed list of string variants.
    Enum(Vec<String>),
}

impl ParamType {
    /// Parses a type name as written in catalog files.
    ///
    /// `variants` is required for `enum` and rejected for every other type.
    pub fn parse(kind: &str, variants: Option<Vec<String>>) -> std::result::Result<Self, String> {
        let parsed = match kind.to_lowercase().as_str() {
            "string" | "text" => Self::String,
            "int" | "integer" => Self::Int,
            "float" | "double" => Self::Float,
            "date" => Self::Date,
            "enum" => {
                let variants = variants.unwrap_or_default();
                if variants.is_empty() {
                    return Err("enum parameters need at least one variant".to_string());
                }
                return Ok(Self::Enum(variants));
            }
            other => return Err(format!("unknown parameter type '{other}'")),
        };

        if variants.is_some() {
            return Err(format!("variants are only allowed on enum parameters, not {parsed}"));
        }
        Ok(parsed)
    }

    /// Coerces `value` to this type, or returns `None` if it cannot be.
    ///
    /// Text that parses cleanly as the target type is accepted so values
    /// coming from the command line or JSON work unchanged. Non-text values
    /// are never turned into text.
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (Self::String, Value::String(s)) => Some(Value::String(s.clone())),

            (Self::Int, Value::Int(i)) => Some(Value::Int(*i)),
            (Self::Int, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::Int),

            (Self::Float, Value::Float(f)) if f.is_finite() => Some(Value::Float(*f)),
            (Self::Float, Value::Int(i)) => Some(Value::Float(*i as f64)),
            (Self::Float, Value::String(s) | Value::Numeric(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::Float),

            (Self::Date, Value::Date(d)) => Some(Value::Date(*d)),
            (Self::Date, Value::String(s)) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .ok()
                .map(Value::Date),

            (Self::Enum(variants), Value::String(s)) if variants.iter().any(|v| v == s) => {
                Some(Value::String(s.clone()))
            }

            _ => None,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Date => write!(f, "date"),
            Self::Enum(variants) => write!(f, "enum({})", variants.join("|")),
        }
    }
}

/// A declared template parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub param_type: ParamType,
    /// Used when the caller does not supply a value.
    pub default: Option<Value>,
}

impl ParamDecl {
    /// Declares a required parameter.
    pub fn new(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            default: None,
        }
    }

    /// Gives the parameter a default value.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Returns true if callers must supply this parameter.
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Placeholder(String),
}

/// SQL rendered for a particular backend marker style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSql {
    /// Query text containing only native markers.
    pub text: String,
    /// Parameter name feeding each value position, in order.
    pub slots: Vec<String>,
}

/// A named, immutable, parameterized query.
#[derive(Debug, Clone)]
pub struct QueryTemplate {
    name: String,
    description: Option<String>,
    sql: String,
    params: Vec<ParamDecl>,
    segments: Vec<Segment>,
}

impl QueryTemplate {
    /// Builds and validates a template.
    ///
    /// Fails with [`CatalogError::InvalidTemplate`] when the name or a
    /// parameter name is not an identifier, a parameter is declared twice,
    /// a default does not fit its type, a placeholder is undeclared or sits
    /// inside a quoted literal, or the SQL is not a single read-only query.
    pub fn new(
        name: impl Into<String>,
        sql: impl Into<String>,
        params: Vec<ParamDecl>,
    ) -> Result<Self> {
        let name = name.into();
        let sql = sql.into();

        if !is_identifier(&name) {
            return Err(CatalogError::invalid_template(
                &name,
                "template names must be identifiers",
            ));
        }

        let params = validate_params(&name, params)?;
        let segments = parse_segments(&name, &sql)?;

        for segment in &segments {
            if let Segment::Placeholder(placeholder) = segment {
                if !params.iter().any(|p| &p.name == placeholder) {
                    return Err(CatalogError::invalid_template(
                        &name,
                        format!("placeholder '{placeholder}' is not a declared parameter"),
                    ));
                }
            }
        }

        let template = Self {
            name,
            description: None,
            sql,
            params,
            segments,
        };

        if let Verdict::Rejected(reason) =
            check_read_only(&template.render(PlaceholderStyle::Dollar).text)
        {
            return Err(CatalogError::invalid_template(&template.name, reason));
        }

        Ok(template)
    }

    /// Attaches a human-readable description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The SQL exactly as authored, placeholders included.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Declared parameters in declaration order.
    pub fn params(&self) -> &[ParamDecl] {
        &self.params
    }

    /// Looks up a declared parameter by name.
    pub fn param(&self, name: &str) -> Option<&ParamDecl> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Distinct placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Placeholder(name) if seen.insert(name.as_str()) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Renders the template with backend-native markers.
    ///
    /// With `$n` markers a repeated placeholder reuses its first index; with
    /// `?` markers every occurrence gets its own slot.
    pub fn render(&self, style: PlaceholderStyle) -> RenderedSql {
        let mut text = String::with_capacity(self.sql.len());
        let mut slots: Vec<String> = Vec::new();

        for segment in &self.segments {
            match segment {
                Segment::Text(literal) => text.push_str(literal),
                Segment::Placeholder(name) => match style {
                    PlaceholderStyle::Dollar => {
                        let index = match slots.iter().position(|s| s == name) {
                            Some(index) => index,
                            None => {
                                slots.push(name.clone());
                                slots.len() - 1
                            }
                        };
                        text.push('$');
                        text.push_str(&(index + 1).to_string());
                    }
                    PlaceholderStyle::Question => {
                        slots.push(name.clone());
                        text.push('?');
                    }
                },
            }
        }

        RenderedSql { text, slots }
    }
}

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"))
}

fn is_identifier(s: &str) -> bool {
    identifier_regex().is_match(s)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn validate_params(template: &str, params: Vec<ParamDecl>) -> Result<Vec<ParamDecl>> {
    let mut seen = HashSet::new();
    let mut validated = Vec::with_capacity(params.len());

    for mut param in params {
        if !is_identifier(&param.name) {
            return Err(CatalogError::invalid_template(
                template,
                format!("parameter name '{}' is not an identifier", param.name),
            ));
        }
        if !seen.insert(param.name.clone()) {
            return Err(CatalogError::invalid_template(
                template,
                format!("parameter '{}' is declared more than once", param.name),
            ));
        }
        if let Some(default) = &param.default {
            let coerced = param.param_type.coerce(default).ok_or_else(|| {
                CatalogError::invalid_template(
                    template,
                    format!(
                        "default for '{}' is a {}, expected {}",
                        param.name,
                        default.kind(),
                        param.param_type
                    ),
                )
            })?;
            param.default = Some(coerced);
        }
        validated.push(param);
    }

    Ok(validated)
}

/// Splits SQL into literal text and placeholders.
///
/// Quoted strings, dollar-quoted strings, quoted identifiers and comments are
/// copied through as text. Native markers (`?`, `?1`, `$1`, `$name`, `:name`,
/// `@name`) are rejected so the only value slots in the rendered query are
/// the ones produced here.
fn parse_segments(template: &str, sql: &str) -> Result<Vec<Segment>> {
    let invalid = |reason: String| CatalogError::invalid_template(template, reason);
    let chars: Vec<char> = sql.chars().collect();
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match (c, next) {
            ('\'', _) | ('"', _) => {
                let end = quoted_end(&chars, i)
                    .ok_or_else(|| invalid(format!("unterminated quote starting at offset {i}")))?;
                let quoted: String = chars[i..end].iter().collect();
                if quoted.contains("{{") {
                    return Err(invalid(
                        "placeholders are not allowed inside quoted literals".to_string(),
                    ));
                }
                text.push_str(&quoted);
                i = end;
            }
            ('-', Some('-')) => {
                let end = chars[i..]
                    .iter()
                    .position(|&ch| ch == '\n')
                    .map_or(chars.len(), |p| i + p);
                text.extend(&chars[i..end]);
                i = end;
            }
            ('/', Some('*')) => {
                let end = find_pair(&chars, i + 2, '*', '/')
                    .ok_or_else(|| invalid("unterminated block comment".to_string()))?
                    + 2;
                text.extend(&chars[i..end]);
                i = end;
            }
            ('{', Some('{')) => {
                let close = find_pair(&chars, i + 2, '}', '}')
                    .ok_or_else(|| invalid("unterminated placeholder".to_string()))?;
                let name: String = chars[i + 2..close].iter().collect::<String>();
                let name = name.trim().to_string();
                if !is_identifier(&name) {
                    return Err(invalid(format!("placeholder '{name}' is not an identifier")));
                }

                let touches_before = match text.chars().last() {
                    Some(prev) => is_ident_char(prev),
                    None => matches!(segments.last(), Some(Segment::Placeholder(_))),
                };
                let touches_after = chars.get(close + 2).is_some_and(|&ch| is_ident_char(ch));
                if touches_before || touches_after {
                    return Err(invalid(format!(
                        "placeholder '{name}' must be separated from surrounding identifiers"
                    )));
                }

                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Placeholder(name));
                i = close + 2;
            }
            ('?', _) => {
                return Err(invalid(
                    "native '?' markers are not allowed; use {{name}} placeholders".to_string(),
                ));
            }
            ('$', Some(d)) if d.is_ascii_digit() => {
                return Err(invalid(
                    "native '$n' markers are not allowed; use {{name}} placeholders".to_string(),
                ));
            }
            // `$` inside an identifier (`col$1`) is just part of the name
            ('$', _) if i == 0 || !is_ident_char(chars[i - 1]) => {
                let tag_end = chars[i + 1..]
                    .iter()
                    .position(|&ch| !(ch.is_alphanumeric() || ch == '_'))
                    .map_or(chars.len(), |p| i + 1 + p);

                if chars.get(tag_end) == Some(&'$') {
                    let delimiter = &chars[i..=tag_end];
                    let end = dollar_quoted_end(&chars, tag_end + 1, delimiter).ok_or_else(|| {
                        invalid(format!("unterminated dollar quote starting at offset {i}"))
                    })?;
                    let quoted: String = chars[i..end].iter().collect();
                    if quoted.contains("{{") {
                        return Err(invalid(
                            "placeholders are not allowed inside quoted literals".to_string(),
                        ));
                    }
                    text.push_str(&quoted);
                    i = end;
                } else if tag_end > i + 1 {
                    let marker: String = chars[i..tag_end].iter().collect();
                    return Err(native_marker(&invalid, &marker));
                } else {
                    text.push(c);
                    i += 1;
                }
            }
            // Casts and the text-search operator, not markers
            (':', Some(':')) | ('@', Some('@')) => {
                text.push(c);
                text.push(c);
                i += 2;
            }
            (':' | '@', Some(n)) if n.is_alphabetic() || n == '_' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| !(ch.is_alphanumeric() || ch == '_'))
                    .map_or(chars.len(), |p| i + 1 + p);
                let marker: String = chars[i..end].iter().collect();
                return Err(native_marker(&invalid, &marker));
            }
            _ => {
                text.push(c);
                i += 1;
            }
        }
    }

    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

/// Index just past the closing quote of the run starting at `start`.
/// A doubled quote character is an escaped quote.
fn quoted_end(chars: &[char], start: usize) -> Option<usize> {
    let quote = chars[start];
    let mut j = start + 1;
    while j < chars.len() {
        if chars[j] == quote {
            if chars.get(j + 1) == Some(&quote) {
                j += 2;
                continue;
            }
            return Some(j + 1);
        }
        j += 1;
    }
    None
}

/// Index just past the closing `delimiter` of a dollar-quoted body starting at `from`.
fn dollar_quoted_end(chars: &[char], from: usize, delimiter: &[char]) -> Option<usize> {
    let last = chars.len().checked_sub(delimiter.len())?;
    (from..=last)
        .find(|&j| chars[j..j + delimiter.len()] == *delimiter)
        .map(|j| j + delimiter.len())
}

fn native_marker(invalid: &impl Fn(String) -> CatalogError, marker: &str) -> CatalogError {
    invalid(format!(
        "native '{marker}' markers are not allowed; use {{{{name}}}} placeholders"
    ))
}

/// Index of the first `a` immediately followed by `b`, searching from `from`.
fn find_pair(chars: &[char], from: usize, a: char, b: char) -> Option<usize> {
    (from..chars.len().saturating_sub(1)).find(|&j| chars[j] == a && chars[j + 1] == b)
}
