//! Parameterized `filterByFormula` construction.
//!
//! Formulas are built as values and rendered once, right before the
//! request is sent. String literals are always quoted and escaped and
//! field names are validated, so user input can never change the shape
//! of a formula.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error("Invalid field name: {0:?}")]
    InvalidFieldName(String),

    #[error("Number is not finite: {0}")]
    NonFiniteNumber(f64),
}

/// A literal value compared against a field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Text(s.clone())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    /// `{field} = value`
    Eq(String, Value),
    /// `{field} != value`
    Ne(String, Value),
    /// `UPPER({field}) = UPPER("text")`
    EqIgnoreCase(String, String),
    /// Substring / linked-record membership: `FIND(value, ARRAYJOIN({field})) > 0`
    Contains(String, String),
    /// `{field} = BLANK()`
    Blank(String),
    /// `RECORD_ID() = "rec..."`
    RecordId(String),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Not(Box<Formula>),
}

impl Formula {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Formula::Eq(field.to_string(), value.into())
    }

    pub fn ne(field: &str, value: impl Into<Value>) -> Self {
        Formula::Ne(field.to_string(), value.into())
    }

    pub fn eq_ignore_case(field: &str, text: &str) -> Self {
        Formula::EqIgnoreCase(field.to_string(), text.to_string())
    }

    pub fn contains(field: &str, needle: &str) -> Self {
        Formula::Contains(field.to_string(), needle.to_string())
    }

    pub fn blank(field: &str) -> Self {
        Formula::Blank(field.to_string())
    }

    pub fn record_id(id: &str) -> Self {
        Formula::RecordId(id.to_string())
    }

    pub fn and(parts: impl IntoIterator<Item = Formula>) -> Self {
        Formula::And(parts.into_iter().collect())
    }

    pub fn or(parts: impl IntoIterator<Item = Formula>) -> Self {
        Formula::Or(parts.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Formula) -> Self {
        Formula::Not(Box::new(inner))
    }

    /// Render to Airtable formula text.
    pub fn render(&self) -> Result<String, FormulaError> {
        let mut out = String::new();
        self.write(&mut out)?;
        Ok(out)
    }

    fn write(&self, out: &mut String) -> Result<(), FormulaError> {
        match self {
            Formula::Eq(field, value) => {
                write_field(out, field)?;
                out.push_str(" = ");
                write_value(out, value)?;
            }
            Formula::Ne(field, value) => {
                write_field(out, field)?;
                out.push_str(" != ");
                write_value(out, value)?;
            }
            Formula::EqIgnoreCase(field, text) => {
                out.push_str("UPPER(");
                write_field(out, field)?;
                out.push_str(") = UPPER(");
                write_string(out, text);
                out.push(')');
            }
            Formula::Contains(field, needle) => {
                out.push_str("FIND(");
                write_string(out, needle);
                out.push_str(", ARRAYJOIN(");
                write_field(out, field)?;
                out.push_str(")) > 0");
            }
            Formula::Blank(field) => {
                write_field(out, field)?;
                out.push_str(" = BLANK()");
            }
            Formula::RecordId(id) => {
                out.push_str("RECORD_ID() = ");
                write_string(out, id);
            }
            Formula::And(parts) => write_call(out, "AND", parts, "TRUE()")?,
            Formula::Or(parts) => write_call(out, "OR", parts, "FALSE()")?,
            Formula::Not(inner) => {
                out.push_str("NOT(");
                inner.write(out)?;
                out.push(')');
            }
        }
        Ok(())
    }
}

fn write_call(
    out: &mut String,
    name: &str,
    parts: &[Formula],
    empty: &str,
) -> Result<(), FormulaError> {
    match parts {
        [] => out.push_str(empty),
        [single] => single.write(out)?,
        _ => {
            out.push_str(name);
            out.push('(');
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                part.write(out)?;
            }
            out.push(')');
        }
    }
    Ok(())
}

fn write_field(out: &mut String, name: &str) -> Result<(), FormulaError> {
    if name.trim().is_empty() || name.contains(['{', '}']) {
        return Err(FormulaError::InvalidFieldName(name.to_string()));
    }
    out.push('{');
    out.push_str(name);
    out.push('}');
    Ok(())
}

fn write_value(out: &mut String, value: &Value) -> Result<(), FormulaError> {
    match value {
        Value::Text(s) => write_string(out, s),
        Value::Number(n) => {
            if !n.is_finite() {
                return Err(FormulaError::NonFiniteNumber(*n));
            }
            if n.fract() == 0.0 && n.abs() < 1e15 {
                out.push_str(&format!("{}", *n as i64));
            } else {
                out.push_str(&n.to_string());
            }
        }
        Value::Bool(true) => out.push_str("TRUE()"),
        Value::Bool(false) => out.push_str("FALSE()"),
    }
    Ok(())
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_eq() {
        let f = Formula::eq("levelId", "L1");
        assert_eq!(f.render().unwrap(), r#"{levelId} = "L1""#);
    }

    #[test]
    fn test_render_numbers_and_bools() {
        assert_eq!(Formula::eq("order", 3).render().unwrap(), "{order} = 3");
        assert_eq!(Formula::eq("grade", 4.5).render().unwrap(), "{grade} = 4.5");
        assert_eq!(Formula::eq("active", true).render().unwrap(), "{active} = TRUE()");
        assert!(matches!(
            Formula::eq("grade", f64::NAN).render(),
            Err(FormulaError::NonFiniteNumber(_))
        ));
        assert!(Formula::eq("grade", f64::INFINITY).render().is_err());
    }

    #[test]
    fn test_quotes_cannot_break_out_of_literal() {
        let hostile = r#"x" , TRUE()) , OR("1"#;
        let rendered = Formula::eq("accessCode", hostile).render().unwrap();
        assert_eq!(rendered, r#"{accessCode} = "x\" , TRUE()) , OR(\"1""#);
    }

    #[test]
    fn test_render_eq_ignore_case() {
        assert_eq!(
            Formula::eq_ignore_case("accessCode", r#"est-"1"#).render().unwrap(),
            r#"UPPER({accessCode}) = UPPER("est-\"1")"#
        );
        assert!(Formula::eq_ignore_case("}", "x").render().is_err());
    }

    #[test]
    fn test_backslashes_escaped() {
        let rendered = Formula::eq("name", r"a\").render().unwrap();
        assert_eq!(rendered, r#"{name} = "a\\""#);
    }

    #[test]
    fn test_field_names_validated() {
        assert_eq!(
            Formula::eq("bad}name", "x").render(),
            Err(FormulaError::InvalidFieldName("bad}name".to_string()))
        );
        assert!(Formula::blank("").render().is_err());
        assert!(Formula::and([Formula::eq("ok", "1"), Formula::eq("{x", "2")])
            .render()
            .is_err());
    }

    #[test]
    fn test_compound_formulas() {
        let f = Formula::and([
            Formula::eq("role", "teacher"),
            Formula::or([Formula::eq("schoolId", "S1"), Formula::blank("schoolId")]),
            Formula::not(Formula::record_id("rec123")),
        ]);
        assert_eq!(
            f.render().unwrap(),
            concat!(
                r#"AND({role} = "teacher", OR({schoolId} = "S1", {schoolId} = BLANK()), "#,
                r#"NOT(RECORD_ID() = "rec123"))"#,
            )
        );
    }

    #[test]
    fn test_degenerate_compounds() {
        assert_eq!(Formula::and([]).render().unwrap(), "TRUE()");
        assert_eq!(Formula::or([]).render().unwrap(), "FALSE()");
        assert_eq!(
            Formula::and([Formula::eq("a", "b")]).render().unwrap(),
            r#"{a} = "b""#
        );
    }

    #[test]
    fn test_contains() {
        assert_eq!(
            Formula::contains("courseIds", "C-1").render().unwrap(),
            r#"FIND("C-1", ARRAYJOIN({courseIds})) > 0"#
        );
    }
}
