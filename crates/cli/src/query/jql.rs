use std::fmt;

/// Comparison used between a field and its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`, exact match
    Equals,
    /// `~`, text contains
    Contains,
}

impl Operator {
    /// `key` is the only field searched by exact match.
    pub fn for_field(field: &str) -> Self {
        if field == "key" {
            Operator::Equals
        } else {
            Operator::Contains
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Equals => "=",
            Operator::Contains => "~",
        }
    }
}

/// A single `field<op>value` JQL clause.
///
/// The value is inserted verbatim: callers pass it already escaped for a
/// query string (e.g. `"Legacy%20Row%20No"`), so it must not be encoded
/// a second time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    field: String,
    value: String,
}

impl SearchQuery {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Wraps the field name in double quotes, as bulk input does for
    /// custom field names containing spaces.
    pub fn quoted_field(field: &str, value: impl Into<String>) -> Self {
        Self::new(format!("\"{field}\""), value)
    }

    pub fn operator(&self) -> Operator {
        Operator::for_field(&self.field)
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.field, self.operator().as_str(), self.value)
    }
}
