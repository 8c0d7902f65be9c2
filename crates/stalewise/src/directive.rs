//! Header directives: `name[=value]` with optional `; name[=value]` parameters
//!
//! A `Cache-Control: private, max-age=39` header yields two directives,
//! `private` and `max-age` (value `39`). Media-type style elements such as
//! `text/html; q=0.9` carry parameters.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Sentinel returned by [`Directive::value_as_integer`] when the value is not a number
pub const INVALID_INTEGER: i64 = -1;

/// Strip one pair of surrounding double quotes, if present
pub(crate) fn remove_quotes(value: &str) -> &str {
    let value = value.trim();
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// A `name[=value]` sub-parameter of a directive
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter {
    name: String,
    value: String,
}

impl Parameter {
    /// Create a parameter; surrounding quotes are removed from the value
    pub fn new(name: impl Into<String>, value: impl AsRef<str>) -> Self {
        Self {
            name: name.into(),
            value: remove_quotes(value.as_ref()).to_string(),
        }
    }

    /// Parameter name as written
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter value, empty when the parameter had none
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.value.is_empty() {
            write!(f, "={}", self.value)?;
        }
        Ok(())
    }
}

/// A single header element with its ordered parameters
///
/// Parameter lookup by name is case-sensitive. The name index is built on
/// first lookup and reused afterwards; with duplicate names the first
/// parameter wins.
#[derive(Clone)]
pub struct Directive {
    name: String,
    value: String,
    parameters: Vec<Parameter>,
    index: OnceLock<HashMap<String, usize>>,
}

impl Directive {
    /// Create a directive without parameters
    pub fn new(name: impl Into<String>, value: impl AsRef<str>) -> Self {
        Self::with_parameters(name, value, Vec::new())
    }

    /// Create a directive with parameters
    pub fn with_parameters(
        name: impl Into<String>,
        value: impl AsRef<str>,
        parameters: Vec<Parameter>,
    ) -> Self {
        Self {
            name: name.into(),
            value: remove_quotes(value.as_ref()).to_string(),
            parameters,
            index: OnceLock::new(),
        }
    }

    /// Directive name as written
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directive value with quotes removed; empty when absent
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Parameters in source order
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Parse the value as a decimal integer, [`INVALID_INTEGER`] on failure
    pub fn value_as_integer(&self) -> i64 {
        self.value.trim().parse().unwrap_or(INVALID_INTEGER)
    }

    /// Look up a parameter by name
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        let index = self.index.get_or_init(|| {
            let mut index = HashMap::with_capacity(self.parameters.len());
            for (position, parameter) in self.parameters.iter().enumerate() {
                index.entry(parameter.name.clone()).or_insert(position);
            }
            index
        });
        index.get(name).map(|&position| &self.parameters[position])
    }

    /// Look up a parameter value by name
    pub fn parameter_value(&self, name: &str) -> Option<&str> {
        self.parameter(name).map(Parameter::value)
    }
}

impl PartialEq for Directive {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value == other.value && self.parameters == other.parameters
    }
}

impl Eq for Directive {}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directive")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("parameters", &self.parameters)
            .finish()
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.value.is_empty() {
            write!(f, "={}", self.value)?;
        }
        for parameter in &self.parameters {
            write!(f, "; {}", parameter)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quotes_are_removed() {
        let directive = Directive::new("etag", "\"123\"");
        assert_eq!(directive.value(), "123");

        let parameter = Parameter::new("charset", "\"utf-8\"");
        assert_eq!(parameter.value(), "utf-8");
    }

    #[test]
    fn test_lone_quote_is_kept() {
        let directive = Directive::new("x", "\"");
        assert_eq!(directive.value(), "\"");
    }

    #[test]
    fn test_value_as_integer() {
        assert_eq!(Directive::new("max-age", "39").value_as_integer(), 39);
        assert_eq!(Directive::new("max-age", " 0 ").value_as_integer(), 0);
        assert_eq!(Directive::new("max-age", "forever").value_as_integer(), INVALID_INTEGER);
        assert_eq!(Directive::new("private", "").value_as_integer(), INVALID_INTEGER);
    }

    #[test]
    fn test_parameter_lookup() {
        let directive = Directive::with_parameters(
            "text/html",
            "",
            vec![Parameter::new("q", "0.9"), Parameter::new("level", "1")],
        );

        assert_eq!(directive.parameter_value("q"), Some("0.9"));
        assert_eq!(directive.parameter_value("level"), Some("1"));
        assert_eq!(directive.parameter_value("Q"), None);
        // Second lookup goes through the memoized index
        assert_eq!(directive.parameter("q").map(Parameter::name), Some("q"));
    }

    #[test]
    fn test_duplicate_parameter_first_wins() {
        let directive = Directive::with_parameters(
            "a",
            "",
            vec![Parameter::new("p", "1"), Parameter::new("p", "2")],
        );
        assert_eq!(directive.parameter_value("p"), Some("1"));
        assert_eq!(directive.parameters().len(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(Directive::new("no-cache", "").to_string(), "no-cache");
        assert_eq!(Directive::new("max-age", "60").to_string(), "max-age=60");

        let directive = Directive::with_parameters(
            "text/html",
            "",
            vec![Parameter::new("q", "0.9"), Parameter::new("secure", "")],
        );
        assert_eq!(directive.to_string(), "text/html; q=0.9; secure");
    }

    #[test]
    fn test_equality_ignores_index() {
        let a = Directive::with_parameters("a", "1", vec![Parameter::new("p", "x")]);
        let b = a.clone();
        let _ = a.parameter("p");
        assert_eq!(a, b);
    }
}
