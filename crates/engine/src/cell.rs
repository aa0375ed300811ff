use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// A single raw value held in a dataframe column.
///
/// Serializes as the bare JSON value (`null`, `true`, `3.5`, `"abc"`) so step
/// params stay readable and can be matched by clients without a schema.
/// Numbers use `OrderedFloat` so values can live in hash sets and be compared
/// for equality when toggling filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Blank,
    Bool(bool),
    Number(OrderedFloat<f64>),
    Text(String),
}

impl CellValue {
    /// Infer a value from a raw text field (CSV import, CLI input).
    pub fn from_input(input: &str) -> Self {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return CellValue::Blank;
        }

        if trimmed.eq_ignore_ascii_case("true") {
            return CellValue::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return CellValue::Bool(false);
        }

        if let Ok(num) = trimmed.parse::<f64>() {
            if num.is_finite() {
                return CellValue::Number(OrderedFloat(num));
            }
        }

        CellValue::Text(trimmed.to_string())
    }

    pub fn number(n: f64) -> Self {
        CellValue::Number(OrderedFloat(n))
    }

    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Blank)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(n.0),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Display string, used for substring search and CLI output.
    pub fn display_string(&self) -> String {
        match self {
            CellValue::Blank => String::new(),
            CellValue::Bool(b) => if *b { "True" } else { "False" }.to_string(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", n.0 as i64)
                } else {
                    format!("{}", n.0)
                }
            }
            CellValue::Text(s) => s.clone(),
        }
    }

    /// Case-insensitive substring match on the display string.
    pub fn matches_search(&self, search: &str) -> bool {
        self.display_string()
            .to_lowercase()
            .contains(&search.to_lowercase())
    }

    /// Python literal for generated code.
    pub fn to_python_literal(&self) -> String {
        match self {
            CellValue::Blank => "None".to_string(),
            CellValue::Bool(b) => if *b { "True" } else { "False" }.to_string(),
            CellValue::Number(_) => self.display_string(),
            CellValue::Text(s) => python_string_literal(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(OrderedFloat(n))
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(OrderedFloat(n as f64))
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

/// Quote and escape a string as a single-quoted Python literal.
pub fn python_string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_input_inference() {
        assert_eq!(CellValue::from_input(""), CellValue::Blank);
        assert_eq!(CellValue::from_input("   "), CellValue::Blank);
        assert_eq!(CellValue::from_input("TRUE"), CellValue::Bool(true));
        assert_eq!(CellValue::from_input("false"), CellValue::Bool(false));
        assert_eq!(CellValue::from_input("42"), CellValue::number(42.0));
        assert_eq!(CellValue::from_input("-1.5"), CellValue::number(-1.5));
        assert_eq!(CellValue::from_input(" aaron "), CellValue::text("aaron"));
        // NaN / inf stay text so every number is comparable
        assert_eq!(CellValue::from_input("NaN"), CellValue::text("NaN"));
    }

    #[test]
    fn test_json_form_is_raw_value() {
        let values = vec![
            CellValue::Blank,
            CellValue::Bool(true),
            CellValue::number(2.5),
            CellValue::text("x"),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[null,true,2.5,"x"]"#);
    }

    #[test]
    fn test_integer_json_parses_as_number() {
        let v: CellValue = serde_json::from_str("2").unwrap();
        assert_eq!(v, CellValue::number(2.0));
    }

    #[test]
    fn test_display_string() {
        assert_eq!(CellValue::number(3.0).display_string(), "3");
        assert_eq!(CellValue::number(3.25).display_string(), "3.25");
        assert_eq!(CellValue::Bool(false).display_string(), "False");
        assert_eq!(CellValue::Blank.display_string(), "");
    }

    #[test]
    fn test_python_literal_escaping() {
        assert_eq!(CellValue::text("it's").to_python_literal(), r"'it\'s'");
        assert_eq!(CellValue::text("a\\b").to_python_literal(), r"'a\\b'");
        assert_eq!(CellValue::Blank.to_python_literal(), "None");
        assert_eq!(CellValue::number(7.0).to_python_literal(), "7");
    }

    #[test]
    fn test_matches_search_case_insensitive() {
        assert!(CellValue::text("Nate").matches_search("nAT"));
        assert!(CellValue::number(12.0).matches_search("2"));
        assert!(!CellValue::text("jake").matches_search("nat"));
        assert!(CellValue::Blank.matches_search(""));
    }
}
