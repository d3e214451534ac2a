/// parse task documents with structure like "title1 key1: value1, value2 key2: value3 title2 key3: value4"
/// into titled sections of key -> list of typed values. Lines starting with //, #, % or ; are comments.
///
/// ```text
/// search
///   hmin: 0.001
///   hmax: 7.1
/// methods
///   names: FE, RK44, SSP104
/// ```
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, alphanumeric1, multispace0, space0},
    combinator::{map, map_res, recognize},
    multi::{many0, many1, separated_list0},
    sequence::{delimited, pair, separated_pair, terminated},
};
use std::collections::HashMap;
use std::fmt;
use std::fs;

pub type SectionMap = HashMap<String, Vec<Value>>;
pub type DocumentMap = HashMap<String, SectionMap>;

/// enum to represent different value types:
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Float(f64),
    Integer(i64),
    Boolean(bool),
}

impl Value {
    pub fn as_string(&self) -> Option<&String> {
        if let Value::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    /// integers are accepted where a float is expected ("7" is a valid step size)
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        if let Value::Boolean(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Float(_) => "float",
            Value::Integer(_) => "integer",
            Value::Boolean(_) => "boolean",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Float(val) => write!(f, "{}", val),
            Value::Integer(val) => write!(f, "{}", val),
            Value::Boolean(val) => write!(f, "{}", val),
        }
    }
}

/// Error types for reading a task document
#[derive(Debug, Clone, PartialEq)]
pub enum TaskError {
    Io(String),
    Parse(String),
    UnknownSection(String),
    UnknownKey { section: String, key: String },
    TypeMismatch {
        section: String,
        key: String,
        expected: &'static str,
        found: String,
    },
    WrongLength {
        section: String,
        key: String,
        expected: usize,
        found: usize,
    },
    Invalid(String),
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaskError::Io(msg) => write!(f, "cannot read task file: {}", msg),
            TaskError::Parse(msg) => write!(f, "Parsing error: {}", msg),
            TaskError::UnknownSection(s) => write!(f, "unknown section '{}'", s),
            TaskError::UnknownKey { section, key } => {
                write!(f, "unknown key '{}' in section '{}'", key, section)
            }
            TaskError::TypeMismatch {
                section,
                key,
                expected,
                found,
            } => write!(
                f,
                "{}.{}: expected {}, found {}",
                section, key, expected, found
            ),
            TaskError::WrongLength {
                section,
                key,
                expected,
                found,
            } => write!(
                f,
                "{}.{}: expected {} value(s), found {}",
                section, key, expected, found
            ),
            TaskError::Invalid(msg) => write!(f, "invalid task: {}", msg),
        }
    }
}

impl std::error::Error for TaskError {}

/// Parses a title or a key (word characters without spaces)
fn parse_identifier(input: &str) -> IResult<&str, String> {
    let parser = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));
    let mut parser = map(parser, String::from);
    parser.parse(input)
}

fn parse_title(input: &str) -> IResult<&str, String> {
    let (input, result) = parse_identifier(input)?;
    Ok((input.trim(), result))
}

fn parse_value(input: &str) -> IResult<&str, Value> {
    // a single value runs up to a comma, whitespace or semicolon
    let value_parser = take_while1(|c: char| !matches!(c, ',' | ' ' | '\t' | '\n' | '\r' | ';'));
    let mut value_parser = map_res(value_parser, |s: &str| -> Result<Value, String> {
        let s = s.trim();
        if let Ok(val) = s.parse::<i64>() {
            Ok(Value::Integer(val))
        } else if let Ok(val) = s.parse::<f64>() {
            Ok(Value::Float(val))
        } else if let Ok(val) = s.parse::<bool>() {
            Ok(Value::Boolean(val))
        } else {
            Ok(Value::String(s.to_string()))
        }
    });
    value_parser.parse(input)
}

fn parse_value_list(input: &str) -> IResult<&str, Vec<Value>> {
    let (input, _) = space0(input)?;
    let separator_coma = delimited(space0, tag(","), space0);
    let mut value_parser = separated_list0(separator_coma, parse_value);
    value_parser.parse(input)
}

/// Parses "key: v1, v2"
fn parse_key_value_pair(input: &str) -> IResult<&str, (String, Vec<Value>)> {
    let colon_separator = delimited(space0, tag(":"), space0);
    let mut parser = separated_pair(parse_identifier, colon_separator, parse_value_list);
    let (input, result) = parser.parse(input)?;
    Ok((input.trim(), result))
}

/// Parses a section with a title and one or more key-value pairs
fn parse_section(input: &str) -> IResult<&str, (String, SectionMap)> {
    let (input, _) = space0(input)?;
    let (input, title) = parse_title(input)?;
    let (input, _) = multispace0(input)?;
    let mut parser = many1(terminated(parse_key_value_pair, space0));
    let (input, pairs) = parser.parse(input)?;
    let section_map: SectionMap = pairs.into_iter().collect();
    Ok((input, (title, section_map)))
}

/// Drops comment lines (starting with //, #, % or ;) and blank lines
fn filter_comments(input: &str) -> String {
    input
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("//")
                && !trimmed.starts_with('#')
                && !trimmed.starts_with('%')
                && !trimmed.starts_with(';')
                && !trimmed.is_empty()
        })
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Parses the entire document into a map of sections
pub fn parse_document(input: &str) -> IResult<&str, DocumentMap> {
    let mut parser = many1(delimited(multispace0, parse_section, multispace0));
    let (input, sections) = parser.parse(input)?;
    Ok((input, sections.into_iter().collect()))
}

/// Parsed task document with typed accessors
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDocument {
    sections: DocumentMap,
}

impl TaskDocument {
    pub fn parse(input: &str) -> Result<TaskDocument, TaskError> {
        let filtered = filter_comments(input);
        match parse_document(&filtered) {
            Ok((remaining, sections)) => {
                if !remaining.trim().is_empty() {
                    return Err(TaskError::Parse(format!(
                        "failed to parse entire document, remaining: '{}'",
                        remaining
                    )));
                }
                Ok(TaskDocument { sections })
            }
            Err(e) => Err(TaskError::Parse(format!("{:?}", e))),
        }
    }

    pub fn from_file(path: &str) -> Result<TaskDocument, TaskError> {
        let content = fs::read_to_string(path).map_err(|e| TaskError::Io(format!("{}: {}", path, e)))?;
        TaskDocument::parse(&content)
    }

    /// section titles in sorted order
    pub fn section_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sections.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    pub fn values(&self, section: &str, key: &str) -> Option<&Vec<Value>> {
        self.sections.get(section).and_then(|s| s.get(key))
    }

    /// every key of `section` must be one of `allowed`
    pub fn check_keys(&self, section: &str, allowed: &[&str]) -> Result<(), TaskError> {
        if let Some(map) = self.sections.get(section) {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                if !allowed.contains(&key.as_str()) {
                    return Err(TaskError::UnknownKey {
                        section: section.to_string(),
                        key: key.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn mismatch(section: &str, key: &str, expected: &'static str, found: &Value) -> TaskError {
        TaskError::TypeMismatch {
            section: section.to_string(),
            key: key.to_string(),
            expected,
            found: format!("{} '{}'", found.type_name(), found),
        }
    }

    fn single(&self, section: &str, key: &str) -> Result<Option<&Value>, TaskError> {
        match self.values(section, key) {
            None => Ok(None),
            Some(values) if values.len() == 1 => Ok(Some(&values[0])),
            Some(values) => Err(TaskError::WrongLength {
                section: section.to_string(),
                key: key.to_string(),
                expected: 1,
                found: values.len(),
            }),
        }
    }

    pub fn get_float(&self, section: &str, key: &str) -> Result<Option<f64>, TaskError> {
        match self.single(section, key)? {
            None => Ok(None),
            Some(v) => v
                .as_float()
                .map(Some)
                .ok_or_else(|| Self::mismatch(section, key, "number", v)),
        }
    }

    pub fn get_integer(&self, section: &str, key: &str) -> Result<Option<i64>, TaskError> {
        match self.single(section, key)? {
            None => Ok(None),
            Some(v) => v
                .as_integer()
                .map(Some)
                .ok_or_else(|| Self::mismatch(section, key, "integer", v)),
        }
    }

    pub fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, TaskError> {
        match self.single(section, key)? {
            None => Ok(None),
            Some(v) => v
                .as_boolean()
                .map(Some)
                .ok_or_else(|| Self::mismatch(section, key, "boolean", v)),
        }
    }

    /// any single value read back as text (file names may look like numbers)
    pub fn get_string(&self, section: &str, key: &str) -> Result<Option<String>, TaskError> {
        Ok(self.single(section, key)?.map(|v| v.to_string()))
    }

    pub fn get_float_list(&self, section: &str, key: &str) -> Result<Option<Vec<f64>>, TaskError> {
        match self.values(section, key) {
            None => Ok(None),
            Some(values) => values
                .iter()
                .map(|v| v.as_float().ok_or_else(|| Self::mismatch(section, key, "number", v)))
                .collect::<Result<Vec<f64>, TaskError>>()
                .map(Some),
        }
    }

    pub fn get_string_list(&self, section: &str, key: &str) -> Option<Vec<String>> {
        self.values(section, key)
            .map(|values| values.iter().map(|v| v.to_string()).collect())
    }
}

/////////////////////////////TESTS////////////////////////////////////////////////////
#[cfg(test)]
mod tests_task_parser {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_parse_title_and_key() {
        let (remaining, title) = parse_title("tableau_SSP75\n a: 1").unwrap();
        assert_eq!(title, "tableau_SSP75");
        assert_eq!(remaining, "a: 1");

        let (remaining, key) = parse_identifier("validate_bracket: true").unwrap();
        assert_eq!(key, "validate_bracket");
        assert_eq!(remaining, ": true");
    }

    #[test]
    fn test_parse_value() {
        let (remaining, value) = parse_value("SSP22star, RK44").unwrap();
        assert_eq!(value, Value::String("SSP22star".to_string()));
        assert_eq!(remaining, ", RK44");

        let (_, value) = parse_value("100").unwrap();
        assert_eq!(value, Value::Integer(100));

        let (_, value) = parse_value("1e-8").unwrap();
        assert_eq!(value, Value::Float(1e-8));

        let (_, value) = parse_value("-0.5;").unwrap();
        assert_eq!(value, Value::Float(-0.5));

        let (_, value) = parse_value("false").unwrap();
        assert_eq!(value, Value::Boolean(false));
    }

    #[test]
    fn test_parse_key_value_pair() {
        let (remaining, (key, values)) = parse_key_value_pair("b : 0.25 , 0, 0.75").unwrap();
        assert_eq!(key, "b");
        assert_eq!(
            values,
            vec![Value::Float(0.25), Value::Integer(0), Value::Float(0.75)]
        );
        assert_eq!(remaining, "");

        let (remaining, (key, values)) = parse_key_value_pair("names:").unwrap();
        assert_eq!(key, "names");
        assert!(values.is_empty());
        assert_eq!(remaining, "");
    }

    #[test]
    fn test_parse_section() {
        let input = "search hmin: 0.001 hmax: 7.1 problem T: 100";
        let (remaining, (title, map)) = parse_section(input).unwrap();
        assert_eq!(title, "search");
        assert_eq!(map.len(), 2);
        assert_eq!(map["hmax"], vec![Value::Float(7.1)]);
        assert_eq!(remaining, "problem T: 100");
    }

    #[test]
    fn test_parse_document_multiline() {
        let input = "search\n  hmin: 0.001\n  eps: 0.0005\n\n\nmethods\n  names: FE, RK44\n";
        let (remaining, doc) = parse_document(input).unwrap();
        assert_eq!(remaining, "");
        assert_eq!(doc.len(), 2);
        assert_eq!(doc["search"]["eps"], vec![Value::Float(0.0005)]);
        assert_eq!(
            doc["methods"]["names"],
            vec![
                Value::String("FE".to_string()),
                Value::String("RK44".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_document_empty() {
        assert!(parse_document("").is_err());
        assert!(TaskDocument::parse("// only a comment\n").is_err());
    }

    #[test]
    fn test_comments_are_dropped() {
        let input = "# experiment settings\nsearch\n  // bracket\n  hmax: 7\n; trailing note\n";
        let doc = TaskDocument::parse(input).unwrap();
        assert_eq!(doc.section_names(), vec!["search"]);
        assert_eq!(doc.get_float("search", "hmax").unwrap(), Some(7.0));
    }

    #[test]
    fn test_malformed_document() {
        let result = TaskDocument::parse("search\n hmin: 0.001, \n invalid structure");
        assert!(matches!(result, Err(TaskError::Parse(_))));
    }

    #[test]
    fn test_typed_accessors() {
        let input = "search\n hmin: 0.001\n validate_bracket: true\n\
                     output\n csv: results.csv\n loglevel: debug\n\
                     tableau_FE\n a:\n b: 1\n order: 1\n\
                     problem\n u0: 1e-8, 0.99999999";
        let doc = TaskDocument::parse(input).unwrap();
        assert_eq!(doc.get_float("search", "hmin").unwrap(), Some(0.001));
        assert_eq!(doc.get_float("search", "hmax").unwrap(), None);
        assert_eq!(doc.get_bool("search", "validate_bracket").unwrap(), Some(true));
        assert_eq!(
            doc.get_string("output", "csv").unwrap(),
            Some("results.csv".to_string())
        );
        assert_eq!(doc.get_integer("tableau_FE", "order").unwrap(), Some(1));
        assert_eq!(doc.get_float_list("tableau_FE", "a").unwrap(), Some(vec![]));
        assert_eq!(
            doc.get_float_list("problem", "u0").unwrap(),
            Some(vec![1e-8, 0.99999999])
        );

        let err = doc.get_float("output", "loglevel").unwrap_err();
        assert!(matches!(err, TaskError::TypeMismatch { expected: "number", .. }));
        let err = doc.get_float("problem", "u0").unwrap_err();
        assert_eq!(
            err,
            TaskError::WrongLength {
                section: "problem".to_string(),
                key: "u0".to_string(),
                expected: 1,
                found: 2
            }
        );
    }

    #[test]
    fn test_check_keys() {
        let doc = TaskDocument::parse("search\n hmin: 0.001\n hmax_typo: 7.1").unwrap();
        assert!(doc.check_keys("search", &["hmin", "hmax_typo"]).is_ok());
        let err = doc.check_keys("search", &["hmin", "hmax"]).unwrap_err();
        assert_eq!(
            err,
            TaskError::UnknownKey {
                section: "search".to_string(),
                key: "hmax_typo".to_string()
            }
        );
        // absent sections have nothing to reject
        assert!(doc.check_keys("output", &[]).is_ok());
    }

    #[test]
    fn test_parse_document_from_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("task.txt");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "methods").unwrap();
        writeln!(file, "  names: FE, SSP104").unwrap();
        writeln!(file, "output").unwrap();
        writeln!(file, "  table: false").unwrap();

        let doc = TaskDocument::from_file(file_path.to_str().unwrap()).unwrap();
        assert_eq!(doc.section_names(), vec!["methods", "output"]);
        assert_eq!(
            doc.get_string_list("methods", "names").unwrap(),
            vec!["FE".to_string(), "SSP104".to_string()]
        );
        assert_eq!(doc.get_bool("output", "table").unwrap(), Some(false));

        let missing = dir.path().join("missing.txt");
        assert!(matches!(
            TaskDocument::from_file(missing.to_str().unwrap()),
            Err(TaskError::Io(_))
        ));
    }
}
