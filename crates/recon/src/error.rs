use std::fmt;

#[derive(Debug)]
pub enum CompareError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad threshold, missing input, etc.).
    ConfigValidation(String),
    /// Missing required column in an input file.
    MissingColumn { file: String, column: String },
    /// A field value that should parse as a number or flag did not.
    FieldParse {
        file: String,
        record: String,
        field: &'static str,
        value: String,
    },
    /// CSV-level read error.
    Csv { file: String, message: String },
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for CompareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { file, column } => {
                write!(f, "{file}: missing column '{column}'")
            }
            Self::FieldParse {
                file,
                record,
                field,
                value,
            } => {
                write!(f, "{file}, record '{record}': cannot parse {field} '{value}'")
            }
            Self::Csv { file, message } => write!(f, "{file}: {message}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for CompareError {}
