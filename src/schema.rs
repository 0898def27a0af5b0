use crate::config::SchemaConfig;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Catalog DDL handed to the model verbatim. Mirrors the production parts
/// database: manufacturers, vehicle models, and the parts fitted to them.
pub const DEFAULT_SCHEMA: &str = r#"CREATE TABLE makes (
    make_id INTEGER PRIMARY KEY,
    name VARCHAR(100) NOT NULL UNIQUE
);

CREATE TABLE models (
    model_id INTEGER PRIMARY KEY,
    make_id INTEGER NOT NULL REFERENCES makes(make_id),
    name VARCHAR(100) NOT NULL,
    year_from SMALLINT,
    year_to SMALLINT,
    body_style VARCHAR(50),
    UNIQUE (make_id, name, year_from, year_to)
);

CREATE TABLE parts_info (
    part_id INTEGER PRIMARY KEY,
    model_id INTEGER NOT NULL REFERENCES models(model_id),
    part_number VARCHAR(50) NOT NULL,
    part_name VARCHAR(100) NOT NULL,
    description VARCHAR(500),
    category VARCHAR(50),
    price DECIMAL(10, 2),
    UNIQUE (model_id, part_number)
);"#;

#[derive(Debug)]
pub enum SchemaError {
    Missing,
    Unreadable(String),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::Missing => {
                write!(f, "no schema configured: set schema.text or schema.file")
            }
            SchemaError::Unreadable(msg) => write!(f, "failed to read schema file: {}", msg),
        }
    }
}

impl Error for SchemaError {}

/// Immutable description of the target relational schema, resolved once at
/// startup and shared read-only by every request.
#[derive(Debug, Clone)]
pub struct SchemaDescriptor {
    text: Arc<str>,
}

impl SchemaDescriptor {
    /// Resolves the schema text: inline config value wins, then a file path,
    /// otherwise startup fails. An effectively empty schema is treated the
    /// same as a missing one.
    pub fn from_config(config: &SchemaConfig) -> Result<Self, SchemaError> {
        let text = if let Some(inline) = &config.text {
            inline.clone()
        } else if let Some(path) = &config.file {
            std::fs::read_to_string(path).map_err(|e| SchemaError::Unreadable(e.to_string()))?
        } else {
            return Err(SchemaError::Missing);
        };

        if text.trim().is_empty() {
            return Err(SchemaError::Missing);
        }

        Ok(Self { text: text.into() })
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_text_wins_over_file() {
        let config = SchemaConfig {
            text: Some("CREATE TABLE t (x INTEGER);".to_string()),
            file: Some("does-not-exist.sql".into()),
        };
        let schema = SchemaDescriptor::from_config(&config).unwrap();
        assert_eq!(schema.text(), "CREATE TABLE t (x INTEGER);");
    }

    #[test]
    fn missing_configuration_is_fatal() {
        let config = SchemaConfig {
            text: None,
            file: None,
        };
        assert!(matches!(
            SchemaDescriptor::from_config(&config),
            Err(SchemaError::Missing)
        ));
    }

    #[test]
    fn unreadable_file_reports_the_io_error() {
        let config = SchemaConfig {
            text: None,
            file: Some("/nonexistent/parts.sql".into()),
        };
        assert!(matches!(
            SchemaDescriptor::from_config(&config),
            Err(SchemaError::Unreadable(_))
        ));
    }

    #[test]
    fn whitespace_only_text_counts_as_missing() {
        let config = SchemaConfig {
            text: Some("   \n\t".to_string()),
            file: None,
        };
        assert!(matches!(
            SchemaDescriptor::from_config(&config),
            Err(SchemaError::Missing)
        ));
    }

    #[test]
    fn repeated_reads_return_identical_text() {
        let config = SchemaConfig {
            text: Some(DEFAULT_SCHEMA.to_string()),
            file: None,
        };
        let schema = SchemaDescriptor::from_config(&config).unwrap();
        let first = schema.text().to_string();
        assert_eq!(schema.text(), first);
        assert_eq!(schema.clone().text(), first);
    }
}
