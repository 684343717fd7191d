//! Store connection configuration
//!
//! Read once from the environment at startup and passed explicitly into
//! the loader, so the pipeline can be exercised with an injected config.

use std::env;

use anyhow::{Context, Result, bail};

/// Table updated when `DB_TABLE` is not set
const DEFAULT_TABLE: &str = "etl_demo";

/// Connection parameters for the persisted table
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub table: String,
}

impl StoreConfig {
    /// Build from `DB_HOST`, `DB_USER`, `DB_PASSWORD`, `DB_NAME` and the
    /// optional `DB_TABLE`
    pub fn from_env() -> Result<Self> {
        let config = Self {
            host: require_var("DB_HOST")?,
            user: require_var("DB_USER")?,
            password: require_var("DB_PASSWORD")?,
            database: require_var("DB_NAME")?,
            table: env::var("DB_TABLE").unwrap_or_else(|_| DEFAULT_TABLE.to_string()),
        };
        // The table name is interpolated into statements (it cannot be
        // bound), so it must be a plain identifier
        validate_table_name(&config.table)?;
        Ok(config)
    }
}

fn require_var(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("Missing required environment variable: {}", name))
}

/// Accept only plain SQL identifiers: ASCII letters, digits and
/// underscores, not starting with a digit
pub fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if !valid {
        bail!("Invalid table name: {:?}", name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_table_names() {
        assert!(validate_table_name("etl_demo").is_ok());
        assert!(validate_table_name("_staging2").is_ok());
        assert!(validate_table_name("ApplicationStatus").is_ok());
    }

    #[test]
    fn test_invalid_table_names() {
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("2fast").is_err());
        assert!(validate_table_name("app status").is_err());
        assert!(validate_table_name("x; DROP TABLE y").is_err());
        assert!(validate_table_name("demo`").is_err());
    }
}
