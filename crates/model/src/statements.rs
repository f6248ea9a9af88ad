use anyhow::Context as _;
use rusqlite::Connection;

/// SQL statements run against the store once at startup.
///
/// Each entry is either a raw SQL statement or `@<file>`, naming a file whose
/// contents are executed as a batch.
#[derive(Clone, Debug, Default)]
pub struct SqlStatements {
    sql_statements: Vec<String>,
}

impl SqlStatements {
    /// Creates a new set of startup statements.
    pub fn new(sql_statements: Vec<String>) -> Self {
        Self { sql_statements }
    }

    /// Returns true if there is nothing to run.
    pub fn is_empty(&self) -> bool {
        self.sql_statements.is_empty()
    }

    /// Executes the statements in order, stopping at the first failure.
    pub fn execute(&self, connection: &Connection) -> anyhow::Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        for statement in &self.sql_statements {
            if let Some(config) = statement.strip_prefix('@') {
                let file = parse_file(config)?;
                let sql = std::fs::read_to_string(file).with_context(|| {
                    format!("could not read file '{file}' containing sql statements")
                })?;
                connection
                    .execute_batch(&sql)
                    .with_context(|| format!("failed to execute sql from file '{file}'"))?;
                tracing::info!("Executed sql statements from '{file}'");
            } else {
                connection.execute_batch(statement).with_context(|| {
                    format!("failed to execute following sql statement: '{statement}'")
                })?;
                tracing::debug!("Executed sql statement '{statement}'");
            }
        }
        Ok(())
    }
}

/// Parses the file part of a `@<file>` statement.
fn parse_file(config: &str) -> anyhow::Result<&str> {
    let file = config.trim();
    if file.is_empty() {
        anyhow::bail!("file path is empty in the '@{config}' sqlite statement");
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{count_rsvps, create_store, DatabaseLocation};
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_parse_file() {
        assert_eq!(parse_file("seed.sql").unwrap(), "seed.sql");
        assert_eq!(parse_file("  seed.sql ").unwrap(), "seed.sql");
        assert!(parse_file("").is_err());
        assert!(parse_file("   ").is_err());
    }

    #[test]
    fn test_execute() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let connection = create_store(&DatabaseLocation::new(dir.path().join("rsvp.db")))?;

        let seed = NamedTempFile::new()?;
        std::fs::write(
            &seed,
            "INSERT INTO rsvp (name, email, event) VALUES ('Grace', 'grace@x.com', 'Launch');
             INSERT INTO rsvp (name, email, event) VALUES ('Linus', 'linus@x.com', 'Launch');",
        )?;

        let statements = SqlStatements::new(vec![
            "INSERT INTO rsvp (name, email, event) VALUES ('Ada', 'ada@x.com', 'Launch')".into(),
            format!("@{}", seed.path().display()),
        ]);
        assert!(!statements.is_empty());
        statements.execute(&connection)?;

        assert_eq!(count_rsvps(&connection)?, 3);
        Ok(())
    }

    #[test]
    fn test_execute_nothing() -> anyhow::Result<()> {
        let statements = SqlStatements::default();
        assert!(statements.is_empty());
        // No schema needed when there is nothing to run.
        statements.execute(&Connection::open_in_memory()?)?;
        Ok(())
    }

    #[test]
    fn test_execute_stops_on_failure() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let connection = create_store(&DatabaseLocation::new(dir.path().join("rsvp.db")))?;

        let statements = SqlStatements::new(vec![
            "INSERT INTO nope VALUES (1)".into(),
            "INSERT INTO rsvp (name, email, event) VALUES ('Ada', 'ada@x.com', 'Launch')".into(),
        ]);
        let err = statements.execute(&connection).unwrap_err();
        assert!(err.to_string().contains("INSERT INTO nope"));
        assert_eq!(count_rsvps(&connection)?, 0);

        let missing = SqlStatements::new(vec![format!(
            "@{}",
            dir.path().join("missing.sql").display()
        )]);
        assert!(missing.execute(&connection).is_err());
        Ok(())
    }
}
