//! Externalized statement text for the page backend.
//!
//! The seven statements are loaded from a JSON object keyed by statement
//! name, either from a file or from the defaults bundled for each driver.
//! Switching backends therefore needs no code change, only a different
//! statement set.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use super::config::{ConfigError, Driver};

const SQLITE_STATEMENTS: &str = include_str!("../../sql/sqlite.json");
const POSTGRES_STATEMENTS: &str = include_str!("../../sql/postgres.json");

/// Names of the statements the backend executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statement {
    CreatePagesTable,
    AllPages,
    GetPageById,
    GetPageByName,
    CreatePage,
    SavePage,
    DeletePage,
}

impl Statement {
    /// Key of the statement in a statement file.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Statement::CreatePagesTable => "create-pages-table",
            Statement::AllPages => "all-pages",
            Statement::GetPageById => "get-page-by-id",
            Statement::GetPageByName => "get-page-by-name",
            Statement::CreatePage => "create-page",
            Statement::SavePage => "save-page",
            Statement::DeletePage => "delete-page",
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The full statement set. Every key is required.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SqlStatements {
    create_pages_table: String,
    all_pages: String,
    get_page_by_id: String,
    get_page_by_name: String,
    create_page: String,
    save_page: String,
    delete_page: String,
}

impl SqlStatements {
    /// Statements bundled with the server for the given driver.
    ///
    /// # Panics
    ///
    /// Panics if a bundled statement file is malformed, which is caught by
    /// this module's tests.
    #[must_use]
    pub fn bundled(driver: Driver) -> Self {
        let source = match driver {
            Driver::Sqlite => SQLITE_STATEMENTS,
            Driver::Postgres => POSTGRES_STATEMENTS,
        };
        serde_json::from_str(source).expect("bundled statement file is valid")
    }

    /// Loads statements from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, lacks
    /// a statement, or names an unknown one.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadStatements {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::ParseStatements {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Text of the given statement.
    #[must_use]
    pub fn get(&self, statement: Statement) -> &str {
        match statement {
            Statement::CreatePagesTable => &self.create_pages_table,
            Statement::AllPages => &self.all_pages,
            Statement::GetPageById => &self.get_page_by_id,
            Statement::GetPageByName => &self.get_page_by_name,
            Statement::CreatePage => &self.create_page,
            Statement::SavePage => &self.save_page,
            Statement::DeletePage => &self.delete_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const ALL: [Statement; 7] = [
        Statement::CreatePagesTable,
        Statement::AllPages,
        Statement::GetPageById,
        Statement::GetPageByName,
        Statement::CreatePage,
        Statement::SavePage,
        Statement::DeletePage,
    ];

    #[test]
    fn bundled_sets_define_every_statement() {
        for driver in [Driver::Sqlite, Driver::Postgres] {
            let statements = SqlStatements::bundled(driver);
            for statement in ALL {
                assert!(
                    !statements.get(statement).trim().is_empty(),
                    "{} missing for {}",
                    statement,
                    driver.as_str()
                );
            }
        }
    }

    #[test]
    fn postgres_uses_numbered_placeholders() {
        let statements = SqlStatements::bundled(Driver::Postgres);
        assert!(statements.get(Statement::SavePage).contains("$3"));
        assert!(!statements.get(Statement::SavePage).contains('?'));
    }

    #[test]
    fn mutations_skip_deleted_pages() {
        for driver in [Driver::Sqlite, Driver::Postgres] {
            let statements = SqlStatements::bundled(driver);
            assert!(statements
                .get(Statement::SavePage)
                .contains("delete_date IS NULL"));
            assert!(statements
                .get(Statement::DeletePage)
                .contains("delete_date IS NULL"));
        }
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SQLITE_STATEMENTS.as_bytes()).unwrap();

        let statements = SqlStatements::from_file(file.path()).unwrap();
        assert_eq!(
            statements.get(Statement::AllPages),
            SqlStatements::bundled(Driver::Sqlite).get(Statement::AllPages)
        );
    }

    #[test]
    fn missing_statement_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{ "all-pages": "SELECT id, name FROM pages" }"#)
            .unwrap();

        let err = SqlStatements::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseStatements { .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = SqlStatements::from_file(Path::new("/nonexistent/db-queries.json")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadStatements { .. }));
    }

    #[test]
    fn statement_keys_are_kebab_case() {
        assert_eq!(Statement::CreatePagesTable.key(), "create-pages-table");
        assert_eq!(Statement::DeletePage.to_string(), "delete-page");
    }
}
