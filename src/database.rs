use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::ast::{InputFromFile, OutputToFile, Statement};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::io;
use crate::ops;
use crate::parser::CommandParser;
use crate::table::Table;

/// The query engine: a namespace of named tables plus the dispatch that turns one
/// command line into one operator call.
///
/// Commands run one at a time and every mutation goes through `&mut self`, so a
/// `Database` shared between threads has to sit behind a lock (e.g.
/// `Mutex<Database>`).
#[derive(Debug, Default)]
pub struct Database {
    /// A map of table names to their respective [Table] structures.
    tables: HashMap<String, Table>,
    /// Table names in the order they were first installed.
    order: Vec<String>,
    parser: CommandParser,
    config: EngineConfig,
}

/// What a successful command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A table was installed in the namespace.
    Stored {
        table: String,
        rows: usize,
        columns: usize,
        /// `true` if a table of the same name was replaced.
        replaced: bool,
    },
    /// A human-readable report; the namespace is untouched.
    Report(String),
    /// A table was written to a file.
    Written { path: PathBuf, rows: usize },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stored {
                table,
                rows,
                columns,
                replaced,
            } => {
                let verb = if *replaced { "replaced" } else { "stored" };
                write!(f, "{verb} {table} ({rows} rows, {columns} columns)")
            }
            Self::Report(text) => f.write_str(text.trim_end_matches('\n')),
            Self::Written { path, rows } => write!(f, "wrote {rows} rows to {}", path.display()),
        }
    }
}

/// The result of one line of a script run with [Database::execute_script].
#[derive(Debug)]
pub struct ScriptEntry {
    /// 1-based line number in the script.
    pub line_no: usize,
    pub line: String,
    pub result: Result<Outcome>,
}

impl Database {
    /// Creates a new, empty database instance with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Retrieves a reference to a table by name.
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Like [Database::get_table] but reports a missing table as an error.
    pub fn table(&self, name: &str) -> Result<&Table> {
        self.get_table(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    /// All tables, in the order their names were first installed.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.order.iter().filter_map(|name| self.tables.get(name))
    }

    /// Returns the names of all tables, in installation order.
    pub fn list_tables(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Installs `table` under its own name, returning the table it replaced.
    pub fn insert_table(&mut self, table: Table) -> Option<Table> {
        info!(
            table = %table.name,
            rows = table.row_count(),
            columns = table.column_count(),
            "installing table"
        );
        let name = table.name.clone();
        let previous = self.tables.insert(name.clone(), table);
        if previous.is_none() {
            self.order.push(name);
        }
        previous
    }

    fn install(&mut self, table: Table) -> Outcome {
        let (rows, columns) = (table.row_count(), table.column_count());
        let name = table.name.clone();
        let replaced = self.insert_table(table).is_some();
        Outcome::Stored {
            table: name,
            rows,
            columns,
            replaced,
        }
    }

    /// Parses and runs one command line.
    ///
    /// On error the namespace is left exactly as it was before the call.
    ///
    /// # Example
    /// ```
    /// # use relq::Database;
    /// let mut db = Database::new();
    /// let s = relq::Table::from_rows("s", vec!["a".into()], vec![vec![1], vec![5]]).unwrap();
    /// db.insert_table(s);
    ///
    /// db.execute("r := select(s, a > 2)").unwrap();
    /// assert_eq!(db.get_table("r").unwrap().rows(), vec![vec![5]]);
    ///
    /// assert!(db.execute("x := select(missing, a > 2)").is_err());
    /// assert_eq!(db.len(), 2);
    /// ```
    pub fn execute(&mut self, line: &str) -> Result<Outcome> {
        let statement = self.parser.parse_statement(line)?;
        debug!(?statement, "parsed command");
        self.run(statement)
    }

    /// Runs an already validated statement.
    pub fn run(&mut self, statement: Statement) -> Result<Outcome> {
        let table = match statement {
            Statement::InputFromFile(input) => return self.input_from_file(input),
            Statement::OutputToFile(output) => return self.output_to_file(output),
            Statement::ShowDb => return Ok(Outcome::Report(self.show_db())),
            Statement::Hash { target, arguments } => {
                return Err(reserved("hash", &target, &arguments));
            }
            Statement::Btree { target, arguments } => {
                return Err(reserved("btree", &target, &arguments));
            }

            Statement::Select(select) => {
                ops::select(self.table(&select.table)?, &select.target, &select.condition)?
            }
            Statement::Project(project) => {
                ops::project(self.table(&project.table)?, &project.target, &project.columns)?
            }
            Statement::Aggregate(agg) => ops::aggregate(
                self.table(&agg.table)?,
                &agg.target,
                &agg.column,
                agg.mode,
            )?,
            Statement::GroupAggregate(agg) => ops::group_aggregate(
                self.table(&agg.table)?,
                &agg.target,
                &agg.column,
                &agg.group_by,
                agg.mode,
            )?,
            Statement::MovingAggregate(agg) => ops::moving_aggregate(
                self.table(&agg.table)?,
                &agg.target,
                &agg.column,
                agg.window,
                agg.mode,
            )?,
            Statement::Join(join) => ops::join(
                self.table(&join.left)?,
                self.table(&join.right)?,
                &join.target,
                &join.condition,
            )?,
            Statement::Sort(sort) => {
                ops::sort(self.table(&sort.table)?, &sort.target, &sort.column)?
            }
            Statement::Concat(concat) => ops::concat(
                self.table(&concat.left)?,
                self.table(&concat.right)?,
                &concat.target,
            )?,
        };

        debug!(
            table = %table.name,
            rows = table.row_count(),
            columns = table.column_count(),
            "operator finished"
        );
        Ok(self.install(table))
    }

    fn input_from_file(&mut self, input: InputFromFile) -> Result<Outcome> {
        let path = self.config.resolve(&input.path);
        let raw = io::read_file(&path, input.delimiter.as_deref())?;
        let table = Table::from_rows(input.target, raw.columns, raw.rows)?;

        if self.tables.contains_key(&table.name) {
            warn!(
                table = %table.name,
                path = %path.display(),
                "table already exists, replacing it"
            );
        }
        Ok(self.install(table))
    }

    fn output_to_file(&self, output: OutputToFile) -> Result<Outcome> {
        let table = self.table(&output.table)?;
        let Some(path) = output.path else {
            return Ok(Outcome::Report(table.to_string()));
        };

        let path = self.config.resolve(&path);
        let delimiter = output
            .delimiter
            .as_deref()
            .unwrap_or(&self.config.default_delimiter);
        io::write_file(&path, &table.column_names(), &table.rows(), delimiter)?;

        Ok(Outcome::Written {
            path,
            rows: table.row_count(),
        })
    }

    /// Describes the namespace: the number of tables, then one line per table with
    /// its shape and approximate heap footprint.
    pub fn show_db(&self) -> String {
        if self.is_empty() {
            return "there is no table in the database\n".to_string();
        }

        let mut report = format!("{} table(s)\n", self.len());
        for table in self.tables() {
            let bytes = allocative::size_of_unique_allocated_data(table);
            report.push_str(&format!(
                "{}: {} rows, {} columns, {bytes} bytes\n",
                table.name,
                table.row_count(),
                table.column_count()
            ));
        }
        report
    }

    /// Runs one line of a script. Blank lines and lines starting with `//` or `#`
    /// carry no command and yield `None`.
    pub fn execute_line(&mut self, line_no: usize, line: &str) -> Option<ScriptEntry> {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") || line.starts_with('#') {
            return None;
        }
        Some(ScriptEntry {
            line_no,
            line: line.to_string(),
            result: self.execute(line),
        })
    }

    /// Runs every line of `script` in order.
    ///
    /// A failing line is logged and recorded; it never stops the lines after it.
    pub fn execute_script(&mut self, script: &str) -> Vec<ScriptEntry> {
        let mut entries = Vec::new();

        for (idx, line) in script.lines().enumerate() {
            let Some(entry) = self.execute_line(idx + 1, line) else {
                continue;
            };
            if let Err(err) = &entry.result {
                warn!(
                    line_no = entry.line_no,
                    line = %entry.line,
                    error = %err,
                    "command failed"
                );
            }
            entries.push(entry);
        }

        entries
    }
}

/// `hash` and `btree` are recognised but have no engine behind them.
fn reserved(command: &str, target: &str, arguments: &[String]) -> Error {
    let call = format!("{command}({})", arguments.join(","));
    if target.is_empty() {
        Error::NotImplemented(call)
    } else {
        Error::NotImplemented(format!("{target} := {call}"))
    }
}
