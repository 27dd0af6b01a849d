pub mod ast;
pub mod column;
pub mod config;
pub mod database;
pub mod error;
pub mod io;
pub mod ops;
pub mod parser;
pub mod table;
pub mod tokenizer;

pub use ast::{AggregateMode, Command, CommandKind, ComparisonOp, Condition, Operand, Statement};
pub use column::Column;
pub use config::EngineConfig;
pub use database::{Database, Outcome, ScriptEntry};
pub use error::{Error, ErrorCategory, Result};
pub use parser::CommandParser;
pub use table::Table;
