use std::fmt;

/// The closed vocabulary of the command language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    InputFromFile,
    OutputToFile,
    Select,
    Project,
    Sum,
    Avg,
    SumGroup,
    AvgGroup,
    Join,
    Sort,
    MovAvg,
    MovSum,
    Concat,
    ShowDb,
    /// Reserved: recognised by the parser, never executed.
    Hash,
    /// Reserved: recognised by the parser, never executed.
    Btree,
}

impl CommandKind {
    pub const ALL: [CommandKind; 16] = [
        Self::InputFromFile,
        Self::OutputToFile,
        Self::Select,
        Self::Project,
        Self::Sum,
        Self::Avg,
        Self::SumGroup,
        Self::AvgGroup,
        Self::Join,
        Self::Sort,
        Self::MovAvg,
        Self::MovSum,
        Self::Concat,
        Self::ShowDb,
        Self::Hash,
        Self::Btree,
    ];

    /// Looks a command name up. Names are expected lower-cased.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::InputFromFile => "inputfromfile",
            Self::OutputToFile => "outputtofile",
            Self::Select => "select",
            Self::Project => "project",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::SumGroup => "sumgroup",
            Self::AvgGroup => "avggroup",
            Self::Join => "join",
            Self::Sort => "sort",
            Self::MovAvg => "movavg",
            Self::MovSum => "movsum",
            Self::Concat => "concat",
            Self::ShowDb => "showdb",
            Self::Hash => "hash",
            Self::Btree => "btree",
        }
    }

    /// `select` and `join` carry a condition as their last argument.
    pub fn takes_condition(self) -> bool {
        matches!(self, Self::Select | Self::Join)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One of the six comparison operators of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Gt,
    Lt,
    Eq,
    NotEq,
    GtEq,
    LtEq,
}

impl ComparisonOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::GtEq => ">=",
            Self::LtEq => "<=",
        }
    }

    /// Evaluates `left <op> right`.
    pub fn apply(self, left: i64, right: i64) -> bool {
        match self {
            Self::Gt => left > right,
            Self::Lt => left < right,
            Self::Eq => left == right,
            Self::NotEq => left != right,
            Self::GtEq => left >= right,
            Self::LtEq => left <= right,
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A column reference, optionally qualified by a table name (`table.column`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{table}.{}", self.column),
            None => f.write_str(&self.column),
        }
    }
}

/// One side of a condition, classified once at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Literal(i64),
    Column(ColumnRef),
}

impl Operand {
    /// An operand is a literal iff the whole text parses as an integer.
    pub fn classify(text: &str) -> Self {
        if let Ok(value) = text.parse::<i64>() {
            return Self::Literal(value);
        }
        match text.split_once('.') {
            Some((table, column)) => Self::Column(ColumnRef {
                table: Some(table.to_string()),
                column: column.to_string(),
            }),
            None => Self::Column(ColumnRef {
                table: None,
                column: text.to_string(),
            }),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "{value}"),
            Self::Column(column) => column.fmt(f),
        }
    }
}

/// A parsed binary predicate driving `select` and `join`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub left: Operand,
    pub op: ComparisonOp,
    pub right: Operand,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.left, self.op, self.right)
    }
}

/// The structured form of one command line, before argument validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Name the result is stored under; empty when the line has no `:=` prefix.
    pub target: String,
    pub kind: CommandKind,
    /// Plain arguments, in order. For `select`/`join` the condition is not included.
    pub arguments: Vec<String>,
    pub condition: Option<Condition>,
}

/// Which reduction an aggregate operator applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateMode {
    Sum,
    Avg,
}

impl AggregateMode {
    pub fn name(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Avg => "avg",
        }
    }

    /// Result column name, e.g. `sum(qty)`.
    pub fn column_name(self, source: &str) -> String {
        format!("{}({source})", self.name())
    }
}

/// A fully validated command, one variant per operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    InputFromFile(InputFromFile),
    OutputToFile(OutputToFile),
    Select(Select),
    Project(Project),
    Aggregate(Aggregate),
    GroupAggregate(GroupAggregate),
    MovingAggregate(MovingAggregate),
    Join(Join),
    Sort(Sort),
    Concat(Concat),
    ShowDb,
    Hash { target: String, arguments: Vec<String> },
    Btree { target: String, arguments: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFromFile {
    pub target: String,
    pub path: String,
    pub delimiter: Option<String>,
}

/// `outputtofile(table)` displays the table; with a path it writes a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputToFile {
    pub table: String,
    pub path: Option<String>,
    pub delimiter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub target: String,
    pub table: String,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub target: String,
    pub table: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub target: String,
    pub table: String,
    pub column: String,
    pub mode: AggregateMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupAggregate {
    pub target: String,
    pub table: String,
    pub column: String,
    pub group_by: Vec<String>,
    pub mode: AggregateMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovingAggregate {
    pub target: String,
    pub table: String,
    pub column: String,
    pub window: usize,
    pub mode: AggregateMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub target: String,
    pub left: String,
    pub right: String,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub target: String,
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Concat {
    pub target: String,
    pub left: String,
    pub right: String,
}
