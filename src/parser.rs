use crate::ast::*;
use crate::error::{Error, Result};
use crate::tokenizer::{Token, Tokenizer};

/// Turns one line of command text into a [Command].
///
/// The parser holds no state between calls: every call to [CommandParser::parse]
/// tokenizes and parses the line from scratch.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandParser;

impl CommandParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses `[<result> :=] <command>(<args>)`.
    ///
    /// # Errors
    /// Returns a parse error for malformed text, an unknown command name, or a
    /// `select`/`join` whose last argument is not a valid condition.
    ///
    /// # Example
    /// ```
    /// # use relq::{CommandParser, CommandKind, ComparisonOp};
    /// let cmd = CommandParser::new().parse("B := select(A, age >= 30)").unwrap();
    /// assert_eq!(cmd.target, "b");
    /// assert_eq!(cmd.kind, CommandKind::Select);
    /// assert_eq!(cmd.arguments, vec!["a"]);
    /// assert_eq!(cmd.condition.unwrap().op, ComparisonOp::GtEq);
    /// ```
    pub fn parse(&self, line: &str) -> Result<Command> {
        let tokens = Tokenizer::new(line).tokenize()?;
        Parser::new(tokens).parse()
    }

    /// Parses a line and validates its arguments into a [Statement].
    pub fn parse_statement(&self, line: &str) -> Result<Statement> {
        Statement::try_from(self.parse(line)?)
    }
}

/// One comma-separated segment of an argument list.
enum Argument {
    Plain(String),
    Condition(Condition, String),
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    fn parse(&mut self) -> Result<Command> {
        if self.is_at_end() {
            return Err(Error::Parse("empty command".into()));
        }

        let target = if matches!(self.peek_token(), Token::Assign) {
            let name = self.consume_word()?;
            self.advance(); // skip `:=`
            name
        } else {
            String::new()
        };

        let name = self.consume_word()?;
        let kind = CommandKind::from_name(&name).ok_or(Error::UnknownCommand(name))?;

        // bare management commands such as `showdb` may omit the parentheses
        let arguments = if self.is_at_end() {
            vec![]
        } else {
            self.consume(Token::LeftParen)?;
            let arguments = self.parse_arguments()?;
            self.consume(Token::RightParen)?;
            arguments
        };

        if !self.is_at_end() {
            return Err(Error::Parse(format!(
                "unexpected token after command: {:?}",
                self.current_token()
            )));
        }

        Self::build_command(target, kind, arguments)
    }

    /// Separates the plain arguments from the condition. Only `select` and `join`
    /// accept a condition and it must be their last argument.
    fn build_command(
        target: String,
        kind: CommandKind,
        arguments: Vec<Argument>,
    ) -> Result<Command> {
        let mut plain = Vec::with_capacity(arguments.len());
        let mut condition = None;
        let count = arguments.len();

        for (idx, argument) in arguments.into_iter().enumerate() {
            match argument {
                Argument::Plain(text) if kind.takes_condition() && idx + 1 == count => {
                    return Err(Error::InvalidCondition(text));
                }
                Argument::Plain(text) => plain.push(text),
                Argument::Condition(cond, _) if kind.takes_condition() && idx + 1 == count => {
                    condition = Some(cond);
                }
                Argument::Condition(_, text) => {
                    return Err(Error::Parse(format!(
                        "unexpected condition {text:?} in arguments of {kind}"
                    )));
                }
            }
        }

        if kind.takes_condition() && condition.is_none() {
            return Err(Error::Parse(format!("{kind} requires a condition")));
        }

        Ok(Command {
            target,
            kind,
            arguments: plain,
            condition,
        })
    }

    fn parse_arguments(&mut self) -> Result<Vec<Argument>> {
        let mut arguments = vec![];
        if matches!(self.current_token(), Token::RightParen) {
            return Ok(arguments);
        }
        loop {
            arguments.push(self.parse_argument()?);
            match self.current_token() {
                Token::Comma => self.advance(),
                Token::RightParen => return Ok(arguments),
                other => return Err(Error::Parse(format!("expected ',' or ')', found {other:?}"))),
            }
        }
    }

    fn parse_argument(&mut self) -> Result<Argument> {
        let left = self.read_segment()?;
        let Token::Op(op) = *self.current_token() else {
            return Ok(Argument::Plain(left));
        };
        self.advance();
        let right = self.read_segment()?;
        if matches!(self.current_token(), Token::Op(_)) {
            return Err(Error::InvalidCondition(format!("{left}{op}{right}...")));
        }
        if left.is_empty() || right.is_empty() {
            return Err(Error::InvalidCondition(format!("{left}{op}{right}")));
        }
        let condition = Condition {
            left: Operand::classify(&left),
            op,
            right: Operand::classify(&right),
        };
        Ok(Argument::Condition(condition, format!("{left}{op}{right}")))
    }

    /// Reads the text of one operand or argument. Balanced parentheses are kept as
    /// part of the text so generated names such as `sum(qty)` stay whole.
    fn read_segment(&mut self) -> Result<String> {
        let mut text = String::new();
        let mut depth = 0usize;
        loop {
            match self.current_token() {
                Token::Word(word) => text.push_str(word),
                Token::LeftParen => {
                    depth += 1;
                    text.push('(');
                }
                Token::RightParen if depth > 0 => {
                    depth -= 1;
                    text.push(')');
                }
                Token::Comma if depth > 0 => {
                    return Err(Error::Parse(format!("unexpected ',' inside {text:?}")));
                }
                Token::Eof if depth > 0 => {
                    return Err(Error::Parse(format!("unbalanced parenthesis in {text:?}")));
                }
                _ => break,
            }
            self.advance();
        }
        if text.is_empty() && !matches!(self.current_token(), Token::Op(_)) {
            return Err(Error::Parse("empty argument".into()));
        }
        Ok(text)
    }

    //helpers
    fn current_token(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn peek_token(&self) -> &Token {
        self.tokens
            .get(self.position + 1)
            .unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_token(), Token::Eof)
    }

    fn consume(&mut self, expected: Token) -> Result<()> {
        if *self.current_token() == expected {
            self.advance();
            Ok(())
        } else {
            Err(Error::Parse(format!(
                "expected {:?}, found {:?}",
                expected,
                self.current_token()
            )))
        }
    }

    fn consume_word(&mut self) -> Result<String> {
        match self.current_token() {
            Token::Word(word) => {
                let word = word.clone();
                self.advance();
                Ok(word)
            }
            other => Err(Error::Parse(format!("expected a name, found {other:?}"))),
        }
    }
}

// --- Argument validation ---

fn require_target(command: &Command) -> Result<String> {
    if command.target.is_empty() {
        return Err(Error::Argument(format!(
            "{} needs a result name (`<name> := {}(...)`)",
            command.kind, command.kind
        )));
    }
    Ok(command.target.clone())
}

fn forbid_target(command: &Command) -> Result<()> {
    if !command.target.is_empty() {
        return Err(Error::Argument(format!(
            "{} does not produce a table and cannot be assigned to {:?}",
            command.kind, command.target
        )));
    }
    Ok(())
}

fn check_arity(
    command: &Command,
    expected: &'static str,
    accept: impl Fn(usize) -> bool,
) -> Result<()> {
    let found = command.arguments.len();
    if accept(found) {
        Ok(())
    } else {
        Err(Error::Arity {
            command: command.kind.name(),
            expected,
            found,
        })
    }
}

fn parse_window(text: &str) -> Result<usize> {
    match text.parse::<usize>() {
        Ok(window) if window >= 1 => Ok(window),
        _ => Err(Error::Argument(format!(
            "window length must be an integer >= 1, found {text:?}"
        ))),
    }
}

fn aggregate_mode(kind: CommandKind) -> AggregateMode {
    match kind {
        CommandKind::Avg | CommandKind::AvgGroup | CommandKind::MovAvg => AggregateMode::Avg,
        _ => AggregateMode::Sum,
    }
}

impl TryFrom<Command> for Statement {
    type Error = Error;

    /// Checks arity, result naming and numeric arguments for every command.
    fn try_from(command: Command) -> Result<Self> {
        let args = &command.arguments;
        let statement = match command.kind {
            CommandKind::InputFromFile => {
                check_arity(&command, "1 or 2", |n| (1..=2).contains(&n))?;
                Statement::InputFromFile(InputFromFile {
                    target: require_target(&command)?,
                    path: args[0].clone(),
                    delimiter: args.get(1).cloned(),
                })
            }
            CommandKind::OutputToFile => {
                check_arity(&command, "1 to 3", |n| (1..=3).contains(&n))?;
                forbid_target(&command)?;
                Statement::OutputToFile(OutputToFile {
                    table: args[0].clone(),
                    path: args.get(1).cloned(),
                    delimiter: args.get(2).cloned(),
                })
            }
            CommandKind::Select => {
                check_arity(&command, "1 and a condition", |n| n == 1)?;
                Statement::Select(Select {
                    target: require_target(&command)?,
                    table: args[0].clone(),
                    condition: command.condition.clone().ok_or_else(|| {
                        Error::Parse("select requires a condition".into())
                    })?,
                })
            }
            CommandKind::Project => {
                check_arity(&command, "at least 2", |n| n >= 2)?;
                Statement::Project(Project {
                    target: require_target(&command)?,
                    table: args[0].clone(),
                    columns: args[1..].to_vec(),
                })
            }
            CommandKind::Sum | CommandKind::Avg => {
                check_arity(&command, "2", |n| n == 2)?;
                Statement::Aggregate(Aggregate {
                    target: require_target(&command)?,
                    table: args[0].clone(),
                    column: args[1].clone(),
                    mode: aggregate_mode(command.kind),
                })
            }
            CommandKind::SumGroup | CommandKind::AvgGroup => {
                check_arity(&command, "at least 3", |n| n >= 3)?;
                Statement::GroupAggregate(GroupAggregate {
                    target: require_target(&command)?,
                    table: args[0].clone(),
                    column: args[1].clone(),
                    group_by: args[2..].to_vec(),
                    mode: aggregate_mode(command.kind),
                })
            }
            CommandKind::MovSum | CommandKind::MovAvg => {
                check_arity(&command, "3", |n| n == 3)?;
                Statement::MovingAggregate(MovingAggregate {
                    target: require_target(&command)?,
                    table: args[0].clone(),
                    column: args[1].clone(),
                    window: parse_window(&args[2])?,
                    mode: aggregate_mode(command.kind),
                })
            }
            CommandKind::Join => {
                check_arity(&command, "2 and a condition", |n| n == 2)?;
                Statement::Join(Join {
                    target: require_target(&command)?,
                    left: args[0].clone(),
                    right: args[1].clone(),
                    condition: command.condition.clone().ok_or_else(|| {
                        Error::Parse("join requires a condition".into())
                    })?,
                })
            }
            CommandKind::Sort => {
                check_arity(&command, "2", |n| n == 2)?;
                Statement::Sort(Sort {
                    target: require_target(&command)?,
                    table: args[0].clone(),
                    column: args[1].clone(),
                })
            }
            CommandKind::Concat => {
                check_arity(&command, "2", |n| n == 2)?;
                Statement::Concat(Concat {
                    target: require_target(&command)?,
                    left: args[0].clone(),
                    right: args[1].clone(),
                })
            }
            CommandKind::ShowDb => {
                check_arity(&command, "0", |n| n == 0)?;
                forbid_target(&command)?;
                Statement::ShowDb
            }
            CommandKind::Hash => Statement::Hash {
                target: command.target.clone(),
                arguments: command.arguments.clone(),
            },
            CommandKind::Btree => Statement::Btree {
                target: command.target.clone(),
                arguments: command.arguments.clone(),
            },
        };
        Ok(statement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    fn parse(line: &str) -> Result<Command> {
        CommandParser::new().parse(line)
    }

    fn column(name: &str) -> Operand {
        Operand::Column(ColumnRef {
            table: None,
            column: name.into(),
        })
    }

    #[test]
    fn test_parse_project() {
        let cmd = parse("R := project(S, saleid, qty)").unwrap();

        assert_eq!(cmd.target, "r");
        assert_eq!(cmd.kind, CommandKind::Project);
        assert_eq!(cmd.arguments, vec!["s", "saleid", "qty"]);
        assert_eq!(cmd.condition, None);
    }

    #[test]
    fn test_parse_select_condition() {
        let cmd = parse("R1 := select(R, qty > 30)").unwrap();

        assert_eq!(cmd.arguments, vec!["r"]);
        assert_eq!(
            cmd.condition,
            Some(Condition {
                left: column("qty"),
                op: ComparisonOp::Gt,
                right: Operand::Literal(30),
            })
        );
    }

    #[test]
    fn test_parse_select_literal_first() {
        let cmd = parse("r := select(t, 5 <= x)").unwrap();
        let condition = cmd.condition.unwrap();

        assert_eq!(condition.left, Operand::Literal(5));
        assert_eq!(condition.op, ComparisonOp::LtEq);
        assert_eq!(condition.right, column("x"));
    }

    #[test]
    fn test_parse_join_condition() {
        let cmd = parse("T := join(R1, S, R1.customerid = S.c)").unwrap();

        assert_eq!(cmd.kind, CommandKind::Join);
        assert_eq!(cmd.arguments, vec!["r1", "s"]);
        let condition = cmd.condition.unwrap();
        assert_eq!(
            condition.left,
            Operand::Column(ColumnRef {
                table: Some("r1".into()),
                column: "customerid".into()
            })
        );
        assert_eq!(condition.op, ComparisonOp::Eq);
    }

    #[test]
    fn test_all_operators() {
        let cases = [
            (">=", ComparisonOp::GtEq),
            ("<=", ComparisonOp::LtEq),
            ("!=", ComparisonOp::NotEq),
            (">", ComparisonOp::Gt),
            ("<", ComparisonOp::Lt),
            ("=", ComparisonOp::Eq),
        ];
        for (symbol, op) in cases {
            let cmd = parse(&format!("r := select(t, a {symbol} b)")).unwrap();
            let condition = cmd.condition.unwrap();
            assert_eq!(condition.op, op, "operator {symbol}");
            assert_eq!(condition.left, column("a"));
            assert_eq!(condition.right, column("b"));
        }
    }

    #[test]
    fn test_no_target_for_output() {
        let cmd = parse("outputtofile(T, out.txt)").unwrap();

        assert_eq!(cmd.target, "");
        assert_eq!(cmd.kind, CommandKind::OutputToFile);
        assert_eq!(cmd.arguments, vec!["t", "out.txt"]);
    }

    #[test]
    fn test_bare_showdb() {
        assert_eq!(parse("showdb").unwrap().kind, CommandKind::ShowDb);
        assert_eq!(parse("showDB()").unwrap().kind, CommandKind::ShowDb);
    }

    #[test]
    fn test_aggregate_name_as_argument() {
        let cmd = parse("s := sort(g, sum(qty))").unwrap();
        assert_eq!(cmd.arguments, vec!["g", "sum(qty)"]);

        let cmd = parse("s := select(g, sum(qty) > 10)").unwrap();
        assert_eq!(cmd.condition.unwrap().left, column("sum(qty)"));
    }

    #[test]
    fn test_unknown_command() {
        let err = parse("r := frobnicate(t)").unwrap_err();
        assert!(matches!(err, Error::UnknownCommand(ref name) if name == "frobnicate"));
        assert_eq!(err.category(), ErrorCategory::Parse);
    }

    #[test]
    fn test_missing_operator() {
        let err = parse("r := select(t, age)").unwrap_err();
        assert!(matches!(err, Error::InvalidCondition(_)));
    }

    #[test]
    fn test_malformed_conditions() {
        assert!(parse("r := select(t, >3)").is_err());
        assert!(parse("r := select(t, a>)").is_err());
        assert!(parse("r := select(t, a>1>2)").is_err());
        assert!(parse("r := select(t)").is_err());
        assert!(parse("r := select(t, a>1, b)").is_err());
    }

    #[test]
    fn test_condition_rejected_elsewhere() {
        assert!(parse("r := project(t, a>1)").is_err());
    }

    #[test]
    fn test_structural_errors() {
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
        assert!(parse("r := project(t, a").is_err());
        assert!(parse("r := project(t,,a)").is_err());
        assert!(parse("r := project(t, a) extra").is_err());
        assert!(parse(":= project(t, a)").is_err());
    }

    #[test]
    fn test_parser_is_stateless() {
        let parser = CommandParser::new();
        let first = parser.parse("a := select(t, x > 1)").unwrap();
        let second = parser.parse("b := project(t, x)").unwrap();

        assert!(first.condition.is_some());
        assert_eq!(second.condition, None);
        assert_eq!(second.arguments, vec!["t", "x"]);
    }

    #[test]
    fn test_statement_moving_window() {
        let parser = CommandParser::new();
        let statement = parser.parse_statement("m := movavg(t, qty, 3)").unwrap();
        assert_eq!(
            statement,
            Statement::MovingAggregate(MovingAggregate {
                target: "m".into(),
                table: "t".into(),
                column: "qty".into(),
                window: 3,
                mode: AggregateMode::Avg,
            })
        );

        let err = parser.parse_statement("m := movsum(t, qty, three)").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Argument);
        let err = parser.parse_statement("m := movsum(t, qty, 0)").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Argument);
    }

    #[test]
    fn test_statement_arity() {
        let parser = CommandParser::new();

        let err = parser.parse_statement("s := sort(t)").unwrap_err();
        assert!(matches!(err, Error::Arity { command: "sort", found: 1, .. }));

        let err = parser.parse_statement("g := sumgroup(t, qty)").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Argument);

        let err = parser.parse_statement("p := project(t)").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Argument);
    }

    #[test]
    fn test_statement_target_rules() {
        let parser = CommandParser::new();

        let err = parser.parse_statement("sort(t, a)").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Argument);

        let err = parser.parse_statement("x := showdb()").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Argument);
    }

    #[test]
    fn test_statement_group_aggregate() {
        let statement = CommandParser::new()
            .parse_statement("g := avggroup(t, qty, a, b)")
            .unwrap();
        assert_eq!(
            statement,
            Statement::GroupAggregate(GroupAggregate {
                target: "g".into(),
                table: "t".into(),
                column: "qty".into(),
                group_by: vec!["a".into(), "b".into()],
                mode: AggregateMode::Avg,
            })
        );
    }

    #[test]
    fn test_reserved_commands_parse() {
        let statement = CommandParser::new()
            .parse_statement("hash(t, a)")
            .unwrap();
        assert!(matches!(statement, Statement::Hash { .. }));
    }
}
