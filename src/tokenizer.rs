use crate::ast::ComparisonOp;
use crate::error::{Error, Result};

/// Represents the smallest meaningful units of the command language.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A run of characters that are not punctuation: a command name, a table or
    /// column name, an integer literal or a file path (e.g. `sales`, `42`,
    /// `data/in.txt`).
    Word(String),
    /// The assignment marker `:=`.
    Assign,
    /// Left parenthesis `(`
    LeftParen,
    /// Right parenthesis `)`
    RightParen,
    /// Comma `,`
    Comma,
    /// A comparison operator. Two-character forms are always read whole, so `>=`
    /// never lexes as `>` followed by `=`.
    Op(ComparisonOp),

    /// Represents the End Of Input.
    Eof,
}

/// A lexical scanner that converts one command line into a sequence of [Token]s.
///
/// Whitespace is insignificant and the language is case-insensitive: the input is
/// stripped of all whitespace and lower-cased before scanning.
pub struct Tokenizer {
    input: Vec<char>,
    position: usize,
}

impl Tokenizer {
    /// Creates a new Tokenizer for the given line.
    pub fn new(input: &str) -> Self {
        Self {
            input: input
                .chars()
                .filter(|c| !c.is_whitespace())
                .flat_map(char::to_lowercase)
                .collect(),
            position: 0,
        }
    }

    /// Processes the entire input and returns a vector of tokens.
    ///
    /// # Errors
    /// Returns an error on a lone `!` (only `!=` is an operator).
    ///
    /// # Example
    /// ```
    /// # use relq::tokenizer::{Tokenizer, Token};
    /// # use relq::ComparisonOp;
    /// let tokens = Tokenizer::new("A >= 3").tokenize().unwrap();
    /// assert_eq!(tokens[0], Token::Word("a".into()));
    /// assert_eq!(tokens[1], Token::Op(ComparisonOp::GtEq));
    /// ```
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while !self.is_at_end() {
            let token = self.next_token()?;
            tokens.push(token);
        }

        tokens.push(Token::Eof);
        Ok(tokens)
    }

    /// Identifies the next token based on the character at the current position.
    fn next_token(&mut self) -> Result<Token> {
        let ch = self.current_char();

        match ch {
            '(' => {
                self.advance();
                Ok(Token::LeftParen)
            }
            ')' => {
                self.advance();
                Ok(Token::RightParen)
            }
            ',' => {
                self.advance();
                Ok(Token::Comma)
            }
            ':' if self.peek() == Some('=') => {
                self.position += 2;
                Ok(Token::Assign)
            }
            '>' | '<' | '=' | '!' => self.read_operator(),
            _ => Ok(self.read_word()),
        }
    }

    // --- Navigation Helpers ---

    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn is_word_char(&self) -> bool {
        match self.current_char() {
            '(' | ')' | ',' | '>' | '<' | '=' | '!' => false,
            ':' => self.peek() != Some('='),
            _ => true,
        }
    }

    // --- Extraction Logic ---

    fn read_operator(&mut self) -> Result<Token> {
        let first = self.current_char();
        let long = self.peek() == Some('=');
        let op = match (first, long) {
            ('>', true) => ComparisonOp::GtEq,
            ('<', true) => ComparisonOp::LtEq,
            ('!', true) => ComparisonOp::NotEq,
            ('>', false) => ComparisonOp::Gt,
            ('<', false) => ComparisonOp::Lt,
            ('=', _) => ComparisonOp::Eq,
            _ => {
                return Err(Error::Parse(format!(
                    "unexpected {first:?} at position {}",
                    self.position
                )));
            }
        };
        // `==` is read as `=` followed by `=`; only `>=`, `<=` and `!=` are two characters long.
        self.position += if long && first != '=' { 2 } else { 1 };
        Ok(Token::Op(op))
    }

    fn read_word(&mut self) -> Token {
        let mut word = String::new();

        while !self.is_at_end() && self.is_word_char() {
            word.push(self.current_char());
            self.advance();
        }

        Token::Word(word)
    }
}
