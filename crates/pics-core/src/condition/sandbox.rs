//! Closed boolean evaluator.
//!
//! Accepts only `true`, `false`, `&&`, `||`, `!` and parentheses. There is no
//! identifier lookup, so a reference that survived substitution is an error rather
//! than something resolved from outside the expression.
//!
//! Grammar (precedence `!` > `&&` > `||`):
//!
//! ```text
//! or   := and ("||" and)*
//! and  := not ("&&" not)*
//! not  := "!" not | atom
//! atom := "true" | "false" | "(" or ")"
//! ```
//!
//! Nesting of `!` and `(` is capped at [`MAX_DEPTH`].

/// Deepest `!`/`(` nesting the evaluator descends into.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    True,
    False,
    And,
    Or,
    Not,
    Open,
    Close,
}

/// Why a substituted expression could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SandboxError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected input '{0}'")]
    UnexpectedInput(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected token {0}")]
    UnexpectedToken(String),
    #[error("expression nested deeper than {MAX_DEPTH} levels")]
    TooDeep,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, SandboxError> {
    let mut tokens = Vec::new();
    let mut rest = expr.trim_start();
    while !rest.is_empty() {
        let (token, len) = if rest.starts_with("&&") {
            (Token::And, 2)
        } else if rest.starts_with("||") {
            (Token::Or, 2)
        } else if rest.starts_with('!') {
            (Token::Not, 1)
        } else if rest.starts_with('(') {
            (Token::Open, 1)
        } else if rest.starts_with(')') {
            (Token::Close, 1)
        } else {
            let word_len = rest
                .find(|c: char| !c.is_ascii_alphanumeric() && c != '_' && c != '.')
                .unwrap_or(rest.len());
            let word = &rest[..word_len];
            if word.eq_ignore_ascii_case("true") {
                (Token::True, word.len())
            } else if word.eq_ignore_ascii_case("false") {
                (Token::False, word.len())
            } else {
                let shown: String = rest.chars().take(24).collect();
                return Err(SandboxError::UnexpectedInput(shown));
            }
        };
        tokens.push(token);
        rest = rest[len..].trim_start();
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn descend(&mut self) -> Result<(), SandboxError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(SandboxError::TooDeep);
        }
        Ok(())
    }

    fn or_expr(&mut self) -> Result<bool, SandboxError> {
        let mut value = self.and_expr()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.and_expr()?;
            value = value || rhs;
        }
        Ok(value)
    }

    fn and_expr(&mut self) -> Result<bool, SandboxError> {
        let mut value = self.not_expr()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.not_expr()?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn not_expr(&mut self) -> Result<bool, SandboxError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            self.descend()?;
            let value = !self.not_expr()?;
            self.depth -= 1;
            return Ok(value);
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<bool, SandboxError> {
        match self.advance() {
            Some(Token::True) => Ok(true),
            Some(Token::False) => Ok(false),
            Some(Token::Open) => {
                self.descend()?;
                let value = self.or_expr()?;
                self.depth -= 1;
                match self.advance() {
                    Some(Token::Close) => Ok(value),
                    Some(other) => Err(SandboxError::UnexpectedToken(format!("{:?}", other))),
                    None => Err(SandboxError::UnexpectedEnd),
                }
            }
            Some(other) => Err(SandboxError::UnexpectedToken(format!("{:?}", other))),
            None => Err(SandboxError::UnexpectedEnd),
        }
    }
}

/// Evaluate a fully substituted boolean expression.
pub fn evaluate_boolean(expr: &str) -> Result<bool, SandboxError> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(SandboxError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.or_expr()?;
    match parser.advance() {
        None => Ok(value),
        Some(extra) => Err(SandboxError::UnexpectedToken(format!("{:?}", extra))),
    }
}
