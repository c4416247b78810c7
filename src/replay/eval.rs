//! Expression evaluator for debugger input
//!
//! Understands just enough to inspect and poke at a suspended frame:
//! literals, variable lookup, assignment, `+` and `-`, parentheses and
//! statement sequences. The value of the last statement is the result.

use super::value::ReplayValue;

/// Variable bindings visible to an evaluation
pub(crate) trait Environment {
    fn lookup(&self, name: &str) -> Option<ReplayValue>;
    fn assign(&mut self, name: &str, value: ReplayValue);
}

/// Whether `program` is complete enough to evaluate
///
/// Open brackets, an unterminated string or a trailing operator mean more
/// input is expected.
pub(crate) fn can_evaluate(program: &str) -> bool {
    let mut depth = 0i32;
    let mut quote = None;
    let mut escaped = false;
    for c in program.chars() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            },
        }
    }
    if quote.is_some() || depth > 0 {
        return false;
    }
    !matches!(program.trim_end().chars().last(), Some('+' | '-' | '=' | '('))
}

/// Evaluate `program`, returning the thrown error value on failure
pub(crate) fn evaluate(
    program: &str,
    env: &mut dyn Environment,
) -> Result<ReplayValue, ReplayValue> {
    let tokens = tokenize(program)?;
    Parser {
        tokens: &tokens,
        pos: 0,
        env,
    }
    .program()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Plus,
    Minus,
    Assign,
    LParen,
    RParen,
    Semi,
}

fn syntax_error() -> ReplayValue {
    ReplayValue::Error("SyntaxError: Parse error".to_string())
}

fn tokenize(program: &str) -> Result<Vec<Token>, ReplayValue> {
    let mut tokens = Vec::new();
    let mut chars = program.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' | '-' | '=' | '(' | ')' | ';' => {
                chars.next();
                tokens.push(match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '=' => Token::Assign,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    _ => Token::Semi,
                });
            }
            '"' | '\'' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => text.push(match chars.next() {
                            Some('n') => '\n',
                            Some('t') => '\t',
                            Some(other) => other,
                            None => return Err(syntax_error()),
                        }),
                        Some(ch) if ch == c => break,
                        Some(ch) => text.push(ch),
                        None => return Err(syntax_error()),
                    }
                }
                tokens.push(Token::Str(text));
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if !(d.is_ascii_digit() || d == '.') {
                        break;
                    }
                    literal.push(d);
                    chars.next();
                }
                let value = literal.parse::<f64>().map_err(|_| syntax_error())?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if !(d.is_alphanumeric() || d == '_' || d == '$') {
                        break;
                    }
                    ident.push(d);
                    chars.next();
                }
                tokens.push(Token::Ident(ident));
            }
            _ => return Err(syntax_error()),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    env: &'a mut dyn Environment,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn program(&mut self) -> Result<ReplayValue, ReplayValue> {
        let mut result = ReplayValue::Undefined;
        while self.pos < self.tokens.len() {
            if self.peek() == Some(&Token::Semi) {
                self.pos += 1;
                continue;
            }
            result = self.statement()?;
        }
        Ok(result)
    }

    fn statement(&mut self) -> Result<ReplayValue, ReplayValue> {
        if let (Some(Token::Ident(name)), Some(Token::Assign)) =
            (self.tokens.get(self.pos), self.tokens.get(self.pos + 1))
        {
            let name = name.clone();
            self.pos += 2;
            let value = self.expression()?;
            self.env.assign(&name, value.clone());
            return Ok(value);
        }
        self.expression()
    }

    fn expression(&mut self) -> Result<ReplayValue, ReplayValue> {
        let mut left = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    let right = self.unary()?;
                    left = add(&left, &right);
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    let right = self.unary()?;
                    left = ReplayValue::Number(to_number(&left) - to_number(&right));
                }
                _ => return Ok(left),
            }
        }
    }

    fn unary(&mut self) -> Result<ReplayValue, ReplayValue> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            let value = self.unary()?;
            return Ok(ReplayValue::Number(-to_number(&value)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<ReplayValue, ReplayValue> {
        match self.next() {
            Some(Token::Number(n)) => Ok(ReplayValue::Number(n)),
            Some(Token::Str(s)) => Ok(ReplayValue::String(s)),
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(ReplayValue::Bool(true)),
                "false" => Ok(ReplayValue::Bool(false)),
                "null" => Ok(ReplayValue::Null),
                "undefined" => Ok(ReplayValue::Undefined),
                _ => self.env.lookup(&name).ok_or_else(|| {
                    ReplayValue::Error(format!("ReferenceError: {name} is not defined"))
                }),
            },
            Some(Token::LParen) => {
                let value = self.expression()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(syntax_error()),
                }
            }
            _ => Err(syntax_error()),
        }
    }
}

fn to_number(value: &ReplayValue) -> f64 {
    match value {
        ReplayValue::Number(n) => *n,
        ReplayValue::Bool(b) => f64::from(u8::from(*b)),
        ReplayValue::Null => 0.0,
        ReplayValue::String(s) if s.trim().is_empty() => 0.0,
        ReplayValue::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn add(left: &ReplayValue, right: &ReplayValue) -> ReplayValue {
    let stringy = |v: &ReplayValue| {
        matches!(
            v,
            ReplayValue::String(_) | ReplayValue::Object(_) | ReplayValue::Function { .. } | ReplayValue::Error(_)
        )
    };
    if stringy(left) || stringy(right) {
        ReplayValue::String(format!("{left}{right}"))
    } else {
        ReplayValue::Number(to_number(left) + to_number(right))
    }
}
