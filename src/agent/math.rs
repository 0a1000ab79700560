//! Arithmetic expression evaluator for the calculator tool.
//!
//! Supports `+ - * / % ^` (`**` is accepted for `^`), parentheses, unary
//! signs, the constants `pi` and `e`, and single-argument functions.
//! `^` binds tighter than unary minus and is right-associative, so
//! `-2^2` is `-4` and `2^3^2` is `512`.

use crate::error::{ChainlabError, Result};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
}

/// Evaluate an expression.
pub fn evaluate(expression: &str) -> Result<f64> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(error("empty expression"));
    }

    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expr()?;
    if let Some(token) = parser.peek() {
        return Err(error(&format!("unexpected token {:?}", token)));
    }
    if !value.is_finite() {
        return Err(error("result is not a finite number"));
    }
    Ok(value)
}

/// Format a result the way a person would write it.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn error(message: &str) -> ChainlabError {
    ChainlabError::Tool(format!("Calculator: {}", message))
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                // Commas count as thousands separators when a digit follows
                let in_number = |k: usize| {
                    chars[k].is_ascii_digit()
                        || chars[k] == '.'
                        || (chars[k] == ',' && chars.get(k + 1).is_some_and(|c| c.is_ascii_digit()))
                };
                while i < chars.len() && in_number(i) {
                    i += 1;
                }
                // Exponent only when digits follow
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let literal: String = chars[start..i].iter().filter(|c| **c != ',').collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| error(&format!("invalid number '{}'", literal)))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();
                tokens.push(Token::Ident(name.to_lowercase()));
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Op('^'));
                i += 2;
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            other => return Err(error(&format!("unexpected character '{}'", other))),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat_op(&mut self, ops: &[char]) -> Option<char> {
        match self.peek() {
            Some(Token::Op(op)) if ops.contains(op) => {
                let op = *op;
                self.pos += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn expr(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        while let Some(op) = self.eat_op(&['+', '-']) {
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64> {
        let mut value = self.unary()?;
        while let Some(op) = self.eat_op(&['*', '/', '%']) {
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                _ if rhs == 0.0 => return Err(error("division by zero")),
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<f64> {
        match self.eat_op(&['+', '-']) {
            Some('-') => Ok(-self.unary()?),
            Some(_) => self.unary(),
            None => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64> {
        let base = self.primary()?;
        if self.eat_op(&['^']).is_some() {
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr()?;
                self.expect_rparen()?;
                Ok(value)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    let arg = self.expr()?;
                    self.expect_rparen()?;
                    apply(&name, arg)
                } else {
                    constant(&name)
                }
            }
            Some(token) => Err(error(&format!("unexpected token {:?}", token))),
            None => Err(error("unexpected end of expression")),
        }
    }

    fn expect_rparen(&mut self) -> Result<()> {
        match self.next() {
            Some(Token::RParen) => Ok(()),
            _ => Err(error("missing closing parenthesis")),
        }
    }
}

fn constant(name: &str) -> Result<f64> {
    match name {
        "pi" => Ok(std::f64::consts::PI),
        "e" => Ok(std::f64::consts::E),
        _ => Err(error(&format!("unknown name '{}'", name))),
    }
}

fn apply(name: &str, arg: f64) -> Result<f64> {
    let value = match name {
        "sqrt" if arg < 0.0 => return Err(error("square root of a negative number")),
        "sqrt" => arg.sqrt(),
        "abs" => arg.abs(),
        "ln" => arg.ln(),
        "log" | "log10" => arg.log10(),
        "exp" => arg.exp(),
        "sin" => arg.sin(),
        "cos" => arg.cos(),
        "tan" => arg.tan(),
        "floor" => arg.floor(),
        "ceil" => arg.ceil(),
        "round" => arg.round(),
        _ => return Err(error(&format!("unknown function '{}'", name))),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(s: &str) -> f64 {
        evaluate(s).unwrap()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("2 + 3 * 4"), 14.0);
        assert_eq!(eval("(2 + 3) * 4"), 20.0);
        assert_eq!(eval("10 - 4 - 3"), 3.0);
        assert_eq!(eval("7 % 4"), 3.0);
        assert_eq!(eval("37593 * 67"), 2518731.0);
    }

    #[test]
    fn test_power_and_unary() {
        assert_eq!(eval("-2^2"), -4.0);
        assert_eq!(eval("2^3^2"), 512.0);
        assert_eq!(eval("2 ** -1"), 0.5);
        assert_eq!(eval("--3"), 3.0);
    }

    #[test]
    fn test_functions_and_constants() {
        assert!((eval("sqrt(2) ^ 3") - 2.828427).abs() < 1e-5);
        assert!((eval("cos(pi)") + 1.0).abs() < 1e-12);
        assert!((eval("ln(e)") - 1.0).abs() < 1e-12);
        assert!((eval("log(1000)") - 3.0).abs() < 1e-12);
        assert_eq!(eval("1.5e3 + 1,000"), 2500.0);
        assert_eq!(eval("round(2.6) + floor(-0.5)"), 2.0);
    }

    #[test]
    fn test_errors() {
        for bad in ["", "1 +", "(1 + 2", "1 / 0", "foo(1)", "x", "2 $ 3", "sqrt(-1)", "1 2"] {
            assert!(
                matches!(evaluate(bad), Err(ChainlabError::Tool(_))),
                "{} should fail",
                bad
            );
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(40500000000.0), "40500000000");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-4.0), "-4");
    }
}
