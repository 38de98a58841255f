//! Symbolic derivative expressions.
//!
//! A catalog states each partial derivative as a small closed-form
//! expression over placeholders for the operands: `x` for the first,
//! `y` for the second (binary operations only). For example the rule for
//! `^` is the pair `y * x ^ (y - 1)` and `x ^ y * log(x)`.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/') unary)*
//! unary  := '-' unary | power
//! power  := atom ('^' unary)?          (right associative)
//! atom   := number | 'pi' | placeholder | name '(' expr (',' expr)* ')' | '(' expr ')'
//! ```
//!
//! Calls resolve against the elementary operations by `(name, argument
//! count)`. Expressions are parsed once when a rule table is built and
//! evaluated with [`Num`] arithmetic, so a derivative evaluated at a dual
//! primal of an outer session carries that session's tangent along.

use crate::dispatch;
use crate::dual::Num;
use crate::error::ExprError;
use crate::ops::{BinaryOp, Op, UnaryOp};
use num_traits::Float;
use std::fmt;

/// A parsed derivative expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(f64),
    /// The first operand.
    X,
    /// The second operand.
    Y,
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Parse `src` as a partial derivative of an operation with `arity`
    /// operands. `y` is only accepted when `arity` is 2.
    ///
    /// ```
    /// use dualtag::Expr;
    ///
    /// let e = Expr::parse("-x / y ^ 2", 2).unwrap();
    /// assert_eq!(e.to_string(), "((-x) / (y ^ 2))");
    ///
    /// assert!(Expr::parse("cos(y)", 1).is_err());
    /// ```
    pub fn parse(src: &str, arity: usize) -> Result<Expr, ExprError> {
        let tokens = tokenize(src)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            arity,
        };
        let expr = parser.parse_expr()?;
        match parser.peek() {
            None => Ok(expr),
            Some(tok) => Err(ExprError::UnexpectedToken(tok.to_string())),
        }
    }

    /// Evaluate at operands `x` and `y`. Unary rules never mention `y`,
    /// so callers pass the single operand for both.
    pub fn eval<T: Float>(&self, x: &Num<T>, y: &Num<T>) -> Num<T> {
        match self {
            Expr::Const(c) => Num::Real(num_traits::cast(*c).unwrap_or_else(T::nan)),
            Expr::X => x.clone(),
            Expr::Y => y.clone(),
            Expr::Unary(op, arg) => dispatch::unary(*op, &arg.eval(x, y)),
            Expr::Binary(op, lhs, rhs) => dispatch::binary(*op, &lhs.eval(x, y), &rhs.eval(x, y)),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(c) => write!(f, "{}", c),
            Expr::X => write!(f, "x"),
            Expr::Y => write!(f, "y"),
            Expr::Unary(UnaryOp::Neg, arg) => write!(f, "(-{})", arg),
            Expr::Unary(op, arg) => write!(f, "{}({})", op.name(), arg),
            Expr::Binary(op @ (BinaryOp::Atan2 | BinaryOp::Hypot), lhs, rhs) => {
                write!(f, "{}({}, {})", op.name(), lhs, rhs)
            }
            Expr::Binary(op, lhs, rhs) => write!(f, "({} {} {})", lhs, op.name(), rhs),
        }
    }
}

// ── Tokenizer ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Num(n) => write!(f, "number `{}`", n),
            Token::Ident(name) => write!(f, "identifier `{}`", name),
            Token::Plus => write!(f, "`+`"),
            Token::Minus => write!(f, "`-`"),
            Token::Star => write!(f, "`*`"),
            Token::Slash => write!(f, "`/`"),
            Token::Caret => write!(f, "`^`"),
            Token::LParen => write!(f, "`(`"),
            Token::RParen => write!(f, "`)`"),
            Token::Comma => write!(f, "`,`"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '^' => Some(Token::Caret),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            ',' => Some(Token::Comma),
            _ => None,
        };
        if let Some(tok) = single {
            tokens.push(tok);
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < chars.len()
                && (chars[i].is_ascii_digit()
                    || chars[i] == '.'
                    || chars[i] == 'e'
                    || chars[i] == 'E'
                    || ((chars[i] == '+' || chars[i] == '-')
                        && i > start
                        && (chars[i - 1] == 'e' || chars[i - 1] == 'E')))
            {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let n = text
                .parse::<f64>()
                .map_err(|_| ExprError::InvalidNumber(text.clone()))?;
            tokens.push(Token::Num(n));
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else {
            return Err(ExprError::UnexpectedChar(c));
        }
    }

    Ok(tokens)
}

// ── Parser (recursive descent) ─────────────────────────────────

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    arity: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ExprError> {
        match self.advance() {
            Some(t) if t == expected => Ok(()),
            Some(t) => Err(ExprError::UnexpectedToken(t.to_string())),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_term(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.advance();
            return match self.parse_unary()? {
                Expr::Const(c) => Ok(Expr::Const(-c)),
                e => Ok(Expr::Unary(UnaryOp::Neg, Box::new(e))),
            };
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Expr, ExprError> {
        let base = self.parse_atom()?;
        if matches!(self.peek(), Some(Token::Caret)) {
            self.advance();
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_atom(&mut self) -> Result<Expr, ExprError> {
        match self.advance() {
            None => Err(ExprError::UnexpectedEnd),
            Some(Token::Num(n)) => Ok(Expr::Const(*n)),
            Some(Token::LParen) => {
                let e = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(e)
            }
            Some(Token::Ident(name)) if matches!(self.peek(), Some(Token::LParen)) => {
                self.advance();
                let mut args = vec![self.parse_expr()?];
                while matches!(self.peek(), Some(Token::Comma)) {
                    self.advance();
                    args.push(self.parse_expr()?);
                }
                self.expect(&Token::RParen)?;
                call(name, args)
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "x" => Ok(Expr::X),
                "y" if self.arity == 2 => Ok(Expr::Y),
                "pi" => Ok(Expr::Const(std::f64::consts::PI)),
                _ => Err(ExprError::UnknownPlaceholder(name.clone())),
            },
            Some(tok) => Err(ExprError::UnexpectedToken(tok.to_string())),
        }
    }
}

fn call(name: &str, args: Vec<Expr>) -> Result<Expr, ExprError> {
    let arity = args.len();
    let mut args = args.into_iter();
    match (Op::lookup(name, arity), args.next(), args.next()) {
        (Some(Op::Unary(op)), Some(arg), None) => Ok(Expr::Unary(op, Box::new(arg))),
        (Some(Op::Binary(op)), Some(lhs), Some(rhs)) => {
            Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
        }
        _ => Err(ExprError::UnknownFunction {
            name: name.to_string(),
            arity,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval2(src: &str, x: f64, y: f64) -> f64 {
        let e = Expr::parse(src, 2).unwrap();
        e.eval(&Num::Real(x), &Num::Real(y)).real().unwrap()
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(eval2("1 + 2 * 3", 0.0, 0.0), 7.0);
        assert_eq!(eval2("8 / 4 / 2", 0.0, 0.0), 1.0);
        assert_eq!(eval2("2 ^ 3 ^ 2", 0.0, 0.0), 512.0);
        assert_eq!(eval2("-x ^ 2", 3.0, 0.0), -9.0);
        assert_eq!(eval2("x ^ -1", 4.0, 0.0), 0.25);
        assert_eq!(eval2("(x + y) * 2", 1.0, 2.0), 6.0);
    }

    #[test]
    fn negated_literals_fold() {
        assert_eq!(Expr::parse("-1", 1), Ok(Expr::Const(-1.0)));
        assert_eq!(
            Expr::parse("-x", 1),
            Ok(Expr::Unary(UnaryOp::Neg, Box::new(Expr::X)))
        );
    }

    #[test]
    fn calls_resolve_by_name_and_argument_count() {
        assert_eq!(
            Expr::parse("atan(x, y)", 2),
            Ok(Expr::Binary(
                BinaryOp::Atan2,
                Box::new(Expr::X),
                Box::new(Expr::Y)
            ))
        );
        assert_eq!(
            Expr::parse("cos(x)", 1),
            Ok(Expr::Unary(UnaryOp::Cos, Box::new(Expr::X)))
        );
        assert_eq!(
            Expr::parse("gamma(x)", 1),
            Err(ExprError::UnknownFunction {
                name: "gamma".to_string(),
                arity: 1
            })
        );
        assert_eq!(
            Expr::parse("hypot(x)", 1),
            Err(ExprError::UnknownFunction {
                name: "hypot".to_string(),
                arity: 1
            })
        );
    }

    #[test]
    fn placeholders_depend_on_arity() {
        assert!(Expr::parse("x * y", 2).is_ok());
        assert_eq!(
            Expr::parse("x * y", 1),
            Err(ExprError::UnknownPlaceholder("y".to_string()))
        );
        assert_eq!(
            Expr::parse("z", 2),
            Err(ExprError::UnknownPlaceholder("z".to_string()))
        );
    }

    #[test]
    fn syntax_errors() {
        assert_eq!(Expr::parse("", 1), Err(ExprError::UnexpectedEnd));
        assert_eq!(Expr::parse("x +", 1), Err(ExprError::UnexpectedEnd));
        assert_eq!(Expr::parse("(x", 1), Err(ExprError::UnexpectedEnd));
        assert_eq!(Expr::parse("x $ 2", 1), Err(ExprError::UnexpectedChar('$')));
        assert_eq!(
            Expr::parse("x 2", 1),
            Err(ExprError::UnexpectedToken("number `2`".to_string()))
        );
        assert_eq!(
            Expr::parse("1.2.3", 1),
            Err(ExprError::InvalidNumber("1.2.3".to_string()))
        );
    }

    #[test]
    fn constants_and_scientific_notation() {
        let e = Expr::parse("2 / sqrt(pi)", 1).unwrap();
        let v = e.eval(&Num::Real(0.0_f64), &Num::Real(0.0)).real().unwrap();
        assert!((v - 2.0 / std::f64::consts::PI.sqrt()).abs() < 1e-15);
        assert_eq!(eval2("1.5e-1 * x", 2.0, 0.0), 0.3);
    }

    #[test]
    fn evaluates_in_single_precision() {
        let e = Expr::parse("0.5 / sqrt(x)", 1).unwrap();
        let v = e.eval(&Num::Real(4.0_f32), &Num::Real(4.0_f32));
        assert_eq!(v.real(), Some(0.25_f32));
    }

    #[test]
    fn display_is_fully_parenthesised() {
        let e = Expr::parse("y * x ^ (y - 1)", 2).unwrap();
        assert_eq!(e.to_string(), "(y * (x ^ (y - 1)))");
        let e = Expr::parse("hypot(x, y) + log(x)", 2).unwrap();
        assert_eq!(e.to_string(), "(hypot(x, y) + log(x))");
    }
}
