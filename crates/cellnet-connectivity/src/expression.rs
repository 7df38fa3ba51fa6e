// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Scalar expressions over the displacement variables `x`, `y`, `z` and `r`.

Used for spatially varying connection probability in volume-based
connectivity and for distance-dependent synaptic weights.

## Grammar

```text
expr    := term (('+' | '-') term)*
term    := unary (('*' | '/') unary)*
unary   := '-' unary | '+' unary | power
power   := atom ('^' unary)?
atom    := function '(' expr ')' | variable | number | '(' expr ')'
```

`^` is right-associative and binds tighter than unary minus, so `-2^2`
is `-4`. Functions: `sin cos tan exp ln log sqrt abs H random`, where `log`
is base 10, `H` is the Heaviside step (1 for positive arguments, else 0)
and `random(a)` draws uniformly from `[0, a)`.
*/

use std::fmt;
use std::str::FromStr;

use nom::branch::alt;
use nom::character::complete::{alpha1, char, multispace0, one_of};
use nom::combinator::{all_consuming, map, opt};
use nom::error::{ErrorKind, ParseError};
use nom::multi::many0;
use nom::number::complete::double;
use nom::sequence::{delimited, pair, preceded};
use nom::IResult;
use rand::{Rng, RngCore};

use crate::geometry::Point3;

/// Errors from parsing or evaluating an expression
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionError {
    #[error("Cannot parse expression '{text}' at offset {offset}: {reason}")]
    Parse {
        text: String,
        offset: usize,
        reason: String,
    },

    #[error("Expression '{text}' is not finite at {variables}")]
    NonFinite { text: String, variables: String },
}

/// Values bound to the expression variables
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Variables {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub r: f64,
}

impl Variables {
    /// Binds x, y, z to a displacement and r to its length
    pub fn displacement(d: Point3) -> Self {
        let (x, y, z) = (d.x as f64, d.y as f64, d.z as f64);
        Self {
            x,
            y,
            z,
            r: (x * x + y * y + z * z).sqrt(),
        }
    }

    /// Binds only r
    pub fn radial(r: f32) -> Self {
        Self {
            r: r as f64,
            ..Self::default()
        }
    }
}

impl fmt::Display for Variables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x={}, y={}, z={}, r={}", self.x, self.y, self.z, self.r)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variable {
    X,
    Y,
    Z,
    R,
}

impl Variable {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "x" => Some(Variable::X),
            "y" => Some(Variable::Y),
            "z" => Some(Variable::Z),
            "r" => Some(Variable::R),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Function {
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
    Log,
    Sqrt,
    Abs,
    Heaviside,
    Random,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "sin" => Some(Function::Sin),
            "cos" => Some(Function::Cos),
            "tan" => Some(Function::Tan),
            "exp" => Some(Function::Exp),
            "ln" => Some(Function::Ln),
            "log" => Some(Function::Log),
            "sqrt" => Some(Function::Sqrt),
            "abs" => Some(Function::Abs),
            "H" => Some(Function::Heaviside),
            "random" => Some(Function::Random),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Var(Variable),
    Negate(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Function, Box<Expr>),
}

impl Expr {
    fn evaluate(&self, vars: &Variables, rng: &mut dyn RngCore) -> f64 {
        match self {
            Expr::Number(value) => *value,
            Expr::Var(Variable::X) => vars.x,
            Expr::Var(Variable::Y) => vars.y,
            Expr::Var(Variable::Z) => vars.z,
            Expr::Var(Variable::R) => vars.r,
            Expr::Negate(inner) => -inner.evaluate(vars, rng),
            Expr::Binary(op, lhs, rhs) => {
                let a = lhs.evaluate(vars, rng);
                let b = rhs.evaluate(vars, rng);
                match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Subtract => a - b,
                    BinaryOp::Multiply => a * b,
                    BinaryOp::Divide => a / b,
                    BinaryOp::Power => a.powf(b),
                }
            }
            Expr::Call(function, argument) => {
                let a = argument.evaluate(vars, rng);
                match function {
                    Function::Sin => a.sin(),
                    Function::Cos => a.cos(),
                    Function::Tan => a.tan(),
                    Function::Exp => a.exp(),
                    Function::Ln => a.ln(),
                    Function::Log => a.log10(),
                    Function::Sqrt => a.sqrt(),
                    Function::Abs => a.abs(),
                    Function::Heaviside => {
                        if a > 0.0 {
                            1.0
                        } else {
                            0.0
                        }
                    }
                    Function::Random => rng.gen::<f64>() * a,
                }
            }
        }
    }
}

/// A parsed expression together with its source text
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    text: String,
    root: Expr,
}

impl Expression {
    pub fn parse(text: &str) -> Result<Self, ExpressionError> {
        match all_consuming(expression)(text) {
            Ok((_, root)) => Ok(Self {
                text: text.trim().to_string(),
                root,
            }),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                let offset = text.len() - e.input.len();
                let reason = e.reason.unwrap_or_else(|| match e.input.chars().next() {
                    Some(c) => format!("unexpected '{}'", c),
                    None => "unexpected end of expression".to_string(),
                });
                Err(ExpressionError::Parse {
                    text: text.to_string(),
                    offset,
                    reason,
                })
            }
            Err(nom::Err::Incomplete(_)) => Err(ExpressionError::Parse {
                text: text.to_string(),
                offset: text.len(),
                reason: "unexpected end of expression".to_string(),
            }),
        }
    }

    /// The constant-one expression, i.e. uniform probability
    pub fn constant_one() -> Self {
        Self {
            text: "1".to_string(),
            root: Expr::Number(1.0),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// True for the literal constant 1, which callers may skip evaluating
    pub fn is_constant_one(&self) -> bool {
        matches!(self.root, Expr::Number(value) if value == 1.0)
    }

    /// Raw IEEE result, infinities and NaN included
    pub fn evaluate_unchecked(&self, vars: &Variables, rng: &mut dyn RngCore) -> f64 {
        self.root.evaluate(vars, rng)
    }

    pub fn evaluate(&self, vars: &Variables, rng: &mut dyn RngCore) -> Result<f64, ExpressionError> {
        let value = self.evaluate_unchecked(vars, rng);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ExpressionError::NonFinite {
                text: self.text.clone(),
                variables: vars.to_string(),
            })
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Expression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::parse(s)
    }
}

// ----------------------------------------------------------------------------
// Parser
// ----------------------------------------------------------------------------

#[derive(Debug)]
struct SyntaxError<'a> {
    input: &'a str,
    reason: Option<String>,
}

impl<'a> ParseError<&'a str> for SyntaxError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        Self {
            input,
            reason: None,
        }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

type PResult<'a, O> = IResult<&'a str, O, SyntaxError<'a>>;

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    F: FnMut(&'a str) -> PResult<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn expression(input: &str) -> PResult<'_, Expr> {
    let (input, first) = term(input)?;
    let (input, rest) = many0(pair(ws(one_of("+-")), term))(input)?;
    let expr = rest.into_iter().fold(first, |lhs, (op, rhs)| {
        let op = if op == '+' {
            BinaryOp::Add
        } else {
            BinaryOp::Subtract
        };
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    });
    Ok((input, expr))
}

fn term(input: &str) -> PResult<'_, Expr> {
    let (input, first) = unary(input)?;
    let (input, rest) = many0(pair(ws(one_of("*/")), unary))(input)?;
    let expr = rest.into_iter().fold(first, |lhs, (op, rhs)| {
        let op = if op == '*' {
            BinaryOp::Multiply
        } else {
            BinaryOp::Divide
        };
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    });
    Ok((input, expr))
}

fn unary(input: &str) -> PResult<'_, Expr> {
    alt((
        map(preceded(ws(char('-')), unary), |e| Expr::Negate(Box::new(e))),
        preceded(ws(char('+')), unary),
        power,
    ))(input)
}

fn power(input: &str) -> PResult<'_, Expr> {
    let (input, base) = atom(input)?;
    let (input, exponent) = opt(preceded(ws(char('^')), unary))(input)?;
    let expr = match exponent {
        Some(exponent) => Expr::Binary(BinaryOp::Power, Box::new(base), Box::new(exponent)),
        None => base,
    };
    Ok((input, expr))
}

fn atom(input: &str) -> PResult<'_, Expr> {
    ws(alt((
        identifier,
        map(double, Expr::Number),
        delimited(char('('), expression, ws(char(')'))),
    )))(input)
}

/// Function call or variable reference
fn identifier(input: &str) -> PResult<'_, Expr> {
    let (rest, name) = alpha1(input)?;
    let (rest, argument) = opt(delimited(ws(char('(')), expression, ws(char(')'))))(rest)?;
    match argument {
        Some(argument) => match Function::from_name(name) {
            Some(function) => Ok((rest, Expr::Call(function, Box::new(argument)))),
            None => Err(nom::Err::Failure(SyntaxError {
                input,
                reason: Some(format!("unknown function '{}'", name)),
            })),
        },
        None => match Variable::from_name(name) {
            Some(variable) => Ok((rest, Expr::Var(variable))),
            None => Err(nom::Err::Failure(SyntaxError {
                input,
                reason: Some(format!("unknown variable '{}'", name)),
            })),
        },
    }
}
