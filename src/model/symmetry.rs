// src/model/symmetry.rs
//
// Symmetry operations are read verbatim from the file ("x+1/2,-y,z") and compiled
// into affine maps. The grammar only admits affine combinations of x, y, z with
// rational constants:
//
//   expr    := term (('+' | '-') term)*
//   term    := unary (('*' | '/') unary)*
//   unary   := ('+' | '-') unary | primary
//   primary := number [var] | var | '(' expr ')'
//
// A number directly followed by a variable ("2x") is an implicit product.

use crate::errors::SymmetryError;
use std::fmt;

/// `coeffs · (x, y, z) + constant`
#[derive(Clone, Copy, Debug, PartialEq)]
struct Affine {
    coeffs: [f64; 3],
    constant: f64,
}

impl Affine {
    fn constant(c: f64) -> Self {
        Self { coeffs: [0.0; 3], constant: c }
    }

    fn variable(axis: usize) -> Self {
        let mut coeffs = [0.0; 3];
        coeffs[axis] = 1.0;
        Self { coeffs, constant: 0.0 }
    }

    fn is_constant(&self) -> bool {
        self.coeffs.iter().all(|c| *c == 0.0)
    }

    fn add(self, other: Self, sign: f64) -> Self {
        Self {
            coeffs: [
                self.coeffs[0] + sign * other.coeffs[0],
                self.coeffs[1] + sign * other.coeffs[1],
                self.coeffs[2] + sign * other.coeffs[2],
            ],
            constant: self.constant + sign * other.constant,
        }
    }

    fn scale(self, s: f64) -> Self {
        Self {
            coeffs: [self.coeffs[0] * s, self.coeffs[1] * s, self.coeffs[2] * s],
            constant: self.constant * s,
        }
    }

    fn eval(&self, p: [f64; 3]) -> f64 {
        self.coeffs[0] * p[0] + self.coeffs[1] * p[1] + self.coeffs[2] * p[2] + self.constant
    }
}

/// One symmetry-equivalent position generator.
#[derive(Clone, Debug, PartialEq)]
pub struct SymmetryOperation {
    source: String,
    rows: [Affine; 3],
}

impl SymmetryOperation {
    pub fn identity() -> Self {
        Self {
            source: "x,y,z".to_string(),
            rows: [Affine::variable(0), Affine::variable(1), Affine::variable(2)],
        }
    }

    pub fn parse(op: &str) -> Result<Self, SymmetryError> {
        let parts: Vec<&str> = op.split(',').collect();
        if parts.len() != 3 {
            return Err(SymmetryError::ComponentCount(parts.len()));
        }
        let rows = [
            parse_component(parts[0])?,
            parse_component(parts[1])?,
            parse_component(parts[2])?,
        ];
        Ok(Self { source: op.trim().to_string(), rows })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Apply to a fractional position. No wrapping.
    pub fn apply(&self, p: [f64; 3]) -> [f64; 3] {
        [self.rows[0].eval(p), self.rows[1].eval(p), self.rows[2].eval(p)]
    }
}

impl fmt::Display for SymmetryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

fn parse_component(expr: &str) -> Result<Affine, SymmetryError> {
    let chars: Vec<char> = expr.chars().filter(|c| !c.is_whitespace()).collect();
    let mut parser = Parser { chars, pos: 0 };
    let value = parser.expr()?;
    match parser.peek() {
        None => Ok(value),
        Some(c) => Err(SymmetryError::UnexpectedChar(c, parser.pos)),
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn expr(&mut self) -> Result<Affine, SymmetryError> {
        let mut acc = self.term()?;
        while let Some(c) = self.peek() {
            let sign = match c {
                '+' => 1.0,
                '-' => -1.0,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.term()?;
            acc = acc.add(rhs, sign);
        }
        Ok(acc)
    }

    fn term(&mut self) -> Result<Affine, SymmetryError> {
        let mut acc = self.unary()?;
        while let Some(c) = self.peek() {
            match c {
                '*' => {
                    self.pos += 1;
                    let rhs = self.unary()?;
                    acc = multiply(acc, rhs)?;
                }
                '/' => {
                    self.pos += 1;
                    let rhs = self.unary()?;
                    if !rhs.is_constant() {
                        return Err(SymmetryError::DivisionByVariable);
                    }
                    if rhs.constant == 0.0 {
                        return Err(SymmetryError::DivisionByZero);
                    }
                    acc = acc.scale(1.0 / rhs.constant);
                }
                _ => break,
            }
        }
        Ok(acc)
    }

    fn unary(&mut self) -> Result<Affine, SymmetryError> {
        match self.peek() {
            Some('-') => {
                self.pos += 1;
                Ok(self.unary()?.scale(-1.0))
            }
            Some('+') => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Affine, SymmetryError> {
        let start = self.pos;
        match self.bump() {
            None => Err(SymmetryError::UnexpectedEnd),
            Some('(') => {
                let inner = self.expr()?;
                match self.bump() {
                    Some(')') => Ok(inner),
                    Some(c) => Err(SymmetryError::UnexpectedChar(c, self.pos - 1)),
                    None => Err(SymmetryError::UnexpectedEnd),
                }
            }
            Some(c) if is_variable(c) => Ok(Affine::variable(axis_of(c))),
            Some(c) if c.is_ascii_digit() || c == '.' => {
                while matches!(self.peek(), Some(d) if d.is_ascii_digit() || d == '.') {
                    self.pos += 1;
                }
                let text: String = self.chars[start..self.pos].iter().collect();
                let value: f64 = text.parse().map_err(|_| SymmetryError::InvalidNumber(text.clone()))?;
                match self.peek() {
                    Some(v) if is_variable(v) => {
                        self.pos += 1;
                        Ok(Affine::variable(axis_of(v)).scale(value))
                    }
                    _ => Ok(Affine::constant(value)),
                }
            }
            Some(c) => Err(SymmetryError::UnexpectedChar(c, start)),
        }
    }
}

fn is_variable(c: char) -> bool {
    matches!(c, 'x' | 'y' | 'z' | 'X' | 'Y' | 'Z')
}

fn axis_of(c: char) -> usize {
    match c.to_ascii_lowercase() {
        'x' => 0,
        'y' => 1,
        _ => 2,
    }
}

fn multiply(a: Affine, b: Affine) -> Result<Affine, SymmetryError> {
    if a.is_constant() {
        Ok(b.scale(a.constant))
    } else if b.is_constant() {
        Ok(a.scale(b.constant))
    } else {
        Err(SymmetryError::NonAffineProduct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(op: &str, p: [f64; 3]) -> [f64; 3] {
        SymmetryOperation::parse(op).unwrap().apply(p)
    }

    fn close(a: [f64; 3], b: [f64; 3]) -> bool {
        (0..3).all(|i| (a[i] - b[i]).abs() < 1e-12)
    }

    #[test]
    fn test_identity() {
        let p = [0.1, 0.2, 0.3];
        assert_eq!(SymmetryOperation::identity().apply(p), p);
        assert!(close(apply("x,y,z", p), p));
    }

    #[test]
    fn test_fractions_and_signs() {
        let out = apply("x+1/2, -y, z-1/4", [0.8, 0.2, 0.1]);
        assert!(close(out, [1.3, -0.2, -0.15]));
    }

    #[test]
    fn test_leading_constant_and_combinations() {
        let out = apply("1/2+x,x-y,-z+0.5", [0.1, 0.4, 0.2]);
        assert!(close(out, [0.6, -0.3, 0.3]));
    }

    #[test]
    fn test_products_and_parentheses() {
        let out = apply("2*x, 2y, -(x+1/3)", [0.1, 0.2, 0.3]);
        assert!(close(out, [0.2, 0.4, -(0.1 + 1.0 / 3.0)]));
    }

    #[test]
    fn test_uppercase_variables() {
        let out = apply("-X,Y+1/2,Z", [0.1, 0.2, 0.3]);
        assert!(close(out, [-0.1, 0.7, 0.3]));
    }

    #[test]
    fn test_rejects_non_affine() {
        assert_eq!(SymmetryOperation::parse("x*y,y,z"), Err(SymmetryError::NonAffineProduct));
        assert_eq!(SymmetryOperation::parse("1/x,y,z"), Err(SymmetryError::DivisionByVariable));
        assert_eq!(SymmetryOperation::parse("x/0,y,z"), Err(SymmetryError::DivisionByZero));
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(SymmetryOperation::parse("x,y"), Err(SymmetryError::ComponentCount(2)));
        assert!(matches!(
            SymmetryOperation::parse("x,y,sin(z)"),
            Err(SymmetryError::UnexpectedChar('s', 0))
        ));
        assert_eq!(SymmetryOperation::parse("x,y,z+"), Err(SymmetryError::UnexpectedEnd));
        assert!(SymmetryOperation::parse("x,(y,z").is_err());
    }
}
