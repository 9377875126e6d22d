//! Infix arithmetic evaluator backing the agent's calculator tool.
//! Supports `+ - * / ^`, parentheses, unary minus, and decimal numbers.

#[derive(Debug, PartialEq)]
pub enum CalcError {
    Empty,
    UnexpectedChar(char),
    UnexpectedEnd,
    TrailingInput,
    DivisionByZero,
}

impl std::fmt::Display for CalcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalcError::Empty => write!(f, "empty expression"),
            CalcError::UnexpectedChar(c) => write!(f, "unexpected character '{}'", c),
            CalcError::UnexpectedEnd => write!(f, "expression ended unexpectedly"),
            CalcError::TrailingInput => write!(f, "unexpected trailing input"),
            CalcError::DivisionByZero => write!(f, "division by zero"),
        }
    }
}

pub fn evaluate(expression: &str) -> Result<f64, CalcError> {
    let mut parser = Parser {
        chars: expression.chars().collect(),
        pos: 0,
    };
    parser.skip_ws();
    if parser.at_end() {
        return Err(CalcError::Empty);
    }
    let value = parser.expr()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(CalcError::TrailingInput);
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some('+') => {
                    self.bump();
                    value += self.term()?;
                }
                Some('-') => {
                    self.bump();
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    // term := power (('*' | '/') power)*
    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.power()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some('*') => {
                    self.bump();
                    value *= self.power()?;
                }
                Some('/') => {
                    self.bump();
                    let divisor = self.power()?;
                    if divisor == 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    // power := atom ('^' power)?   (right-associative)
    fn power(&mut self) -> Result<f64, CalcError> {
        let base = self.atom()?;
        self.skip_ws();
        if self.peek() == Some('^') {
            self.bump();
            let exponent = self.power()?;
            Ok(base.powf(exponent))
        } else {
            Ok(base)
        }
    }

    // atom := '-' atom | '(' expr ')' | number
    fn atom(&mut self) -> Result<f64, CalcError> {
        self.skip_ws();
        match self.peek() {
            None => Err(CalcError::UnexpectedEnd),
            Some('-') => {
                self.bump();
                Ok(-self.atom()?)
            }
            Some('(') => {
                self.bump();
                let value = self.expr()?;
                self.skip_ws();
                match self.bump() {
                    Some(')') => Ok(value),
                    Some(c) => Err(CalcError::UnexpectedChar(c)),
                    None => Err(CalcError::UnexpectedEnd),
                }
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) => Err(CalcError::UnexpectedChar(c)),
        }
    }

    fn number(&mut self) -> Result<f64, CalcError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse()
            .map_err(|_| CalcError::UnexpectedChar(text.chars().next().unwrap_or('?')))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(s: &str) -> f64 {
        evaluate(s).unwrap()
    }

    #[test]
    fn test_basic_arithmetic() {
        assert_eq!(eval("2+2"), 4.0);
        assert_eq!(eval("10 - 3"), 7.0);
        assert_eq!(eval("6 * 7"), 42.0);
        assert_eq!(eval("9 / 2"), 4.5);
    }

    #[test]
    fn test_precedence_and_parens() {
        assert_eq!(eval("2 + 3 * 4"), 14.0);
        assert_eq!(eval("(2 + 3) * 4"), 20.0);
        assert_eq!(eval("2 * (1 + (3 - 1))"), 6.0);
    }

    #[test]
    fn test_power_is_right_associative() {
        assert_eq!(eval("2 ^ 10"), 1024.0);
        assert_eq!(eval("2 ^ 3 ^ 2"), 512.0);
    }

    #[test]
    fn test_unary_minus_and_decimals() {
        assert_eq!(eval("-4 + 10"), 6.0);
        assert_eq!(eval("--5"), 5.0);
        assert!((eval("0.1 + 0.2") - 0.3).abs() < 1e-9);
        assert_eq!(eval("-(2 + 3)"), -5.0);
    }

    #[test]
    fn test_errors() {
        assert_eq!(evaluate(""), Err(CalcError::Empty));
        assert_eq!(evaluate("   "), Err(CalcError::Empty));
        assert_eq!(evaluate("1/0"), Err(CalcError::DivisionByZero));
        assert_eq!(evaluate("2 +"), Err(CalcError::UnexpectedEnd));
        assert_eq!(evaluate("(1 + 2"), Err(CalcError::UnexpectedEnd));
        assert_eq!(evaluate("2 2"), Err(CalcError::TrailingInput));
        assert_eq!(evaluate("two"), Err(CalcError::UnexpectedChar('t')));
    }
}
