//! Text parser for condition lists and indicator lists.
//!
//! Recursive descent over the grammar:
//!
//! ```text
//! conditions := condition (';' condition)* [';']
//! condition  := key comparator operand
//!             | 'macd' ('crosses_above' | 'crosses_below')
//! operand    := value | '[' value ',' value ']'
//! value      := number | key
//! indicators := spec (',' spec)*
//! spec       := name [ '(' param (',' param)* ')' ]
//! param      := name '=' number
//! ```
//!
//! The bare `macd` crossing compares the MACD line against `macd_signal`.
//!
//! Errors carry the character offset of the offending token.

use crate::domain::condition::{Comparator, Condition, ConditionValue, Operand};
use crate::domain::error::ParseError;
use crate::domain::indicator::IndicatorSpec;

const MACD_LINE: &str = "macd";
const MACD_SIGNAL: &str = "macd_signal";

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.peek().is_none()
    }

    fn consume_char(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        if self.consume_char(expected) {
            return Ok(());
        }
        Err(ParseError {
            message: format!("expected '{}', found '{}'", expected, self.peek_word()),
            position: self.pos,
        })
    }

    fn peek_word(&self) -> String {
        let word: String = self
            .remaining()
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        if word.is_empty() {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        } else {
            word
        }
    }

    fn parse_identifier(&mut self, what: &str) -> Result<String, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        match self.peek() {
            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {}
            _ => {
                return Err(ParseError {
                    message: format!("expected {}, found '{}'", what, self.peek_word()),
                    position: start,
                });
            }
        }
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        Ok(self.input[start..self.pos].to_ascii_lowercase())
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if self.peek() == Some('-') {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError {
                message: "expected number".to_string(),
                position: start,
            });
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<f64>().map_err(|_| ParseError {
            message: format!("invalid number: {}", num_str),
            position: start,
        })
    }

    fn parse_value(&mut self) -> Result<Operand, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch.is_ascii_digit() || ch == '-' || ch == '.' => {
                Ok(Operand::Literal(self.parse_number()?))
            }
            _ => Ok(Operand::IndicatorRef(self.parse_identifier("number or indicator key")?)),
        }
    }

    fn parse_comparator(&mut self) -> Result<Comparator, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let word = self.parse_identifier("comparator")?;
        word.parse::<Comparator>().map_err(|_| {
            let known: Vec<&str> = Comparator::ALL.iter().map(|c| c.as_str()).collect();
            ParseError {
                message: format!(
                    "unknown comparator '{}', expected one of {}",
                    word,
                    known.join(", ")
                ),
                position: start,
            }
        })
    }

    fn parse_condition(&mut self) -> Result<Condition, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let key = self.parse_identifier("indicator key")?;
        let comparator = self.parse_comparator()?;

        self.skip_whitespace();
        let value_pos = self.pos;
        let operand_missing = matches!(self.peek(), None | Some(';'));
        let value = if operand_missing && key == MACD_LINE && comparator.is_crossing() {
            ConditionValue::Single(Operand::IndicatorRef(MACD_SIGNAL.to_string()))
        } else if self.consume_char('[') {
            let lower = self.parse_value()?;
            self.expect_char(',')?;
            let upper = self.parse_value()?;
            self.expect_char(']')?;
            ConditionValue::Range(lower, upper)
        } else {
            ConditionValue::Single(self.parse_value()?)
        };

        Condition::new(&key, comparator, value).map_err(|e| ParseError {
            message: e.to_string(),
            position: if comparator == Comparator::Between {
                value_pos
            } else {
                start
            },
        })
    }

    fn parse_conditions(&mut self) -> Result<Vec<Condition>, ParseError> {
        let mut conditions = Vec::new();
        while !self.at_end() {
            conditions.push(self.parse_condition()?);
            if self.at_end() {
                break;
            }
            self.expect_char(';')?;
        }
        Ok(conditions)
    }

    fn parse_indicator_spec(&mut self) -> Result<IndicatorSpec, ParseError> {
        let mut spec = IndicatorSpec::new(self.parse_identifier("indicator name")?);
        if self.consume_char('(') {
            if self.consume_char(')') {
                return Ok(spec);
            }
            loop {
                let key = self.parse_identifier("parameter name")?;
                self.expect_char('=')?;
                let value = self.parse_number()?;
                spec.params.push((key, value));
                if self.consume_char(')') {
                    break;
                }
                self.expect_char(',')?;
            }
        }
        Ok(spec)
    }

    fn parse_indicator_specs(&mut self) -> Result<Vec<IndicatorSpec>, ParseError> {
        let mut specs = Vec::new();
        while !self.at_end() {
            specs.push(self.parse_indicator_spec()?);
            if self.at_end() {
                break;
            }
            self.expect_char(',')?;
        }
        Ok(specs)
    }
}

/// Parse a `;`-separated condition list. Empty input yields an empty list.
pub fn parse_conditions(input: &str) -> Result<Vec<Condition>, ParseError> {
    Parser::new(input).parse_conditions()
}

/// Parse a single condition.
pub fn parse_condition(input: &str) -> Result<Condition, ParseError> {
    let mut parser = Parser::new(input);
    let condition = parser.parse_condition()?;
    if !parser.at_end() {
        return Err(ParseError {
            message: format!("unexpected trailing input '{}'", parser.peek_word()),
            position: parser.pos,
        });
    }
    Ok(condition)
}

/// Parse a `,`-separated indicator list such as `ema(period=5), bbands`.
pub fn parse_indicator_specs(input: &str) -> Result<Vec<IndicatorSpec>, ParseError> {
    Parser::new(input).parse_indicator_specs()
}
