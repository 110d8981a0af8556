//! Recursive-descent parser producing [`PathExpr`] values.
//!
//! Grammar (whitespace insignificant):
//!
//! ```text
//! expr       := path ( ('=' | '!=') operand )?
//! path       := segment ( '.' segment )*
//! segment    := identifier '(' ')'            -- function call
//!             | identifier ( '[' integer ']' )*
//! operand    := literal | '%' identifier
//! literal    := string | integer | decimal | 'true' | 'false'
//! ```

use crate::ast::{CompareOp, Comparison, Function, Literal, Operand, PathExpr, Step};
use crate::tokenizer::{Spanned, Token, tokenize};
use crate::{ParseError, ParseResult};

/// Compile a path expression. All grammar and function-name errors are
/// caught here; the resulting [`PathExpr`] evaluates without failure.
pub fn parse(input: &str) -> ParseResult<PathExpr> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expr()?;
    parser.expect_end()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Spanned>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|s| s.token.clone())
    }

    fn advance(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.pos).cloned();
        if spanned.is_some() {
            self.pos += 1;
        }
        spanned
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        match self.tokens.get(self.pos) {
            Some(spanned) => ParseError::UnexpectedToken {
                found: spanned.token.describe(),
                expected,
                offset: spanned.offset,
            },
            None => ParseError::UnexpectedEof,
        }
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> ParseResult<()> {
        if self.peek() == Some(token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_end(&self) -> ParseResult<()> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(self.unexpected("end of expression"))
        }
    }

    fn parse_expr(&mut self) -> ParseResult<PathExpr> {
        let steps = self.parse_path()?;

        let comparison = match self.peek() {
            Some(Token::Equal) => {
                self.pos += 1;
                Some(Comparison {
                    op: CompareOp::Equal,
                    rhs: self.parse_operand()?,
                })
            }
            Some(Token::NotEqual) => {
                self.pos += 1;
                Some(Comparison {
                    op: CompareOp::NotEqual,
                    rhs: self.parse_operand()?,
                })
            }
            _ => None,
        };

        Ok(PathExpr { steps, comparison })
    }

    fn parse_path(&mut self) -> ParseResult<Vec<Step>> {
        let mut steps = Vec::new();
        self.parse_segment(&mut steps)?;

        while self.peek() == Some(Token::Dot) {
            self.pos += 1;
            self.parse_segment(&mut steps)?;
        }

        Ok(steps)
    }

    fn parse_segment(&mut self, steps: &mut Vec<Step>) -> ParseResult<()> {
        let name = match self.peek() {
            Some(Token::Identifier(name)) => name,
            _ => return Err(self.unexpected("identifier")),
        };
        self.pos += 1;

        if self.peek() == Some(Token::LeftParen) {
            self.pos += 1;
            let function = Function::from_name(&name)
                .ok_or(ParseError::UnknownFunction { name: name.clone() })?;
            match self.peek() {
                Some(Token::RightParen) => {
                    self.pos += 1;
                }
                Some(_) => {
                    return Err(ParseError::UnexpectedArguments { name });
                }
                None => return Err(ParseError::UnexpectedEof),
            }
            steps.push(Step::Function(function));
            return Ok(());
        }

        steps.push(Step::Member(name));

        while self.peek() == Some(Token::LeftBracket) {
            self.pos += 1;
            let index = match self.advance() {
                Some(Spanned {
                    token: Token::Integer(i),
                    offset,
                }) => {
                    if i < 0 {
                        return Err(ParseError::UnexpectedToken {
                            found: format!("integer {i}"),
                            expected: "non-negative index",
                            offset,
                        });
                    }
                    i as usize
                }
                Some(spanned) => {
                    return Err(ParseError::UnexpectedToken {
                        found: spanned.token.describe(),
                        expected: "integer index",
                        offset: spanned.offset,
                    });
                }
                None => return Err(ParseError::UnexpectedEof),
            };
            self.expect(Token::RightBracket, "']'")?;
            steps.push(Step::Index(index));
        }

        Ok(())
    }

    fn parse_operand(&mut self) -> ParseResult<Operand> {
        match self.peek() {
            Some(Token::Percent) => {
                self.pos += 1;
                match self.peek() {
                    Some(Token::Identifier(name)) => {
                        self.pos += 1;
                        Ok(Operand::Constant(name))
                    }
                    _ => Err(self.unexpected("constant name")),
                }
            }
            Some(Token::String(s)) => {
                self.pos += 1;
                Ok(Operand::Literal(Literal::String(s)))
            }
            Some(Token::Integer(i)) => {
                self.pos += 1;
                Ok(Operand::Literal(Literal::Integer(i)))
            }
            Some(Token::Decimal(d)) => {
                self.pos += 1;
                Ok(Operand::Literal(Literal::Decimal(d)))
            }
            Some(Token::Boolean(b)) => {
                self.pos += 1;
                Ok(Operand::Literal(Literal::Boolean(b)))
            }
            _ => Err(self.unexpected("literal or constant")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_member_chain() {
        let expr = parse("name.family").unwrap();
        assert_eq!(
            expr.steps,
            vec![Step::Member("name".into()), Step::Member("family".into())]
        );
        assert!(expr.comparison.is_none());
    }

    #[test]
    fn parses_function_call() {
        let expr = parse("name.given.first()").unwrap();
        assert_eq!(
            expr.steps,
            vec![
                Step::Member("name".into()),
                Step::Member("given".into()),
                Step::Function(Function::First),
            ]
        );
    }

    #[test]
    fn parses_index() {
        let expr = parse("name[0].given[1]").unwrap();
        assert_eq!(
            expr.steps,
            vec![
                Step::Member("name".into()),
                Step::Index(0),
                Step::Member("given".into()),
                Step::Index(1),
            ]
        );
    }

    #[test]
    fn parses_comparison_with_boolean() {
        let expr = parse("active = true").unwrap();
        assert_eq!(expr.steps, vec![Step::Member("active".into())]);
        assert_eq!(
            expr.comparison,
            Some(Comparison {
                op: CompareOp::Equal,
                rhs: Operand::Literal(Literal::Boolean(true)),
            })
        );
    }

    #[test]
    fn parses_not_equal_with_string() {
        let expr = parse("gender != 'male'").unwrap();
        assert_eq!(
            expr.comparison,
            Some(Comparison {
                op: CompareOp::NotEqual,
                rhs: Operand::Literal(Literal::String("male".into())),
            })
        );
    }

    #[test]
    fn parses_constant_reference() {
        let expr = parse("status = %statusFilter").unwrap();
        assert_eq!(
            expr.comparison,
            Some(Comparison {
                op: CompareOp::Equal,
                rhs: Operand::Constant("statusFilter".into()),
            })
        );
    }

    #[test]
    fn rejects_unknown_function() {
        assert_eq!(
            parse("name.where()"),
            Err(ParseError::UnknownFunction {
                name: "where".into()
            })
        );
    }

    #[test]
    fn rejects_function_arguments() {
        assert_eq!(
            parse("name.exists(use)"),
            Err(ParseError::UnexpectedArguments {
                name: "exists".into()
            })
        );
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse("name.family extra").is_err());
    }

    #[test]
    fn rejects_empty_expression() {
        assert_eq!(parse(""), Err(ParseError::UnexpectedEof));
        assert_eq!(parse("   "), Err(ParseError::UnexpectedEof));
    }

    #[test]
    fn rejects_leading_dot() {
        assert!(parse(".name").is_err());
    }

    #[test]
    fn rejects_dangling_dot() {
        assert_eq!(parse("name."), Err(ParseError::UnexpectedEof));
    }
}
