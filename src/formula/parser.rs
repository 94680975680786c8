use std::fmt;
use tracing::debug;

use crate::formula::errors::EvaluationError;
use crate::formula::expr::Expr;
use crate::formula::lexer::{tokenize, Token};
use crate::models::{PhraseId, PhraseSet};

/// Deepest nesting the parser accepts, counted both as `NOT`/group
/// recursion and as height of the resulting tree.
pub const MAX_DEPTH: usize = 256;

/// Recursive-descent parser over the token stream.
///
/// Grammar, lowest precedence first:
///
/// ```text
/// or_expr   := and_expr (("OR" | "NOR" | "XOR" | "XNOR") and_expr)*
/// and_expr  := unary ("AND" unary)*
/// unary     := "NOT" unary | primary
/// primary   := VAR | open or_expr close      (close must match open)
/// ```
///
/// OR, NOR, XOR and XNOR share one precedence level and associate left.
/// Every sub-parser returns the height of the tree it built alongside it.
struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Parser {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.peek()?;
        self.pos += 1;
        Some(t)
    }

    fn unexpected(&self, token: Token) -> EvaluationError {
        EvaluationError::UnexpectedToken {
            token: token.to_string(),
            index: self.pos + 1,
        }
    }

    fn descend(&mut self) -> Result<(), EvaluationError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvaluationError::TooDeep { limit: MAX_DEPTH });
        }
        Ok(())
    }

    fn node(expr: Expr, height: usize) -> Result<(Expr, usize), EvaluationError> {
        if height > MAX_DEPTH {
            return Err(EvaluationError::TooDeep { limit: MAX_DEPTH });
        }
        Ok((expr, height))
    }

    fn parse(mut self) -> Result<Expr, EvaluationError> {
        let (expr, _) = self.parse_or_expr()?;
        // Unlike a search query, leftover tokens mean the formula is malformed
        match self.peek() {
            Some(t) => Err(self.unexpected(t)),
            None => Ok(expr),
        }
    }

    fn parse_or_expr(&mut self) -> Result<(Expr, usize), EvaluationError> {
        let (mut left, mut height) = self.parse_and_expr()?;

        while let Some(op @ (Token::Or | Token::Nor | Token::Xor | Token::Xnor)) = self.peek() {
            self.next();
            let (right, right_height) = self.parse_and_expr()?;
            let (l, r) = (Box::new(left), Box::new(right));
            let expr = match op {
                Token::Or => Expr::Or(l, r),
                Token::Nor => Expr::Nor(l, r),
                Token::Xor => Expr::Xor(l, r),
                _ => Expr::Xnor(l, r),
            };
            (left, height) = Self::node(expr, height.max(right_height) + 1)?;
        }
        Ok((left, height))
    }

    fn parse_and_expr(&mut self) -> Result<(Expr, usize), EvaluationError> {
        let (mut left, mut height) = self.parse_unary()?;

        while let Some(Token::And) = self.peek() {
            self.next();
            let (right, right_height) = self.parse_unary()?;
            let expr = Expr::And(Box::new(left), Box::new(right));
            (left, height) = Self::node(expr, height.max(right_height) + 1)?;
        }
        Ok((left, height))
    }

    fn parse_unary(&mut self) -> Result<(Expr, usize), EvaluationError> {
        if let Some(Token::Not) = self.peek() {
            self.next();
            self.descend()?;
            let (inner, height) = self.parse_unary()?;
            self.depth -= 1;
            return Self::node(Expr::Not(Box::new(inner)), height + 1);
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<(Expr, usize), EvaluationError> {
        match self.peek() {
            Some(Token::Var(id)) => {
                self.next();
                Ok((Expr::Var(id), 1))
            }
            Some(Token::Open(open)) => {
                self.next();
                self.descend()?;
                let inner = self.parse_or_expr()?;
                self.depth -= 1;
                match self.peek() {
                    Some(Token::Close(close)) if close == open => {
                        self.next();
                        Ok(inner)
                    }
                    Some(Token::Close(close)) => Err(EvaluationError::MismatchedBracket {
                        open: open.open_char(),
                        close: close.close_char(),
                        index: self.pos + 1,
                    }),
                    Some(t) => Err(self.unexpected(t)),
                    None => Err(EvaluationError::UnexpectedEnd),
                }
            }
            Some(t) => Err(self.unexpected(t)),
            None => Err(EvaluationError::UnexpectedEnd),
        }
    }
}

/// Parses an already tokenized formula into its expression tree.
pub(crate) fn parse_tokens(tokens: &[Token]) -> Result<Expr, EvaluationError> {
    Parser::new(tokens).parse()
}

/// A formula parsed once and evaluated many times.
///
/// An empty or whitespace-only formula compiles to a formula that never
/// matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFormula {
    source: String,
    expr: Option<Expr>,
}

impl CompiledFormula {
    pub fn compile(formula: &str) -> Result<Self, EvaluationError> {
        let expr = if formula.trim().is_empty() {
            None
        } else {
            let tokens = tokenize(formula)?;
            let expr = parse_tokens(&tokens)?;
            debug!("Parsed formula {:?} => {}", formula, expr);
            Some(expr)
        };

        Ok(CompiledFormula {
            source: formula.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> Option<&Expr> {
        self.expr.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.expr.is_none()
    }

    /// Distinct phrase slots the formula references, in `A`..`F` order.
    pub fn referenced(&self) -> Vec<PhraseId> {
        let mut vars = Vec::new();
        if let Some(expr) = &self.expr {
            expr.collect_vars(&mut vars);
        }
        vars.sort_unstable();
        vars.dedup();
        vars
    }

    pub fn evaluate(&self, phrases: &PhraseSet, content: &str) -> bool {
        match &self.expr {
            Some(expr) => expr.evaluate(&phrases.presence(content)),
            None => false,
        }
    }
}

impl fmt::Display for CompiledFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.expr {
            Some(expr) => write!(f, "{expr}"),
            None => Ok(()),
        }
    }
}
