use std::fmt;

use crate::models::{PhraseId, Presence};

/// The expression tree a formula parses into.
///
/// Leaves are phrase slots; every interior node is a fixed boolean
/// connective. The tree is evaluated by walking it, so user text is never
/// executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Presence of one phrase in the content unit.
    Var(PhraseId),

    /// Logical negation.
    Not(Box<Expr>),

    /// Logical AND of two sub-expressions.
    And(Box<Expr>, Box<Expr>),

    /// Logical OR of two sub-expressions.
    Or(Box<Expr>, Box<Expr>),

    /// Negated OR.
    Nor(Box<Expr>, Box<Expr>),

    /// True when the operands differ.
    Xor(Box<Expr>, Box<Expr>),

    /// True when the operands are equal.
    Xnor(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn evaluate(&self, presence: &Presence) -> bool {
        match self {
            Expr::Var(id) => presence.get(*id),
            Expr::Not(inner) => !inner.evaluate(presence),
            Expr::And(left, right) => left.evaluate(presence) && right.evaluate(presence),
            Expr::Or(left, right) => left.evaluate(presence) || right.evaluate(presence),
            Expr::Nor(left, right) => !(left.evaluate(presence) || right.evaluate(presence)),
            Expr::Xor(left, right) => left.evaluate(presence) != right.evaluate(presence),
            Expr::Xnor(left, right) => left.evaluate(presence) == right.evaluate(presence),
        }
    }

    /// Collects every phrase slot referenced by the tree (with duplicates).
    pub fn collect_vars(&self, out: &mut Vec<PhraseId>) {
        match self {
            Expr::Var(id) => out.push(*id),
            Expr::Not(inner) => inner.collect_vars(out),
            Expr::And(left, right)
            | Expr::Or(left, right)
            | Expr::Nor(left, right)
            | Expr::Xor(left, right)
            | Expr::Xnor(left, right) => {
                left.collect_vars(out);
                right.collect_vars(out);
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var(id) => write!(f, "{id}"),
            Expr::Not(inner) => write!(f, "NOT {inner}"),
            Expr::And(left, right) => write!(f, "({left} AND {right})"),
            Expr::Or(left, right) => write!(f, "({left} OR {right})"),
            Expr::Nor(left, right) => write!(f, "({left} NOR {right})"),
            Expr::Xor(left, right) => write!(f, "({left} XOR {right})"),
            Expr::Xnor(left, right) => write!(f, "({left} XNOR {right})"),
        }
    }
}
