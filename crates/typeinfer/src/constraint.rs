use std::collections::BTreeMap;
use std::sync::Arc;

use crate::diagnostics::Span;
use crate::types::{Type, Variable};

/// Names bound by a binding group or pattern, with their (not yet generalized) types.
pub type Header = BTreeMap<String, Type>;

/// Obligations gathered during generation and discharged later by the solver.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Constraint {
    #[default]
    Trivial,
    /// Marks the region later errors are attributed to.
    Checkpoint(Span),
    Equal {
        expected: Type,
        actual: Type,
        span: Span,
    },
    /// Solved left to right; errors are reported in that order.
    And(Vec<Constraint>),
    Let(Box<LetConstraint>),
    Instance {
        name: String,
        ty: Type,
        span: Span,
    },
}

/// A generalization boundary. `defs` is shared with the schemes built from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetConstraint {
    pub vars: Vec<Variable>,
    pub header: Header,
    pub defs: Arc<Constraint>,
    pub body: Constraint,
}

// Program-level groups nest one `Let` per group; unlink the chain iteratively.
impl Drop for LetConstraint {
    fn drop(&mut self) {
        let mut body = std::mem::take(&mut self.body);
        while let Constraint::Let(mut next) = body {
            body = std::mem::take(&mut next.body);
        }
    }
}

impl Constraint {
    pub fn equal(expected: Type, actual: Type, span: Span) -> Constraint {
        Constraint::Equal {
            expected,
            actual,
            span,
        }
    }

    pub fn instance(name: &str, ty: Type, span: Span) -> Constraint {
        Constraint::Instance {
            name: name.to_string(),
            ty,
            span,
        }
    }

    pub fn let_in(
        vars: Vec<Variable>,
        header: Header,
        defs: impl Into<Arc<Constraint>>,
        body: Constraint,
    ) -> Constraint {
        Constraint::Let(Box::new(LetConstraint {
            vars,
            header,
            defs: defs.into(),
            body,
        }))
    }

    /// Binds a recursive group's names monomorphically around its own definitions,
    /// so uses inside the group share the defining occurrence's variables.
    pub fn recursive(header: Header, defs: Constraint) -> Constraint {
        if header.is_empty() {
            return defs;
        }
        Constraint::let_in(Vec::new(), header, Constraint::Trivial, defs)
    }

    /// Conjunction. `Trivial` is dropped and nested conjunctions are flattened,
    /// so the operation is associative on the nose.
    pub fn and(self, other: Constraint) -> Constraint {
        match (self, other) {
            (Constraint::Trivial, other) | (other, Constraint::Trivial) => other,
            (Constraint::And(mut left), Constraint::And(right)) => {
                left.extend(right);
                Constraint::And(left)
            }
            (Constraint::And(mut left), right) => {
                left.push(right);
                Constraint::And(left)
            }
            (left, Constraint::And(mut right)) => {
                right.insert(0, left);
                Constraint::And(right)
            }
            (left, right) => Constraint::And(vec![left, right]),
        }
    }

    pub fn all<I>(constraints: I) -> Constraint
    where
        I: IntoIterator<Item = Constraint>,
    {
        constraints
            .into_iter()
            .fold(Constraint::Trivial, Constraint::and)
    }

    pub fn is_trivial(&self) -> bool {
        matches!(self, Constraint::Trivial)
    }
}
