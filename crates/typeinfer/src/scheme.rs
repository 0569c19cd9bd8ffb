use std::collections::BTreeSet;
use std::sync::Arc;

use crate::constraint::{Constraint, Header};
use crate::types::{Type, Variable};

/// A (possibly) polymorphic binding group.
///
/// `candidates` are the variables introduced while generating the group; the solver
/// decides by rank which of them end up in `quantifiers`. `qualifier` travels with
/// the binding and is shared by every name of the group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheme {
    pub quantifiers: BTreeSet<Variable>,
    pub candidates: Vec<Variable>,
    pub qualifier: Arc<Constraint>,
    pub header: Header,
}

impl Scheme {
    /// A fully quantified scheme for a single name, as used for the initial context.
    pub fn closed(name: &str, ty: Type, quantifiers: Vec<Variable>) -> Scheme {
        Scheme {
            quantifiers: quantifiers.iter().copied().collect(),
            candidates: quantifiers,
            qualifier: Arc::new(Constraint::Trivial),
            header: Header::from([(name.to_string(), ty)]),
        }
    }

    pub fn type_of(&self, name: &str) -> Option<&Type> {
        self.header.get(name)
    }

    pub fn is_monomorphic(&self) -> bool {
        self.quantifiers.is_empty()
    }

    /// The generalization boundary this scheme stands for, with `body` solved in its scope.
    pub fn into_let(self, body: Constraint) -> Constraint {
        Constraint::let_in(self.candidates, self.header, self.qualifier, body)
    }
}
