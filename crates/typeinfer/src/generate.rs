use std::collections::BTreeMap;

use tracing::debug;

use crate::ast::{Def, NodeId, Program};
use crate::constraint::Constraint;
use crate::env::Environment;
use crate::error::SolveError;
use crate::fragment::Fragment;
use crate::scheme::Scheme;
use crate::store::VarStore;
use crate::types::{Rank, Type, Variable};

mod expr;
mod pattern;

/// Walks the AST once, allocating variables and building the constraint tree.
///
/// `rank` mirrors the rank the solver will be at when it reaches the constraint
/// being built, so every variable is born at the rank of the `Let` that owns it.
pub struct Generator<'a> {
    store: &'a mut VarStore,
    env: &'a Environment,
    rank: Rank,
    node_types: BTreeMap<NodeId, Type>,
}

impl<'a> Generator<'a> {
    pub fn new(store: &'a mut VarStore, env: &'a Environment) -> Self {
        Self {
            store,
            env,
            rank: Rank::OUTERMOST,
            node_types: BTreeMap::new(),
        }
    }

    /// The type each expression node was checked against.
    pub fn finish(self) -> BTreeMap<NodeId, Type> {
        self.node_types
    }

    /// One `Let` per binding group, nested in order so later groups see earlier ones.
    pub fn program(&mut self, program: &Program) -> Result<Constraint, SolveError> {
        let schemes = program
            .groups
            .iter()
            .map(|group| self.binding_group(&group.defs))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            target: "typeinfer::generate",
            groups = schemes.len(),
            variables = self.store.len(),
            "generated program constraints"
        );
        Ok(schemes
            .into_iter()
            .rev()
            .fold(Constraint::Trivial, |body, scheme| scheme.into_let(body)))
    }

    /// Generates a mutually recursive group one rank deeper. Recursive uses are
    /// solved against the group's own monomorphic header.
    pub(crate) fn binding_group(&mut self, defs: &[Def]) -> Result<Scheme, SolveError> {
        let fragments = self.nested(|generator| {
            defs.iter()
                .map(|def| generator.definition(def))
                .collect::<Result<Vec<_>, _>>()
        })?;
        let Fragment {
            env,
            vars,
            constraint,
        } = Fragment::join_all(fragments);
        let constraint = Constraint::recursive(env.clone(), constraint);
        Ok(Fragment {
            env,
            vars,
            constraint,
        }
        .into_scheme())
    }

    fn definition(&mut self, def: &Def) -> Result<Fragment, SolveError> {
        let var = self.fresh(None);
        let body = self.function(&def.params, &def.body, Type::Var(var), def.span)?;
        Ok(Fragment::binding(
            &def.name,
            var,
            Constraint::Checkpoint(def.span).and(body),
        ))
    }

    /// Runs `f` one rank deeper.
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SolveError>,
    ) -> Result<T, SolveError> {
        self.rank = self.rank.next();
        let result = f(self);
        self.rank = self.rank.prev();
        result
    }

    fn fresh(&mut self, hint: Option<&str>) -> Variable {
        self.store.fresh(self.rank, hint)
    }

    fn fresh_type(&mut self) -> Type {
        self.store.fresh_type(self.rank)
    }
}

#[cfg(test)]
mod tests;
