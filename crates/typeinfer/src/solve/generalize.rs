use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, trace};

use super::{Context, Solver};
use crate::constraint::{Constraint, Header, LetConstraint};
use crate::diagnostics::Span;
use crate::error::SolveError;
use crate::scheme::Scheme;
use crate::store::Content;
use crate::types::{Rank, Type, Variable};

impl<'s> Solver<'s> {
    /// A `Let` whose body is another `Let` is solved in the same frame, so a
    /// program of any number of binding groups runs in constant stack depth.
    pub(super) fn solve_let(
        &mut self,
        context: &Context,
        let_constraint: &LetConstraint,
    ) -> Result<(), SolveError> {
        let saved = self.checkpoint;
        let mut context = context.clone();
        let mut current = let_constraint;
        loop {
            context = self.bind_group(&context, current)?;
            self.checkpoint = saved;
            match &current.body {
                Constraint::Let(next) => current = &**next,
                body => {
                    self.solve(&context, body)?;
                    self.checkpoint = saved;
                    return Ok(());
                }
            }
        }
    }

    /// Solves the definitions one rank deeper and returns `context` extended
    /// with a scheme for every name of the group.
    fn bind_group(
        &mut self,
        context: &Context,
        let_constraint: &LetConstraint,
    ) -> Result<Context, SolveError> {
        let LetConstraint {
            vars, header, defs, ..
        } = let_constraint;
        let outer = self.rank;
        self.rank = outer.next();
        trace!(
            target: "typeinfer::solve",
            rank = self.rank.0,
            vars = vars.len(),
            "entering let"
        );

        // A failing definition still yields schemes, so the body sees every name.
        let solved = self.solve(context, defs);
        let quantifiers = self.generalize(header, outer);
        self.rank = outer;
        solved?;
        debug!(
            target: "typeinfer::solve",
            rank = outer.next().0,
            names = ?header.keys().collect::<Vec<_>>(),
            quantifiers = quantifiers.len(),
            "generalized binding group"
        );

        let mut extended = context.clone();
        for name in header.keys() {
            let scheme = Scheme {
                quantifiers: quantifiers.clone(),
                candidates: vars.clone(),
                qualifier: Arc::clone(defs),
                header: header.clone(),
            };
            if outer == Rank::OUTERMOST {
                self.solution.top_level.insert(name.clone(), scheme.clone());
            }
            extended.insert(name.clone(), scheme);
        }
        Ok(extended)
    }

    /// Unbound variables reachable from `header` whose rank is newer than `outer`.
    fn generalize(&mut self, header: &Header, outer: Rank) -> BTreeSet<Variable> {
        let mut quantifiers = BTreeSet::new();
        let mut visited = HashSet::new();
        for ty in header.values() {
            self.collect_generalizable(ty, outer, &mut quantifiers, &mut visited);
        }
        quantifiers
    }

    fn collect_generalizable(
        &mut self,
        ty: &Type,
        outer: Rank,
        quantifiers: &mut BTreeSet<Variable>,
        visited: &mut HashSet<Variable>,
    ) {
        match ty {
            Type::Var(var) => self.collect_var(*var, outer, quantifiers, visited),
            Type::Func(arg, ret) => {
                self.collect_generalizable(arg, outer, quantifiers, visited);
                self.collect_generalizable(ret, outer, quantifiers, visited);
            }
            Type::App(_, args) => {
                for arg in args {
                    self.collect_generalizable(arg, outer, quantifiers, visited);
                }
            }
            Type::Record { fields, ext } => {
                for field in fields.values() {
                    self.collect_generalizable(field, outer, quantifiers, visited);
                }
                if let Some(ext) = ext {
                    self.collect_var(*ext, outer, quantifiers, visited);
                }
            }
        }
    }

    fn collect_var(
        &mut self,
        var: Variable,
        outer: Rank,
        quantifiers: &mut BTreeSet<Variable>,
        visited: &mut HashSet<Variable>,
    ) {
        let root = self.store.find(var);
        if !visited.insert(root) {
            return;
        }
        match self.store.content(root).clone() {
            Content::Unbound { rank, .. } => {
                if rank > outer {
                    quantifiers.insert(root);
                }
            }
            Content::Bound(term) => self.collect_generalizable(&term, outer, quantifiers, visited),
            Content::Error => {}
        }
    }

    /// Copies `name`'s type with fresh variables for exactly the quantifiers.
    /// Everything else stays shared with the defining occurrence.
    pub(super) fn instantiate(
        &mut self,
        scheme: &Scheme,
        name: &str,
        span: Span,
    ) -> Result<Type, SolveError> {
        let Some(ty) = scheme.type_of(name) else {
            return Err(SolveError::UnboundName {
                name: name.to_string(),
                span,
            });
        };
        if scheme.is_monomorphic() {
            return Ok(ty.clone());
        }
        let quantifiers: BTreeSet<Variable> = scheme
            .quantifiers
            .iter()
            .map(|var| self.store.find(*var))
            .collect();
        let mut copies = HashMap::new();
        let instance = self.copy(ty, &quantifiers, &mut copies);
        trace!(
            target: "typeinfer::solve",
            name,
            fresh = copies.len(),
            "instantiated scheme"
        );
        Ok(instance)
    }

    fn copy(
        &mut self,
        ty: &Type,
        quantifiers: &BTreeSet<Variable>,
        copies: &mut HashMap<Variable, Variable>,
    ) -> Type {
        match ty {
            Type::Var(var) => self.copy_var(*var, quantifiers, copies),
            Type::Func(arg, ret) => Type::func(
                self.copy(arg, quantifiers, copies),
                self.copy(ret, quantifiers, copies),
            ),
            Type::App(name, args) => Type::App(
                name.clone(),
                args.iter()
                    .map(|arg| self.copy(arg, quantifiers, copies))
                    .collect(),
            ),
            Type::Record { fields, ext } => {
                let mut fields: BTreeMap<String, Type> = fields
                    .iter()
                    .map(|(name, ty)| (name.clone(), self.copy(ty, quantifiers, copies)))
                    .collect();
                let Some(ext) = ext else {
                    return Type::Record { fields, ext: None };
                };
                match self.copy_var(*ext, quantifiers, copies) {
                    Type::Var(copied) => Type::Record {
                        fields,
                        ext: Some(copied),
                    },
                    Type::Record {
                        fields: more,
                        ext: rest,
                    } => {
                        for (name, ty) in more {
                            fields.entry(name).or_insert(ty);
                        }
                        Type::Record { fields, ext: rest }
                    }
                    // Poisoned extension: keep pointing at it.
                    _ => Type::Record {
                        fields,
                        ext: Some(*ext),
                    },
                }
            }
        }
    }

    fn copy_var(
        &mut self,
        var: Variable,
        quantifiers: &BTreeSet<Variable>,
        copies: &mut HashMap<Variable, Variable>,
    ) -> Type {
        let root = self.store.find(var);
        if let Some(copy) = copies.get(&root) {
            return Type::Var(*copy);
        }
        match self.store.content(root).clone() {
            Content::Unbound { hint, .. } if quantifiers.contains(&root) => {
                let fresh = self.store.fresh(self.rank, hint.as_deref());
                copies.insert(root, fresh);
                Type::Var(fresh)
            }
            Content::Bound(term) => self.copy(&term, quantifiers, copies),
            Content::Unbound { .. } | Content::Error => Type::Var(var),
        }
    }
}
