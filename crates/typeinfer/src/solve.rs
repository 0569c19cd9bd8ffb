use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::config::SolverConfig;
use crate::constraint::Constraint;
use crate::diagnostics::Span;
use crate::error::{SolveError, TypeError};
use crate::scheme::Scheme;
use crate::store::{Mismatch, VarStore};
use crate::types::Rank;

mod generalize;

/// Names in scope while solving. Extending it never disturbs the caller's copy.
pub type Context = im::HashMap<String, Scheme>;

/// What a finished solve leaves behind besides the mutated store.
#[derive(Debug, Clone, Default)]
pub struct Solution {
    pub errors: Vec<TypeError>,
    /// Errors dropped because `max_errors` was reached.
    pub suppressed: usize,
    /// Schemes generalized at top-level rank, by name.
    pub top_level: BTreeMap<String, Scheme>,
}

pub struct Solver<'s> {
    store: &'s mut VarStore,
    rank: Rank,
    checkpoint: Option<Span>,
    max_errors: Option<usize>,
    solution: Solution,
}

impl<'s> Solver<'s> {
    pub fn new(store: &'s mut VarStore) -> Self {
        Self::with_config(store, &SolverConfig::default())
    }

    pub fn with_config(store: &'s mut VarStore, config: &SolverConfig) -> Self {
        store.set_path_compression(config.path_compression);
        Self {
            store,
            rank: Rank::OUTERMOST,
            checkpoint: None,
            max_errors: config.max_errors,
            solution: Solution::default(),
        }
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn errors(&self) -> &[TypeError] {
        &self.solution.errors
    }

    pub fn finish(self) -> Solution {
        self.solution
    }

    /// Discharges `constraint`. Type errors are recorded and solving continues;
    /// only broken invariants come back as `Err`.
    pub fn solve(&mut self, context: &Context, constraint: &Constraint) -> Result<(), SolveError> {
        match constraint {
            Constraint::Trivial => Ok(()),
            Constraint::Checkpoint(span) => {
                self.checkpoint = Some(*span);
                Ok(())
            }
            Constraint::Equal {
                expected,
                actual,
                span,
            } => {
                if let Err(mismatch) = self.store.unify(expected, actual) {
                    self.report(mismatch, *span);
                }
                Ok(())
            }
            Constraint::And(constraints) => {
                let saved = self.checkpoint;
                for constraint in constraints {
                    self.solve(context, constraint)?;
                }
                self.checkpoint = saved;
                Ok(())
            }
            Constraint::Let(let_constraint) => self.solve_let(context, let_constraint),
            Constraint::Instance { name, ty, span } => {
                let Some(scheme) = context.get(name) else {
                    return Err(SolveError::UnboundName {
                        name: name.clone(),
                        span: *span,
                    });
                };
                let instantiated = self.instantiate(scheme, name, *span)?;
                if let Err(mismatch) = self.store.unify(ty, &instantiated) {
                    self.report(mismatch, *span);
                }
                Ok(())
            }
        }
    }

    fn report(&mut self, mismatch: Mismatch, span: Span) {
        let error = TypeError::from_mismatch(mismatch, span, self.checkpoint);
        debug!(
            target: "typeinfer::solve",
            code = error.code(),
            line = span.start.line,
            column = span.start.column,
            "{error}"
        );
        if self
            .max_errors
            .is_some_and(|max| self.solution.errors.len() >= max.max(1))
        {
            self.solution.suppressed += 1;
            trace!(target: "typeinfer::solve", "diagnostic over the configured limit");
            return;
        }
        self.solution.errors.push(error);
    }
}
