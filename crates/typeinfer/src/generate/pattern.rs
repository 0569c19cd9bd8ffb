use super::expr::literal_type;
use super::Generator;
use crate::ast::{Pattern, PatternKind};
use crate::constraint::{Constraint, Header};
use crate::error::SolveError;
use crate::fragment::Fragment;
use crate::types::{Type, Variable};

impl Generator<'_> {
    /// Binds the pattern's variables and ties its shape to `expected`, the type
    /// of the value being matched.
    pub(crate) fn pattern(
        &mut self,
        pattern: &Pattern,
        expected: Type,
    ) -> Result<Fragment, SolveError> {
        let span = pattern.span;
        match &pattern.kind {
            PatternKind::Wildcard => Ok(Fragment::empty()),
            PatternKind::Var { name } => {
                let var = self.fresh(None);
                Ok(Fragment::binding(
                    name,
                    var,
                    Constraint::equal(expected, Type::Var(var), span),
                ))
            }
            PatternKind::Literal { value } => Ok(Fragment {
                constraint: Constraint::equal(expected, literal_type(value), span),
                ..Fragment::empty()
            }),
            PatternKind::Ctor { name, args } => {
                let (params, result) =
                    self.env
                        .instantiate_ctor(self.store, name, self.rank, span)?;
                let vars: Vec<Variable> = args.iter().map(|_| self.fresh(None)).collect();
                // Comparing curried shapes reports a wrong argument count as a mismatch.
                let head = Fragment {
                    env: Header::new(),
                    vars: vars.clone(),
                    constraint: Constraint::all([
                        Constraint::equal(expected, result.clone(), span),
                        Constraint::equal(
                            Type::curried(vars.iter().map(|var| Type::Var(*var)), result.clone()),
                            Type::curried(params, result),
                            span,
                        ),
                    ]),
                };
                let subpatterns = args
                    .iter()
                    .zip(&vars)
                    .map(|(arg, var)| self.pattern(arg, Type::Var(*var)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(head.join(Fragment::join_all(subpatterns)))
            }
            PatternKind::Record { fields } => {
                let ext = self.fresh(None);
                let bindings: Vec<Fragment> = fields
                    .iter()
                    .map(|field| {
                        let var = self.fresh(None);
                        Fragment::binding(field, var, Constraint::Trivial)
                    })
                    .collect();
                let bindings = Fragment::join_all(bindings);
                let row = Type::Record {
                    fields: bindings.env.clone(),
                    ext: Some(ext),
                };
                let head = Fragment {
                    env: Header::new(),
                    vars: vec![ext],
                    constraint: Constraint::equal(expected, row, span),
                };
                Ok(head.join(bindings))
            }
            PatternKind::As { pattern, name } => {
                let var = self.fresh(None);
                let alias = Fragment::binding(
                    name,
                    var,
                    Constraint::equal(expected.clone(), Type::Var(var), span),
                );
                Ok(alias.join(self.pattern(pattern, expected)?))
            }
        }
    }
}
