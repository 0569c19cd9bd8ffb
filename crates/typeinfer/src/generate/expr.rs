use std::collections::BTreeMap;

use super::Generator;
use crate::ast::{Branch, Expr, ExprKind, Field, Literal, Pattern};
use crate::constraint::Constraint;
use crate::diagnostics::Span;
use crate::error::SolveError;
use crate::fragment::Fragment;
use crate::types::{Type, BOOL, CHAR, FLOAT, INT, STRING};

impl Generator<'_> {
    /// Constraints making `expr` have type `expected`.
    pub(crate) fn expr(&mut self, expr: &Expr, expected: Type) -> Result<Constraint, SolveError> {
        self.node_types.insert(expr.id, expected.clone());
        let span = expr.span;
        match &expr.kind {
            ExprKind::Literal { value } => {
                Ok(Constraint::equal(expected, literal_type(value), span))
            }
            ExprKind::Var { name } => Ok(Constraint::instance(name, expected, span)),
            ExprKind::Lambda { params, body } => self.function(params, body, expected, span),
            ExprKind::Apply { func, args } => self.apply(func, args, expected),
            ExprKind::Let { defs, body } => {
                let scheme = self.binding_group(defs)?;
                let body = self.expr(body, expected)?;
                Ok(scheme.into_let(body))
            }
            ExprKind::Case {
                scrutinee,
                branches,
            } => self.case(scrutinee, branches, expected),
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => Ok(Constraint::all([
                self.expr(cond, Type::con(BOOL))?,
                self.expr(then_branch, expected.clone())?,
                self.expr(else_branch, expected)?,
            ])),
            ExprKind::List { items } => {
                let elem = self.fresh_type();
                let mut constraints = Vec::with_capacity(items.len() + 1);
                for item in items {
                    constraints.push(self.expr(item, elem.clone())?);
                }
                constraints.push(Constraint::equal(expected, Type::list(elem), span));
                Ok(Constraint::all(constraints))
            }
            ExprKind::Record { fields } => {
                let (types, mut constraints) = self.fields(fields)?;
                constraints.push(Constraint::equal(
                    expected,
                    Type::closed_record(types),
                    span,
                ));
                Ok(Constraint::all(constraints))
            }
            ExprKind::Access { record, field } => {
                let ext = self.fresh(None);
                self.expr(record, Type::open_record([(field.clone(), expected)], ext))
            }
            ExprKind::Update { record, fields } => {
                let ext = self.fresh(None);
                let mut types = BTreeMap::new();
                for field in fields {
                    types
                        .entry(field.name.clone())
                        .or_insert_with(|| self.fresh_type());
                }
                let record_type = Type::Record {
                    fields: types.clone(),
                    ext: Some(ext),
                };
                let mut constraints = vec![self.expr(record, record_type.clone())?];
                for field in fields {
                    constraints.push(self.expr(&field.value, types[&field.name].clone())?);
                }
                constraints.push(Constraint::equal(expected, record_type, span));
                Ok(Constraint::all(constraints))
            }
        }
    }

    /// `\p1 .. pn -> body`. Parameter patterns live in their own `Let` so that the
    /// variables they bind are in scope for the body only.
    pub(super) fn function(
        &mut self,
        params: &[Pattern],
        body: &Expr,
        expected: Type,
        span: Span,
    ) -> Result<Constraint, SolveError> {
        if params.is_empty() {
            return self.expr(body, expected);
        }
        let args: Vec<Type> = params.iter().map(|_| self.fresh_type()).collect();
        let ret = self.fresh_type();
        let fragment = self.nested(|generator| {
            let fragments = params
                .iter()
                .zip(&args)
                .map(|(param, arg)| generator.pattern(param, arg.clone()))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Fragment::join_all(fragments))
        })?;
        let body = self.expr(body, ret.clone())?;
        Ok(Constraint::all([
            fragment.into_scheme().into_let(body),
            Constraint::equal(expected, Type::curried(args, ret), span),
        ]))
    }

    /// The function is checked first so argument errors are reported against
    /// the parameter types it expects.
    fn apply(
        &mut self,
        func: &Expr,
        args: &[Expr],
        expected: Type,
    ) -> Result<Constraint, SolveError> {
        let arg_types: Vec<Type> = args.iter().map(|_| self.fresh_type()).collect();
        let mut constraints = Vec::with_capacity(args.len() + 1);
        constraints.push(self.expr(func, Type::curried(arg_types.clone(), expected))?);
        for (arg, ty) in args.iter().zip(arg_types) {
            constraints.push(self.expr(arg, ty)?);
        }
        Ok(Constraint::all(constraints))
    }

    fn case(
        &mut self,
        scrutinee: &Expr,
        branches: &[Branch],
        expected: Type,
    ) -> Result<Constraint, SolveError> {
        let subject = self.fresh_type();
        let mut constraints = Vec::with_capacity(branches.len() + 1);
        constraints.push(self.expr(scrutinee, subject.clone())?);
        for branch in branches {
            let fragment =
                self.nested(|generator| generator.pattern(&branch.pattern, subject.clone()))?;
            let body = self.expr(&branch.body, expected.clone())?;
            let checkpoint = Constraint::Checkpoint(branch.span);
            let fragment = Fragment {
                constraint: checkpoint.clone().and(fragment.constraint),
                ..fragment
            };
            constraints.push(fragment.into_scheme().into_let(checkpoint.and(body)));
        }
        Ok(Constraint::all(constraints))
    }

    fn fields(
        &mut self,
        fields: &[Field],
    ) -> Result<(BTreeMap<String, Type>, Vec<Constraint>), SolveError> {
        let mut types = BTreeMap::new();
        let mut constraints = Vec::with_capacity(fields.len() + 1);
        for field in fields {
            let ty = self.fresh_type();
            constraints.push(self.expr(&field.value, ty.clone())?);
            types.insert(field.name.clone(), ty);
        }
        Ok((types, constraints))
    }
}

pub(super) fn literal_type(literal: &Literal) -> Type {
    let name = match literal {
        Literal::Int(_) => INT,
        Literal::Float(_) => FLOAT,
        Literal::Char(_) => CHAR,
        Literal::String(_) => STRING,
        Literal::Bool(_) => BOOL,
    };
    Type::con(name)
}
