use std::collections::BTreeMap;

use tracing::trace;

use super::{Content, VarStore};
use crate::resolve::Resolved;
use crate::types::{Type, Variable};

/// Why two terms could not be made equal. Shapes are snapshots taken at the failure point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    Shape {
        expected: Resolved,
        actual: Resolved,
    },
    Occurs {
        var: Resolved,
        ty: Resolved,
    },
    Fields {
        missing: Vec<String>,
        extra: Vec<String>,
        expected: Resolved,
        actual: Resolved,
    },
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

enum Tail {
    Closed,
    Open(Variable),
    Poisoned,
}

struct Row {
    fields: BTreeMap<String, Type>,
    tail: Tail,
}

impl VarStore {
    /// Makes `left` and `right` equal. On failure the classes involved are poisoned so
    /// later constraints mentioning them do not report the same problem again.
    pub fn unify(&mut self, left: &Type, right: &Type) -> Result<(), Mismatch> {
        self.unify_types(left, right)
    }

    pub fn unify_vars(&mut self, left: Variable, right: Variable) -> Result<(), Mismatch> {
        self.unify_var_var(left, right)
    }

    fn unify_types(&mut self, left: &Type, right: &Type) -> Result<(), Mismatch> {
        match (left, right) {
            (Type::Var(a), Type::Var(b)) => self.unify_var_var(*a, *b),
            (Type::Var(var), term) => self.unify_var_term(*var, term, Side::Left),
            (term, Type::Var(var)) => self.unify_var_term(*var, term, Side::Right),
            _ => self.unify_terms(left, right),
        }
    }

    fn unify_var_var(&mut self, left: Variable, right: Variable) -> Result<(), Mismatch> {
        let a = self.find(left);
        let b = self.find(right);
        if a == b {
            return Ok(());
        }
        match (self.root_content(a).clone(), self.root_content(b).clone()) {
            (Content::Error, _) => {
                self.link(b, a);
                Ok(())
            }
            (_, Content::Error) => {
                self.link(a, b);
                Ok(())
            }
            (
                Content::Unbound {
                    rank: rank_a,
                    hint: hint_a,
                },
                Content::Unbound {
                    rank: rank_b,
                    hint: hint_b,
                },
            ) => {
                self.link(a, b);
                self.set(
                    b,
                    Content::Unbound {
                        rank: rank_a.min(rank_b),
                        hint: hint_b.or(hint_a),
                    },
                );
                Ok(())
            }
            (Content::Unbound { rank, .. }, Content::Bound(term)) => {
                self.check_occurs(a, &term)?;
                self.adjust_ranks(&term, rank);
                self.link(a, b);
                Ok(())
            }
            (Content::Bound(term), Content::Unbound { rank, .. }) => {
                self.check_occurs(b, &term)?;
                self.adjust_ranks(&term, rank);
                self.link(b, a);
                Ok(())
            }
            (Content::Bound(left_term), Content::Bound(right_term)) => {
                match self.unify_terms(&left_term, &right_term) {
                    Ok(()) => {
                        let a = self.find(a);
                        let b = self.find(b);
                        if a != b {
                            self.link(a, b);
                        }
                        Ok(())
                    }
                    Err(mismatch) => {
                        self.poison(a);
                        self.poison(b);
                        Err(mismatch)
                    }
                }
            }
        }
    }

    fn unify_var_term(&mut self, var: Variable, term: &Type, side: Side) -> Result<(), Mismatch> {
        let root = self.find(var);
        match self.root_content(root).clone() {
            Content::Error => Ok(()),
            Content::Unbound { rank, .. } => {
                self.check_occurs(root, term)?;
                self.adjust_ranks(term, rank);
                trace!(target: "typeinfer::unify", var = root.index(), "binding variable");
                self.set(root, Content::Bound(term.clone()));
                Ok(())
            }
            Content::Bound(bound) => {
                let result = match side {
                    Side::Left => self.unify_terms(&bound, term),
                    Side::Right => self.unify_terms(term, &bound),
                };
                if result.is_err() {
                    self.poison(root);
                }
                result
            }
        }
    }

    fn check_occurs(&mut self, root: Variable, term: &Type) -> Result<(), Mismatch> {
        if !self.occurs(root, term) {
            return Ok(());
        }
        let mismatch = Mismatch::Occurs {
            var: self.snapshot(&Type::Var(root)),
            ty: self.snapshot(term),
        };
        self.poison(root);
        Err(mismatch)
    }

    fn unify_terms(&mut self, left: &Type, right: &Type) -> Result<(), Mismatch> {
        let left = self.dealias(left)?;
        let right = self.dealias(right)?;
        match (&left, &right) {
            (Type::Var(_), _) | (_, Type::Var(_)) => self.unify_types(&left, &right),
            (Type::Func(arg_a, ret_a), Type::Func(arg_b, ret_b)) => {
                self.unify_types(arg_a, arg_b)?;
                self.unify_types(ret_a, ret_b)
            }
            (Type::App(name_a, args_a), Type::App(name_b, args_b)) => {
                if name_a != name_b || args_a.len() != args_b.len() {
                    return Err(self.shape_mismatch(&left, &right));
                }
                for (a, b) in args_a.iter().zip(args_b.iter()) {
                    self.unify_types(a, b)?;
                }
                Ok(())
            }
            (
                Type::Record {
                    fields: fields_a,
                    ext: ext_a,
                },
                Type::Record {
                    fields: fields_b,
                    ext: ext_b,
                },
            ) => {
                let row_a = self.row(fields_a, *ext_a);
                let row_b = self.row(fields_b, *ext_b);
                self.unify_rows(row_a, row_b, &left, &right)
            }
            _ => Err(self.shape_mismatch(&left, &right)),
        }
    }

    /// Expands aliases until the head constructor is not an alias.
    fn dealias(&mut self, ty: &Type) -> Result<Type, Mismatch> {
        let mut current = ty.clone();
        loop {
            let Type::App(name, args) = &current else {
                return Ok(current);
            };
            match self.aliases.expand(name, args) {
                None => return Ok(current),
                Some(Ok(expanded)) => current = expanded,
                Some(Err(_)) => {
                    let snapshot = self.snapshot(&current);
                    return Err(Mismatch::Shape {
                        expected: snapshot.clone(),
                        actual: snapshot,
                    });
                }
            }
        }
    }

    /// Collects all fields of a record, following bound extension variables.
    fn row(&mut self, fields: &BTreeMap<String, Type>, ext: Option<Variable>) -> Row {
        let mut fields = fields.clone();
        let mut ext = ext;
        loop {
            let Some(var) = ext else {
                return Row {
                    fields,
                    tail: Tail::Closed,
                };
            };
            let root = self.find(var);
            match self.root_content(root).clone() {
                Content::Unbound { .. } => {
                    return Row {
                        fields,
                        tail: Tail::Open(root),
                    }
                }
                Content::Bound(term) => match self.dealias(&term) {
                    Ok(Type::Record {
                        fields: more,
                        ext: next,
                    }) => {
                        for (name, ty) in more {
                            fields.entry(name).or_insert(ty);
                        }
                        ext = next;
                    }
                    // An extension bound to something that is not a record was already reported.
                    _ => {
                        return Row {
                            fields,
                            tail: Tail::Poisoned,
                        }
                    }
                },
                Content::Error => {
                    return Row {
                        fields,
                        tail: Tail::Poisoned,
                    }
                }
            }
        }
    }

    fn unify_rows(
        &mut self,
        left: Row,
        right: Row,
        left_ty: &Type,
        right_ty: &Type,
    ) -> Result<(), Mismatch> {
        let mut only_left = BTreeMap::new();
        let mut only_right = right.fields.clone();
        for (name, ty) in &left.fields {
            match right.fields.get(name) {
                Some(other) => {
                    only_right.remove(name);
                    self.unify_types(ty, other)?;
                }
                None => {
                    only_left.insert(name.clone(), ty.clone());
                }
            }
        }

        match (left.tail, right.tail) {
            (Tail::Poisoned, _) | (_, Tail::Poisoned) => Ok(()),
            (Tail::Closed, Tail::Closed) => {
                if only_left.is_empty() && only_right.is_empty() {
                    Ok(())
                } else {
                    Err(self.fields_mismatch(&only_left, &only_right, left_ty, right_ty))
                }
            }
            (Tail::Open(var), Tail::Closed) => {
                if !only_left.is_empty() {
                    return Err(self.fields_mismatch(
                        &only_left,
                        &BTreeMap::new(),
                        left_ty,
                        right_ty,
                    ));
                }
                self.unify_var_term(var, &Type::closed_record(only_right), Side::Left)
            }
            (Tail::Closed, Tail::Open(var)) => {
                if !only_right.is_empty() {
                    return Err(self.fields_mismatch(
                        &BTreeMap::new(),
                        &only_right,
                        left_ty,
                        right_ty,
                    ));
                }
                self.unify_var_term(var, &Type::closed_record(only_left), Side::Right)
            }
            (Tail::Open(var_a), Tail::Open(var_b)) => {
                if var_a == var_b {
                    return if only_left.is_empty() && only_right.is_empty() {
                        Ok(())
                    } else {
                        Err(self.fields_mismatch(&only_left, &only_right, left_ty, right_ty))
                    };
                }
                let rank = match (self.rank(var_a), self.rank(var_b)) {
                    (Some(a), Some(b)) => a.min(b),
                    (Some(rank), None) | (None, Some(rank)) => rank,
                    (None, None) => return Ok(()),
                };
                let rest = self.fresh(rank, None);
                self.unify_var_term(var_a, &Type::open_record(only_right, rest), Side::Left)?;
                self.unify_var_term(var_b, &Type::open_record(only_left, rest), Side::Right)
            }
        }
    }

    fn shape_mismatch(&mut self, left: &Type, right: &Type) -> Mismatch {
        Mismatch::Shape {
            expected: self.snapshot(left),
            actual: self.snapshot(right),
        }
    }

    fn fields_mismatch(
        &mut self,
        only_left: &BTreeMap<String, Type>,
        only_right: &BTreeMap<String, Type>,
        left: &Type,
        right: &Type,
    ) -> Mismatch {
        Mismatch::Fields {
            missing: only_left.keys().cloned().collect(),
            extra: only_right.keys().cloned().collect(),
            expected: self.snapshot(left),
            actual: self.snapshot(right),
        }
    }
}
