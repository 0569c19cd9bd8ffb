use std::collections::BTreeSet;
use std::sync::Arc;

use crate::constraint::{Constraint, Header};
use crate::scheme::Scheme;
use crate::types::{Type, Variable};

/// What generating one pattern, expression or binding list produced before it is
/// promoted to a [`Scheme`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fragment {
    pub env: Header,
    pub vars: Vec<Variable>,
    pub constraint: Constraint,
}

impl Fragment {
    pub fn empty() -> Fragment {
        Fragment::default()
    }

    /// A single name bound to a fresh variable.
    pub fn binding(name: &str, var: Variable, constraint: Constraint) -> Fragment {
        Fragment {
            env: Header::from([(name.to_string(), Type::Var(var))]),
            vars: vec![var],
            constraint,
        }
    }

    /// Associative, with `self` winning name collisions. Not commutative.
    pub fn join(self, other: Fragment) -> Fragment {
        let mut env = other.env;
        env.extend(self.env);
        let mut vars = self.vars;
        vars.extend(other.vars);
        Fragment {
            env,
            vars,
            constraint: self.constraint.and(other.constraint),
        }
    }

    /// `[x1, .., xn]` becomes `xn ⊕ .. ⊕ x1`: the last fragment wins name
    /// collisions and `vars` come out in reverse input order.
    pub fn join_all<I>(fragments: I) -> Fragment
    where
        I: IntoIterator<Item = Fragment>,
    {
        fragments
            .into_iter()
            .fold(Fragment::empty(), |acc, fragment| fragment.join(acc))
    }

    /// Nothing is quantified yet; the solver decides that from ranks.
    pub fn into_scheme(self) -> Scheme {
        Scheme {
            quantifiers: BTreeSet::new(),
            candidates: self.vars,
            qualifier: Arc::new(self.constraint),
            header: self.env,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::diagnostics::Span;
    use crate::types::{INT, STRING};

    fn marker(index: usize) -> Type {
        Type::con(&format!("M{index}"))
    }

    fn arb_type() -> impl Strategy<Value = Type> {
        prop_oneof![
            (0u32..6).prop_map(|index| Type::Var(Variable(index))),
            prop::sample::select(vec![INT, STRING, "Bool"]).prop_map(Type::con),
        ]
    }

    fn arb_leaf() -> impl Strategy<Value = Constraint> {
        prop_oneof![
            Just(Constraint::Trivial),
            (1usize..20).prop_map(|line| Constraint::Checkpoint(Span::line(line))),
            (arb_type(), arb_type(), 1usize..20)
                .prop_map(|(left, right, line)| Constraint::equal(left, right, Span::line(line))),
            (prop::sample::select(vec!["f", "g"]), arb_type())
                .prop_map(|(name, ty)| Constraint::instance(name, ty, Span::line(1))),
        ]
    }

    fn arb_fragment() -> impl Strategy<Value = Fragment> {
        (
            prop::collection::btree_map(
                prop::sample::select(vec!["x", "y", "z"]).prop_map(str::to_string),
                arb_type(),
                0..3,
            ),
            prop::collection::vec((0u32..8).prop_map(Variable), 0..3),
            prop::collection::vec(arb_leaf(), 0..3),
        )
            .prop_map(|(env, vars, leaves)| Fragment {
                env,
                vars,
                constraint: Constraint::all(leaves),
            })
    }

    proptest! {
        #[test]
        fn join_is_associative(a in arb_fragment(), b in arb_fragment(), c in arb_fragment()) {
            let left = a.clone().join(b.clone()).join(c.clone());
            let right = a.join(b.join(c));
            prop_assert_eq!(left, right);
        }

        #[test]
        fn empty_is_a_two_sided_identity(a in arb_fragment()) {
            prop_assert_eq!(a.clone().join(Fragment::empty()), a.clone());
            prop_assert_eq!(Fragment::empty().join(a.clone()), a);
        }
    }

    #[test]
    fn join_is_not_commutative() {
        let a = Fragment {
            env: Header::from([("x".to_string(), Type::con(INT))]),
            ..Fragment::empty()
        };
        let b = Fragment {
            env: Header::from([("x".to_string(), Type::con(STRING))]),
            ..Fragment::empty()
        };
        assert_eq!(a.clone().join(b.clone()).env["x"], Type::con(INT));
        assert_eq!(b.join(a).env["x"], Type::con(STRING));
    }

    #[test]
    fn join_all_lets_the_last_fragment_win_and_reverses_vars() {
        let fragments: Vec<Fragment> = (1..=3)
            .map(|index| Fragment {
                env: Header::from([("x".to_string(), marker(index))]),
                vars: vec![Variable(index as u32)],
                constraint: Constraint::Trivial,
            })
            .collect();
        let joined = Fragment::join_all(fragments);
        assert_eq!(joined.env["x"], marker(3));
        assert_eq!(joined.vars, vec![Variable(3), Variable(2), Variable(1)]);
    }

    #[test]
    fn join_keeps_duplicate_vars() {
        let a = Fragment {
            vars: vec![Variable(0)],
            ..Fragment::empty()
        };
        let joined = a.clone().join(a);
        assert_eq!(joined.vars, vec![Variable(0), Variable(0)]);
    }

    #[test]
    fn join_all_of_nothing_is_empty() {
        assert_eq!(Fragment::join_all(Vec::new()), Fragment::empty());
    }

    #[test]
    fn into_scheme_quantifies_nothing() {
        let var = Variable(7);
        let fragment = Fragment::binding(
            "x",
            var,
            Constraint::equal(Type::Var(var), Type::con(INT), Span::line(1)),
        );
        let scheme = fragment.clone().into_scheme();
        assert!(scheme.is_monomorphic());
        assert_eq!(scheme.candidates, vec![var]);
        assert_eq!(*scheme.qualifier, fragment.constraint);
        assert_eq!(scheme.type_of("x"), Some(&Type::Var(var)));
    }
}
