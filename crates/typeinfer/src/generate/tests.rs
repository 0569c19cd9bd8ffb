use super::*;
use crate::ast::{BindingGroup, Branch, Builder, Def, Pattern};
use crate::diagnostics::Span;
use crate::env::CtorSig;
use crate::solve::{Solution, Solver};
use crate::types::{TypeExpr, INT};

fn program(defs: Vec<Def>) -> Program {
    Program {
        groups: defs
            .into_iter()
            .map(|def| BindingGroup { defs: vec![def] })
            .collect(),
    }
}

fn solve(env: &Environment, program: &Program) -> Solution {
    let mut store = VarStore::with_aliases(env.alias_table().expect("valid aliases"));
    let context = env.initial_context(&mut store).expect("valid environment");
    let constraint = Generator::new(&mut store, env)
        .program(program)
        .expect("generates");
    let mut solver = Solver::new(&mut store);
    solver.solve(&context, &constraint).expect("no fatal error");
    solver.finish()
}

fn maybe() -> Environment {
    Environment {
        constructors: BTreeMap::from([(
            "Just".to_string(),
            CtorSig {
                result: "Maybe".to_string(),
                params: vec!["a".to_string()],
                args: vec![TypeExpr::var("a")],
            },
        )]),
        ..Environment::default()
    }
}

#[test]
fn literal_is_checked_against_the_expected_type() {
    let env = Environment::default();
    let mut store = VarStore::new();
    let mut b = Builder::new();
    let expr = b.line(2).int(1);
    let mut generator = Generator::new(&mut store, &env);
    let expected = generator.fresh_type();
    let constraint = generator.expr(&expr, expected.clone()).expect("generates");
    assert_eq!(
        constraint,
        Constraint::equal(expected.clone(), Type::con(INT), Span::line(2))
    );
    assert_eq!(generator.finish().get(&expr.id), Some(&expected));
}

#[test]
fn binding_group_is_wrapped_for_recursion() {
    let env = Environment::default();
    let mut store = VarStore::new();
    let mut b = Builder::new();
    let body = b.line(1).var("f");
    let defs = vec![Def::new("f", Vec::new(), body)];
    let mut generator = Generator::new(&mut store, &env);
    let scheme = generator.binding_group(&defs).expect("generates");
    assert!(scheme.quantifiers.is_empty());
    let f = scheme.header.get("f").cloned().expect("f is bound");
    let Constraint::Let(wrapper) = scheme.qualifier.as_ref() else {
        panic!("expected the recursive wrapper, got {:?}", scheme.qualifier);
    };
    assert_eq!(wrapper.header, scheme.header);
    assert!(wrapper.defs.is_trivial());
    assert_eq!(
        wrapper.body,
        Constraint::And(vec![
            Constraint::Checkpoint(Span::line(1)),
            Constraint::instance("f", f, Span::line(1)),
        ])
    );
}

#[test]
fn later_definition_wins_a_duplicate_name() {
    let env = Environment::default();
    let mut store = VarStore::new();
    let mut b = Builder::new();
    let first = b.int(1);
    let second = b.string("two");
    let defs = vec![
        Def::new("f", Vec::new(), first),
        Def::new("f", Vec::new(), second),
    ];
    let scheme = Generator::new(&mut store, &env)
        .binding_group(&defs)
        .expect("generates");
    assert_eq!(scheme.candidates.len(), 2);
    assert_eq!(scheme.header.get("f"), Some(&Type::Var(scheme.candidates[0])));
}

#[test]
fn lambda_parameters_stay_monomorphic() {
    let mut b = Builder::new();
    let one = b.int(1);
    let yes = b.boolean(true);
    let x1 = b.var("x");
    let x2 = b.var("x");
    let first = b.apply(x1, vec![one]);
    let second = b.apply(x2, vec![yes]);
    let body = b.list(vec![first, second]);
    let lambda = b.lambda(vec![Pattern::var("x")], body);
    let solution = solve(
        &Environment::default(),
        &program(vec![Def::new("f", Vec::new(), lambda)]),
    );
    assert_eq!(solution.errors.len(), 1, "{:?}", solution.errors);
}

#[test]
fn let_bound_names_are_polymorphic_in_the_body() {
    let mut b = Builder::new();
    let y = b.var("y");
    let id = b.lambda(vec![Pattern::var("y")], y);
    let id1 = b.var("id");
    let id2 = b.var("id");
    let one = b.int(1);
    let yes = b.boolean(true);
    let at_int = b.apply(id1, vec![one]);
    let at_bool = b.apply(id2, vec![yes]);
    let record = b.record(vec![("a", at_int), ("b", at_bool)]);
    let body = b.let_in(vec![Def::new("id", Vec::new(), id)], record);
    let solution = solve(
        &Environment::default(),
        &program(vec![Def::new("pair", Vec::new(), body)]),
    );
    assert!(solution.errors.is_empty(), "{:?}", solution.errors);
    assert!(solution.top_level.contains_key("pair"));
    assert!(!solution.top_level.contains_key("id"));
}

#[test]
fn unknown_constructor_pattern_is_fatal() {
    let env = maybe();
    let mut store = VarStore::new();
    let mut b = Builder::new();
    let zero = b.int(0);
    let x = b.var("m");
    let case = b.case(
        x,
        vec![Branch::new(Pattern::ctor("Left", vec![Pattern::wildcard()]), zero)],
    );
    let lambda = b.lambda(vec![Pattern::var("m")], case);
    let err = Generator::new(&mut store, &env)
        .program(&program(vec![Def::new("f", Vec::new(), lambda)]))
        .unwrap_err();
    assert!(
        matches!(&err, SolveError::UnknownConstructor { name, .. } if name == "Left"),
        "{err:?}"
    );
}

#[test]
fn constructor_pattern_with_wrong_arity_is_a_mismatch() {
    let mut b = Builder::new();
    let one = b.int(1);
    let m = b.var("m");
    let pattern = Pattern::ctor("Just", vec![Pattern::var("a"), Pattern::var("b")]);
    let case = b.case(m, vec![Branch::new(pattern, one)]);
    let lambda = b.lambda(vec![Pattern::var("m")], case);
    let solution = solve(&maybe(), &program(vec![Def::new("f", Vec::new(), lambda)]));
    assert_eq!(solution.errors.len(), 1, "{:?}", solution.errors);
}

#[test]
fn branch_errors_are_attributed_to_their_branch() {
    let mut b = Builder::new();
    let x = b.line(1).var("x");
    let first = b.line(4).string("a");
    let second = b.line(5).int(3);
    let case = b.line(3).case(
        x,
        vec![
            Branch::new(Pattern::literal(crate::ast::Literal::Int(1)), first),
            Branch::new(Pattern::wildcard(), second),
        ],
    );
    let lambda = b.line(1).lambda(vec![Pattern::var("x")], case);
    let solution = solve(
        &Environment::default(),
        &program(vec![Def::new("f", Vec::new(), lambda)]),
    );
    assert_eq!(solution.errors.len(), 1, "{:?}", solution.errors);
    assert_eq!(solution.errors[0].span(), Span::line(5));
    assert_eq!(solution.errors[0].checkpoint(), Some(Span::line(5)));
}
