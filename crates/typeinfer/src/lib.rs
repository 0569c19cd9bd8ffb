mod alias;
pub mod ast;
mod config;
mod constraint;
mod diagnostics;
mod env;
mod error;
mod fragment;
mod generate;
mod resolve;
mod scheme;
mod solve;
mod store;
mod types;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use alias::{Alias, AliasTable};
pub use config::{read_config, InferConfig, SolverConfig};
pub use constraint::{Constraint, Header, LetConstraint};
pub use diagnostics::{Diagnostic, DiagnosticLabel, Position, Span};
pub use env::{CtorSig, Environment};
pub use error::{InferError, SolveError, TypeError};
pub use fragment::Fragment;
pub use generate::Generator;
pub use resolve::{PolyType, Resolved};
pub use scheme::Scheme;
pub use solve::{Context, Solution, Solver};
pub use store::{Content, Mismatch, VarStore};
pub use types::{LowerError, Rank, Type, TypeExpr, Variable};

use ast::{NodeId, Program};
use resolve::Resolver;

/// Input to a single inference pass.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Module {
    #[serde(default)]
    pub environment: Environment,
    pub program: Program,
}

impl Module {
    pub fn from_json(text: &str) -> Result<Module, InferError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Result of a successful pass.
#[derive(Debug, Clone, Serialize)]
pub struct TypedProgram {
    /// Generalized type of every top-level binding.
    pub bindings: BTreeMap<String, PolyType>,
    /// Solved type of every expression node.
    pub node_types: BTreeMap<NodeId, Resolved>,
}

pub fn load_module(path: &Path) -> Result<Module, InferError> {
    let text = std::fs::read_to_string(path)?;
    Module::from_json(&text)
}

pub fn infer_module(module: &Module, config: &InferConfig) -> Result<TypedProgram, InferError> {
    infer_program(&module.program, &module.environment, config)
}

/// Generates and solves the whole program. Type errors are collected across the
/// pass and returned together; a `SolveError` aborts at once.
pub fn infer_program(
    program: &Program,
    environment: &Environment,
    config: &InferConfig,
) -> Result<TypedProgram, InferError> {
    let mut store = VarStore::with_aliases(environment.alias_table()?);
    let context = environment.initial_context(&mut store)?;

    let mut generator = Generator::new(&mut store, environment);
    let constraint = generator.program(program)?;
    let node_types = generator.finish();

    let mut solver = Solver::with_config(&mut store, &config.solver);
    solver.solve(&context, &constraint)?;
    let solution = solver.finish();
    info!(
        target: "typeinfer::solve",
        variables = store.len(),
        bindings = solution.top_level.len(),
        errors = solution.errors.len(),
        suppressed = solution.suppressed,
        "solved program"
    );
    if !solution.errors.is_empty() {
        return Err(InferError::Types {
            errors: solution.errors,
            suppressed: solution.suppressed,
        });
    }

    let bindings = solution
        .top_level
        .iter()
        .filter_map(|(name, scheme)| {
            let ty = scheme.type_of(name)?;
            let mut resolver =
                Resolver::with_quantifiers(&mut store, scheme.quantifiers.iter().copied());
            let ty = resolver.resolve(ty);
            let vars = resolver.quantifier_names();
            debug!(target: "typeinfer::solve", name = name.as_str(), %ty, "top-level binding");
            Some((name.clone(), PolyType { vars, ty }))
        })
        .collect();
    let mut resolver = Resolver::new(&mut store);
    let node_types = node_types
        .iter()
        .map(|(id, ty)| (*id, resolver.resolve(ty)))
        .collect();
    Ok(TypedProgram {
        bindings,
        node_types,
    })
}
