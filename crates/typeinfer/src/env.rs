use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use crate::alias::{Alias, AliasTable};
use crate::diagnostics::Span;
use crate::error::SolveError;
use crate::scheme::Scheme;
use crate::solve::Context;
use crate::store::VarStore;
use crate::types::{LowerError, Rank, Type, TypeExpr};

/// A data constructor `name : args -> result params`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CtorSig {
    pub result: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub args: Vec<TypeExpr>,
}

impl CtorSig {
    /// The constructor's type when used as a value.
    pub fn signature(&self) -> TypeExpr {
        let result = TypeExpr::con(
            &self.result,
            self.params.iter().map(|param| TypeExpr::var(param)).collect(),
        );
        self.args
            .iter()
            .rev()
            .fold(result, |ret, arg| TypeExpr::func(arg.clone(), ret))
    }
}

/// Everything known before the program is looked at: aliases, data constructors,
/// and the types of imported values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub aliases: BTreeMap<String, Alias>,
    #[serde(default)]
    pub constructors: BTreeMap<String, CtorSig>,
    #[serde(default)]
    pub values: BTreeMap<String, TypeExpr>,
}

impl Environment {
    pub fn alias_table(&self) -> Result<AliasTable, SolveError> {
        let mut table = AliasTable::new();
        for (name, alias) in &self.aliases {
            table
                .insert(name, alias.clone())
                .map_err(|source| invalid(name, source))?;
        }
        if let Some(name) = table.find_cycle() {
            return Err(invalid(name, LowerError::RecursiveAlias(name.to_string())));
        }
        Ok(table)
    }

    /// Constructors and values as closed schemes. Values shadow constructors of the same name.
    pub fn initial_context(&self, store: &mut VarStore) -> Result<Context, SolveError> {
        let mut context = Context::new();
        for (name, ctor) in &self.constructors {
            let signature = ctor.signature();
            if let Some(unknown) = signature
                .free_vars()
                .into_iter()
                .find(|var| !ctor.params.contains(var))
            {
                return Err(invalid(name, LowerError::UnknownVar(unknown)));
            }
            let scheme = closed_scheme(store, name, &signature)?;
            context.insert(name.clone(), scheme);
        }
        for (name, ty) in &self.values {
            let scheme = closed_scheme(store, name, ty)?;
            context.insert(name.clone(), scheme);
        }
        Ok(context)
    }

    /// Fresh argument types and result type for a constructor in a pattern.
    pub fn instantiate_ctor(
        &self,
        store: &mut VarStore,
        name: &str,
        rank: Rank,
        span: Span,
    ) -> Result<(Vec<Type>, Type), SolveError> {
        let Some(ctor) = self.constructors.get(name) else {
            return Err(SolveError::UnknownConstructor {
                name: name.to_string(),
                span,
            });
        };
        let vars: HashMap<String, Type> = ctor
            .params
            .iter()
            .map(|param| (param.clone(), Type::Var(store.fresh(rank, Some(param)))))
            .collect();
        let args = ctor
            .args
            .iter()
            .map(|arg| arg.lower(&vars))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| invalid(name, source))?;
        let result = Type::App(
            ctor.result.clone(),
            ctor.params
                .iter()
                .filter_map(|param| vars.get(param).cloned())
                .collect(),
        );
        Ok((args, result))
    }
}

/// Every type variable in `ty` becomes a quantifier. Their rank is irrelevant since
/// uses only ever see fresh copies.
fn closed_scheme(store: &mut VarStore, name: &str, ty: &TypeExpr) -> Result<Scheme, SolveError> {
    let params = ty.free_vars();
    let vars: Vec<_> = params
        .iter()
        .map(|param| store.fresh(Rank::OUTERMOST, Some(param)))
        .collect();
    let mapping: HashMap<String, Type> = params
        .into_iter()
        .zip(vars.iter().map(|var| Type::Var(*var)))
        .collect();
    let lowered = ty.lower(&mapping).map_err(|source| invalid(name, source))?;
    Ok(Scheme::closed(name, lowered, vars))
}

fn invalid(name: &str, source: LowerError) -> SolveError {
    SolveError::InvalidSignature {
        name: name.to_string(),
        source,
    }
}
