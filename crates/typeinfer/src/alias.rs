use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::types::{LowerError, Type, TypeExpr};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    #[serde(default)]
    pub params: Vec<String>,
    pub body: TypeExpr,
}

/// Named type aliases. Expansion is one level at a time; callers expand again
/// when the result is itself an alias.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: HashMap<String, Alias>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an alias; the body may only mention the alias parameters.
    pub fn insert(&mut self, name: &str, alias: Alias) -> Result<(), LowerError> {
        if let Some(unknown) = alias
            .body
            .free_vars()
            .into_iter()
            .find(|var| !alias.params.contains(var))
        {
            return Err(LowerError::UnknownVar(unknown));
        }
        self.aliases.insert(name.to_string(), alias);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Alias> {
        self.aliases.get(name)
    }

    /// First alias (by name) whose expansion eventually reaches itself.
    pub fn find_cycle(&self) -> Option<&str> {
        let mut names: Vec<&String> = self.aliases.keys().collect();
        names.sort();
        names
            .into_iter()
            .find(|name| self.reaches(name, name))
            .map(String::as_str)
    }

    fn reaches(&self, from: &str, target: &str) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![from];
        while let Some(name) = stack.pop() {
            let Some(alias) = self.aliases.get(name) else {
                continue;
            };
            let mut mentioned = Vec::new();
            constructors(&alias.body, &mut mentioned);
            for next in mentioned {
                if next == target {
                    return true;
                }
                if seen.insert(next) {
                    stack.push(next);
                }
            }
        }
        false
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// `None` when `name` is not an alias or is applied to the wrong number of arguments.
    pub fn expand(&self, name: &str, args: &[Type]) -> Option<Result<Type, LowerError>> {
        let alias = self.aliases.get(name)?;
        if alias.params.len() != args.len() {
            return None;
        }
        trace!(target: "typeinfer::unify", alias = name, "expanding alias");
        let mapping: HashMap<String, Type> = alias
            .params
            .iter()
            .cloned()
            .zip(args.iter().cloned())
            .collect();
        Some(alias.body.lower(&mapping))
    }
}

fn constructors<'a>(expr: &'a TypeExpr, out: &mut Vec<&'a str>) {
    match expr {
        TypeExpr::Var { .. } => {}
        TypeExpr::Con { name, args } => {
            out.push(name);
            for arg in args {
                constructors(arg, out);
            }
        }
        TypeExpr::Func { arg, ret } => {
            constructors(arg, out);
            constructors(ret, out);
        }
        TypeExpr::Record { fields, .. } => {
            for ty in fields.values() {
                constructors(ty, out);
            }
        }
    }
}
