use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

pub const INT: &str = "Int";
pub const FLOAT: &str = "Float";
pub const CHAR: &str = "Char";
pub const STRING: &str = "String";
pub const BOOL: &str = "Bool";
pub const LIST: &str = "List";

/// Stable handle into the variable store arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Variable(pub(crate) u32);

impl Variable {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Nesting depth of the generalization boundary a variable belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rank(pub u32);

impl Rank {
    /// Rank of the initial context (interface values, constructors).
    pub const OUTERMOST: Rank = Rank(0);

    pub fn next(self) -> Rank {
        Rank(self.0 + 1)
    }

    pub fn prev(self) -> Rank {
        Rank(self.0.saturating_sub(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Var(Variable),
    Func(Box<Type>, Box<Type>),
    App(String, Vec<Type>),
    /// `ext: None` means the record is closed.
    Record {
        fields: BTreeMap<String, Type>,
        ext: Option<Variable>,
    },
}

impl Type {
    pub fn con(name: &str) -> Type {
        Type::App(name.to_string(), Vec::new())
    }

    pub fn app(name: &str, args: Vec<Type>) -> Type {
        Type::App(name.to_string(), args)
    }

    pub fn func(arg: Type, ret: Type) -> Type {
        Type::Func(Box::new(arg), Box::new(ret))
    }

    /// `a1 -> a2 -> ... -> ret`
    pub fn curried<I>(args: I, ret: Type) -> Type
    where
        I: IntoIterator<Item = Type>,
        I::IntoIter: DoubleEndedIterator,
    {
        args.into_iter()
            .rev()
            .fold(ret, |acc, arg| Type::func(arg, acc))
    }

    pub fn list(elem: Type) -> Type {
        Type::App(LIST.to_string(), vec![elem])
    }

    pub fn closed_record<I>(fields: I) -> Type
    where
        I: IntoIterator<Item = (String, Type)>,
    {
        Type::Record {
            fields: fields.into_iter().collect(),
            ext: None,
        }
    }

    pub fn open_record<I>(fields: I, ext: Variable) -> Type
    where
        I: IntoIterator<Item = (String, Type)>,
    {
        Type::Record {
            fields: fields.into_iter().collect(),
            ext: Some(ext),
        }
    }
}

impl From<Variable> for Type {
    fn from(var: Variable) -> Self {
        Type::Var(var)
    }
}

/// Type syntax as written in interfaces, constructor signatures and alias bodies.
/// Lowercase variables are parameters, never unification variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeExpr {
    Var {
        name: String,
    },
    Con {
        name: String,
        #[serde(default)]
        args: Vec<TypeExpr>,
    },
    Func {
        arg: Box<TypeExpr>,
        ret: Box<TypeExpr>,
    },
    Record {
        fields: BTreeMap<String, TypeExpr>,
        #[serde(default)]
        ext: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LowerError {
    #[error("type variable '{0}' is not in scope")]
    UnknownVar(String),
    #[error("record extension '{0}' is not a record")]
    ExtensionNotRecord(String),
    #[error("alias '{0}' expands to itself")]
    RecursiveAlias(String),
}

impl TypeExpr {
    pub fn var(name: &str) -> TypeExpr {
        TypeExpr::Var {
            name: name.to_string(),
        }
    }

    pub fn con(name: &str, args: Vec<TypeExpr>) -> TypeExpr {
        TypeExpr::Con {
            name: name.to_string(),
            args,
        }
    }

    pub fn func(arg: TypeExpr, ret: TypeExpr) -> TypeExpr {
        TypeExpr::Func {
            arg: Box::new(arg),
            ret: Box::new(ret),
        }
    }

    /// Type variables in order of first appearance, record extensions included.
    pub fn free_vars(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut Vec<String>) {
        match self {
            TypeExpr::Var { name } => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            TypeExpr::Con { args, .. } => {
                for arg in args {
                    arg.collect_vars(out);
                }
            }
            TypeExpr::Func { arg, ret } => {
                arg.collect_vars(out);
                ret.collect_vars(out);
            }
            TypeExpr::Record { fields, ext } => {
                for field in fields.values() {
                    field.collect_vars(out);
                }
                if let Some(ext) = ext {
                    if !out.contains(ext) {
                        out.push(ext.clone());
                    }
                }
            }
        }
    }

    /// Builds a term, replacing each type variable by its entry in `vars`.
    pub(crate) fn lower(&self, vars: &HashMap<String, Type>) -> Result<Type, LowerError> {
        match self {
            TypeExpr::Var { name } => vars
                .get(name)
                .cloned()
                .ok_or_else(|| LowerError::UnknownVar(name.clone())),
            TypeExpr::Con { name, args } => Ok(Type::App(
                name.clone(),
                args.iter()
                    .map(|arg| arg.lower(vars))
                    .collect::<Result<_, _>>()?,
            )),
            TypeExpr::Func { arg, ret } => Ok(Type::func(arg.lower(vars)?, ret.lower(vars)?)),
            TypeExpr::Record { fields, ext } => {
                let mut lowered = fields
                    .iter()
                    .map(|(name, ty)| Ok((name.clone(), ty.lower(vars)?)))
                    .collect::<Result<BTreeMap<_, _>, LowerError>>()?;
                let Some(ext) = ext else {
                    return Ok(Type::Record {
                        fields: lowered,
                        ext: None,
                    });
                };
                match vars.get(ext) {
                    Some(Type::Var(var)) => Ok(Type::Record {
                        fields: lowered,
                        ext: Some(*var),
                    }),
                    // `{ r | x : Int }` with `r := { y : Bool | s }` flattens to one row.
                    Some(Type::Record {
                        fields: extra,
                        ext: inner,
                    }) => {
                        for (name, ty) in extra {
                            lowered.entry(name.clone()).or_insert_with(|| ty.clone());
                        }
                        Ok(Type::Record {
                            fields: lowered,
                            ext: *inner,
                        })
                    }
                    Some(_) => Err(LowerError::ExtensionNotRecord(ext.clone())),
                    None => Err(LowerError::UnknownVar(ext.clone())),
                }
            }
        }
    }
}
