use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;

use crate::store::{Content, VarStore};
use crate::types::{Type, Variable};

/// A solved type with every link, binding and alias expanded away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolved {
    Var {
        name: String,
    },
    Func {
        arg: Box<Resolved>,
        ret: Box<Resolved>,
    },
    App {
        name: String,
        args: Vec<Resolved>,
    },
    Record {
        fields: BTreeMap<String, Resolved>,
        ext: Option<String>,
    },
    /// A poisoned position left behind by a reported error.
    Error,
}

/// Generalized type of a binding: `vars` are the quantifiers in order of first appearance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolyType {
    pub vars: Vec<String>,
    pub ty: Resolved,
}

impl Resolved {
    pub fn con(name: &str) -> Resolved {
        Resolved::App {
            name: name.to_string(),
            args: Vec::new(),
        }
    }

    pub fn var(name: &str) -> Resolved {
        Resolved::Var {
            name: name.to_string(),
        }
    }

    pub fn func(arg: Resolved, ret: Resolved) -> Resolved {
        Resolved::Func {
            arg: Box::new(arg),
            ret: Box::new(ret),
        }
    }

    /// True when no variables or poisoned positions remain.
    pub fn is_ground(&self) -> bool {
        match self {
            Resolved::Var { .. } | Resolved::Error => false,
            Resolved::Func { arg, ret } => arg.is_ground() && ret.is_ground(),
            Resolved::App { args, .. } => args.iter().all(Resolved::is_ground),
            Resolved::Record { fields, ext } => {
                ext.is_none() && fields.values().all(Resolved::is_ground)
            }
        }
    }

    fn fmt_atom(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Func { .. } | Resolved::App { .. } if self.needs_parens() => {
                write!(f, "({self})")
            }
            _ => write!(f, "{self}"),
        }
    }

    fn needs_parens(&self) -> bool {
        match self {
            Resolved::Func { .. } => true,
            Resolved::App { args, .. } => !args.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Var { name } => write!(f, "{name}"),
            Resolved::Error => write!(f, "?"),
            Resolved::Func { arg, ret } => {
                if matches!(**arg, Resolved::Func { .. }) {
                    write!(f, "({arg}) -> {ret}")
                } else {
                    write!(f, "{arg} -> {ret}")
                }
            }
            Resolved::App { name, args } => {
                write!(f, "{name}")?;
                for arg in args {
                    write!(f, " ")?;
                    arg.fmt_atom(f)?;
                }
                Ok(())
            }
            Resolved::Record { fields, ext } => {
                if fields.is_empty() {
                    return match ext {
                        Some(ext) => write!(f, "{{ {ext} }}"),
                        None => write!(f, "{{}}"),
                    };
                }
                write!(f, "{{ ")?;
                if let Some(ext) = ext {
                    write!(f, "{ext} | ")?;
                }
                for (index, (name, ty)) in fields.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name} : {ty}")?;
                }
                write!(f, " }}")
            }
        }
    }
}

impl fmt::Display for PolyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ty)
    }
}

/// Walks terms through the store. Quantified variables get short letter names,
/// every other unbound variable is named after its store index.
pub(crate) struct Resolver<'s> {
    store: &'s mut VarStore,
    quantified: BTreeSet<Variable>,
    names: HashMap<Variable, String>,
    order: Vec<String>,
    next_letter: usize,
}

impl<'s> Resolver<'s> {
    pub(crate) fn new(store: &'s mut VarStore) -> Self {
        Self {
            store,
            quantified: BTreeSet::new(),
            names: HashMap::new(),
            order: Vec::new(),
            next_letter: 0,
        }
    }

    pub(crate) fn with_quantifiers<I>(store: &'s mut VarStore, quantifiers: I) -> Self
    where
        I: IntoIterator<Item = Variable>,
    {
        let quantified = quantifiers
            .into_iter()
            .map(|var| store.find(var))
            .collect();
        Self {
            quantified,
            ..Self::new(store)
        }
    }

    /// Quantifier names in order of first appearance in the resolved types.
    pub(crate) fn quantifier_names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub(crate) fn resolve(&mut self, ty: &Type) -> Resolved {
        match ty {
            Type::Var(var) => self.resolve_var(*var),
            Type::Func(arg, ret) => Resolved::func(self.resolve(arg), self.resolve(ret)),
            Type::App(name, args) => {
                if let Some(Ok(expanded)) = self.store.aliases().expand(name, args) {
                    return self.resolve(&expanded);
                }
                Resolved::App {
                    name: name.clone(),
                    args: args.iter().map(|arg| self.resolve(arg)).collect(),
                }
            }
            Type::Record { fields, ext } => {
                let mut resolved: BTreeMap<String, Resolved> = fields
                    .iter()
                    .map(|(name, ty)| (name.clone(), self.resolve(ty)))
                    .collect();
                let ext = match ext {
                    None => None,
                    Some(var) => match self.resolve_var(*var) {
                        Resolved::Var { name } => Some(name),
                        Resolved::Record {
                            fields: more,
                            ext: rest,
                        } => {
                            for (name, ty) in more {
                                resolved.entry(name).or_insert(ty);
                            }
                            rest
                        }
                        _ => None,
                    },
                };
                Resolved::Record {
                    fields: resolved,
                    ext,
                }
            }
        }
    }

    fn resolve_var(&mut self, var: Variable) -> Resolved {
        let root = self.store.find(var);
        match self.store.content(root).clone() {
            Content::Bound(term) => self.resolve(&term),
            Content::Error => Resolved::Error,
            Content::Unbound { hint, .. } => Resolved::Var {
                name: self.name_of(root, hint),
            },
        }
    }

    fn name_of(&mut self, root: Variable, hint: Option<String>) -> String {
        if let Some(name) = self.names.get(&root) {
            return name.clone();
        }
        let name = if self.quantified.contains(&root) {
            let name = match hint {
                Some(hint) if !self.names.values().any(|taken| *taken == hint) => hint,
                _ => self.next_letter_name(),
            };
            self.order.push(name.clone());
            name
        } else {
            format!("t{}", root.index())
        };
        self.names.insert(root, name.clone());
        name
    }

    fn next_letter_name(&mut self) -> String {
        loop {
            let index = self.next_letter;
            self.next_letter += 1;
            let letter = char::from(b'a' + (index % 26) as u8);
            let name = match index / 26 {
                0 => letter.to_string(),
                round => format!("{letter}{round}"),
            };
            if !self.names.values().any(|taken| *taken == name) {
                return name;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Rank, BOOL, INT};

    #[test]
    fn display_parenthesizes_nested_functions_and_applications() {
        let ty = Resolved::func(
            Resolved::func(Resolved::var("a"), Resolved::var("b")),
            Resolved::App {
                name: "List".to_string(),
                args: vec![Resolved::App {
                    name: "Maybe".to_string(),
                    args: vec![Resolved::con(INT)],
                }],
            },
        );
        assert_eq!(ty.to_string(), "(a -> b) -> List (Maybe Int)");
    }

    #[test]
    fn display_records() {
        let open = Resolved::Record {
            fields: BTreeMap::from([
                ("a".to_string(), Resolved::con(INT)),
                ("b".to_string(), Resolved::con(BOOL)),
            ]),
            ext: Some("r".to_string()),
        };
        assert_eq!(open.to_string(), "{ r | a : Int, b : Bool }");
        let empty = Resolved::Record {
            fields: BTreeMap::new(),
            ext: None,
        };
        assert_eq!(empty.to_string(), "{}");
    }

    #[test]
    fn quantifiers_get_letters_in_order_of_appearance() {
        let mut store = VarStore::new();
        let x = store.fresh(Rank(2), None);
        let y = store.fresh(Rank(2), None);
        let free = store.fresh(Rank(1), None);
        let ty = Type::curried(vec![Type::Var(y), Type::Var(free)], Type::Var(x));
        let mut resolver = Resolver::with_quantifiers(&mut store, [x, y]);
        let resolved = resolver.resolve(&ty);
        assert_eq!(resolver.quantifier_names(), vec!["a", "b"]);
        assert_eq!(resolved.to_string(), format!("a -> t{} -> b", free.index()));
    }

    #[test]
    fn record_extension_bound_to_record_is_flattened() {
        let mut store = VarStore::new();
        let rho = store.fresh(Rank(1), None);
        store
            .unify(
                &Type::Var(rho),
                &Type::closed_record([("b".to_string(), Type::con(BOOL))]),
            )
            .expect("binds");
        let record = Type::open_record([("a".to_string(), Type::con(INT))], rho);
        let resolved = store.snapshot(&record);
        assert_eq!(resolved.to_string(), "{ a : Int, b : Bool }");
        assert!(resolved.is_ground());
    }
}
