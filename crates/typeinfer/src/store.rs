use crate::alias::AliasTable;
use crate::resolve::{Resolved, Resolver};
use crate::types::{Rank, Type, Variable};

mod unify;

pub use self::unify::Mismatch;

/// What a class of unified variables currently stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Not yet solved. `rank` is the minimum rank of everything unified into the class.
    Unbound { rank: Rank, hint: Option<String> },
    /// Solved to a term whose variable positions are themselves store variables.
    Bound(Type),
    /// Produced by a failed unification; later uses succeed silently.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Link(Variable),
    Root(Content),
}

/// Arena of unification variables forming a union-find structure.
#[derive(Debug, Clone)]
pub struct VarStore {
    slots: Vec<Slot>,
    aliases: AliasTable,
    path_compression: bool,
}

impl Default for VarStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VarStore {
    pub fn new() -> Self {
        Self::with_aliases(AliasTable::default())
    }

    pub fn with_aliases(aliases: AliasTable) -> Self {
        Self {
            slots: Vec::new(),
            aliases,
            path_compression: true,
        }
    }

    pub fn set_path_compression(&mut self, enabled: bool) {
        self.path_compression = enabled;
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn fresh(&mut self, rank: Rank, hint: Option<&str>) -> Variable {
        let var = Variable(self.slots.len() as u32);
        self.slots.push(Slot::Root(Content::Unbound {
            rank,
            hint: hint.map(str::to_string),
        }));
        var
    }

    pub fn fresh_type(&mut self, rank: Rank) -> Type {
        Type::Var(self.fresh(rank, None))
    }

    /// Representative of `var`'s class.
    pub fn find(&mut self, var: Variable) -> Variable {
        let mut root = var;
        while let Slot::Link(next) = self.slots[root.index()] {
            root = next;
        }
        if self.path_compression {
            let mut current = var;
            while let Slot::Link(next) = self.slots[current.index()] {
                self.slots[current.index()] = Slot::Link(root);
                current = next;
            }
        }
        root
    }

    /// Content of the representative of `var`'s class.
    pub fn content(&mut self, var: Variable) -> &Content {
        let root = self.find(var);
        self.root_content(root)
    }

    /// Rank of the class, `None` when it is bound or poisoned.
    pub fn rank(&mut self, var: Variable) -> Option<Rank> {
        match self.content(var) {
            Content::Unbound { rank, .. } => Some(*rank),
            Content::Bound(_) | Content::Error => None,
        }
    }

    pub fn same_class(&mut self, left: Variable, right: Variable) -> bool {
        self.find(left) == self.find(right)
    }

    pub fn is_error(&mut self, var: Variable) -> bool {
        matches!(self.content(var), Content::Error)
    }

    /// Self-contained picture of `ty` as it stands now, used in diagnostics.
    pub fn snapshot(&mut self, ty: &Type) -> Resolved {
        Resolver::new(self).resolve(ty)
    }

    fn root_content(&self, var: Variable) -> &Content {
        let mut current = var;
        loop {
            match &self.slots[current.index()] {
                Slot::Link(next) => current = *next,
                Slot::Root(content) => return content,
            }
        }
    }

    fn set(&mut self, root: Variable, content: Content) {
        self.slots[root.index()] = Slot::Root(content);
    }

    fn link(&mut self, from: Variable, to: Variable) {
        self.slots[from.index()] = Slot::Link(to);
    }

    fn poison(&mut self, var: Variable) {
        let root = self.find(var);
        self.set(root, Content::Error);
    }

    fn set_rank(&mut self, root: Variable, rank: Rank) {
        if let Slot::Root(Content::Unbound { rank: current, .. }) = &mut self.slots[root.index()] {
            *current = rank;
        }
    }

    /// Lowers every unbound variable reachable from `ty` to at most `rank`.
    fn adjust_ranks(&mut self, ty: &Type, rank: Rank) {
        match ty {
            Type::Var(var) => self.adjust_var_rank(*var, rank),
            Type::Func(arg, ret) => {
                self.adjust_ranks(arg, rank);
                self.adjust_ranks(ret, rank);
            }
            Type::App(_, args) => {
                for arg in args {
                    self.adjust_ranks(arg, rank);
                }
            }
            Type::Record { fields, ext } => {
                for field in fields.values() {
                    self.adjust_ranks(field, rank);
                }
                if let Some(ext) = ext {
                    self.adjust_var_rank(*ext, rank);
                }
            }
        }
    }

    fn adjust_var_rank(&mut self, var: Variable, rank: Rank) {
        let root = self.find(var);
        match self.root_content(root).clone() {
            Content::Unbound { rank: current, .. } => {
                if current > rank {
                    self.set_rank(root, rank);
                }
            }
            Content::Bound(term) => self.adjust_ranks(&term, rank),
            Content::Error => {}
        }
    }

    /// Whether `root` appears anywhere inside `ty`, looking through bound variables.
    fn occurs(&mut self, root: Variable, ty: &Type) -> bool {
        match ty {
            Type::Var(var) => self.occurs_var(root, *var),
            Type::Func(arg, ret) => self.occurs(root, arg) || self.occurs(root, ret),
            Type::App(_, args) => args.iter().any(|arg| self.occurs(root, arg)),
            Type::Record { fields, ext } => {
                fields.values().any(|field| self.occurs(root, field))
                    || ext.is_some_and(|ext| self.occurs_var(root, ext))
            }
        }
    }

    fn occurs_var(&mut self, root: Variable, var: Variable) -> bool {
        let other = self.find(var);
        if other == root {
            return true;
        }
        match self.root_content(other).clone() {
            Content::Bound(term) => self.occurs(root, &term),
            Content::Unbound { .. } | Content::Error => false,
        }
    }
}
