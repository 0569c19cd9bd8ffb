use serde::{Deserialize, Serialize};

use crate::diagnostics::Span;

/// Identifies an expression node; the inferred type of every node is reported by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Binding groups in dependency order. Each group may be mutually recursive.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub groups: Vec<BindingGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingGroup {
    pub defs: Vec<Def>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Def {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Pattern>,
    pub body: Expr,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub id: NodeId,
    #[serde(default)]
    pub span: Span,
    #[serde(flatten)]
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExprKind {
    Literal {
        value: Literal,
    },
    /// A resolved name: a local, a top-level binding, an interface value or a constructor.
    Var {
        name: String,
    },
    Lambda {
        params: Vec<Pattern>,
        body: Box<Expr>,
    },
    Apply {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `let` with one mutually recursive binding group.
    Let {
        defs: Vec<Def>,
        body: Box<Expr>,
    },
    Case {
        scrutinee: Box<Expr>,
        branches: Vec<Branch>,
    },
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    List {
        items: Vec<Expr>,
    },
    Record {
        fields: Vec<Field>,
    },
    Access {
        record: Box<Expr>,
        field: String,
    },
    /// `{ record | field = value, ... }`; the updated fields keep their types.
    Update {
        record: Box<Expr>,
        fields: Vec<Field>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub pattern: Pattern,
    pub body: Expr,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Int(i64),
    Float(f64),
    Char(char),
    String(String),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    #[serde(default)]
    pub span: Span,
    #[serde(flatten)]
    pub kind: PatternKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternKind {
    Wildcard,
    Var {
        name: String,
    },
    Literal {
        value: Literal,
    },
    Ctor {
        name: String,
        #[serde(default)]
        args: Vec<Pattern>,
    },
    /// `{ a, b }`: binds the named fields and matches any record that has them.
    Record {
        fields: Vec<String>,
    },
    /// `pattern as name`
    As {
        pattern: Box<Pattern>,
        name: String,
    },
}

impl Pattern {
    pub fn wildcard() -> Pattern {
        PatternKind::Wildcard.into()
    }

    pub fn var(name: &str) -> Pattern {
        PatternKind::Var {
            name: name.to_string(),
        }
        .into()
    }

    pub fn literal(value: Literal) -> Pattern {
        PatternKind::Literal { value }.into()
    }

    pub fn ctor(name: &str, args: Vec<Pattern>) -> Pattern {
        PatternKind::Ctor {
            name: name.to_string(),
            args,
        }
        .into()
    }

    pub fn record(fields: &[&str]) -> Pattern {
        PatternKind::Record {
            fields: fields.iter().map(|field| field.to_string()).collect(),
        }
        .into()
    }

    pub fn as_name(self, name: &str) -> Pattern {
        let span = self.span;
        Pattern {
            span,
            kind: PatternKind::As {
                pattern: Box::new(self),
                name: name.to_string(),
            },
        }
    }

    pub fn at(mut self, span: Span) -> Pattern {
        self.span = span;
        self
    }
}

impl From<PatternKind> for Pattern {
    fn from(kind: PatternKind) -> Self {
        Pattern {
            span: Span::default(),
            kind,
        }
    }
}

impl Def {
    pub fn new(name: &str, params: Vec<Pattern>, body: Expr) -> Def {
        let span = body.span;
        Def {
            name: name.to_string(),
            params,
            body,
            span,
        }
    }
}

impl Branch {
    pub fn new(pattern: Pattern, body: Expr) -> Branch {
        let span = body.span;
        Branch {
            pattern,
            body,
            span,
        }
    }
}

/// Hands out node ids and stamps nodes with the current source line.
#[derive(Debug, Default)]
pub struct Builder {
    next_id: u32,
    span: Span,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes built from now on carry `line` as their span.
    pub fn line(&mut self, line: usize) -> &mut Self {
        self.span = Span::line(line);
        self
    }

    pub fn node(&mut self, kind: ExprKind) -> Expr {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        Expr {
            id,
            span: self.span,
            kind,
        }
    }

    pub fn int(&mut self, value: i64) -> Expr {
        self.literal(Literal::Int(value))
    }

    pub fn float(&mut self, value: f64) -> Expr {
        self.literal(Literal::Float(value))
    }

    pub fn char(&mut self, value: char) -> Expr {
        self.literal(Literal::Char(value))
    }

    pub fn string(&mut self, value: &str) -> Expr {
        self.literal(Literal::String(value.to_string()))
    }

    pub fn boolean(&mut self, value: bool) -> Expr {
        self.literal(Literal::Bool(value))
    }

    pub fn literal(&mut self, value: Literal) -> Expr {
        self.node(ExprKind::Literal { value })
    }

    pub fn var(&mut self, name: &str) -> Expr {
        self.node(ExprKind::Var {
            name: name.to_string(),
        })
    }

    pub fn lambda(&mut self, params: Vec<Pattern>, body: Expr) -> Expr {
        self.node(ExprKind::Lambda {
            params,
            body: Box::new(body),
        })
    }

    pub fn apply(&mut self, func: Expr, args: Vec<Expr>) -> Expr {
        self.node(ExprKind::Apply {
            func: Box::new(func),
            args,
        })
    }

    pub fn let_in(&mut self, defs: Vec<Def>, body: Expr) -> Expr {
        self.node(ExprKind::Let {
            defs,
            body: Box::new(body),
        })
    }

    pub fn case(&mut self, scrutinee: Expr, branches: Vec<Branch>) -> Expr {
        self.node(ExprKind::Case {
            scrutinee: Box::new(scrutinee),
            branches,
        })
    }

    pub fn if_then_else(&mut self, cond: Expr, then_branch: Expr, else_branch: Expr) -> Expr {
        self.node(ExprKind::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    pub fn list(&mut self, items: Vec<Expr>) -> Expr {
        self.node(ExprKind::List { items })
    }

    pub fn record(&mut self, fields: Vec<(&str, Expr)>) -> Expr {
        self.node(ExprKind::Record {
            fields: to_fields(fields),
        })
    }

    pub fn access(&mut self, record: Expr, field: &str) -> Expr {
        self.node(ExprKind::Access {
            record: Box::new(record),
            field: field.to_string(),
        })
    }

    pub fn update(&mut self, record: Expr, fields: Vec<(&str, Expr)>) -> Expr {
        self.node(ExprKind::Update {
            record: Box::new(record),
            fields: to_fields(fields),
        })
    }
}

fn to_fields(fields: Vec<(&str, Expr)>) -> Vec<Field> {
    fields
        .into_iter()
        .map(|(name, value)| Field {
            name: name.to_string(),
            value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_allocates_distinct_ids() {
        let mut b = Builder::new();
        let one = b.int(1);
        let two = b.int(2);
        let list = b.list(vec![one, two]);
        assert_eq!(list.id, NodeId(2));
        let ExprKind::List { items } = &list.kind else {
            panic!("expected a list");
        };
        assert_eq!(items[0].id, NodeId(0));
        assert_eq!(items[1].id, NodeId(1));
    }

    #[test]
    fn definitions_and_branches_take_the_body_span() {
        let mut b = Builder::new();
        let body = b.line(7).var("x");
        let def = Def::new("f", vec![Pattern::var("x")], body);
        assert_eq!(def.span, Span::line(7));
        let body = b.line(9).int(0);
        assert_eq!(Branch::new(Pattern::wildcard(), body).span, Span::line(9));
    }

    #[test]
    fn expressions_deserialize_from_tagged_json() {
        let expr: Expr = serde_json::from_str(
            r#"{
                "id": 3,
                "kind": "apply",
                "func": { "id": 0, "kind": "var", "name": "f" },
                "args": [
                    { "id": 1, "kind": "literal", "value": { "int": 1 } },
                    { "id": 2, "kind": "literal", "value": { "string": "s" } }
                ]
            }"#,
        )
        .expect("valid expression");
        assert_eq!(expr.id, NodeId(3));
        let ExprKind::Apply { func, args } = expr.kind else {
            panic!("expected an application");
        };
        assert_eq!(
            func.kind,
            ExprKind::Var {
                name: "f".to_string()
            }
        );
        assert_eq!(
            args[1].kind,
            ExprKind::Literal {
                value: Literal::String("s".to_string())
            }
        );
    }

    #[test]
    fn patterns_deserialize_from_tagged_json() {
        let pattern: Pattern = serde_json::from_str(
            r#"{ "kind": "as", "name": "whole",
                 "pattern": { "kind": "ctor", "name": "Just", "args": [ { "kind": "wildcard" } ] } }"#,
        )
        .expect("valid pattern");
        assert_eq!(
            pattern,
            Pattern::ctor("Just", vec![Pattern::wildcard()]).as_name("whole")
        );
    }
}
