// ast.rs — Annotated AST produced by the AST builder
//
// Structural nodes (loops, conditionals, blocks, marks) are only walked.
// User nodes carry an annotation naming either a kernel launch or a kernel
// statement; the annotation decides which printer handles the node.
//
// Preconditions: produced by the AST builder; read-only here.
// Postconditions: none (data + traversal only).
// Failure modes: traversal callbacks may abort with an error.
// Side effects: none.

use serde::{Deserialize, Serialize};

use crate::expr::AstExpr;
use crate::id::{KernelId, StmtId};

// ── Nodes ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AstNode {
    For(ForNode),
    If(IfNode),
    Block(Vec<AstNode>),
    /// A named mark inserted by the scheduler; printed transparently.
    Mark { mark: String, node: Box<AstNode> },
    User(UserNode),
}

/// `for (int iterator = init; cond; iterator += inc) body`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForNode {
    pub iterator: String,
    pub init: AstExpr,
    pub cond: AstExpr,
    pub inc: AstExpr,
    pub body: Box<AstNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfNode {
    pub cond: AstExpr,
    pub then: Box<AstNode>,
    #[serde(default, rename = "else", skip_serializing_if = "Option::is_none")]
    pub otherwise: Option<Box<AstNode>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserNode {
    /// The call expression the AST builder generated for the statement.
    pub expr: AstExpr,
    #[serde(default)]
    pub annotation: Option<Annotation>,
}

/// What a user node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Annotation {
    /// Launch of the kernel with this id (host AST only).
    Kernel(KernelId),
    /// A copy, domain or break statement from the unit's statement table.
    Stmt(StmtId),
}

// ── Construction helpers ────────────────────────────────────────────────────

impl AstNode {
    pub fn for_loop(
        iterator: impl Into<String>,
        init: AstExpr,
        cond: AstExpr,
        inc: AstExpr,
        body: AstNode,
    ) -> Self {
        AstNode::For(ForNode {
            iterator: iterator.into(),
            init,
            cond,
            inc,
            body: Box::new(body),
        })
    }

    pub fn if_then(cond: AstExpr, then: AstNode, otherwise: Option<AstNode>) -> Self {
        AstNode::If(IfNode {
            cond,
            then: Box::new(then),
            otherwise: otherwise.map(Box::new),
        })
    }

    /// User node for statement `id`, using the conventional call expression.
    pub fn stmt(id: StmtId) -> Self {
        AstNode::User(UserNode {
            expr: AstExpr::call(id.to_string(), Vec::new()),
            annotation: Some(Annotation::Stmt(id)),
        })
    }

    /// User node launching kernel `id`.
    pub fn launch(id: KernelId) -> Self {
        AstNode::User(UserNode {
            expr: AstExpr::call(format!("kernel{}", id), Vec::new()),
            annotation: Some(Annotation::Kernel(id)),
        })
    }
}

// ── Traversal ───────────────────────────────────────────────────────────────

impl AstNode {
    /// Children in printing order.
    pub fn children(&self) -> Vec<&AstNode> {
        match self {
            AstNode::For(f) => vec![&*f.body],
            AstNode::If(i) => {
                let mut kids = vec![&*i.then];
                if let Some(e) = &i.otherwise {
                    kids.push(&**e);
                }
                kids
            }
            AstNode::Block(nodes) => nodes.iter().collect(),
            AstNode::Mark { node, .. } => vec![&**node],
            AstNode::User(_) => Vec::new(),
        }
    }

    /// Visit this node and its descendants pre-order.
    ///
    /// `visit` returns `Ok(true)` to descend into the node's children,
    /// `Ok(false)` to skip them, or an error to abort the whole walk.
    pub fn foreach_descendant_top_down<E, F>(&self, visit: &mut F) -> Result<(), E>
    where
        F: FnMut(&AstNode) -> Result<bool, E>,
    {
        if visit(self)? {
            for child in self.children() {
                child.foreach_descendant_top_down(visit)?;
            }
        }
        Ok(())
    }

    /// Visit every expression attached to this subtree.
    pub fn for_each_expr<F>(&self, visit: &mut F)
    where
        F: FnMut(&AstExpr),
    {
        match self {
            AstNode::For(f) => {
                visit(&f.init);
                visit(&f.cond);
                visit(&f.inc);
            }
            AstNode::If(i) => visit(&i.cond),
            AstNode::User(u) => visit(&u.expr),
            AstNode::Block(_) | AstNode::Mark { .. } => {}
        }
        for child in self.children() {
            child.for_each_expr(visit);
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
