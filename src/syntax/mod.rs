//! Owned syntax trees for Python sources and the structural queries the
//! classifier needs.
//!
//! Files are parsed with tree-sitter and immediately lowered into an arena
//! of [`SyntaxNode`]s. Each node knows its parent by index, so ancestor
//! paths are computed without back-references and the tree-sitter `Tree`
//! can be dropped as soon as lowering is done.

mod lower;

use crate::cancel::CancelToken;
use crate::error::ParseError;
use std::path::Path;
use tree_sitter::Parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// How an expression names something: a bare identifier (`raises`), the
/// trailing member of an attribute access (`self.assertEqual` ->
/// `assertEqual`), or anything else (calls, subscripts, lambdas).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameRef {
    Bare(String),
    Member(String),
    Other,
}

impl NameRef {
    pub fn as_bare(&self) -> Option<&str> {
        match self {
            Self::Bare(name) => Some(name),
            _ => None,
        }
    }

    /// The simple name regardless of whether it was reached through an
    /// attribute.
    pub fn simple_name(&self) -> Option<&str> {
        match self {
            Self::Bare(name) | Self::Member(name) => Some(name),
            Self::Other => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: String,
    pub is_async: bool,
    pub decorators: Vec<NameRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub name: String,
    pub bases: Vec<NameRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Module,
    Function(FunctionDef),
    Class(ClassDef),
    Call(NameRef),
    Assert,
    Decorator,
    Other(&'static str),
}

/// Discriminant of [`NodeKind`], used to search by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTag {
    Module,
    FunctionDef,
    AsyncFunctionDef,
    ClassDef,
    Call,
    Assert,
    Decorator,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// 1-based.
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub start: Position,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SyntaxNode {
    pub fn tag(&self) -> NodeTag {
        match &self.kind {
            NodeKind::Module => NodeTag::Module,
            NodeKind::Function(func) if func.is_async => NodeTag::AsyncFunctionDef,
            NodeKind::Function(_) => NodeTag::FunctionDef,
            NodeKind::Class(_) => NodeTag::ClassDef,
            NodeKind::Call(_) => NodeTag::Call,
            NodeKind::Assert => NodeTag::Assert,
            NodeKind::Decorator => NodeTag::Decorator,
            NodeKind::Other(_) => NodeTag::Other,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionDef> {
        match &self.kind {
            NodeKind::Function(func) => Some(func),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassDef> {
        match &self.kind {
            NodeKind::Class(class) => Some(class),
            _ => None,
        }
    }

    /// Name of a function or class definition.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Function(func) => Some(&func.name),
            NodeKind::Class(class) => Some(&class.name),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Anything that can select nodes during a search: a [`NodeTag`] or a
/// predicate closure.
pub trait NodeMatcher {
    fn matches(&self, node: &SyntaxNode) -> bool;
}

impl NodeMatcher for NodeTag {
    fn matches(&self, node: &SyntaxNode) -> bool {
        node.tag() == *self
    }
}

impl<F> NodeMatcher for F
where
    F: Fn(&SyntaxNode) -> bool,
{
    fn matches(&self, node: &SyntaxNode) -> bool {
        self(node)
    }
}

/// A parsed file and the queries over it.
#[derive(Debug)]
pub struct Navigator {
    nodes: Vec<SyntaxNode>,
}

impl Navigator {
    pub fn from_file(path: &Path, cancel: &CancelToken) -> Result<Self, ParseError> {
        let bytes = std::fs::read(path).map_err(|source| ParseError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let source = String::from_utf8(bytes)
            .map_err(|_| ParseError::Encoding(path.display().to_string()))?;
        Self::parse(&source, cancel)
    }

    pub fn parse(source: &str, cancel: &CancelToken) -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::language())
            .map_err(|e| ParseError::Language(e.to_string()))?;

        if let Some(remaining) = cancel.remaining() {
            if remaining.is_zero() {
                return Err(ParseError::TimedOut);
            }
            parser.set_timeout_micros(remaining.as_micros().clamp(1, u64::MAX as u128) as u64);
        }

        let tree = parser.parse(source, None).ok_or(ParseError::TimedOut)?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(ParseError::Syntax {
                line: lower::first_error_line(root),
            });
        }
        if let Some(line) = lower::first_legacy_line(root) {
            return Err(ParseError::Syntax { line });
        }

        Ok(Self {
            nodes: lower::lower(&tree, source.as_bytes()),
        })
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.0]
    }

    /// Every node under `root` (the whole tree when `None`) accepted by
    /// `matcher`, in document order. `root` itself is a candidate.
    pub fn find_all<M>(&self, matcher: &M, root: Option<NodeId>) -> Vec<NodeId>
    where
        M: NodeMatcher + ?Sized,
    {
        let mut found = Vec::new();
        let mut stack = vec![root.unwrap_or_else(|| self.root())];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if matcher.matches(node) {
                found.push(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        found
    }

    /// Ancestors of `id` ordered from the module's direct children down to
    /// the node's parent. Neither the module node nor `id` is included.
    pub fn path_to(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = self.node(id).parent;
        while let Some(ancestor) = current {
            if ancestor == self.root() {
                break;
            }
            path.push(ancestor);
            current = self.node(ancestor).parent;
        }
        path.reverse();
        path
    }

    /// `{file_path}::{Outer.Inner.}{name}` for a function node.
    pub fn format_identifier(&self, id: NodeId, file_path: &str, path: &[NodeId]) -> String {
        let mut qualified: Vec<&str> = path
            .iter()
            .filter_map(|ancestor| self.node(*ancestor).as_class())
            .map(|class| class.name.as_str())
            .collect();
        qualified.push(self.node(id).name().unwrap_or_default());
        format!("{}::{}", file_path, qualified.join("."))
    }
}
