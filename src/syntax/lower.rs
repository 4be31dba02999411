use super::{ClassDef, FunctionDef, NameRef, NodeId, NodeKind, Position, SyntaxNode};
use tree_sitter::{Node, Tree};

/// Flatten a tree-sitter tree into preorder arena nodes. Only named nodes
/// are kept; punctuation and keywords carry nothing the queries need.
pub(super) fn lower(tree: &Tree, source: &[u8]) -> Vec<SyntaxNode> {
    let mut nodes: Vec<SyntaxNode> = Vec::new();
    let mut stack: Vec<(Node, Option<NodeId>)> = vec![(tree.root_node(), None)];

    while let Some((ts_node, parent)) = stack.pop() {
        let id = NodeId(nodes.len());
        let point = ts_node.start_position();
        nodes.push(SyntaxNode {
            kind: lower_kind(ts_node, source),
            start: Position {
                line: point.row + 1,
                column: point.column,
            },
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            nodes[parent.0].children.push(id);
        }

        let mut cursor = ts_node.walk();
        let children: Vec<Node> = ts_node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev().map(|child| (child, Some(id))));
    }

    nodes
}

pub(super) fn first_error_line(root: Node) -> usize {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return node.start_position().row + 1;
        }
        if !node.has_error() {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    root.start_position().row + 1
}

/// Line of the first Python 2 statement the grammar accepts but the
/// language no longer does: `print x`, `exec code`, `raise E, v` and
/// `except E, e:`.
pub(super) fn first_legacy_line(root: Node) -> Option<usize> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if is_legacy_statement(node) {
            return Some(node.start_position().row + 1);
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

fn is_legacy_statement(node: Node) -> bool {
    match node.kind() {
        "print_statement" | "exec_statement" => true,
        "raise_statement" | "except_clause" => {
            let mut cursor = node.walk();
            let comma_form = node
                .children(&mut cursor)
                .any(|child| matches!(child.kind(), "," | "expression_list"));
            comma_form
        }
        _ => false,
    }
}

fn lower_kind(node: Node, source: &[u8]) -> NodeKind {
    match node.kind() {
        "module" => NodeKind::Module,
        "function_definition" => NodeKind::Function(FunctionDef {
            name: field_text(node, "name", source),
            is_async: is_async(node),
            decorators: decorators_of(node, source),
        }),
        "class_definition" => NodeKind::Class(ClassDef {
            name: field_text(node, "name", source),
            bases: bases_of(node, source),
        }),
        "call" => NodeKind::Call(
            node.child_by_field_name("function")
                .map(|callee| name_ref(callee, source))
                .unwrap_or(NameRef::Other),
        ),
        "assert_statement" => NodeKind::Assert,
        "decorator" => NodeKind::Decorator,
        other => NodeKind::Other(other),
    }
}

fn name_ref(expr: Node, source: &[u8]) -> NameRef {
    match expr.kind() {
        "identifier" => NameRef::Bare(text(expr, source)),
        "attribute" => NameRef::Member(field_text(expr, "attribute", source)),
        _ => NameRef::Other,
    }
}

fn is_async(func: Node) -> bool {
    func.child(0).is_some_and(|first| first.kind() == "async")
}

/// Decorators live on the wrapping `decorated_definition`, not on the
/// function node itself.
fn decorators_of(func: Node, source: &[u8]) -> Vec<NameRef> {
    let Some(parent) = func.parent().filter(|p| p.kind() == "decorated_definition") else {
        return Vec::new();
    };
    let mut cursor = parent.walk();
    let decorators: Vec<Node> = parent
        .named_children(&mut cursor)
        .filter(|child| child.kind() == "decorator")
        .collect();
    decorators
        .into_iter()
        .map(|decorator| {
            decorator
                .named_child(0)
                .map(|expr| name_ref(expr, source))
                .unwrap_or(NameRef::Other)
        })
        .collect()
}

fn bases_of(class: Node, source: &[u8]) -> Vec<NameRef> {
    let Some(arguments) = class.child_by_field_name("superclasses") else {
        return Vec::new();
    };
    let mut cursor = arguments.walk();
    let bases: Vec<Node> = arguments
        .named_children(&mut cursor)
        .filter(|arg| arg.kind() != "keyword_argument" && arg.kind() != "comment")
        .collect();
    bases
        .into_iter()
        .map(|base| name_ref(base, source))
        .collect()
}

fn field_text(node: Node, field: &str, source: &[u8]) -> String {
    node.child_by_field_name(field)
        .map(|child| text(child, source))
        .unwrap_or_default()
}

fn text(node: Node, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or_default().to_string()
}
