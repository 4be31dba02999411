//! Test-function classification following pytest and unittest discovery
//! conventions, gated by a check that the body actually asserts something.

use crate::syntax::{NameRef, Navigator, NodeId, NodeKind, NodeTag, SyntaxNode};
use tracing::trace;

const TEST_FUNCTION_PREFIX: &str = "test";
const TEST_CLASS_PREFIX: &str = "Test";
const TEST_CASE_BASE: &str = "TestCase";
const INITIALIZER: &str = "__init__";
const ASSERT_PREFIX: &str = "assert";

/// Decorators that make a non-`test*` method inside a test class count.
/// `classmethods` is matched literally; see DESIGN.md.
const CLASS_LEVEL_DECORATORS: [&str; 2] = ["staticmethod", "classmethods"];

/// Free functions that signal an expectation even without an `assert`
/// prefix (nose's `ok_`, pytest's bare `raises`/`fail`).
const ASSERTION_HELPERS: [&str; 3] = ["raises", "fail", "ok_"];

#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyOptions {
    /// Also consider `async def` functions.
    pub include_async: bool,
}

/// Identifiers of every test function in `nav`, labelled with
/// `file_label`, in document order.
pub fn collect_tests(nav: &Navigator, file_label: &str, options: ClassifyOptions) -> Vec<String> {
    let is_candidate = |node: &SyntaxNode| match node.tag() {
        NodeTag::FunctionDef => true,
        NodeTag::AsyncFunctionDef => options.include_async,
        _ => false,
    };

    nav.find_all(&is_candidate, None)
        .into_iter()
        .filter_map(|func| {
            let path = nav.path_to(func);
            if !is_test_function(nav, func, &path) {
                return None;
            }
            let identifier = nav.format_identifier(func, file_label, &path);
            let start = nav.node(func).start;
            trace!(line = start.line, column = start.column, %identifier, "test function");
            Some(identifier)
        })
        .collect()
}

pub fn is_test_function(nav: &Navigator, func: NodeId, path: &[NodeId]) -> bool {
    let Some(def) = nav.node(func).as_function() else {
        return false;
    };

    let in_class = path.iter().any(|id| nav.node(*id).as_class().is_some());
    let eligible = if in_class {
        path.iter().any(|id| is_test_class(nav, *id))
            && (def.name.starts_with(TEST_FUNCTION_PREFIX)
                || def.decorators.iter().any(|decorator| {
                    decorator
                        .as_bare()
                        .is_some_and(|name| CLASS_LEVEL_DECORATORS.contains(&name))
                }))
    } else {
        def.name.starts_with(TEST_FUNCTION_PREFIX)
    };

    eligible && has_assertion(nav, func)
}

/// A class named `Test*` or deriving from `TestCase`, without its own
/// `__init__`.
pub fn is_test_class(nav: &Navigator, id: NodeId) -> bool {
    let Some(class) = nav.node(id).as_class() else {
        return false;
    };

    let named_like_test = class.name.starts_with(TEST_CLASS_PREFIX);
    let inherits_test_case = class
        .bases
        .iter()
        .any(|base| base.simple_name() == Some(TEST_CASE_BASE));
    if !named_like_test && !inherits_test_case {
        return false;
    }

    !direct_methods(nav, id)
        .iter()
        .any(|method| method.name() == Some(INITIALIZER))
}

/// An assertion in the body, or in a decorator expression such as nose's
/// `@raises(ValueError)`.
pub fn has_assertion(nav: &Navigator, func: NodeId) -> bool {
    if !nav.find_all(&is_assertion, Some(func)).is_empty() {
        return true;
    }
    decorators_of(nav, func)
        .into_iter()
        .any(|decorator| !nav.find_all(&is_assertion, Some(decorator)).is_empty())
}

fn decorators_of(nav: &Navigator, func: NodeId) -> Vec<NodeId> {
    let Some(parent) = nav.node(func).parent() else {
        return Vec::new();
    };
    let wrapper = nav.node(parent);
    if wrapper.kind != NodeKind::Other("decorated_definition") {
        return Vec::new();
    }
    wrapper
        .children()
        .iter()
        .copied()
        .filter(|id| nav.node(*id).tag() == NodeTag::Decorator)
        .collect()
}

fn is_assertion(node: &SyntaxNode) -> bool {
    match &node.kind {
        NodeKind::Assert => true,
        NodeKind::Call(NameRef::Member(name)) => name.starts_with(ASSERT_PREFIX),
        NodeKind::Call(NameRef::Bare(name)) => {
            name.starts_with(ASSERT_PREFIX) || ASSERTION_HELPERS.contains(&name.as_str())
        }
        _ => false,
    }
}

/// Functions defined directly in the class body, decorated or not.
fn direct_methods(nav: &Navigator, class: NodeId) -> Vec<&SyntaxNode> {
    let mut methods = Vec::new();
    let bodies = nav
        .node(class)
        .children()
        .iter()
        .filter(|id| nav.node(**id).kind == NodeKind::Other("block"));
    for body in bodies {
        for member in nav.node(*body).children() {
            let node = nav.node(*member);
            match &node.kind {
                NodeKind::Function(_) => methods.push(node),
                NodeKind::Other("decorated_definition") => methods.extend(
                    node.children()
                        .iter()
                        .map(|id| nav.node(*id))
                        .filter(|child| child.as_function().is_some()),
                ),
                _ => {}
            }
        }
    }
    methods
}
