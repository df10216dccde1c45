use tree_sitter::{Node, Point};

use super::LanguageGrammar;

pub struct PythonGrammar;

impl LanguageGrammar for PythonGrammar {
    fn name(&self) -> &'static str {
        "python"
    }

    fn file_extensions(&self) -> &[&'static str] {
        // Stubs (.pyi) would duplicate every definition they shadow
        &["py"]
    }

    fn language(&self) -> tree_sitter::Language {
        tree_sitter_python::LANGUAGE.into()
    }

    fn initializer_stem(&self) -> Option<&'static str> {
        Some("__init__")
    }

    fn rejected_construct(&self, root: Node) -> Option<(Point, &'static str)> {
        let mut cursor = root.walk();
        loop {
            let node = cursor.node();
            match node.kind() {
                "print_statement" => return Some((node.start_position(), "Python 2 print statement")),
                "exec_statement" => return Some((node.start_position(), "Python 2 exec statement")),
                "parameters" | "lambda_parameters" => {
                    if let Some(param) = misplaced_parameter(node) {
                        return Some((param.start_position(), "non-default parameter follows default parameter"));
                    }
                }
                _ => {}
            }

            if cursor.goto_first_child() {
                continue;
            }
            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return None;
                }
            }
        }
    }
}

/// A positional parameter without a default after one with a default.
/// Anything after `*` or `*args` is keyword-only and may omit defaults.
fn misplaced_parameter(parameters: Node) -> Option<Node> {
    let mut seen_default = false;
    let mut cursor = parameters.walk();
    for param in parameters.named_children(&mut cursor) {
        match param.kind() {
            "default_parameter" | "typed_default_parameter" => seen_default = true,
            "list_splat_pattern" | "dictionary_splat_pattern" | "keyword_separator" => return None,
            "typed_parameter" if is_splat(param) => return None,
            "identifier" | "typed_parameter" | "tuple_pattern" if seen_default => return Some(param),
            _ => {}
        }
    }
    None
}

fn is_splat(typed_parameter: Node) -> bool {
    typed_parameter
        .named_child(0)
        .is_some_and(|c| matches!(c.kind(), "list_splat_pattern" | "dictionary_splat_pattern"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(source: &str) -> Option<(usize, &'static str)> {
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&PythonGrammar.language()).unwrap();
        let tree = parser.parse(source, None).unwrap();
        assert!(!tree.root_node().has_error());
        PythonGrammar
            .rejected_construct(tree.root_node())
            .map(|(point, reason)| (point.row, reason))
    }

    #[test]
    fn test_print_statement_rejected() {
        assert_eq!(rejected("x = 1\nprint \"x\"\n"), Some((1, "Python 2 print statement")));
    }

    #[test]
    fn test_print_call_accepted() {
        assert_eq!(rejected("print(\"x\")\n"), None);
    }

    #[test]
    fn test_exec_statement_rejected() {
        assert_eq!(rejected("exec \"code\"\n"), Some((0, "Python 2 exec statement")));
    }

    #[test]
    fn test_non_default_after_default_rejected() {
        let found = rejected("def f(a=1, b):\n    pass\n");
        assert_eq!(found, Some((0, "non-default parameter follows default parameter")));

        let found = rejected("def g(a: int = 1, b: int):\n    pass\n");
        assert_eq!(found.map(|(_, reason)| reason), Some("non-default parameter follows default parameter"));

        assert!(rejected("f = lambda a=1, b: a\n").is_some());
    }

    #[test]
    fn test_keyword_only_after_default_accepted() {
        assert_eq!(rejected("def f(a=1, *, b):\n    pass\n"), None);
        assert_eq!(rejected("def f(a=1, *args, b):\n    pass\n"), None);
        assert_eq!(rejected("def f(a=1, *args: int, b: str):\n    pass\n"), None);
        assert_eq!(rejected("def f(a, /, b=2, *, c):\n    pass\n"), None);
    }

    #[test]
    fn test_nested_function_checked() {
        let source = "def outer():\n    def inner(a=1, b):\n        pass\n";
        assert_eq!(rejected(source).map(|(row, _)| row), Some(1));
    }
}
