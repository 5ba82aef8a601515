use tree_sitter::{Node, Parser};

/// Check that `source` is syntactically valid Python. Valid means the
/// grammar produces a tree with no error or missing nodes.
pub fn check_syntax(source: &str) -> Result<(), String> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::language())
        .map_err(|e| format!("Failed to load Python grammar: {}", e))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| "Python parser produced no tree".to_string())?;

    let root = tree.root_node();
    if !root.has_error() {
        return Ok(());
    }

    let line = first_error_line(root).map(|row| row + 1).unwrap_or(1);
    Err(format!("Python syntax error near line {}", line))
}

fn first_error_line(node: Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(row) = first_error_line(child) {
            return Some(row);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_source() {
        assert!(check_syntax("def f():\n    return 1\n").is_ok());
        assert!(check_syntax("class A:\n    def m(self):\n        pass\n").is_ok());
    }

    #[test]
    fn accepts_empty_source() {
        assert!(check_syntax("").is_ok());
    }

    #[test]
    fn rejects_broken_source() {
        let err = check_syntax("def (").unwrap_err();
        assert!(err.contains("syntax"), "unexpected message: {}", err);
    }

    #[test]
    fn rejects_unterminated_block() {
        assert!(check_syntax("if True:\n").is_err());
    }
}
