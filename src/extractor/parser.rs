use std::path::Path;
use std::sync::Arc;

use crate::error::{ExtractorError, Result};
use crate::languages::{LanguageGrammar, LanguageRegistry};

pub struct Parser {
    registry: LanguageRegistry,
}

impl Parser {
    pub fn new(registry: LanguageRegistry) -> Self {
        Self { registry }
    }

    pub fn parse_file(&self, path: &Path) -> Result<ParsedFile> {
        let grammar = self.registry.get_for_file(path).ok_or_else(|| ExtractorError::Parse {
            path: path.display().to_string(),
            message: "unsupported file type".to_string(),
        })?;

        let source = std::fs::read_to_string(path)?;
        self.parse_source(&source, grammar).map_err(|e| match e {
            ExtractorError::Parse { message, .. } => ExtractorError::Parse {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// Parses `source`, rejecting trees that contain syntax errors.
    pub fn parse_source(&self, source: &str, grammar: Arc<dyn LanguageGrammar>) -> Result<ParsedFile> {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);

        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&grammar.language())
            .map_err(|e| parse_error(e.to_string()))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| parse_error("Failed to parse source".to_string()))?;

        if tree.root_node().has_error() {
            let message = match first_error_position(tree.root_node()) {
                Some((row, column)) => format!("syntax error at line {}, column {}", row + 1, column + 1),
                None => "syntax error".to_string(),
            };
            return Err(parse_error(message));
        }

        if let Some((pos, reason)) = grammar.rejected_construct(tree.root_node()) {
            return Err(parse_error(format!(
                "syntax error at line {}, column {}: {}",
                pos.row + 1,
                pos.column + 1,
                reason
            )));
        }

        Ok(ParsedFile {
            tree,
            source: source.to_string(),
            grammar,
        })
    }
}

fn parse_error(message: String) -> ExtractorError {
    ExtractorError::Parse {
        path: "<source>".to_string(),
        message,
    }
}

/// Position of the first ERROR or MISSING node in document order
fn first_error_position(root: tree_sitter::Node) -> Option<(usize, usize)> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            let pos = node.start_position();
            return Some((pos.row, pos.column));
        }
        if node.has_error() && cursor.goto_first_child() {
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

pub struct ParsedFile {
    pub tree: tree_sitter::Tree,
    pub source: String,
    pub grammar: Arc<dyn LanguageGrammar>,
}

impl ParsedFile {
    pub fn root_node(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    pub fn source_bytes(&self) -> &[u8] {
        self.source.as_bytes()
    }

    pub fn node_text(&self, node: &tree_sitter::Node) -> &str {
        node.utf8_text(self.source_bytes()).unwrap_or("")
    }
}
