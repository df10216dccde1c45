//! Syntax collection: top-level functions and package export declarations.
//!
//! Only the direct children of the module node are inspected. Functions
//! nested in classes, conditionals or other functions are never tools.

use tree_sitter::Node;

use crate::extractor::parser::ParsedFile;
use crate::extractor::signature::{annotation_text, render_signature};
use crate::models::{
    ExportDeclaration, FunctionDefinition, ImportSource, ParamKind, Parameter, SourceFile, ToolRecord,
};

const EXPORT_LIST_NAME: &str = "__all__";

/// Everything collected from one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedFile {
    pub source: SourceFile,
    /// All top-level functions, public or not, in file order
    pub definitions: Vec<FunctionDefinition>,
    /// Names from `__all__`, if the module declares one
    pub export_list: Option<Vec<String>>,
    /// Export declarations; only ever populated for package initializers
    pub declarations: Vec<ExportDeclaration>,
}

impl CollectedFile {
    pub fn public_definitions(&self) -> impl Iterator<Item = &FunctionDefinition> {
        let export_list = self.export_list.as_deref();
        self.definitions.iter().filter(move |d| d.is_public(export_list))
    }

    /// Records for the functions this module defines itself
    pub fn direct_records(&self) -> Vec<ToolRecord> {
        self.public_definitions()
            .map(|def| ToolRecord::direct(&self.source.module, def))
            .collect()
    }

    pub fn has_re_exports(&self) -> bool {
        self.declarations
            .iter()
            .any(|d| matches!(d, ExportDeclaration::ReExport { .. }))
    }

    pub fn has_aliases(&self) -> bool {
        self.declarations
            .iter()
            .any(|d| matches!(d, ExportDeclaration::SubpackageAlias { .. }))
    }
}

/// Top-level statements the collector understands. Anything else at module
/// level is ignored.
enum TopLevelItem<'t> {
    Function(Node<'t>),
    ImportFrom(Node<'t>),
    Import(Node<'t>),
    Assignment(Node<'t>),
}

impl<'t> TopLevelItem<'t> {
    fn classify(node: Node<'t>) -> Option<Self> {
        match node.kind() {
            "function_definition" => Some(TopLevelItem::Function(node)),
            "decorated_definition" => node
                .child_by_field_name("definition")
                .filter(|def| def.kind() == "function_definition")
                .map(TopLevelItem::Function),
            "import_from_statement" => Some(TopLevelItem::ImportFrom(node)),
            "import_statement" => Some(TopLevelItem::Import(node)),
            "expression_statement" => node
                .named_child(0)
                .filter(|expr| expr.kind() == "assignment")
                .map(TopLevelItem::Assignment),
            _ => None,
        }
    }
}

pub struct SyntaxCollector;

impl Default for SyntaxCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxCollector {
    pub fn new() -> Self {
        Self
    }

    pub fn collect(&self, parsed: &ParsedFile, source: SourceFile) -> CollectedFile {
        let root = parsed.root_node();
        let mut cursor = root.walk();
        let items: Vec<TopLevelItem> = root
            .named_children(&mut cursor)
            .filter_map(TopLevelItem::classify)
            .collect();

        let export_list = self.export_list(parsed, &items);

        let mut definitions: Vec<FunctionDefinition> = Vec::new();
        let mut declarations = Vec::new();

        for item in &items {
            match item {
                TopLevelItem::Function(node) => {
                    if let Some(def) = self.function_definition(parsed, node, &source.path) {
                        // A later definition rebinds the name
                        definitions.retain(|d| d.name != def.name);
                        definitions.push(def);
                    }
                }
                TopLevelItem::ImportFrom(node) if source.is_package => {
                    self.import_from(parsed, node, &source.module, &mut declarations);
                }
                TopLevelItem::Import(node) if source.is_package => {
                    self.import_aliases(parsed, node, &mut declarations);
                }
                TopLevelItem::Assignment(node) if source.is_package => {
                    if let Some(names) = self.export_list_assignment(parsed, node) {
                        declarations.push(ExportDeclaration::ExportList { names });
                    }
                }
                _ => {}
            }
        }

        tracing::debug!(
            "Collected {} functions and {} declarations from {}",
            definitions.len(),
            declarations.len(),
            source.path
        );

        CollectedFile {
            source,
            definitions,
            export_list,
            declarations,
        }
    }

    /// Union of every literal `__all__` assignment, in declaration order
    fn export_list(&self, parsed: &ParsedFile, items: &[TopLevelItem]) -> Option<Vec<String>> {
        let mut names: Option<Vec<String>> = None;
        for item in items {
            if let TopLevelItem::Assignment(node) = item {
                if let Some(found) = self.export_list_assignment(parsed, node) {
                    let merged = names.get_or_insert_with(Vec::new);
                    for name in found {
                        if !merged.contains(&name) {
                            merged.push(name);
                        }
                    }
                }
            }
        }
        names
    }

    fn export_list_assignment(&self, parsed: &ParsedFile, node: &Node) -> Option<Vec<String>> {
        let left = node.child_by_field_name("left")?;
        if left.kind() != "identifier" || parsed.node_text(&left) != EXPORT_LIST_NAME {
            return None;
        }

        let mut right = node.child_by_field_name("right")?;
        if right.kind() == "parenthesized_expression" {
            right = right.named_child(0)?;
        }
        if !matches!(right.kind(), "list" | "tuple" | "set" | "expression_list") {
            return None;
        }

        let mut names = Vec::new();
        let mut cursor = right.walk();
        for element in right.named_children(&mut cursor) {
            let value = match element.kind() {
                "string" => string_literal_value(parsed, &element),
                "concatenated_string" => concatenated_string_value(parsed, &element),
                _ => None,
            };
            // Non-string entries are ignored
            if let Some(value) = value {
                if !names.contains(&value) {
                    names.push(value);
                }
            }
        }
        Some(names)
    }

    fn function_definition(
        &self,
        parsed: &ParsedFile,
        node: &Node,
        file_path: &str,
    ) -> Option<FunctionDefinition> {
        let name = parsed.node_text(&node.child_by_field_name("name")?).to_string();

        let mut cursor = node.walk();
        let is_async = node.children(&mut cursor).any(|c| c.kind() == "async");

        let parameters = node
            .child_by_field_name("parameters")
            .map(|p| self.parameters(parsed, &p))
            .unwrap_or_default();

        let return_annotation = node
            .child_by_field_name("return_type")
            .and_then(|r| annotation_text(&r, parsed.source_bytes()));

        let doc_first_line = node
            .child_by_field_name("body")
            .and_then(|body| docstring(parsed, &body))
            .and_then(|doc| first_doc_line(&doc));

        let signature = render_signature(&name, &parameters, return_annotation.as_deref(), is_async);

        Some(FunctionDefinition {
            name,
            parameters,
            return_annotation,
            doc_first_line,
            is_async,
            file: file_path.to_string(),
            lineno: node.start_position().row as u32 + 1,
            signature,
        })
    }

    fn parameters(&self, parsed: &ParsedFile, node: &Node) -> Vec<Parameter> {
        let source = parsed.source_bytes();
        let mut params: Vec<Parameter> = Vec::new();
        // Set by a bare `*` or by `*args`; everything after is keyword-only
        let mut keyword_only = false;

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            let plain_kind = if keyword_only {
                ParamKind::KeywordOnly
            } else {
                ParamKind::PositionalOrKeyword
            };

            match child.kind() {
                "identifier" | "tuple_pattern" => {
                    params.push(Parameter::new(parsed.node_text(&child), plain_kind));
                }
                "default_parameter" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        params.push(Parameter::new(parsed.node_text(&name), plain_kind).with_default());
                    }
                }
                "typed_default_parameter" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        let mut param = Parameter::new(parsed.node_text(&name), plain_kind).with_default();
                        param.annotation = child
                            .child_by_field_name("type")
                            .and_then(|t| annotation_text(&t, source));
                        params.push(param);
                    }
                }
                "typed_parameter" => {
                    let annotation = child
                        .child_by_field_name("type")
                        .and_then(|t| annotation_text(&t, source));
                    let mut inner_cursor = child.walk();
                    let target = child
                        .named_children(&mut inner_cursor)
                        .find(|n| n.kind() != "type" && n.kind() != "comment");
                    if let Some(target) = target {
                        let mut param = match target.kind() {
                            "list_splat_pattern" => {
                                keyword_only = true;
                                Parameter::new(splat_name(parsed, &target), ParamKind::VarPositional)
                            }
                            "dictionary_splat_pattern" => {
                                Parameter::new(splat_name(parsed, &target), ParamKind::VarKeyword)
                            }
                            _ => Parameter::new(parsed.node_text(&target), plain_kind),
                        };
                        param.annotation = annotation;
                        params.push(param);
                    }
                }
                "list_splat_pattern" => {
                    keyword_only = true;
                    params.push(Parameter::new(splat_name(parsed, &child), ParamKind::VarPositional));
                }
                "dictionary_splat_pattern" => {
                    params.push(Parameter::new(splat_name(parsed, &child), ParamKind::VarKeyword));
                }
                "keyword_separator" => keyword_only = true,
                "positional_separator" => {
                    for param in params.iter_mut() {
                        if param.kind == ParamKind::PositionalOrKeyword {
                            param.kind = ParamKind::PositionalOnly;
                        }
                    }
                }
                _ => {}
            }
        }

        params
    }

    fn import_from(
        &self,
        parsed: &ParsedFile,
        node: &Node,
        package: &str,
        declarations: &mut Vec<ExportDeclaration>,
    ) {
        let Some(module_node) = node.child_by_field_name("module_name") else {
            return;
        };

        let (level, module) = match module_node.kind() {
            "relative_import" => {
                let mut cursor = module_node.walk();
                let mut level = 0;
                let mut module = None;
                for part in module_node.named_children(&mut cursor) {
                    match part.kind() {
                        "import_prefix" => {
                            level = parsed.node_text(&part).chars().filter(|c| *c == '.').count()
                        }
                        "dotted_name" => module = Some(parsed.node_text(&part).to_string()),
                        _ => {}
                    }
                }
                (level, module)
            }
            _ => (0, Some(parsed.node_text(&module_node).to_string())),
        };

        let mut cursor = node.walk();
        if node.children(&mut cursor).any(|c| c.kind() == "wildcard_import") {
            tracing::debug!(
                "Discarding wildcard import from {} in {}",
                ImportSource::relative(level, module.as_deref()),
                package
            );
            return;
        }

        let mut cursor = node.walk();
        for name_node in node.children_by_field_name("name", &mut cursor) {
            let Some((name, local)) = imported_name(parsed, &name_node) else {
                continue;
            };
            let line = name_node.start_position().row as u32 + 1;

            let declaration = if module.is_none() && level > 0 {
                ExportDeclaration::SubpackageAlias {
                    local,
                    source: ImportSource::relative(level, Some(&name)),
                    line,
                }
            } else {
                ExportDeclaration::ReExport {
                    local,
                    source: ImportSource::relative(level, module.as_deref()),
                    name,
                    line,
                }
            };
            declarations.push(declaration);
        }
    }

    /// `import a.b as c` binds module `a.b` to `c`. A plain `import a.b`
    /// only binds `a` and is not an alias.
    fn import_aliases(&self, parsed: &ParsedFile, node: &Node, declarations: &mut Vec<ExportDeclaration>) {
        let mut cursor = node.walk();
        for name_node in node.children_by_field_name("name", &mut cursor) {
            if name_node.kind() != "aliased_import" {
                continue;
            }
            if let Some((module, local)) = imported_name(parsed, &name_node) {
                declarations.push(ExportDeclaration::SubpackageAlias {
                    local,
                    source: ImportSource::absolute(module),
                    line: name_node.start_position().row as u32 + 1,
                });
            }
        }
    }
}

/// `(imported, bound)` names of a `dotted_name` or `aliased_import` node
fn imported_name(parsed: &ParsedFile, node: &Node) -> Option<(String, String)> {
    match node.kind() {
        "dotted_name" => {
            let name = parsed.node_text(node).to_string();
            Some((name.clone(), name))
        }
        "aliased_import" => {
            let name = parsed.node_text(&node.child_by_field_name("name")?).to_string();
            let alias = parsed.node_text(&node.child_by_field_name("alias")?).to_string();
            Some((name, alias))
        }
        _ => None,
    }
}

fn splat_name(parsed: &ParsedFile, node: &Node) -> String {
    let mut cursor = node.walk();
    let inner = node
        .named_children(&mut cursor)
        .find(|n| n.kind() == "identifier");
    match inner {
        Some(ident) => parsed.node_text(&ident).to_string(),
        None => parsed.node_text(node).trim_start_matches('*').trim().to_string(),
    }
}

/// Raw docstring of a function body: the first statement, if it is a
/// plain string literal
fn docstring(parsed: &ParsedFile, body: &Node) -> Option<String> {
    let mut cursor = body.walk();
    let first = body.named_children(&mut cursor).find(|n| n.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = first.named_child(0)?;
    match expr.kind() {
        "string" => string_literal_value(parsed, &expr),
        "concatenated_string" => concatenated_string_value(parsed, &expr),
        _ => None,
    }
}

/// Value of a string literal. `None` for f-strings and bytes, which are
/// not constant text.
fn string_literal_value(parsed: &ParsedFile, node: &Node) -> Option<String> {
    let mut start = None;
    let mut end = None;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "string_start" => start = Some(child),
            "string_end" => end = Some(child),
            "interpolation" => return None,
            _ => {}
        }
    }
    let (start, end) = (start?, end?);

    let prefix = parsed
        .node_text(&start)
        .trim_end_matches(['"', '\''])
        .to_ascii_lowercase();
    if prefix.contains('f') || prefix.contains('b') {
        return None;
    }

    let content = parsed.source.get(start.end_byte()..end.start_byte())?;
    if prefix.contains('r') {
        Some(content.to_string())
    } else {
        Some(decode_escapes(content))
    }
}

fn concatenated_string_value(parsed: &ParsedFile, node: &Node) -> Option<String> {
    let mut cursor = node.walk();
    let mut value = String::new();
    for part in node.named_children(&mut cursor) {
        if part.kind() == "string" {
            value.push_str(&string_literal_value(parsed, &part)?);
        }
    }
    Some(value)
}

/// Decodes the backslash escapes of a non-raw string literal. Unknown or
/// malformed escapes and `\N{...}` names are kept verbatim.
pub fn decode_escapes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0c'),
            Some('v') => out.push('\x0b'),
            Some(first @ '0'..='7') => {
                let mut value = first as u32 - '0' as u32;
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            Some(kind @ ('x' | 'u' | 'U')) => {
                let width = match kind {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = chars.clone().take(width).collect();
                if digits.len() == width && digits.chars().all(|c| c.is_ascii_hexdigit()) {
                    for _ in 0..width {
                        chars.next();
                    }
                    let decoded = u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32);
                    // Lone surrogates have no `char`
                    out.push(decoded.unwrap_or(char::REPLACEMENT_CHARACTER));
                } else {
                    out.push('\\');
                    out.push(kind);
                }
            }
            Some('\n') => {}
            Some('\r') => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Normalizes docstring indentation the way `inspect.cleandoc` does.
pub fn clean_docstring(doc: &str) -> String {
    let expanded: Vec<String> = doc.lines().map(expand_tabs).collect();
    let lines: Vec<&str> = expanded.iter().map(String::as_str).collect();
    if lines.is_empty() {
        return String::new();
    }

    let margin = lines[1..]
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<&str> = Vec::with_capacity(lines.len());
    cleaned.push(lines[0].trim_start());
    for line in &lines[1..] {
        cleaned.push(line.get(margin..).unwrap_or_else(|| line.trim_start()));
    }

    while cleaned.last().is_some_and(|l| l.trim().is_empty()) {
        cleaned.pop();
    }
    let leading_blank = cleaned.iter().take_while(|l| l.trim().is_empty()).count();
    cleaned[leading_blank..].join("\n")
}

/// Replaces tabs with spaces up to the next multiple of eight columns
fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let spaces = 8 - column % 8;
            out.extend(std::iter::repeat(' ').take(spaces));
            column += spaces;
        } else {
            out.push(c);
            column += 1;
        }
    }
    out
}

/// First line of the cleaned docstring, or `None` if it is blank
pub fn first_doc_line(doc: &str) -> Option<String> {
    let cleaned = clean_docstring(doc);
    cleaned
        .trim()
        .lines()
        .next()
        .map(|l| l.trim_end().to_string())
        .filter(|l| !l.is_empty())
}
