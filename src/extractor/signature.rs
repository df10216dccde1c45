//! Canonical signature rendering for collected functions.

use tree_sitter::Node;

use crate::models::{ParamKind, Parameter};

/// Renders `[async ]def name(params)[ -> ret]`.
///
/// Separators come from the parameter kinds, not from the source: `/` goes
/// after the last positional-only parameter and a bare `*` before the first
/// keyword-only parameter unless `*args` already introduced it.
pub fn render_signature(
    name: &str,
    parameters: &[Parameter],
    return_annotation: Option<&str>,
    is_async: bool,
) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(parameters.len() + 2);
    let last_positional_only = parameters
        .iter()
        .rposition(|p| p.kind == ParamKind::PositionalOnly);
    let mut seen_star = false;

    for (index, param) in parameters.iter().enumerate() {
        match param.kind {
            ParamKind::VarPositional => seen_star = true,
            ParamKind::KeywordOnly if !seen_star => {
                parts.push("*".to_string());
                seen_star = true;
            }
            _ => {}
        }

        parts.push(format_param(param));

        if Some(index) == last_positional_only {
            parts.push("/".to_string());
        }
    }

    let keyword = if is_async { "async def" } else { "def" };
    match return_annotation {
        Some(ret) if !ret.is_empty() => format!("{} {}({}) -> {}", keyword, name, parts.join(", "), ret),
        _ => format!("{} {}({})", keyword, name, parts.join(", ")),
    }
}

fn format_param(param: &Parameter) -> String {
    let prefix = match param.kind {
        ParamKind::VarPositional => "*",
        ParamKind::VarKeyword => "**",
        _ => "",
    };
    let mut out = format!("{}{}", prefix, param.name);
    if let Some(ann) = param.annotation.as_deref() {
        out.push_str(": ");
        out.push_str(ann);
    }
    let variadic = matches!(param.kind, ParamKind::VarPositional | ParamKind::VarKeyword);
    if param.has_default && !variadic {
        out.push_str("=...");
    }
    out
}

/// Text of an annotation node: the trimmed source slice when available,
/// otherwise a token-level reconstruction.
pub fn annotation_text(node: &Node, source: &[u8]) -> Option<String> {
    let literal = node
        .utf8_text(source)
        .ok()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    match literal {
        Some(text) => Some(text.to_string()),
        None => {
            let rebuilt = reconstruct_annotation(node, source);
            (!rebuilt.is_empty()).then_some(rebuilt)
        }
    }
}

/// Rebuilds annotation text from its tokens with normalized spacing
/// (`dict[ str ,int ]` becomes `dict[str, int]`).
pub fn reconstruct_annotation(node: &Node, source: &[u8]) -> String {
    let mut tokens = Vec::new();
    collect_tokens(node, source, &mut tokens);

    let mut out = String::new();
    let mut prev: Option<&str> = None;
    for token in &tokens {
        if let Some(p) = prev {
            if needs_space(p, token) {
                out.push(' ');
            }
        }
        out.push_str(token);
        prev = Some(token);
    }
    out
}

fn collect_tokens(node: &Node, source: &[u8], tokens: &mut Vec<String>) {
    if node.kind() == "comment" {
        return;
    }

    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();

    // Strings are atomic; their start/content/end pieces must not be spaced apart
    if children.is_empty() || matches!(node.kind(), "string" | "concatenated_string") {
        let text = String::from_utf8_lossy(&source[node.byte_range()]);
        let text = text.trim();
        if !text.is_empty() {
            tokens.push(text.to_string());
        }
        return;
    }

    for child in &children {
        collect_tokens(child, source, tokens);
    }
}

fn needs_space(prev: &str, token: &str) -> bool {
    if matches!(token, "," | ")" | "]" | "}" | "." | ":") {
        return false;
    }
    if matches!(prev, "(" | "[" | "{" | ".") {
        return false;
    }
    if matches!(token, "(" | "[") {
        let attached = prev
            .chars()
            .last()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == ')' || c == ']');
        return !attached;
    }
    true
}
