//! Output formatting utilities

use std::fmt::Write;
use std::str::FromStr;

use depwalk_core::{ActionTag, DependencyNode};
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "tree" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("Unknown output format: {} (expected text or json)", other),
        }
    }
}

/// Pretty JSON for any serializable value
pub fn to_json<T: Serialize>(data: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(data)?)
}

fn join_actions(actions: &[ActionTag]) -> String {
    actions
        .iter()
        .map(ActionTag::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Indented text rendering of a dependency tree
pub fn render_tree(nodes: &[DependencyNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        render_node(&mut out, node, 0);
    }
    out
}

fn render_node(out: &mut String, node: &DependencyNode, level: usize) {
    let indent = "  ".repeat(level);
    // Writing to a String cannot fail
    let _ = writeln!(
        out,
        "{}{} {}#{} \"{}\" via {} [{}] depth={}",
        indent,
        node.label,
        node.entity_type,
        node.entity_id,
        node.display_name,
        node.foreign_key_field,
        join_actions(&node.actions),
        node.depth
    );

    if let Some(options) = &node.options {
        let listed: Vec<String> = options
            .iter()
            .map(|o| format!("{} ({})", o.name, o.id))
            .collect();
        let _ = writeln!(out, "{}  options: {}", indent, listed.join(", "));
    }

    for child in &node.children {
        render_node(out, child, level + 1);
    }
}

/// Render nodes in the requested format
pub fn format_nodes(nodes: &[DependencyNode], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => to_json(&nodes),
        OutputFormat::Text if nodes.is_empty() => Ok("No dependencies\n".to_string()),
        OutputFormat::Text => Ok(render_tree(nodes)),
    }
}
