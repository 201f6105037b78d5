use anyhow::Result;
use dm_xml::schema::{AttrAction, Children, ElementDescriptor, Schema};
use serde::Serialize;

use crate::common;

#[derive(Serialize)]
struct AttributeNode {
    name: &'static str,
    required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    expect: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    writes: Option<&'static str>,
}

#[derive(Serialize)]
struct ElementNode {
    name: &'static str,
    required: bool,
    attributes: Vec<AttributeNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<ElementNode>,
}

fn element_node(elem: &ElementDescriptor) -> ElementNode {
    ElementNode {
        name: elem.name,
        required: elem.required,
        attributes: elem
            .attributes
            .iter()
            .map(|attr| AttributeNode {
                name: attr.name,
                required: attr.required,
                expect: match attr.action {
                    Some(AttrAction::Expect(value)) => Some(value),
                    _ => None,
                },
                writes: match attr.action {
                    Some(AttrAction::Write(action)) => Some(action.name()),
                    _ => None,
                },
            })
            .collect(),
        children: nodes(elem.children),
    }
}

fn nodes(children: Children) -> Vec<ElementNode> {
    children.elements().iter().map(element_node).collect()
}

/// Render the tree as indented text, one element per line.
pub fn render(schema: &Schema) -> Vec<String> {
    fn walk(node: &ElementNode, depth: usize, out: &mut Vec<String>) {
        let attrs = node
            .attributes
            .iter()
            .map(|attr| {
                let marker = if attr.required { "" } else { "?" };
                match attr.expect {
                    Some(value) => format!("{}{marker}=\"{value}\"", attr.name),
                    None => format!("{}{marker}", attr.name),
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        let required = if node.required { " (required)" } else { "" };
        let mut line = format!("{}<{}", "  ".repeat(depth), node.name);
        if !attrs.is_empty() {
            line.push(' ');
            line.push_str(&attrs);
        }
        line.push('>');
        line.push_str(required);
        out.push(line);
        for child in &node.children {
            walk(child, depth + 1, out);
        }
    }

    let mut out = Vec::new();
    for node in nodes(schema.root) {
        walk(&node, 0, &mut out);
    }
    out
}

pub fn run(json: bool) -> Result<()> {
    let schema = &dm_xml::STANDARD;
    if json {
        common::print_json(&nodes(schema.root))?;
    } else {
        println!("{} dialect", schema.name);
        for line in render(schema) {
            println!("{line}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_standard_tree() {
        let lines = render(&dm_xml::STANDARD);
        assert_eq!(
            lines[0],
            r#"<dm version="1.0" level="1" type="std"> (required)"#
        );
        assert_eq!(lines[1], "  <row enabled>");
        assert!(lines.iter().any(|l| l == "    <mask class type> (required)"));
        assert!(lines.contains(&"    <description>".to_string()));
        assert!(lines.iter().all(|l| !l.starts_with("      ")));
    }
}
