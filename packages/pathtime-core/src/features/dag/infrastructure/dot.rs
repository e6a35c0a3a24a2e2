//! DOT reader and writer for control-flow DAGs.
//!
//! The reader accepts the subset of DOT that CFG extractors emit: one
//! `digraph` block with `id [label="..."];` node statements and
//! `a -> b;` edge statements. Attributes other than `label` are ignored.

use std::io::Write;
use std::path::Path;

use regex::Regex;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::errors::{PathtimeError, Result};
use crate::features::dag::domain::{CfgNode, ControlFlowDag};
use crate::shared::models::Edge;

/// Parse a DOT file into a DAG.
pub fn read_dot_file(path: &Path, remove_back_edges: bool) -> Result<ControlFlowDag> {
    let text = std::fs::read_to_string(path)?;
    debug!(path = %path.display(), "reading control-flow DOT file");
    read_dot_str(&text, remove_back_edges)
}

/// Parse DOT text into a DAG.
pub fn read_dot_str(text: &str, remove_back_edges: bool) -> Result<ControlFlowDag> {
    // Statements end with `;`; node and edge ids are bare words or quoted.
    let edge_re = Regex::new(r#"^\s*"?([\w.$]+)"?\s*->\s*"?([\w.$]+)"?\s*(\[[^\]]*\])?\s*;?\s*$"#)
        .expect("edge pattern is valid");
    let node_re = Regex::new(r#"^\s*"?([\w.$]+)"?\s*(\[[^\]]*\])?\s*;?\s*$"#)
        .expect("node pattern is valid");
    let label_re = Regex::new(r#"label\s*=\s*"((?s:[^"]*))""#).expect("label pattern is valid");

    if !text.contains("digraph") {
        return Err(PathtimeError::malformed_dag(
            "DOT input does not declare a digraph",
        ));
    }

    let mut labels: FxHashMap<String, String> = FxHashMap::default();
    let mut order: Vec<String> = Vec::new();
    let mut edges: Vec<Edge> = Vec::new();

    fn note(labels: &mut FxHashMap<String, String>, order: &mut Vec<String>, id: &str) {
        if !labels.contains_key(id) {
            labels.insert(id.to_string(), String::new());
            order.push(id.to_string());
        }
    }

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty()
            || line.starts_with("//")
            || line.starts_with('#')
            || line.starts_with("digraph")
            || line.starts_with('{')
            || line.starts_with('}')
            || line.starts_with("graph")
            || line.starts_with("node ")
            || line.starts_with("edge ")
            || line.starts_with("rankdir")
        {
            continue;
        }
        if let Some(caps) = edge_re.captures(line) {
            let from = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let to = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            note(&mut labels, &mut order, from);
            note(&mut labels, &mut order, to);
            edges.push(Edge::new(from, to));
        } else if let Some(caps) = node_re.captures(line) {
            let id = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            note(&mut labels, &mut order, id);
            if let Some(attrs) = caps.get(2) {
                if let Some(lab) = label_re.captures(attrs.as_str()) {
                    labels.insert(id.to_string(), lab[1].to_string());
                }
            }
        }
    }

    if order.is_empty() {
        return Err(PathtimeError::malformed_dag("DOT input declares no nodes"));
    }

    let nodes: Vec<CfgNode> = order
        .into_iter()
        .map(|id| {
            let label = labels.remove(&id).unwrap_or_default();
            CfgNode { id, label }
        })
        .collect();
    ControlFlowDag::from_parts(nodes, edges, remove_back_edges)
}

/// Write a DAG as DOT, annotating edges with their current weights and
/// coloring the edges of `highlight` when given.
pub fn write_dot_file(
    dag: &ControlFlowDag,
    path: &Path,
    highlight: Option<&[Edge]>,
) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(render_dot(dag, highlight).as_bytes())?;
    debug!(path = %path.display(), "wrote control-flow DOT file");
    Ok(())
}

pub fn render_dot(dag: &ControlFlowDag, highlight: Option<&[Edge]>) -> String {
    let mut out = String::from("digraph cfg {\n");
    for node in dag.all_nodes() {
        let label = dag.label(node).unwrap_or_default();
        if label.is_empty() {
            out.push_str(&format!("  \"{node}\";\n"));
        } else {
            let escaped = label.replace('"', "\\\"");
            out.push_str(&format!("  \"{node}\" [label=\"{escaped}\"];\n"));
        }
    }
    for (idx, edge) in dag.all_edges().iter().enumerate() {
        let weight = dag.edge_weights[idx];
        let mut attrs = Vec::new();
        if weight != 0.0 {
            attrs.push(format!("label=\"{weight}\""));
        }
        if highlight.is_some_and(|edges| edges.contains(edge)) {
            attrs.push("color=\"red\"".to_string());
        }
        if attrs.is_empty() {
            out.push_str(&format!("  \"{}\" -> \"{}\";\n", edge.source, edge.target));
        } else {
            out.push_str(&format!(
                "  \"{}\" -> \"{}\" [{}];\n",
                edge.source,
                edge.target,
                attrs.join(", ")
            ));
        }
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIAMOND: &str = r#"
        digraph g {
          a [label="entry"];
          b [label="then"];
          c [label="else"];
          d [label="exit"];
          a -> b;
          a -> c;
          b -> d;
          c -> d;
        }
    "#;

    #[test]
    fn test_read_diamond() {
        let dag = read_dot_str(DIAMOND, false).unwrap();
        assert_eq!(dag.num_nodes(), 4);
        assert_eq!(dag.num_edges(), 4);
        assert_eq!(dag.label(&"a".to_string()), Some("entry"));
    }

    #[test]
    fn test_read_edges_imply_nodes() {
        let text = "digraph g { s -> t; }";
        let dag = read_dot_str(text, false).unwrap();
        assert_eq!(dag.num_nodes(), 2);
        assert_eq!(dag.source(), "s");
        assert_eq!(dag.sink(), "t");
    }

    #[test]
    fn test_rejects_non_digraph() {
        assert!(read_dot_str("graph g { a -- b; }", false).is_err());
    }

    #[test]
    fn test_render_round_trip() {
        let dag = read_dot_str(DIAMOND, false).unwrap();
        let rendered = render_dot(&dag, None);
        let again = read_dot_str(&rendered, false).unwrap();
        assert_eq!(again.num_nodes(), dag.num_nodes());
        assert_eq!(again.all_edges(), dag.all_edges());
        assert_eq!(again.label(&"b".to_string()), Some("then"));
    }

    #[test]
    fn test_highlighted_edges_are_colored() {
        let dag = read_dot_str(DIAMOND, false).unwrap();
        let highlight = vec![Edge::new("a", "b"), Edge::new("b", "d")];
        let rendered = render_dot(&dag, Some(&highlight));
        assert!(rendered.contains("\"a\" -> \"b\" [color=\"red\"]"));
        assert!(rendered.contains("\"a\" -> \"c\";"));
    }
}
