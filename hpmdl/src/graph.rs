//! Axiom dependency graph.
//!
//! DESIGN
//! ======
//! Nodes are axioms in declaration order. An edge `from -> to` means the
//! expression of `from` mentions axiom `to` by name. Declaration order is the
//! tie-breaker everywhere so output is stable across runs.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::ast::{Program, SafetyLevel};
use crate::error::SemanticError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxiomNode {
    pub name: String,
    pub tags: Vec<String>,
    pub safety: SafetyLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxiomEdge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxiomGraph {
    pub nodes: Vec<AxiomNode>,
    pub edges: Vec<AxiomEdge>,
}

impl AxiomGraph {
    #[must_use]
    pub fn from_program(program: &Program) -> Self {
        let nodes: Vec<AxiomNode> = program
            .axioms
            .iter()
            .map(|a| AxiomNode { name: a.name.clone(), tags: a.metadata.tags.clone(), safety: a.metadata.safety_level })
            .collect();

        let names: HashSet<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
        let mut edges = Vec::new();
        for axiom in &program.axioms {
            for var in axiom.expression.variables() {
                if names.contains(var.as_str()) {
                    edges.push(AxiomEdge { from: axiom.name.clone(), to: var });
                }
            }
        }

        Self { nodes, edges }
    }

    /// Axioms that `name` references directly.
    #[must_use]
    pub fn dependencies(&self, name: &str) -> Vec<&str> {
        self.edges.iter().filter(|e| e.from == name).map(|e| e.to.as_str()).collect()
    }

    /// Axioms that reference `name` directly.
    #[must_use]
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        self.edges.iter().filter(|e| e.to == name).map(|e| e.from.as_str()).collect()
    }

    /// Axiom names ordered so every axiom follows its dependencies.
    ///
    /// # Errors
    ///
    /// Returns [`SemanticError::CyclicAxiom`] with the offending chain
    /// (first name repeated at the end) when the graph has a cycle.
    pub fn topological_order(&self) -> Result<Vec<String>, SemanticError> {
        let count = self.nodes.len();
        let mut first_index: HashMap<&str, usize> = HashMap::new();
        for (i, node) in self.nodes.iter().enumerate() {
            first_index.entry(node.name.as_str()).or_insert(i);
        }
        let mut deps_by_name: HashMap<&str, BTreeSet<usize>> = HashMap::new();
        for edge in &self.edges {
            if let Some(&to) = first_index.get(edge.to.as_str()) {
                deps_by_name.entry(edge.from.as_str()).or_default().insert(to);
            }
        }

        // Kahn's algorithm; the min-heap keeps ties in declaration order.
        let mut pending = vec![0usize; count];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(deps) = deps_by_name.get(node.name.as_str()) {
                pending[i] = deps.len();
                for &dep in deps {
                    dependents[dep].push(i);
                }
            }
        }
        let mut ready: BinaryHeap<Reverse<usize>> =
            pending.iter().enumerate().filter(|(_, p)| **p == 0).map(|(i, _)| Reverse(i)).collect();

        let mut emitted = vec![false; count];
        let mut order = Vec::with_capacity(count);
        while let Some(Reverse(i)) = ready.pop() {
            emitted[i] = true;
            order.push(self.nodes[i].name.clone());
            for &next in &dependents[i] {
                pending[next] -= 1;
                if pending[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() < count {
            return Err(SemanticError::CyclicAxiom { chain: self.find_cycle(&emitted) });
        }
        Ok(order)
    }

    /// Render the graph as GraphML for external graph editors.
    #[must_use]
    pub fn to_graphml(&self) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str("<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">\n");
        out.push_str("  <key id=\"safety\" for=\"node\" attr.name=\"safety\" attr.type=\"string\"/>\n");
        out.push_str("  <key id=\"tags\" for=\"node\" attr.name=\"tags\" attr.type=\"string\"/>\n");
        out.push_str("  <graph id=\"axioms\" edgedefault=\"directed\">\n");
        for node in &self.nodes {
            let _ = writeln!(out, "    <node id=\"{}\">", xml_escape(&node.name));
            let _ = writeln!(out, "      <data key=\"safety\">{}</data>", node.safety.as_str());
            let _ = writeln!(out, "      <data key=\"tags\">{}</data>", xml_escape(&node.tags.join(",")));
            out.push_str("    </node>\n");
        }
        for (i, edge) in self.edges.iter().enumerate() {
            let _ = writeln!(
                out,
                "    <edge id=\"e{i}\" source=\"{}\" target=\"{}\"/>",
                xml_escape(&edge.from),
                xml_escape(&edge.to)
            );
        }
        out.push_str("  </graph>\n</graphml>\n");
        out
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    /// Walk unemitted dependencies from the first blocked node until a name repeats.
    fn find_cycle(&self, emitted: &[bool]) -> Vec<String> {
        let Some(start) = emitted.iter().position(|done| !done) else {
            return Vec::new();
        };

        let mut path: Vec<String> = Vec::new();
        let mut current = self.nodes[start].name.clone();
        loop {
            if let Some(at) = path.iter().position(|n| *n == current) {
                let mut chain = path.split_off(at);
                chain.push(current);
                return chain;
            }
            path.push(current.clone());
            let next = self
                .dependencies(&current)
                .into_iter()
                .find(|dep| self.index_of(dep).is_some_and(|j| !emitted[j]))
                .map(ToOwned::to_owned);
            match next {
                Some(n) => current = n,
                None => return path,
            }
        }
    }
}

fn xml_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
