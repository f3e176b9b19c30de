use std::collections::VecDeque;
use std::fmt::Write as FmtWrite;

use crate::error::{MaporaError, Result};
use crate::state::{ResidueClass, Transition};

/// 可視化用の根ラベル
pub const GRAPH_ROOT_LABEL: &str = "R";

/// 既定の深さ上限（これ以上は図が読めなくなる）
pub const DEFAULT_MAX_DEPTH: u64 = 14;

/// 受け付ける深さ上限の最大値。節点数は深さに対して指数的に増える。
pub const MAX_GRAPH_DEPTH: u64 = 20;

const MERGE_COLOR: &str = "#2ecc71";
const SPLIT_COLOR: &str = "#e74c3c";

pub fn validate_graph_depth(depth: u64) -> Result<()> {
    if depth > MAX_GRAPH_DEPTH {
        return Err(MaporaError::InvalidParameter(format!(
            "graph depth {} exceeds {}",
            depth, MAX_GRAPH_DEPTH
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Merge,
    Split,
}

#[derive(Debug, Clone)]
pub struct GraphNode {
    pub state: ResidueClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphEdge {
    pub from: usize,
    pub to: usize,
    pub kind: EdgeKind,
}

/// 遷移規則を深さ上限まで明示的に展開したグラフ。
///
/// 安定性走査と違って終端判定はしない（深さ上限だけで止める）。
/// ノードは BFS 順に並び、index 0 が根。
#[derive(Debug, Clone, Default)]
pub struct TransitionGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub max_depth: u64,
}

impl TransitionGraph {
    pub fn build(root: ResidueClass, max_depth: u64) -> Self {
        let mut graph = TransitionGraph {
            nodes: vec![GraphNode { state: root }],
            edges: Vec::new(),
            max_depth,
        };
        let mut queue: VecDeque<usize> = VecDeque::new();
        queue.push_back(0);

        while let Some(idx) = queue.pop_front() {
            let curr = &graph.nodes[idx].state;
            if curr.depth() >= max_depth {
                continue;
            }
            match curr.next_state() {
                Transition::Merge(next) => {
                    let to = graph.push_node(next);
                    graph.edges.push(GraphEdge { from: idx, to, kind: EdgeKind::Merge });
                    queue.push_back(to);
                }
                Transition::Split => {
                    let (a, b) = curr.split_children();
                    for child in [a, b] {
                        let to = graph.push_node(child);
                        graph.edges.push(GraphEdge { from: idx, to, kind: EdgeKind::Split });
                        queue.push_back(to);
                    }
                }
            }
        }

        tracing::debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            max_depth,
            "transition graph built"
        );
        graph
    }

    fn push_node(&mut self, state: ResidueClass) -> usize {
        self.nodes.push(GraphNode { state });
        self.nodes.len() - 1
    }

    pub fn merge_edges(&self) -> usize {
        self.edges.iter().filter(|e| e.kind == EdgeKind::Merge).count()
    }

    pub fn split_edges(&self) -> usize {
        self.edges.iter().filter(|e| e.kind == EdgeKind::Split).count()
    }

    /// 分岐した節点の数（分岐辺は1節点につき2本）
    pub fn split_points(&self) -> usize {
        self.split_edges() / 2
    }

    /// 葉（深さ上限で展開を止めた節点）の数
    pub fn leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.state.depth() >= self.max_depth).count()
    }

    /// Graphviz DOT 形式で出力。合流辺は緑の太線、分岐辺は赤の細線。
    pub fn to_dot(&self, title: &str) -> String {
        let mut out = String::new();
        // String への write! は失敗しない
        let _ = writeln!(out, "digraph mapora {{");
        let _ = writeln!(out, "  label=\"{}\";", escape(title));
        let _ = writeln!(out, "  labelloc=t;");
        let _ = writeln!(out, "  node [shape=point, width=0.08, color=black];");
        let _ = writeln!(out, "  edge [arrowhead=none];");
        for node in &self.nodes {
            let s = &node.state;
            let _ = writeln!(
                out,
                "  \"{}\" [tooltip=\"{} mod {} (depth {})\"];",
                s.label(),
                s.residue(),
                s.modulus(),
                s.depth()
            );
        }
        for edge in &self.edges {
            let (color, width) = match edge.kind {
                EdgeKind::Merge => (MERGE_COLOR, 2),
                EdgeKind::Split => (SPLIT_COLOR, 1),
            };
            let _ = writeln!(
                out,
                "  \"{}\" -> \"{}\" [color=\"{}\", penwidth={}];",
                self.nodes[edge.from].state.label(),
                self.nodes[edge.to].state.label(),
                color,
                width
            );
        }
        out.push_str("}\n");
        out
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
