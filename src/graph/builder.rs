//! Turns a method body into a [`UsageGraph`].
//!
//! The builder first derives the control-flow graph of the instruction list
//! and splits it with a depth-first search into an acyclic skeleton plus loop
//! back-edges. Instructions are then visited in reverse postorder while a
//! flow state (control frontier and def-use map) is propagated along the
//! skeleton. Non-library instructions are elided but keep the def-use map
//! pointing at the library node a value originally came from.
//!
//! Each back-edge closes a natural loop: the head plus every instruction that
//! reaches the tail without passing the head. Loop-back edges run from the
//! library nodes that may execute last in that loop to the first library
//! nodes of its body. A loop without library nodes adds no edge.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::core::errors::{Result, SchaapiError};
use crate::graph::instruction::{Instruction, InstructionKind, LibrarySurface};
use crate::graph::usage::{EdgeKind, UsageGraph, UsageNode};

/// Builds usage graphs for one target library.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    library: LibrarySurface,
}

impl GraphBuilder {
    /// Create a builder that keeps instructions targeting `library`
    pub fn new(library: LibrarySurface) -> Self {
        Self { library }
    }

    /// Library surface used to select nodes
    pub fn library(&self) -> &LibrarySurface {
        &self.library
    }

    /// Build the usage graph of one method body.
    ///
    /// Operands without a recorded definition are counted as external inputs
    /// of the consuming node. Only malformed jump targets are rejected.
    pub fn build(&self, instructions: &[Instruction]) -> Result<UsageGraph> {
        let flow = ControlFlow::analyze(instructions)?;
        let mut graph = UsageGraph::new();
        let mut node_at: Vec<Option<usize>> = vec![None; instructions.len()];
        let mut out: Vec<Option<FlowState>> = vec![None; instructions.len()];

        for &index in &flow.order {
            let mut state = FlowState::default();
            for &pred in &flow.preds[index] {
                if let Some(prev) = &out[pred] {
                    state.merge(prev);
                }
            }

            let instruction = &instructions[index];
            if self.library.involves(instruction) {
                node_at[index] = Some(emit(&mut graph, &mut state, instruction, index)?);
            } else if let Some(result) = &instruction.result {
                let origins = state.origins(instruction);
                state.defs.insert(result.clone(), origins);
            }
            out[index] = Some(state);
        }

        for &(tail, head) in &flow.back_edges {
            let Some(state) = &out[tail] else {
                continue;
            };
            let body = natural_loop(&flow, tail, head);
            let entries = loop_entries(&flow, &node_at, &body, head);
            let exits: Vec<usize> = state
                .frontier
                .iter()
                .copied()
                .filter(|&node| graph.node(node).is_some_and(|n| body[n.order]))
                .collect();
            for &from in &exits {
                for &to in &entries {
                    graph.add_edge(from, to, EdgeKind::LoopBack)?;
                }
            }
        }

        debug!(
            instructions = instructions.len(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            loops = flow.back_edges.len(),
            "Built usage graph"
        );
        Ok(graph)
    }
}

/// Library nodes that may execute last on a path, plus the library nodes
/// each variable's value can originate from.
#[derive(Debug, Clone, Default)]
struct FlowState {
    frontier: BTreeSet<usize>,
    defs: BTreeMap<String, BTreeSet<usize>>,
}

impl FlowState {
    fn merge(&mut self, other: &FlowState) {
        self.frontier.extend(other.frontier.iter().copied());
        for (var, origins) in &other.defs {
            self.defs
                .entry(var.clone())
                .or_default()
                .extend(origins.iter().copied());
        }
    }

    /// Library origins of every local an instruction reads
    fn origins(&self, instruction: &Instruction) -> BTreeSet<usize> {
        instruction
            .locals()
            .filter_map(|local| self.defs.get(local))
            .flatten()
            .copied()
            .collect()
    }
}

fn emit(
    graph: &mut UsageGraph,
    state: &mut FlowState,
    instruction: &Instruction,
    index: usize,
) -> Result<usize> {
    let mut node = UsageNode::new(instruction.clone(), index);
    let mut data_origins = BTreeSet::new();
    for local in instruction.locals() {
        match state.defs.get(local) {
            Some(origins) => data_origins.extend(origins.iter().copied()),
            None => node.external_inputs += 1,
        }
    }

    let id = graph.add_node(node);
    for &from in &state.frontier {
        graph.add_edge(from, id, EdgeKind::Control)?;
    }
    for from in data_origins {
        graph.add_edge(from, id, EdgeKind::Data)?;
    }

    state.frontier = BTreeSet::from([id]);
    if let Some(result) = &instruction.result {
        state.defs.insert(result.clone(), BTreeSet::from([id]));
    }
    Ok(id)
}

/// Instructions of the loop closed by the back-edge `tail -> head`
fn natural_loop(flow: &ControlFlow, tail: usize, head: usize) -> Vec<bool> {
    let mut body = vec![false; flow.preds.len()];
    body[head] = true;
    let mut pending = vec![tail];
    while let Some(index) = pending.pop() {
        if body[index] {
            continue;
        }
        body[index] = true;
        let looping = flow
            .back_edges
            .iter()
            .filter(|&&(_, to)| to == index)
            .map(|&(from, _)| from);
        pending.extend(flow.preds[index].iter().copied().chain(looping));
    }
    body
}

/// First library nodes reachable from the loop head without leaving the loop
fn loop_entries(
    flow: &ControlFlow,
    node_at: &[Option<usize>],
    body: &[bool],
    head: usize,
) -> BTreeSet<usize> {
    let mut entries = BTreeSet::new();
    let mut visited = vec![false; body.len()];
    let mut pending = vec![head];
    while let Some(index) = pending.pop() {
        if !body[index] || visited[index] {
            continue;
        }
        visited[index] = true;
        match node_at[index] {
            Some(node) => {
                entries.insert(node);
            }
            None => pending.extend(flow.succs[index].iter().copied()),
        }
    }
    entries
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unseen,
    Active,
    Done,
}

/// Control-flow graph split into an acyclic skeleton and back-edges.
#[derive(Debug, Default)]
struct ControlFlow {
    /// Reachable instructions in reverse postorder
    order: Vec<usize>,
    succs: Vec<Vec<usize>>,
    preds: Vec<Vec<usize>>,
    back_edges: Vec<(usize, usize)>,
}

impl ControlFlow {
    fn analyze(instructions: &[Instruction]) -> Result<Self> {
        let len = instructions.len();
        if len == 0 {
            return Ok(Self::default());
        }

        let jumps = instructions
            .iter()
            .enumerate()
            .map(|(index, instruction)| successors(index, instruction, len))
            .collect::<Result<Vec<_>>>()?;

        let mut visit = vec![Visit::Unseen; len];
        let mut succs = vec![Vec::new(); len];
        let mut back_edges = Vec::new();
        let mut postorder = Vec::with_capacity(len);
        let mut stack: Vec<(usize, usize)> = vec![(0, 0)];
        visit[0] = Visit::Active;

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            if next < jumps[node].len() {
                frame.1 += 1;
                let succ = jumps[node][next];
                match visit[succ] {
                    Visit::Active => back_edges.push((node, succ)),
                    Visit::Done => succs[node].push(succ),
                    Visit::Unseen => {
                        succs[node].push(succ);
                        visit[succ] = Visit::Active;
                        stack.push((succ, 0));
                    }
                }
            } else {
                visit[node] = Visit::Done;
                postorder.push(node);
                stack.pop();
            }
        }

        let mut preds = vec![Vec::new(); len];
        for (node, targets) in succs.iter().enumerate() {
            for &target in targets {
                preds[target].push(node);
            }
        }

        postorder.reverse();
        Ok(Self {
            order: postorder,
            succs,
            preds,
            back_edges,
        })
    }
}

fn successors(index: usize, instruction: &Instruction, len: usize) -> Result<Vec<usize>> {
    let mut succs = Vec::new();
    if instruction.kind.falls_through() && index + 1 < len {
        succs.push(index + 1);
    }
    if matches!(instruction.kind, InstructionKind::Branch | InstructionKind::Goto) {
        for &target in &instruction.targets {
            if target >= len {
                return Err(SchaapiError::graph_element(
                    format!("jump target out of range ({len} instructions)"),
                    format!("instruction {index} -> {target}"),
                ));
            }
            if !succs.contains(&target) {
                succs.push(target);
            }
        }
    }
    Ok(succs)
}
