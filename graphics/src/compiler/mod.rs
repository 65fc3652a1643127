//! Render graph compilation.
//!
//! Turns one frame's declarations into a dependency graph of nodes, rooted
//! at a synthetic node that depends on every declared output.
//!
//! # Design Philosophy
//!
//! Compilation is demand driven. Starting from the outputs, it walks
//! backwards from each consumer to the passes that produce what it reads,
//! keeping the walk on an explicit stack:
//!
//! 1. **Producer lookup** - writers of a resource first, then read-writers,
//!    limited to those declared before the consumer
//! 2. **Memoization** - a pass gets at most one node, however many
//!    consumers reach it
//! 3. **Cycle Detection** - reaching a pass that is still being built
//!    aborts with the path that closed the loop
//!
//! Declaration order acts as a version chain per resource: a pass sees the
//! writes declared before it. A read-only pass declared ahead of every
//! producer waits on all of them, and the root waits on every producer.
//!
//! Passes never reached are culled: they get no node and never run. There
//! is no global sort; the [`executor`](crate::executor) derives the order
//! from the node edges.

use ember_core::arena::{Cursor, List};
use ember_core::profile_function;

use crate::error::GraphError;
use crate::graph::node::{Node, NodeId};
use crate::graph::{BuildState, GraphArena, PassHandle, Resource, ResourceHandle, Usage};

/// Producers of one resource still to be linked to a consumer.
struct ProducerScan {
    writers: Cursor<PassHandle>,
    read_writers: Cursor<PassHandle>,
    /// Passes at or after this index are not observed.
    bound: usize,
}

impl ProducerScan {
    fn new(
        arena: &GraphArena,
        resource: ResourceHandle,
        consumer: Option<PassHandle>,
    ) -> Option<Self> {
        let tracked = arena.resources.get(resource.0)?;
        let bound = match consumer {
            Some(pass) if sees_earlier_producer(arena, tracked, pass) => pass.index(),
            _ => usize::MAX,
        };
        Some(Self {
            writers: tracked.writers().cursor(),
            read_writers: tracked.read_writers().cursor(),
            bound,
        })
    }
}

/// A node whose inputs are being resolved. The root has no pass and walks
/// the outputs instead of usages.
struct Frame {
    node: NodeId,
    pass: Option<PassHandle>,
    next_output: usize,
    usages: Cursor<Usage>,
    dependencies: Cursor<PassHandle>,
    scan: Option<ProducerScan>,
}

impl Frame {
    fn new(
        node: NodeId,
        pass: Option<PassHandle>,
        usages: List<Usage>,
        dependencies: List<PassHandle>,
    ) -> Self {
        Self {
            node,
            pass,
            next_output: 0,
            usages: usages.cursor(),
            dependencies: dependencies.cursor(),
            scan: None,
        }
    }
}

/// Build the frame's dependency graph and return its root node.
///
/// Every pass reachable from an output ends up with exactly one node. On
/// error the arena keeps a partial graph and must be reset before reuse.
pub(crate) fn build(arena: &mut GraphArena) -> Result<NodeId, GraphError> {
    profile_function!();

    let root = arena.nodes.alloc(Node::root());
    let mut stack = vec![Frame::new(root, None, List::new(), List::new())];

    while let Some(frame) = stack.last_mut() {
        let consumer = frame.node;
        let Some(producer) = next_producer(arena, frame) else {
            let finished = stack.pop().map(|frame| frame.pass);
            if let Some(Some(pass)) = finished {
                arena.visiting.pop();
                set_state(arena, pass, BuildState::Built(consumer));
            }
            if let Some(parent) = stack.last() {
                link(arena, parent.node, consumer);
            }
            continue;
        };

        let Some(entry) = arena.passes.get(producer.0) else {
            return Err(GraphError::StaleHandle {
                kind: "pass",
                index: producer.0.index(),
                generation: producer.0.generation(),
            });
        };
        match entry.state() {
            BuildState::Built(node) => link(arena, consumer, node),
            BuildState::Visiting => return Err(cycle_error(arena, producer)),
            BuildState::Unvisited => {
                let (usages, dependencies) = (*entry.usages(), *entry.dependencies());
                let node = arena.nodes.alloc(Node::for_pass(producer));
                set_state(arena, producer, BuildState::Visiting);
                arena.visiting.push(producer);
                stack.push(Frame::new(node, Some(producer), usages, dependencies));
            }
        }
    }

    log::trace!(
        "Built render graph: {} of {} passes reachable from {} outputs",
        arena.nodes.len() - 1,
        arena.passes.len(),
        arena.outputs.len()
    );
    Ok(root)
}

/// Next pass `frame` has to wait on, or `None` once its inputs are linked.
///
/// Producers of each read resource come first, in usage order, then the
/// explicit dependencies.
fn next_producer(arena: &GraphArena, frame: &mut Frame) -> Option<PassHandle> {
    loop {
        if let Some(scan) = &mut frame.scan {
            while let Some(producer) = arena
                .pass_links
                .next(&mut scan.writers)
                .or_else(|| arena.pass_links.next(&mut scan.read_writers))
            {
                if Some(producer) != frame.pass && producer.index() < scan.bound {
                    return Some(producer);
                }
            }
            frame.scan = None;
        }

        let resource = match frame.pass {
            None => {
                let output = arena.outputs.get(frame.next_output).copied()?;
                frame.next_output += 1;
                output
            }
            Some(_) => match arena.usages.next(&mut frame.usages) {
                Some(usage) if usage.access.reads() => usage.resource,
                Some(_) => continue,
                None => return arena.pass_links.next(&mut frame.dependencies),
            },
        };
        frame.scan = ProducerScan::new(arena, resource, frame.pass);
    }
}

/// Whether `pass` only sees producers of `resource` declared before it.
///
/// True when such a producer exists or when `pass` itself produces the
/// resource; a producer never waits on a later one.
fn sees_earlier_producer(arena: &GraphArena, resource: &Resource, pass: PassHandle) -> bool {
    arena
        .pass_links
        .iter(resource.writers())
        .chain(arena.pass_links.iter(resource.read_writers()))
        .any(|&producer| producer == pass || producer.index() < pass.index())
}

fn set_state(arena: &mut GraphArena, pass: PassHandle, state: BuildState) {
    if let Some(entry) = arena.passes.get_mut(pass.0) {
        entry.set_state(state);
    }
}

/// Record that `consumer` runs after `producer`.
fn link(arena: &mut GraphArena, consumer: NodeId, producer: NodeId) {
    let Some(producer_depth) = arena.nodes.get(producer).map(|node| node.depth) else {
        return;
    };
    let Some(node) = arena.nodes.get_mut(consumer) else {
        return;
    };
    // A pass reading two outputs of one producer links to it once.
    if arena.node_links.contains(&node.dependencies, &producer) {
        return;
    }
    arena.node_links.push(&mut node.dependencies, producer);
    node.depth = node.depth.max(producer_depth + 1);

    if let Some(node) = arena.nodes.get_mut(producer) {
        arena.node_links.push(&mut node.dependents, consumer);
    }
}

fn cycle_error(arena: &GraphArena, closing: PassHandle) -> GraphError {
    let start = arena
        .visiting
        .iter()
        .position(|&pass| pass == closing)
        .unwrap_or(0);
    let cycle = arena.visiting[start..]
        .iter()
        .chain(std::iter::once(&closing))
        .map(|&pass| arena.pass_name(pass).to_owned())
        .collect();
    GraphError::CyclicDependency { cycle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Access, GraphConfig, PassKind, RenderGraph, ResourceKey};

    fn key(id: u64) -> ResourceKey {
        ResourceKey::scope(id)
    }

    fn node_of(arena: &GraphArena, pass: PassHandle) -> Option<NodeId> {
        match arena.passes.get(pass.0)?.state() {
            BuildState::Built(node) => Some(node),
            _ => None,
        }
    }

    fn dependencies_of(arena: &GraphArena, node: NodeId) -> Vec<Option<PassHandle>> {
        let node = arena.nodes.get(node).unwrap();
        arena
            .node_links
            .iter(&node.dependencies)
            .map(|&dep| arena.nodes.get(dep).unwrap().pass)
            .collect()
    }

    fn depth_of(arena: &GraphArena, node: NodeId) -> u32 {
        arena.nodes.get(node).unwrap().depth
    }

    fn frame(arena: &mut GraphArena) -> RenderGraph<'_> {
        arena.begin_frame(GraphConfig::default().with_write_hazard_warnings(false))
    }

    #[test]
    fn test_build_empty_graph() {
        let mut arena = GraphArena::new();
        drop(frame(&mut arena));

        let root = build(&mut arena).unwrap();
        assert!(dependencies_of(&arena, root).is_empty());
        assert_eq!(arena.nodes.len(), 1);
        assert_eq!(depth_of(&arena, root), 0);
    }

    #[test]
    fn test_build_linear_chain() {
        // A -> B -> C, C writes the output
        let mut arena = GraphArena::new();
        let (a, b, c) = {
            let mut graph = frame(&mut arena);
            let a = graph.add_pass(PassKind::Graphics, "A").write(key(1)).handle();
            let b = graph
                .add_pass(PassKind::Graphics, "B")
                .read(key(1))
                .write(key(2))
                .handle();
            let c = graph
                .add_pass(PassKind::Graphics, "C")
                .read(key(2))
                .write(key(3))
                .handle();
            graph.add_output(key(3));
            (a, b, c)
        };

        let root = build(&mut arena).unwrap();
        let (na, nb, nc) = (
            node_of(&arena, a).unwrap(),
            node_of(&arena, b).unwrap(),
            node_of(&arena, c).unwrap(),
        );

        assert_eq!(dependencies_of(&arena, root), vec![Some(c)]);
        assert_eq!(dependencies_of(&arena, nc), vec![Some(b)]);
        assert_eq!(dependencies_of(&arena, nb), vec![Some(a)]);
        assert!(dependencies_of(&arena, na).is_empty());

        assert_eq!(depth_of(&arena, na), 0);
        assert_eq!(depth_of(&arena, nc), 2);
        assert_eq!(depth_of(&arena, root), 3);
    }

    #[test]
    fn test_build_diamond_shares_node() {
        //     A
        //    / \
        //   B   C
        //    \ /
        //     D
        let mut arena = GraphArena::new();
        let a = {
            let mut graph = frame(&mut arena);
            let a = graph.add_pass(PassKind::Compute, "A").write(key(1)).handle();
            graph
                .add_pass(PassKind::Compute, "B")
                .read(key(1))
                .write(key(2));
            graph
                .add_pass(PassKind::Compute, "C")
                .read(key(1))
                .write(key(3));
            graph
                .add_pass(PassKind::Graphics, "D")
                .read(key(2))
                .read(key(3))
                .write(key(4));
            graph.add_output(key(4));
            a
        };

        build(&mut arena).unwrap();

        // root + one node per pass
        assert_eq!(arena.nodes.len(), 5);
        let na = node_of(&arena, a).unwrap();
        let dependents = arena.nodes.get(na).unwrap().dependents;
        assert_eq!(arena.node_links.iter(&dependents).count(), 2);
    }

    #[test]
    fn test_build_culls_unreachable() {
        let mut arena = GraphArena::new();
        let (used, unused) = {
            let mut graph = frame(&mut arena);
            let used = graph.add_pass(PassKind::Graphics, "used").write(key(1)).handle();
            let unused = graph
                .add_pass(PassKind::Graphics, "unused")
                .write(key(2))
                .handle();
            graph.add_output(key(1));
            (used, unused)
        };

        build(&mut arena).unwrap();
        assert!(node_of(&arena, used).is_some());
        assert!(node_of(&arena, unused).is_none());
        assert_eq!(arena.nodes.len(), 2);
    }

    #[test]
    fn test_build_writers_before_read_writers() {
        let mut arena = GraphArena::new();
        let (w, rw) = {
            let mut graph = frame(&mut arena);
            let w = graph.add_pass(PassKind::Compute, "w").write(key(1)).handle();
            let rw = graph
                .add_pass(PassKind::Compute, "rw")
                .read_write(key(1))
                .handle();
            graph.add_output(key(1));
            (w, rw)
        };

        let root = build(&mut arena).unwrap();
        assert_eq!(dependencies_of(&arena, root), vec![Some(w), Some(rw)]);
        // The read-writer depends on the plain writer, not on itself.
        let nrw = node_of(&arena, rw).unwrap();
        assert_eq!(dependencies_of(&arena, nrw), vec![Some(w)]);
    }

    #[test]
    fn test_build_read_writer_ignores_later_writer() {
        let mut arena = GraphArena::new();
        let (rw, w) = {
            let mut graph = frame(&mut arena);
            let rw = graph
                .add_pass(PassKind::Compute, "rw")
                .read_write(key(1))
                .handle();
            let w = graph.add_pass(PassKind::Compute, "w").write(key(1)).handle();
            graph.add_output(key(1));
            (rw, w)
        };

        build(&mut arena).unwrap();
        assert!(dependencies_of(&arena, node_of(&arena, rw).unwrap()).is_empty());
        assert!(dependencies_of(&arena, node_of(&arena, w).unwrap()).is_empty());
    }

    #[test]
    fn test_build_reader_declared_first_waits_on_later_writer() {
        let mut arena = GraphArena::new();
        let (post, scene) = {
            let mut graph = frame(&mut arena);
            let post = graph
                .add_pass(PassKind::Graphics, "post")
                .read(key(1))
                .write(key(2))
                .handle();
            let scene = graph.add_pass(PassKind::Graphics, "scene").write(key(1)).handle();
            graph.add_output(key(2));
            (post, scene)
        };

        build(&mut arena).unwrap();
        let node = node_of(&arena, post).unwrap();
        assert_eq!(dependencies_of(&arena, node), vec![Some(scene)]);
    }

    #[test]
    fn test_build_links_producer_once() {
        let mut arena = GraphArena::new();
        let consumer = {
            let mut graph = frame(&mut arena);
            graph
                .add_pass(PassKind::Graphics, "gbuffer")
                .write(key(1))
                .write(key(2));
            let consumer = graph
                .add_pass(PassKind::Graphics, "lighting")
                .read(key(1))
                .read(key(2))
                .write(key(3))
                .handle();
            graph.add_output(key(3));
            consumer
        };

        build(&mut arena).unwrap();
        let node = node_of(&arena, consumer).unwrap();
        assert_eq!(dependencies_of(&arena, node).len(), 1);
    }

    #[test]
    fn test_build_explicit_dependency() {
        let mut arena = GraphArena::new();
        let (upload, draw) = {
            let mut graph = frame(&mut arena);
            let upload = graph.add_pass(PassKind::Transfer, "upload").handle();
            let draw = graph
                .add_pass(PassKind::Graphics, "draw")
                .add_dependency(upload)
                .write(key(1))
                .handle();
            graph.add_output(key(1));
            (upload, draw)
        };

        build(&mut arena).unwrap();
        let node = node_of(&arena, draw).unwrap();
        assert_eq!(dependencies_of(&arena, node), vec![Some(upload)]);
    }

    #[test]
    fn test_build_cycle_two_nodes() {
        // A reads what B writes and B reads what A writes.
        let mut arena = GraphArena::new();
        {
            let mut graph = frame(&mut arena);
            graph
                .add_pass(PassKind::Graphics, "A")
                .read(key(2))
                .write(key(1));
            graph
                .add_pass(PassKind::Graphics, "B")
                .read(key(1))
                .write(key(2));
            graph.add_output(key(1));
        }

        let result = build(&mut arena);
        assert_eq!(
            result,
            Err(GraphError::CyclicDependency {
                cycle: vec!["A".into(), "B".into(), "A".into()]
            })
        );
    }

    #[test]
    fn test_build_cycle_three_nodes() {
        // A -> B -> C -> A through explicit dependencies
        let mut arena = GraphArena::new();
        {
            let mut graph = frame(&mut arena);
            let a = graph.add_pass(PassKind::Graphics, "A").write(key(1)).handle();
            let b = graph.add_pass(PassKind::Graphics, "B").handle();
            let c = graph.add_pass(PassKind::Graphics, "C").handle();
            graph.add_dependency(a, b).unwrap();
            graph.add_dependency(b, c).unwrap();
            graph.add_dependency(c, a).unwrap();
            graph.add_output(key(1));
        }

        match build(&mut arena) {
            Err(GraphError::CyclicDependency { cycle }) => {
                assert_eq!(cycle, vec!["A", "B", "C", "A"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_build_two_read_writers_chain_in_declaration_order() {
        let mut arena = GraphArena::new();
        let (x, y) = {
            let mut graph = frame(&mut arena);
            let x = graph.add_pass(PassKind::Compute, "X").read_write(key(1)).handle();
            let y = graph.add_pass(PassKind::Compute, "Y").read_write(key(1)).handle();
            graph.add_output(key(1));
            (x, y)
        };

        build(&mut arena).unwrap();
        let (nx, ny) = (node_of(&arena, x).unwrap(), node_of(&arena, y).unwrap());
        assert!(dependencies_of(&arena, nx).is_empty());
        assert_eq!(dependencies_of(&arena, ny), vec![Some(x)]);
        assert_eq!(depth_of(&arena, ny), 1);
    }

    #[test]
    fn test_build_ping_pong_reads_earlier_version() {
        // scene writes a, blur_h reads a and writes b, blur_v reads b and
        // writes a again.
        let mut arena = GraphArena::new();
        let (scene, blur_h, blur_v) = {
            let mut graph = frame(&mut arena);
            let scene = graph.add_pass(PassKind::Graphics, "scene").write(key(1)).handle();
            let blur_h = graph
                .add_pass(PassKind::Compute, "blur_h")
                .read(key(1))
                .write(key(2))
                .handle();
            let blur_v = graph
                .add_pass(PassKind::Compute, "blur_v")
                .read(key(2))
                .write(key(1))
                .handle();
            graph.add_output(key(1));
            (scene, blur_h, blur_v)
        };

        let root = build(&mut arena).unwrap();
        assert_eq!(dependencies_of(&arena, root), vec![Some(scene), Some(blur_v)]);
        let nh = node_of(&arena, blur_h).unwrap();
        assert_eq!(dependencies_of(&arena, nh), vec![Some(scene)]);
        let nv = node_of(&arena, blur_v).unwrap();
        assert_eq!(dependencies_of(&arena, nv), vec![Some(blur_h)]);
    }

    #[test]
    fn test_build_cycle_outside_outputs_ignored() {
        let mut arena = GraphArena::new();
        {
            let mut graph = frame(&mut arena);
            graph
                .add_pass(PassKind::Graphics, "A")
                .read(key(2))
                .write(key(1));
            graph
                .add_pass(PassKind::Graphics, "B")
                .read(key(1))
                .write(key(2));
            graph.add_pass(PassKind::Graphics, "main").write(key(3));
            graph.add_output(key(3));
        }

        assert!(build(&mut arena).is_ok());
    }
}
