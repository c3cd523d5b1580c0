//! Test Utilities for the Barrier Elision Suite
//!
//! A small method builder over `MemoryOpGraph` plus random method shapes for
//! the property tests.

#![allow(dead_code)]

use elide_ir::{
    AccessKind, BarrierKind, BlockId, Decision, LocationKey, MemoryOpGraph, OpId, SafepointKind,
    ValueId,
};
use elide_opt::{BarrierElision, ElisionConfig, ElisionReport};
use quickcheck::{Arbitrary, Gen};

/// Field offsets used by most scenarios.
pub const FIELD_C: u32 = 12;
pub const FIELD_F: u32 = 16;

// ============================================================================
// METHOD FIXTURE
// ============================================================================

/// Method under construction with two unrelated reference parameters.
pub struct MethodFixture {
    pub graph: MemoryOpGraph,
    pub blocks: Vec<BlockId>,
    pub p: ValueId,
    pub q: ValueId,
}

impl MethodFixture {
    /// `n` blocks, no edges yet.
    pub fn with_blocks(name: &str, n: usize) -> Self {
        let mut graph = MemoryOpGraph::new(name);
        let blocks = (0..n)
            .map(|_| graph.add_block().expect("fresh graph accepts blocks"))
            .collect();
        let p = graph.add_param().expect("fresh graph accepts params");
        let q = graph.add_param().expect("fresh graph accepts params");
        Self { graph, blocks, p, q }
    }

    /// Single straight-line block.
    pub fn straight(name: &str) -> Self {
        Self::with_blocks(name, 1)
    }

    /// bb0 -> {bb1, bb2} -> bb3
    pub fn diamond(name: &str) -> Self {
        let mut m = Self::with_blocks(name, 4);
        m.edges(&[(0, 1), (0, 2), (1, 3), (2, 3)]);
        m
    }

    pub fn edges(&mut self, edges: &[(usize, usize)]) {
        for &(from, to) in edges {
            self.graph
                .add_edge(self.blocks[from], self.blocks[to])
                .expect("edge between existing blocks");
        }
    }

    pub fn load(&mut self, block: usize, key: LocationKey, barrier: BarrierKind) -> OpId {
        self.graph
            .add_op(self.blocks[block], AccessKind::Load, key, barrier)
            .expect("load on known block")
    }

    pub fn load_value(
        &mut self,
        block: usize,
        key: LocationKey,
        barrier: BarrierKind,
    ) -> (OpId, ValueId) {
        self.graph
            .add_load_value(self.blocks[block], key, barrier)
            .expect("load on known block")
    }

    pub fn store(&mut self, block: usize, key: LocationKey, barrier: BarrierKind) -> OpId {
        self.graph
            .add_op(self.blocks[block], AccessKind::Store, key, barrier)
            .expect("store on known block")
    }

    pub fn call(&mut self, block: usize) {
        self.graph
            .add_safepoint(self.blocks[block], SafepointKind::Call)
            .expect("call on known block");
    }

    pub fn poll(&mut self, block: usize) {
        self.graph
            .add_safepoint(self.blocks[block], SafepointKind::Poll)
            .expect("poll on known block");
    }

    pub fn alloc(&mut self, block: usize) -> ValueId {
        self.graph
            .add_allocation(self.blocks[block])
            .expect("allocation on known block")
    }

    /// Finalize and run the pass.
    pub fn run(&mut self, config: ElisionConfig) -> ElisionReport {
        self.graph.finalize().expect("fixture builds valid graphs");
        BarrierElision::new(config)
            .expect("valid config")
            .run(&mut self.graph)
            .expect("pass succeeds on valid graphs")
    }

    pub fn decision(&self, op: OpId) -> Decision {
        self.graph.annotation(op).expect("op annotated by the pass")
    }
}

/// Annotation of every op, in op order.
pub fn annotations(graph: &MemoryOpGraph) -> Vec<Option<Decision>> {
    graph.ops().iter().map(|op| op.annotation()).collect()
}

// ============================================================================
// RANDOM METHODS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetShape {
    Field(u32),
    /// Index into the value pool, like `NodeShape::Access::base`
    Element(u8),
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    Access {
        store: bool,
        /// Index into the value pool: `p`, `q`, a merge value, then every
        /// value defined by earlier nodes in build order
        base: u8,
        offset: OffsetShape,
        barrier: BarrierKind,
        /// A load that defines a new reference value
        def: bool,
    },
    Call,
    Poll,
    Alloc,
}

/// Shape of a random method. Block 0 is the entry; every other block gets a
/// predecessor with a smaller index, so the graph always finalizes.
#[derive(Debug, Clone)]
pub struct MethodShape {
    pub blocks: Vec<Vec<NodeShape>>,
    pub edges: Vec<(usize, usize)>,
}

/// Random method whose edges all point forward.
#[derive(Debug, Clone)]
pub struct AcyclicMethod(pub MethodShape);

/// Random method that may contain loops, irreducible ones included.
#[derive(Debug, Clone)]
pub struct CyclicMethod(pub MethodShape);

impl Arbitrary for AcyclicMethod {
    fn arbitrary(g: &mut Gen) -> Self {
        AcyclicMethod(random_shape(g, false))
    }
}

impl Arbitrary for CyclicMethod {
    fn arbitrary(g: &mut Gen) -> Self {
        CyclicMethod(random_shape(g, true))
    }
}

fn below(g: &mut Gen, n: usize) -> usize {
    usize::arbitrary(g) % n
}

/// Mostly `p`, so that chains form; otherwise anything in the pool.
fn random_value(g: &mut Gen) -> u8 {
    if bool::arbitrary(g) {
        0
    } else {
        u8::arbitrary(g)
    }
}

fn random_node(g: &mut Gen) -> NodeShape {
    match below(g, 10) {
        0 => NodeShape::Call,
        1 => NodeShape::Poll,
        2 => NodeShape::Alloc,
        _ => {
            let barrier = *g
                .choose(&[BarrierKind::Read, BarrierKind::Write, BarrierKind::None])
                .unwrap_or(&BarrierKind::Read);
            let offset = match below(g, 6) {
                0 | 1 => OffsetShape::Field(8),
                2 => OffsetShape::Field(16),
                3 => OffsetShape::Element(random_value(g)),
                4 if bool::arbitrary(g) => OffsetShape::Unknown,
                _ => OffsetShape::Field(8),
            };
            let store = bool::arbitrary(g);
            NodeShape::Access {
                store,
                base: random_value(g),
                offset,
                barrier,
                def: !store && below(g, 3) == 0,
            }
        },
    }
}

fn random_shape(g: &mut Gen, allow_back_edges: bool) -> MethodShape {
    let count = 1 + below(g, 6);
    let blocks = (0..count)
        .map(|_| {
            let len = below(g, 5);
            (0..len).map(|_| random_node(g)).collect()
        })
        .collect();

    let mut edges = Vec::new();
    for to in 1..count {
        edges.push((below(g, to), to));
    }
    for _ in 0..below(g, count + 1) {
        if count < 2 {
            break;
        }
        let from = below(g, count);
        let to = 1 + below(g, count - 1);
        if allow_back_edges || from < to {
            edges.push((from, to));
        }
    }

    MethodShape { blocks, edges }
}

fn pick(pool: &[ValueId], index: u8) -> ValueId {
    pool[index as usize % pool.len()]
}

impl MethodShape {
    pub fn build(&self) -> MemoryOpGraph {
        let mut m = MethodFixture::with_blocks("random", self.blocks.len());
        let phi = m.graph.add_merge_value().expect("fresh graph accepts values");
        let mut pool = vec![m.p, m.q, phi];

        for (i, nodes) in self.blocks.iter().enumerate() {
            for node in nodes {
                match *node {
                    NodeShape::Access {
                        store,
                        base,
                        offset,
                        barrier,
                        def,
                    } => {
                        let base = pick(&pool, base);
                        let key = match offset {
                            OffsetShape::Field(offset) => LocationKey::field(base, offset),
                            OffsetShape::Element(index) => {
                                LocationKey::element(base, pick(&pool, index))
                            },
                            OffsetShape::Unknown => LocationKey::unknown(base),
                        };
                        if store {
                            m.store(i, key, barrier);
                        } else if def {
                            let (_, value) = m.load_value(i, key, barrier);
                            pool.push(value);
                        } else {
                            m.load(i, key, barrier);
                        }
                    },
                    NodeShape::Call => m.call(i),
                    NodeShape::Poll => m.poll(i),
                    NodeShape::Alloc => {
                        let value = m.alloc(i);
                        pool.push(value);
                    },
                }
            }
        }
        m.edges(&self.edges);
        m.graph.finalize().expect("random shapes are well formed");
        m.graph
    }
}
