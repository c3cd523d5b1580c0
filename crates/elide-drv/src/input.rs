//! Method descriptions.
//!
//! A method is read from JSON and turned into a finalized `MemoryOpGraph`:
//!
//! ```json
//! {
//!   "name": "Node.next",
//!   "values": [{ "name": "this" }, { "name": "phi", "kind": "merge" }],
//!   "blocks": [
//!     { "ops": [
//!         { "op": "load", "base": "this", "offset": { "field": 12 },
//!           "barrier": "read", "def": "n" },
//!         { "op": "call" },
//!         { "op": "store", "base": "n", "offset": "unknown", "barrier": "none" }
//!       ],
//!       "succs": [1] },
//!     { "ops": [{ "op": "alloc", "def": "obj" }] }
//!   ]
//! }
//! ```
//!
//! Block 0 is the entry. Values are defined by `values`, by a load's `def`
//! or by an `alloc`, and must be defined before any op names them.

use crate::error::{DriverError, Result};
use elide_ir::{
    AccessKind, BarrierKind, BlockId, GraphError, LocationKey, MemoryOpGraph, SafepointKind,
    ValueId,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodDesc {
    pub name: String,
    #[serde(default)]
    pub values: Vec<ValueDecl>,
    pub blocks: Vec<BlockDesc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValueDecl {
    pub name: String,
    #[serde(default)]
    pub kind: ValueKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    #[default]
    Param,
    Merge,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockDesc {
    #[serde(default)]
    pub ops: Vec<OpDesc>,
    #[serde(default)]
    pub succs: Vec<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OpDesc {
    Load {
        base: String,
        offset: OffsetDesc,
        barrier: BarrierKind,
        #[serde(default)]
        def: Option<String>,
    },
    Store {
        base: String,
        offset: OffsetDesc,
        barrier: BarrierKind,
    },
    Call,
    Poll,
    Alloc { def: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetDesc {
    Field(u32),
    Element(String),
    Unknown,
}

/// Name-to-value scope while building one method.
struct Scope<'m> {
    method: &'m str,
    names: HashMap<String, ValueId>,
}

impl<'m> Scope<'m> {
    fn lookup(&self, name: &str) -> Result<ValueId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| DriverError::UndefinedValue {
                method: self.method.to_string(),
                name: name.to_string(),
            })
    }

    fn define(&mut self, name: &str, value: ValueId) -> Result<()> {
        if self.names.insert(name.to_string(), value).is_some() {
            return Err(DriverError::DuplicateValue {
                method: self.method.to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn key(&self, base: &str, offset: &OffsetDesc) -> Result<LocationKey> {
        let base = self.lookup(base)?;
        Ok(match offset {
            OffsetDesc::Field(off) => LocationKey::field(base, *off),
            OffsetDesc::Element(index) => LocationKey::element(base, self.lookup(index)?),
            OffsetDesc::Unknown => LocationKey::unknown(base),
        })
    }
}

impl MethodDesc {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Build and finalize the graph.
    pub fn build(&self) -> Result<MemoryOpGraph> {
        let graph_err = |source: GraphError| DriverError::Graph {
            method: self.name.clone(),
            source,
        };

        let mut graph = MemoryOpGraph::new(self.name.clone());
        let mut scope = Scope {
            method: &self.name,
            names: HashMap::new(),
        };

        let blocks = self
            .blocks
            .iter()
            .map(|_| graph.add_block())
            .collect::<std::result::Result<Vec<BlockId>, _>>()
            .map_err(graph_err)?;

        for decl in &self.values {
            let value = match decl.kind {
                ValueKind::Param => graph.add_param(),
                ValueKind::Merge => graph.add_merge_value(),
            }
            .map_err(graph_err)?;
            scope.define(&decl.name, value)?;
        }

        for (desc, &block) in self.blocks.iter().zip(&blocks) {
            for op in &desc.ops {
                match op {
                    OpDesc::Load {
                        base,
                        offset,
                        barrier,
                        def,
                    } => {
                        let key = scope.key(base, offset)?;
                        match def {
                            Some(name) => {
                                let (_, value) = graph
                                    .add_load_value(block, key, *barrier)
                                    .map_err(graph_err)?;
                                scope.define(name, value)?;
                            },
                            None => {
                                graph
                                    .add_op(block, AccessKind::Load, key, *barrier)
                                    .map_err(graph_err)?;
                            },
                        }
                    },
                    OpDesc::Store {
                        base,
                        offset,
                        barrier,
                    } => {
                        let key = scope.key(base, offset)?;
                        graph
                            .add_op(block, AccessKind::Store, key, *barrier)
                            .map_err(graph_err)?;
                    },
                    OpDesc::Call => graph
                        .add_safepoint(block, SafepointKind::Call)
                        .map_err(graph_err)?,
                    OpDesc::Poll => graph
                        .add_safepoint(block, SafepointKind::Poll)
                        .map_err(graph_err)?,
                    OpDesc::Alloc { def } => {
                        let value = graph.add_allocation(block).map_err(graph_err)?;
                        scope.define(def, value)?;
                    },
                }
            }
        }

        for (desc, &from) in self.blocks.iter().zip(&blocks) {
            for &to in &desc.succs {
                graph.add_edge(from, BlockId(to)).map_err(graph_err)?;
            }
        }

        graph.finalize().map_err(graph_err)?;
        Ok(graph)
    }
}
