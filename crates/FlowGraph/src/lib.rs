//! # FlowGraph
//!
//! `flow_graph` is a headless, engine-independent node-graph model and
//! mutation engine. It is the "operating system" for visual graph editors —
//! behavior trees, state machines, blueprints — handling entities, indices,
//! validation and history, while rendering and input stay with the host.
//!
//! ## Core Architecture
//! - **Model (`src/model.rs`, `src/decorations.rs`)**: the entity value
//!   types owned by the graph.
//! - **Graph (`src/graph.rs`)**: the aggregate root with O(1) port/edge
//!   indices, lifecycle signals and the low-level mutation API.
//! - **Policy (`src/policy.rs`)**: the scope-aware connection judgement.
//! - **Commands (`src/command.rs`, `src/commands.rs`)**: undoable wrappers
//!   around every user-visible mutation.
//! - **SubGraphs (`src/subgraph.rs`)**: instantiation with a representative
//!   boundary node; **Export (`src/export.rs`)** flattens them back out.
//! - **Persistence (`src/persistence.rs`)**: the portable JSON document.

pub mod command;
pub mod commands;
pub mod decorations;
pub mod error;
pub mod events;
pub mod export;
pub mod graph;
pub mod id;
pub mod math;
pub mod model;
pub mod persistence;
pub mod policy;
pub mod registry;
pub mod subgraph;
pub mod topology;

// Re-exports for convenience
pub use command::{Command, CommandHistory, CompoundCommand};
pub use error::GraphError;
pub use graph::{ConnectOutcome, Graph, GraphSettings, Topology};
pub use id::{CommentId, EdgeId, FrameId, GraphId, GroupId, NodeId, PortId};
pub use math::{Color, Rect};
pub use model::{
    DisplayMode, Edge, Node, NodeState, Port, PortCapacity, PortDefinition, PortDirection,
    PortKind, SUBGRAPH_BOUNDARY_TYPE,
};
pub use policy::{ConnectionPolicy, ConnectionResult, ConnectionValidator, DefaultConnectionPolicy};
pub use registry::{NodeTypeCatalog, NodeTypeDefinition, TypeCompatibilityRegistry};
