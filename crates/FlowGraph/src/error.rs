//! # Error Taxonomy
//!
//! API misuse fails fast with a [`GraphError`]; policy rejections are plain
//! result values ([`crate::policy::ConnectionResult`]) and lookup misses are
//! `Option` — neither ever surfaces here.

use crate::id::{CommentId, EdgeId, FrameId, GroupId, NodeId, PortId};
use crate::policy::ConnectionResult;

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("port not found: {0}")]
    PortNotFound(PortId),
    #[error("edge not found: {0}")]
    EdgeNotFound(EdgeId),
    #[error("group not found: {0}")]
    GroupNotFound(GroupId),
    #[error("sub-graph frame not found: {0}")]
    FrameNotFound(FrameId),
    #[error("comment not found: {0}")]
    CommentNotFound(CommentId),
    #[error("duplicate id: {0}")]
    DuplicateId(String),
    #[error("node type already registered: {0}")]
    DuplicateNodeType(String),
    #[error("unknown node type: {0}")]
    UnknownNodeType(String),
    #[error("node {0} does not allow dynamic ports")]
    DynamicPortsNotAllowed(NodeId),
    #[error("node {0} already belongs to a sub-graph frame")]
    NodeAlreadyFramed(NodeId),
    #[error("node {0} is a sub-graph representative and cannot be contained")]
    RepresentativeNotContainable(NodeId),
    #[error("node {0} is not a sub-graph boundary node")]
    NotABoundaryNode(NodeId),
    #[error("connection rejected: {0:?}")]
    ConnectionRejected(ConnectionResult),
    #[error("command has not been executed")]
    CommandNotExecuted,
    #[error("malformed document: {0}")]
    MalformedDocument(String),
}
