//! # Entity Identifiers
//!
//! Every entity in the graph is keyed by a globally unique id (UUID v4).
//! Each entity kind gets its own newtype so node/port/edge ids cannot be
//! mixed up at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random id.
            pub fn fresh() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Parses the hyphenated textual form.
            pub fn parse_str(input: &str) -> Result<Self, uuid::Error> {
                Uuid::parse_str(input).map(Self)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

define_id! {
    /// Unique identifier for a Graph.
    GraphId
}
define_id! {
    /// Unique identifier for a Node.
    NodeId
}
define_id! {
    /// Unique identifier for a Port.
    PortId
}
define_id! {
    /// Unique identifier for an Edge.
    EdgeId
}
define_id! {
    /// Unique identifier for a NodeGroup.
    GroupId
}
define_id! {
    /// Unique identifier for a SubGraphFrame.
    FrameId
}
define_id! {
    /// Unique identifier for a GraphComment.
    CommentId
}
