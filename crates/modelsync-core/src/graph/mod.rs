//! Node/edge graphs and their wire formats

pub mod codec;
pub mod drawflow;
pub mod json;
pub mod model;

pub use codec::{CodecRegistry, GraphCodec};
pub use drawflow::DrawflowCodec;
pub use json::NodeEdgeJsonCodec;
pub use model::{Edge, EdgeIdx, Graph, Node, NodeFactory, NodeIdx, PlainNodeFactory};
