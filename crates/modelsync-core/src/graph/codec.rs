use std::collections::BTreeMap;

use crate::errors::{ModelError, Result};
use crate::graph::drawflow::DrawflowCodec;
use crate::graph::json::NodeEdgeJsonCodec;
use crate::graph::model::{Graph, NodeFactory};

/// Translates graphs to and from one wire format
pub trait GraphCodec: Send + Sync {
    /// Format name the codec is registered under by default
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// Returns `GraphEncode` if the graph cannot be written.
    fn encode(&self, graph: &Graph) -> Result<String>;

    /// # Errors
    ///
    /// Returns `GraphDecode` for malformed input.
    fn decode(&self, text: &str, factory: &dyn NodeFactory) -> Result<Graph>;
}

/// Graph codecs keyed by format name
pub struct CodecRegistry {
    codecs: BTreeMap<String, Box<dyn GraphCodec>>,
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("formats", &self.formats())
            .finish()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(DrawflowCodec::FORMAT, Box::new(DrawflowCodec));
        registry.register(NodeEdgeJsonCodec::FORMAT, Box::new(NodeEdgeJsonCodec));
        registry
    }
}

impl CodecRegistry {
    /// Registry with the built-in `drawflow` and `json` codecs
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self {
            codecs: BTreeMap::new(),
        }
    }

    /// Register `codec` under `format`, replacing an earlier registration
    pub fn register(&mut self, format: impl Into<String>, codec: Box<dyn GraphCodec>) {
        self.codecs.insert(format.into(), codec);
    }

    /// # Errors
    ///
    /// Returns `UnknownFormat` if nothing is registered under `format`.
    pub fn codec(&self, format: &str) -> Result<&dyn GraphCodec> {
        self.codecs
            .get(format)
            .map(|c| c.as_ref())
            .ok_or_else(|| ModelError::UnknownFormat {
                format: format.to_string(),
            })
    }

    /// # Errors
    ///
    /// Returns `UnknownFormat` or the codec's encoding error.
    pub fn encode(&self, format: &str, graph: &Graph) -> Result<String> {
        self.codec(format)?.encode(graph)
    }

    /// # Errors
    ///
    /// Returns `UnknownFormat` or the codec's decoding error.
    pub fn decode(&self, format: &str, text: &str, factory: &dyn NodeFactory) -> Result<Graph> {
        self.codec(format)?.decode(text, factory)
    }

    pub fn formats(&self) -> Vec<String> {
        self.codecs.keys().cloned().collect()
    }
}
