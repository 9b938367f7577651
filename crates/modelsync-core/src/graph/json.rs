//! Plain node/edge JSON
//!
//! ```json
//! {"nodes": {"n1": {"name": "src", "x": 10, "y": 20, "impl": "source"}},
//!  "edges": [{"id": "e1", "source": "n1", "target": "n2", "name": "flow"}]}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{ModelError, Result};
use crate::graph::codec::GraphCodec;
use crate::graph::model::{Graph, Node, NodeFactory};

#[derive(Debug, Serialize, Deserialize)]
struct GraphDoc {
    #[serde(default)]
    nodes: BTreeMap<String, NodeDoc>,
    #[serde(default)]
    edges: Vec<EdgeDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeDoc {
    #[serde(default)]
    name: String,
    #[serde(default)]
    x: i32,
    #[serde(default)]
    y: i32,
    #[serde(rename = "impl", default, skip_serializing_if = "Option::is_none")]
    impl_ref: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EdgeDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    source: String,
    target: String,
    #[serde(default)]
    name: String,
}

/// Codec for the plain `json` node/edge format
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeEdgeJsonCodec;

impl NodeEdgeJsonCodec {
    pub const FORMAT: &'static str = "json";
}

fn decode_error(reason: impl Into<String>) -> ModelError {
    ModelError::GraphDecode {
        format: NodeEdgeJsonCodec::FORMAT.to_string(),
        reason: reason.into(),
    }
}

impl GraphCodec for NodeEdgeJsonCodec {
    fn name(&self) -> &str {
        Self::FORMAT
    }

    fn encode(&self, graph: &Graph) -> Result<String> {
        let doc = GraphDoc {
            nodes: graph
                .nodes()
                .map(|(_, n)| {
                    (
                        n.id.clone(),
                        NodeDoc {
                            name: n.name.clone(),
                            x: n.x,
                            y: n.y,
                            impl_ref: n.impl_ref.clone(),
                        },
                    )
                })
                .collect(),
            edges: graph
                .edges()
                .map(|e| EdgeDoc {
                    id: Some(e.id.clone()),
                    source: graph.node(e.source).id.clone(),
                    target: graph.node(e.target).id.clone(),
                    name: e.name.clone(),
                })
                .collect(),
        };
        serde_json::to_string(&doc).map_err(|e| ModelError::GraphEncode {
            format: Self::FORMAT.to_string(),
            reason: e.to_string(),
        })
    }

    fn decode(&self, text: &str, factory: &dyn NodeFactory) -> Result<Graph> {
        let doc: GraphDoc = serde_json::from_str(text).map_err(|e| decode_error(e.to_string()))?;
        let mut graph = Graph::new();
        for (id, n) in doc.nodes {
            let decoded = Node {
                id,
                name: n.name,
                x: n.x,
                y: n.y,
                impl_ref: n.impl_ref,
            };
            graph.add_node(factory.create_node(decoded))?;
        }
        for (i, e) in doc.edges.into_iter().enumerate() {
            let id = e.id.unwrap_or_else(|| format!("e{}", i + 1));
            graph
                .connect(id, &e.source, &e.target, e.name)
                .map_err(|err| decode_error(err.to_string()))?;
        }
        Ok(graph)
    }
}
