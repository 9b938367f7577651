//! Drawflow editor documents
//!
//! ```json
//! {"drawflow": {"Home": {"data": {
//!   "1": {"id": 1, "name": "src", "data": {"impl": "source"}, "class": "node",
//!         "html": "src", "typenode": false, "inputs": {},
//!         "outputs": {"output_1": {"connections": [
//!             {"node": "2", "output": "input_1", "id": "1|2", "name": "flow"}]}},
//!         "pos_x": 10, "pos_y": 20}}}},
//!  "Other": {"data": {}}}}
//! ```
//!
//! The reader also accepts documents without the `drawflow` / `Home`
//! wrappers. Edges are read from output ports; connections found only on
//! input ports are added as well.

use serde_json::{json, Map, Value as Json};

use crate::errors::{ModelError, Result};
use crate::graph::codec::GraphCodec;
use crate::graph::model::{Graph, Node, NodeFactory};

const INPUT_PORT: &str = "input_1";
const OUTPUT_PORT: &str = "output_1";

/// Codec for the `drawflow` format
#[derive(Debug, Clone, Copy, Default)]
pub struct DrawflowCodec;

impl DrawflowCodec {
    pub const FORMAT: &'static str = "drawflow";
}

fn decode_error(reason: impl Into<String>) -> ModelError {
    ModelError::GraphDecode {
        format: DrawflowCodec::FORMAT.to_string(),
        reason: reason.into(),
    }
}

/// Drawflow writes numeric ids; keep them numeric when they are
fn id_value(id: &str) -> Json {
    id.parse::<u64>().map(Json::from).unwrap_or_else(|_| json!(id))
}

fn id_text(value: &Json) -> Option<String> {
    match value {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn position(value: Option<&Json>) -> i32 {
    value
        .and_then(Json::as_f64)
        .map(|v| v.round() as i32)
        .unwrap_or_default()
}

fn default_edge_id(source: &str, target: &str) -> String {
    format!("{}|{}", source, target)
}

/// Locate the node map, tolerating missing outer wrappers
fn node_map(doc: &Json) -> Option<&Map<String, Json>> {
    doc.pointer("/drawflow/Home/data")
        .or_else(|| doc.pointer("/Home/data"))
        .or_else(|| doc.get("data"))
        .unwrap_or(doc)
        .as_object()
}

/// Natural order for numeric ids, text order otherwise
fn sorted_ids(nodes: &Map<String, Json>) -> Vec<&String> {
    let mut ids: Vec<&String> = nodes.keys().collect();
    ids.sort_by(|a, b| match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    });
    ids
}

struct Connection {
    id: Option<String>,
    peer: String,
    name: String,
}

fn connections<'a>(node: &'a Json, ports: &str) -> impl Iterator<Item = Connection> + 'a {
    node.get(ports)
        .and_then(Json::as_object)
        .into_iter()
        .flat_map(|ports| ports.values())
        .filter_map(|port| port.get("connections").and_then(Json::as_array))
        .flatten()
        .filter_map(|conn| {
            Some(Connection {
                id: conn.get("id").and_then(id_text),
                peer: conn.get("node").and_then(id_text)?,
                name: conn
                    .get("name")
                    .and_then(Json::as_str)
                    .unwrap_or_default()
                    .to_string(),
            })
        })
}

impl GraphCodec for DrawflowCodec {
    fn name(&self) -> &str {
        Self::FORMAT
    }

    fn encode(&self, graph: &Graph) -> Result<String> {
        let mut data = Map::new();
        for (idx, node) in graph.nodes() {
            let outputs: Vec<Json> = graph
                .out_edges(idx)
                .map(|e| {
                    json!({
                        "node": graph.node(e.target).id,
                        "output": INPUT_PORT,
                        "id": e.id,
                        "name": e.name,
                    })
                })
                .collect();
            let inputs: Vec<Json> = graph
                .in_edges(idx)
                .map(|e| {
                    json!({
                        "node": graph.node(e.source).id,
                        "input": OUTPUT_PORT,
                        "id": e.id,
                        "name": e.name,
                    })
                })
                .collect();
            let mut node_data = Map::new();
            if let Some(impl_ref) = &node.impl_ref {
                node_data.insert("impl".to_string(), json!(impl_ref));
            }
            data.insert(
                node.id.clone(),
                json!({
                    "id": id_value(&node.id),
                    "name": node.name,
                    "data": node_data,
                    "class": "node",
                    "html": node.name,
                    "typenode": false,
                    "inputs": { INPUT_PORT: { "connections": inputs } },
                    "outputs": { OUTPUT_PORT: { "connections": outputs } },
                    "pos_x": node.x,
                    "pos_y": node.y,
                }),
            );
        }
        let doc = json!({
            "drawflow": {
                "Home": { "data": data },
                "Other": { "data": {} },
            }
        });
        serde_json::to_string(&doc).map_err(|e| ModelError::GraphEncode {
            format: Self::FORMAT.to_string(),
            reason: e.to_string(),
        })
    }

    fn decode(&self, text: &str, factory: &dyn NodeFactory) -> Result<Graph> {
        let doc: Json = serde_json::from_str(text).map_err(|e| decode_error(e.to_string()))?;
        let nodes = node_map(&doc).ok_or_else(|| decode_error("no node data found"))?;
        let mut graph = Graph::new();
        for id in sorted_ids(nodes) {
            let raw = &nodes[id];
            if !raw.is_object() {
                return Err(decode_error(format!("node {} is not an object", id)));
            }
            let data = raw.get("data");
            let impl_ref = data
                .and_then(|d| d.get("impl").or_else(|| d.get("ivmlVar")))
                .and_then(Json::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            let decoded = Node {
                id: id.clone(),
                name: raw
                    .get("name")
                    .and_then(Json::as_str)
                    .unwrap_or_default()
                    .to_string(),
                x: position(raw.get("pos_x")),
                y: position(raw.get("pos_y")),
                impl_ref,
            };
            graph
                .add_node(factory.create_node(decoded))
                .map_err(|e| decode_error(e.to_string()))?;
        }

        let mut seen = Vec::new();
        for id in sorted_ids(nodes) {
            let raw = &nodes[id];
            let outgoing = connections(raw, "outputs").map(|c| (id.clone(), c.peer.clone(), c));
            let incoming = connections(raw, "inputs").map(|c| (c.peer.clone(), id.clone(), c));
            for (source, target, conn) in outgoing.chain(incoming) {
                let edge_id = conn
                    .id
                    .unwrap_or_else(|| default_edge_id(&source, &target));
                if seen.contains(&edge_id) {
                    continue;
                }
                graph
                    .connect(edge_id.clone(), &source, &target, conn.name)
                    .map_err(|e| decode_error(e.to_string()))?;
                seen.push(edge_id);
            }
        }
        Ok(graph)
    }
}
