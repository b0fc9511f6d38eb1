use std::fmt;
use std::time::Instant;

use tracing::{debug, warn};

use crate::connectivity::{Edge, derive_edges};
use crate::document::{MapDocument, MapNode};
use crate::domain::Galaxy;
use crate::svg::SvgCanvas;

pub const NODE_WIDTH: i32 = 50;
pub const NODE_HEIGHT: i32 = 22;
pub const NODE_RADIUS: i32 = 10;

const BORDER_STYLE: &str = "fill:rgb(255,255,255);stroke:rgb(0,0,0);stroke-width:1px";
const JUMP_STYLE: &str = "stroke:rgb(0,0,0);stroke-width:1px";
const NAME_STYLE: &str = "text-anchor:middle;font-size:9px";
const LABEL_STYLE: &str = "text-anchor:middle;font-size:8px";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatus {
    pub fill: Rgb,
    pub label: String,
}

impl NodeStatus {
    pub fn clear() -> Self {
        Self {
            fill: Rgb(255, 255, 255),
            label: "CLEAR".to_string(),
        }
    }

    pub fn hostile() -> Self {
        Self {
            fill: Rgb(255, 64, 64),
            label: "HOSTILE".to_string(),
        }
    }
}

/// Supplies the fill colour and label line for each node. `index` is the
/// node's position in draw order.
pub trait StatusSource: Send + Sync {
    fn status(&self, index: usize, node: &MapNode) -> NodeStatus;
}

impl<F> StatusSource for F
where
    F: Fn(usize, &MapNode) -> NodeStatus + Send + Sync,
{
    fn status(&self, index: usize, node: &MapNode) -> NodeStatus {
        self(index, node)
    }
}

#[derive(Debug, Clone)]
pub struct UniformStatus(pub NodeStatus);

impl Default for UniformStatus {
    fn default() -> Self {
        Self(NodeStatus::clear())
    }
}

impl StatusSource for UniformStatus {
    fn status(&self, _index: usize, _node: &MapNode) -> NodeStatus {
        self.0.clone()
    }
}

/// Cycles through a fixed list of statuses in draw order.
#[derive(Debug, Clone)]
pub struct StatusSequence(Vec<NodeStatus>);

impl StatusSequence {
    pub fn new(statuses: Vec<NodeStatus>) -> Self {
        Self(statuses)
    }
}

impl StatusSource for StatusSequence {
    fn status(&self, index: usize, _node: &MapNode) -> NodeStatus {
        if self.0.is_empty() {
            return NodeStatus::clear();
        }
        self.0[index % self.0.len()].clone()
    }
}

pub struct Renderer<'a> {
    galaxy: &'a Galaxy,
    status: &'a dyn StatusSource,
}

impl<'a> Renderer<'a> {
    pub fn new(galaxy: &'a Galaxy, status: &'a dyn StatusSource) -> Self {
        Self { galaxy, status }
    }

    pub fn render(&self, document: &MapDocument) -> String {
        let started = Instant::now();
        let edges = derive_edges(self.galaxy, &document.system_ids());
        let svg = render_document(document, &edges, self.status);
        debug!(
            map = %document.name,
            systems = document.systems.len(),
            edges = edges.len(),
            elapsed = ?started.elapsed(),
            "rendered map"
        );
        svg
    }
}

/// Lays out `document` with `edges` beneath the nodes.
///
/// Edges are drawn from centre to centre of the node footprints and only
/// when both endpoints are nodes of the document. Duplicates are drawn again.
pub fn render_document(
    document: &MapDocument,
    edges: &[Edge],
    status: &dyn StatusSource,
) -> String {
    let mut canvas = SvgCanvas::start(document.width, document.height);
    canvas.rect(0, 0, document.width, document.height, BORDER_STYLE);

    canvas.group("jumps");
    for edge in edges {
        let (Some(source), Some(destination)) =
            (document.node(edge.source), document.node(edge.destination))
        else {
            warn!(
                map = %document.name,
                source = edge.source,
                destination = edge.destination,
                "edge endpoint missing from map, not drawn"
            );
            continue;
        };
        let (x1, y1) = centre(source);
        let (x2, y2) = centre(destination);
        canvas.line(x1, y1, x2, y2, JUMP_STYLE);
    }
    canvas.end_group();

    canvas.group("systems");
    for (index, node) in document.systems.values().enumerate() {
        canvas.group(&node.id.to_string());
        let status = status.status(index, node);
        let radius = if node.external { 0 } else { NODE_RADIUS };
        let style = format!("fill:{};stroke:rgb(0,0,0);stroke-width:1px", status.fill);
        canvas.round_rect(node.x, node.y, NODE_WIDTH, NODE_HEIGHT, radius, radius, &style);

        let (x, name_y) = centre(node);
        let label_y = node.y + NODE_HEIGHT * 7 / 8;
        canvas.text(x, name_y, &node.name, NAME_STYLE);
        canvas.text(x, label_y, &status.label, LABEL_STYLE);
        canvas.end_group();
    }
    canvas.end_group();

    canvas.finish()
}

fn centre(node: &MapNode) -> (i32, i32) {
    (node.x + NODE_WIDTH / 2, node.y + NODE_HEIGHT / 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::CanvasSize;

    fn node(id: i32, x: i32, y: i32) -> MapNode {
        MapNode {
            id,
            name: format!("S{id}"),
            icon: None,
            x,
            y,
            external: false,
        }
    }

    #[test]
    fn edges_are_drawn_beneath_nodes() {
        let mut document = MapDocument::new("Test", CanvasSize::default());
        document.insert(node(1, 0, 0));
        document.insert(node(2, 100, 50));
        let edges = [Edge {
            source: 1,
            destination: 2,
        }];
        let svg = render_document(&document, &edges, &UniformStatus::default());
        let line = svg.find("<line").unwrap();
        let first_node = svg.find("rx=").unwrap();
        assert!(line < first_node);
        assert!(svg.contains(r#"<line x1="25" y1="11" x2="125" y2="61""#));
    }

    #[test]
    fn edge_with_missing_endpoint_is_skipped() {
        let mut document = MapDocument::new("Test", CanvasSize::default());
        document.insert(node(1, 0, 0));
        let edges = [Edge {
            source: 1,
            destination: 9,
        }];
        let svg = render_document(&document, &edges, &UniformStatus::default());
        assert!(!svg.contains("<line"));
    }

    #[test]
    fn status_sequence_cycles_in_draw_order() {
        let mut document = MapDocument::new("Test", CanvasSize::default());
        document.insert(node(1, 0, 0));
        document.insert(node(2, 60, 0));
        document.insert(node(3, 120, 0));
        let statuses = StatusSequence::new(vec![NodeStatus::hostile(), NodeStatus::clear()]);
        let svg = render_document(&document, &[], &statuses);
        assert_eq!(svg.matches("fill:rgb(255,64,64)").count(), 2);
        assert_eq!(svg.matches(">HOSTILE</text>").count(), 2);
        assert_eq!(svg.matches(">CLEAR</text>").count(), 1);
    }

    #[test]
    fn closures_act_as_status_sources() {
        let mut document = MapDocument::new("Test", CanvasSize::default());
        document.insert(node(7, 0, 0));
        let by_id = |_: usize, node: &MapNode| NodeStatus {
            fill: Rgb(0, 0, 255),
            label: format!("#{}", node.id),
        };
        let svg = render_document(&document, &[], &by_id);
        assert!(svg.contains("fill:rgb(0,0,255)"));
        assert!(svg.contains(">#7</text>"));
    }
}
