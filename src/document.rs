use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::Galaxy;
use crate::layout::ImportedLayout;

pub const DEFAULT_CANVAS_WIDTH: i32 = 1024;
pub const DEFAULT_CANVAS_HEIGHT: i32 = 768;
pub const DEFAULT_AUTHOR: &str = "Dotlan";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: i32,
    pub height: i32,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapNode {
    pub id: i32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub x: i32,
    pub y: i32,
    /// Perimeter system owned by a neighbouring region.
    #[serde(default, skip_serializing_if = "is_false")]
    pub external: bool,
}

/// A persisted per-region diagram: the unit the renderer works on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub systems: BTreeMap<i32, MapNode>,
}

impl MapDocument {
    pub fn new(name: &str, canvas: CanvasSize) -> Self {
        Self {
            name: name.to_string(),
            author: None,
            description: None,
            width: canvas.width,
            height: canvas.height,
            systems: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, node: MapNode) {
        self.systems.insert(node.id, node);
    }

    pub fn node(&self, id: i32) -> Option<&MapNode> {
        self.systems.get(&id)
    }

    pub fn system_ids(&self) -> Vec<i32> {
        self.systems.keys().copied().collect()
    }
}

/// Merges one imported chart with galaxy names and the region description.
pub fn build_document(
    layout: &ImportedLayout,
    galaxy: &Galaxy,
    canvas: CanvasSize,
    author: Option<&str>,
) -> MapDocument {
    let mut document = MapDocument::new(&layout.region, canvas);
    document.author = author.map(str::to_string);
    document.description = galaxy
        .region_by_name(&layout.region)
        .map(|region| region.description.clone())
        .filter(|description| !description.is_empty());

    for node in &layout.nodes {
        document.insert(MapNode {
            id: node.system_id,
            name: galaxy.system_name(node.system_id),
            icon: None,
            x: node.x,
            y: node.y,
            external: node.external,
        });
    }
    document
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Constellation, Region, System};
    use crate::layout::LayoutNode;

    #[test]
    fn names_resolve_or_fall_back_to_ids() {
        let mut systems = BTreeMap::new();
        systems.insert(
            30000142,
            System {
                id: 30000142,
                name: "Jita".to_string(),
                ..System::default()
            },
        );
        let mut constellations = BTreeMap::new();
        constellations.insert(
            20000020,
            Constellation {
                id: 20000020,
                systems,
                ..Constellation::default()
            },
        );
        let mut regions = BTreeMap::new();
        regions.insert(
            10000002,
            Region {
                id: 10000002,
                name: "The Forge".to_string(),
                description: "Trade hub".to_string(),
                constellations,
            },
        );
        let galaxy = Galaxy::new(regions);
        let layout = ImportedLayout {
            region: "The_Forge".to_string(),
            nodes: vec![
                LayoutNode {
                    system_id: 30000142,
                    x: 10,
                    y: 20,
                    external: false,
                },
                LayoutNode {
                    system_id: 30002187,
                    x: 90,
                    y: 20,
                    external: true,
                },
            ],
        };

        let document = build_document(&layout, &galaxy, CanvasSize::default(), Some(DEFAULT_AUTHOR));
        assert_eq!(document.name, "The_Forge");
        assert_eq!(document.description.as_deref(), Some("Trade hub"));
        assert_eq!(document.author.as_deref(), Some("Dotlan"));
        assert_eq!((document.width, document.height), (1024, 768));
        assert_eq!(document.node(30000142).unwrap().name, "Jita");
        let unknown = document.node(30002187).unwrap();
        assert_eq!(unknown.name, "30002187");
        assert!(unknown.external);
    }

    #[test]
    fn optional_fields_are_omitted_from_json() {
        let mut document = MapDocument::new("Delve", CanvasSize::default());
        document.insert(MapNode {
            id: 1,
            name: "1-SMEB".to_string(),
            icon: None,
            x: 0,
            y: 0,
            external: false,
        });
        let json = serde_json::to_value(&document).unwrap();
        assert!(json.get("author").is_none());
        assert!(json["systems"]["1"].get("external").is_none());
        assert!(json["systems"]["1"].get("icon").is_none());
    }
}
