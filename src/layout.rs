use std::collections::HashMap;

use roxmltree::{Document, ParsingOptions};
use tracing::{debug, info, warn};

use crate::app::{ProgressEvent, ProgressSink};
use crate::error::MapperError;
use crate::fetch::Transport;

pub const DEFAULT_LAYOUT_URL_TEMPLATE: &str = "https://evemaps.dotlan.net/svg/{region}.svg";

pub const DEFAULT_LAYOUT_REGIONS: [&str; 65] = [
    "Aridia",
    "Black_Rise",
    "The_Bleak_Lands",
    "Branch",
    "Cache",
    "Catch",
    "The_Citadel",
    "Cloud_Ring",
    "Cobalt_Edge",
    "Curse",
    "Deklein",
    "Delve",
    "Derelik",
    "Detorid",
    "Devoid",
    "Domain",
    "Esoteria",
    "Essence",
    "Etherium_Reach",
    "Everyshore",
    "Fade",
    "Feythabolis",
    "The_Forge",
    "Fountain",
    "Geminate",
    "Genesis",
    "Great_Wildlands",
    "Heimatar",
    "Immensea",
    "Impass",
    "Insmother",
    "Kador",
    "The_Kalevala_Expanse",
    "Khanid",
    "Kor-Azor",
    "Lonetrek",
    "Malpais",
    "Metropolis",
    "Molden_Heath",
    "Oasa",
    "Omist",
    "Outer_Passage",
    "Outer_Ring",
    "Paragon_Soul",
    "Period_Basis",
    "Perrigen_Falls",
    "Placid",
    "Pochven",
    "Providence",
    "Pure_Blind",
    "Querious",
    "Scalding_Pass",
    "Sinq_Laison",
    "Solitude",
    "The_Spire",
    "Stain",
    "Syndicate",
    "Tash-Murkon",
    "Tenal",
    "Tenerifis",
    "Tribute",
    "Vale_of_the_Silent",
    "Venal",
    "Verge_Vendor",
    "Wicked_Creek",
];

const SYSTEM_GROUP_ID: &str = "sysuse";
const NODE_ID_PREFIX_LEN: usize = 3;

/// One system as drawn on an external region chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutNode {
    pub system_id: i32,
    pub x: i32,
    pub y: i32,
    pub external: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedLayout {
    pub region: String,
    pub nodes: Vec<LayoutNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutImport {
    pub layouts: Vec<ImportedLayout>,
    pub skipped: Vec<String>,
}

pub trait LayoutSource: Send + Sync {
    /// Returns the raw SVG chart for `region`.
    fn fetch_layout(&self, region: &str) -> Result<String, MapperError>;
}

#[derive(Clone)]
pub struct DotlanClient<T: Transport> {
    transport: T,
    url_template: String,
}

impl<T: Transport> DotlanClient<T> {
    pub fn new(transport: T, url_template: &str) -> Self {
        Self {
            transport,
            url_template: url_template.to_string(),
        }
    }

    pub fn layout_url(&self, region: &str) -> String {
        self.url_template.replace("{region}", region)
    }
}

impl<T: Transport> LayoutSource for DotlanClient<T> {
    fn fetch_layout(&self, region: &str) -> Result<String, MapperError> {
        let url = self.layout_url(region);
        let response = self
            .transport
            .get(&url)
            .map_err(|err| MapperError::RegionImport {
                region: region.to_string(),
                message: err.to_string(),
            })?;
        if !response.is_ok() {
            return Err(MapperError::RegionImport {
                region: region.to_string(),
                message: format!("{url} returned status {}", response.status),
            });
        }
        Ok(String::from_utf8_lossy(&response.body).into_owned())
    }
}

/// Fetches and parses every region chart. Unreachable regions are skipped,
/// unparsable chart data aborts the import.
pub fn import_layouts<L: LayoutSource + ?Sized>(
    source: &L,
    regions: &[String],
    sink: &dyn ProgressSink,
) -> Result<LayoutImport, MapperError> {
    let mut import = LayoutImport::default();
    for region in regions {
        sink.event(ProgressEvent {
            message: format!("phase=Layout; grabbing chart {region}"),
            elapsed: None,
        });
        let svg = match source.fetch_layout(region) {
            Ok(svg) => svg,
            Err(err) => {
                warn!(%region, error = %err, "layout download failed, skipping region");
                import.skipped.push(region.clone());
                continue;
            }
        };
        let nodes = parse_layout(region, &svg)?;
        info!(%region, systems = nodes.len(), "imported layout");
        import.layouts.push(ImportedLayout {
            region: region.clone(),
            nodes,
        });
    }
    Ok(import)
}

/// Reads node placements from a region chart.
///
/// Systems are the `<use>` elements below `<g id="sysuse">`; their id carries
/// a three character prefix before the system id. A system counts as external
/// when its `<rect id="rect{system_id}">` has a class starting with `e`.
pub fn parse_layout(region: &str, svg: &str) -> Result<Vec<LayoutNode>, MapperError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(svg, options).map_err(|err| {
        MapperError::MalformedLayout {
            region: region.to_string(),
            field: "document".to_string(),
            value: err.to_string(),
        }
    })?;

    let Some(group) = doc.descendants().find(|node| {
        node.is_element()
            && node.tag_name().name() == "g"
            && node.attribute("id") == Some(SYSTEM_GROUP_ID)
    }) else {
        warn!(%region, "chart has no system group");
        return Ok(Vec::new());
    };

    let rect_classes: HashMap<&str, &str> = doc
        .descendants()
        .filter(|node| node.is_element() && node.tag_name().name() == "rect")
        .filter_map(|node| Some((node.attribute("id")?, node.attribute("class").unwrap_or(""))))
        .collect();

    let mut nodes = Vec::new();
    for element in group
        .descendants()
        .filter(|node| node.is_element() && node.tag_name().name() == "use")
    {
        let ident = element.attribute("id").unwrap_or("");
        let system_id = ident
            .get(NODE_ID_PREFIX_LEN..)
            .and_then(|digits| digits.parse::<i32>().ok())
            .ok_or_else(|| malformed(region, "id", ident))?;
        let x = parse_coordinate(region, "x", element.attribute("x"))?;
        let y = parse_coordinate(region, "y", element.attribute("y"))?;
        let external = rect_classes
            .get(format!("rect{system_id}").as_str())
            .is_some_and(|class| class.starts_with('e'));
        debug!(%region, system_id, x, y, external, "layout node");
        nodes.push(LayoutNode {
            system_id,
            x,
            y,
            external,
        });
    }
    Ok(nodes)
}

/// Whole-pixel attribute. Anything else, fractions included, is malformed.
fn parse_coordinate(region: &str, field: &str, value: Option<&str>) -> Result<i32, MapperError> {
    let raw = value.unwrap_or("").trim();
    raw.parse::<i32>().map_err(|_| malformed(region, field, raw))
}

fn malformed(region: &str, field: &str, value: &str) -> MapperError {
    MapperError::MalformedLayout {
        region: region.to_string(),
        field: field.to_string(),
        value: value.to_string(),
    }
}
