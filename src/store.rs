use std::fs;
use std::sync::LazyLock;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::Builder;
use tracing::{debug, info, warn};

use crate::document::MapDocument;
use crate::domain::Galaxy;
use crate::error::MapperError;

pub const DEFAULT_GALAXY_FILE: &str = "neweden.json";
pub const DEFAULT_MAPS_DIR: &str = "maps";

static MAP_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("map id pattern compiles"));

/// Flat-file home of the galaxy snapshot and the per-region map documents.
#[derive(Debug, Clone)]
pub struct MapStore {
    root: Utf8PathBuf,
    galaxy_file: String,
    maps_dir: String,
}

#[derive(Debug, Clone)]
pub struct WrittenOutput {
    pub galaxy_path: Utf8PathBuf,
    pub maps: Vec<Utf8PathBuf>,
}

impl MapStore {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self::with_layout(root, DEFAULT_GALAXY_FILE, DEFAULT_MAPS_DIR)
    }

    pub fn with_layout(root: Utf8PathBuf, galaxy_file: &str, maps_dir: &str) -> Self {
        Self {
            root,
            galaxy_file: galaxy_file.to_string(),
            maps_dir: maps_dir.to_string(),
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn galaxy_path(&self) -> Utf8PathBuf {
        self.root.join(&self.galaxy_file)
    }

    pub fn maps_dir(&self) -> Utf8PathBuf {
        self.root.join(&self.maps_dir)
    }

    pub fn map_path(&self, id: &str) -> Result<Utf8PathBuf, MapperError> {
        validate_map_id(id)?;
        Ok(self.maps_dir().join(format!("{id}.json")))
    }

    /// Identifiers of every stored map document, sorted.
    pub fn list_maps(&self) -> Result<Vec<String>, MapperError> {
        let dir = self.maps_dir();
        if !dir.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let entries =
            fs::read_dir(dir.as_std_path()).map_err(|err| MapperError::Filesystem(err.to_string()))?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| MapperError::Filesystem(err.to_string()))?;
            let path = entry.path();
            if !path.is_file() || path.extension().map(|ext| ext != "json").unwrap_or(true) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                if validate_map_id(stem).is_ok() {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    pub fn load_map(&self, id: &str) -> Result<MapDocument, MapperError> {
        let path = self.map_path(id)?;
        if !path.as_std_path().exists() {
            return Err(MapperError::UnknownMapDocument(id.to_string()));
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| MapperError::Filesystem(err.to_string()))?;
        serde_json::from_str(&content).map_err(|err| MapperError::MalformedMapDocument {
            id: id.to_string(),
            message: err.to_string(),
        })
    }

    pub fn load_galaxy(&self) -> Result<Galaxy, MapperError> {
        let path = self.galaxy_path();
        if !path.as_std_path().exists() {
            return Err(MapperError::MissingGalaxy(path.into_std_path_buf()));
        }
        read_json(&path)
    }

    /// Writes the snapshot and all documents into a staging directory next to
    /// the destination, then moves them over the previous output.
    ///
    /// The previous maps directory is moved aside rather than deleted, and is
    /// put back if either move fails. Directories cannot be exchanged
    /// atomically, so readers may briefly find no maps directory between the
    /// two renames.
    pub fn write_output(
        &self,
        galaxy: &Galaxy,
        documents: &[MapDocument],
    ) -> Result<WrittenOutput, MapperError> {
        validate_layout(&self.galaxy_file, &self.maps_dir)?;
        for document in documents {
            validate_map_id(&document.name)?;
        }
        create_dir_all(&self.root)?;
        let staging = tempdir_in(&self.root, ".spyglass-stage")?;
        let staging_root = utf8_dir(&staging)?;

        let staged_galaxy = staging_root.join(&self.galaxy_file);
        let staged_maps = staging_root.join(&self.maps_dir);
        if let Some(parent) = staged_galaxy.parent() {
            create_dir_all(parent)?;
        }
        write_json(&staged_galaxy, galaxy)?;
        create_dir_all(&staged_maps)?;

        let mut maps = Vec::with_capacity(documents.len());
        for document in documents {
            write_json(&staged_maps.join(format!("{}.json", document.name)), document)?;
            maps.push(self.maps_dir().join(format!("{}.json", document.name)));
        }
        debug!(staging = %staging_root, documents = documents.len(), "staged output");

        let galaxy_path = self.galaxy_path();
        let live_maps = self.maps_dir();
        for path in [&galaxy_path, &live_maps] {
            if let Some(parent) = path.parent() {
                create_dir_all(parent)?;
            }
        }

        let retired = tempdir_in(&self.root, ".spyglass-retired")?;
        let retired_maps = utf8_dir(&retired)?.join("maps");
        let had_previous = live_maps.as_std_path().exists();
        if had_previous {
            rename(&live_maps, &retired_maps)?;
        }
        if let Err(err) = rename(&staged_maps, &live_maps) {
            restore_maps(had_previous, &retired_maps, &live_maps);
            return Err(err);
        }
        if let Err(err) = rename(&staged_galaxy, &galaxy_path) {
            if let Err(cleanup) = fs::remove_dir_all(live_maps.as_std_path()) {
                warn!(path = %live_maps, error = %cleanup, "could not remove new maps");
            }
            restore_maps(had_previous, &retired_maps, &live_maps);
            return Err(err);
        }

        info!(galaxy = %galaxy_path, maps = maps.len(), "output written");
        Ok(WrittenOutput { galaxy_path, maps })
    }
}

/// Checks that the snapshot file and maps directory are plain relative paths
/// under the output root and that neither contains the other.
pub fn validate_layout(galaxy_file: &str, maps_dir: &str) -> Result<(), MapperError> {
    let galaxy = plain_relative("output.galaxy_path", galaxy_file)?;
    let maps = plain_relative("output.maps_dir", maps_dir)?;
    if galaxy.starts_with(maps) || maps.starts_with(galaxy) {
        return Err(MapperError::InvalidConfig {
            field: "output".to_string(),
            message: format!("{galaxy_file:?} and {maps_dir:?} must not nest"),
        });
    }
    Ok(())
}

fn plain_relative<'a>(field: &str, value: &'a str) -> Result<&'a Utf8Path, MapperError> {
    let path = Utf8Path::new(value);
    let plain = path
        .components()
        .all(|component| matches!(component, Utf8Component::Normal(_)));
    if value.trim().is_empty() || !plain {
        return Err(MapperError::InvalidConfig {
            field: field.to_string(),
            message: format!("{value:?} must be a relative path of plain names"),
        });
    }
    Ok(path)
}

fn restore_maps(had_previous: bool, retired: &Utf8Path, live: &Utf8Path) {
    if !had_previous {
        return;
    }
    if let Err(err) = rename(retired, live) {
        warn!(path = %live, error = %err, "could not restore previous maps");
    }
}

fn tempdir_in(root: &Utf8Path, prefix: &str) -> Result<tempfile::TempDir, MapperError> {
    Builder::new()
        .prefix(prefix)
        .tempdir_in(root.as_std_path())
        .map_err(|err| MapperError::Filesystem(err.to_string()))
}

fn utf8_dir(dir: &tempfile::TempDir) -> Result<Utf8PathBuf, MapperError> {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .map_err(|_| MapperError::Filesystem("invalid staging dir".to_string()))
}

fn create_dir_all(path: &Utf8Path) -> Result<(), MapperError> {
    fs::create_dir_all(path.as_std_path()).map_err(|err| MapperError::Filesystem(err.to_string()))
}

fn rename(from: &Utf8Path, to: &Utf8Path) -> Result<(), MapperError> {
    fs::rename(from.as_std_path(), to.as_std_path())
        .map_err(|err| MapperError::Filesystem(format!("{from} -> {to}: {err}")))
}

pub fn validate_map_id(id: &str) -> Result<(), MapperError> {
    if MAP_ID.is_match(id) {
        Ok(())
    } else {
        Err(MapperError::InvalidMapId(id.to_string()))
    }
}

/// Pretty JSON with tab indentation and a trailing newline.
pub fn to_tab_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, MapperError> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|err| MapperError::Filesystem(err.to_string()))?;
    out.push(b'\n');
    Ok(out)
}

fn write_json<T: Serialize + ?Sized>(path: &Utf8Path, value: &T) -> Result<(), MapperError> {
    let content = to_tab_json(value)?;
    fs::write(path.as_std_path(), content).map_err(|err| MapperError::Filesystem(err.to_string()))
}

fn read_json<T: DeserializeOwned>(path: &Utf8Path) -> Result<T, MapperError> {
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|err| MapperError::Filesystem(err.to_string()))?;
    serde_json::from_str(&content)
        .map_err(|err| MapperError::Filesystem(format!("{path}: {err}")))
}
