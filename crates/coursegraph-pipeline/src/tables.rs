//! CSV emission for the node and edge tables, plus a manifest recording the
//! hash and size of each emitted file.
//!
//! Descriptions and requirement text routinely contain commas, quotes and
//! newlines, so fields are quoted with doubled-quote escaping when needed.
//! Each table is built fully in memory and written with a single call —
//! a failed build never leaves a half-written table behind.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use coursegraph_core::{Campus, CourseEntity, Edge};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::catalog::CourseCatalog;

pub const NODE_HEADERS: [&str; 11] = [
    "Id",
    "Label",
    "Title",
    "Description",
    "Subject",
    "UTSG",
    "UTM",
    "UTSC",
    "Prerequisites",
    "Corequisites",
    "Exclusions",
];

pub const EDGE_HEADERS: [&str; 4] = ["Source", "Target", "Type", "Weight"];

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_row<W: Write, S: AsRef<str>>(mut w: W, row: &[S]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        let cell = cell.as_ref();
        if !first {
            write!(w, ",")?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            let escaped = cell.replace('"', "\"\"");
            write!(w, "\"{escaped}\"")?;
        } else {
            write!(w, "{cell}")?;
        }
    }
    writeln!(w)
}

fn bool_cell(flag: bool) -> String {
    if flag { "True" } else { "False" }.to_string()
}

fn node_row(entity: &CourseEntity) -> Vec<String> {
    vec![
        entity.id.to_string(),
        entity.code.clone(),
        entity.title.clone(),
        entity.description.clone(),
        entity.subject.clone(),
        bool_cell(entity.offered.get(Campus::Utsg)),
        bool_cell(entity.offered.get(Campus::Utm)),
        bool_cell(entity.offered.get(Campus::Utsc)),
        entity.prerequisites.clone(),
        entity.corequisites.clone(),
        entity.exclusions.clone(),
    ]
}

fn edge_row(edge: &Edge) -> Vec<String> {
    vec![
        edge.source.to_string(),
        edge.target.to_string(),
        Edge::TYPE.to_string(),
        Edge::WEIGHT.to_string(),
    ]
}

pub fn write_node_table(path: &Path, catalog: &CourseCatalog) -> Result<()> {
    let mut buf: Vec<u8> = Vec::new();
    write_row(&mut buf, &NODE_HEADERS).context("formatting node table header")?;
    for entity in catalog.entities() {
        write_row(&mut buf, &node_row(entity))
            .with_context(|| format!("formatting node row for {}", entity.code))?;
    }
    std::fs::write(path, buf).with_context(|| format!("writing {}", path.display()))
}

pub fn write_edge_table(path: &Path, edges: &[Edge]) -> Result<()> {
    let mut buf: Vec<u8> = Vec::new();
    write_row(&mut buf, &EDGE_HEADERS).context("formatting edge table header")?;
    for edge in edges {
        write_row(&mut buf, &edge_row(edge))
            .with_context(|| format!("formatting edge row {} -> {}", edge.source, edge.target))?;
    }
    std::fs::write(path, buf).with_context(|| format!("writing {}", path.display()))
}

#[derive(Debug, Clone, Serialize)]
pub struct TableManifest {
    pub schema_version: u32,
    pub files: Vec<TableManifestFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableManifestFile {
    pub name: String,
    pub path: String,
    pub sha256: String,
    pub bytes: u64,
}

fn manifest_entry(name: &str, out_dir: &Path, path: &Path) -> Result<TableManifestFile> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let sha256 = hex::encode(hasher.finalize());
    let rel = path.strip_prefix(out_dir).unwrap_or(path).display().to_string();
    Ok(TableManifestFile {
        name: name.to_string(),
        path: rel,
        sha256,
        bytes: bytes.len() as u64,
    })
}

/// Write `manifest.json` next to the tables and return its path.
pub fn write_manifest(out_dir: &Path, tables: &[(&str, &Path)]) -> Result<PathBuf> {
    let manifest = TableManifest {
        schema_version: 1,
        files: tables
            .iter()
            .map(|(name, path)| manifest_entry(name, out_dir, path))
            .collect::<Result<Vec<_>>>()?,
    };

    let manifest_path = out_dir.join("manifest.json");
    let bytes = serde_json::to_vec_pretty(&manifest).context("serializing table manifest")?;
    std::fs::write(&manifest_path, bytes)
        .with_context(|| format!("writing {}", manifest_path.display()))?;
    Ok(manifest_path)
}
