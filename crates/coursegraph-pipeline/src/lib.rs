//! Pipeline orchestration: mining runs (fetch + persist per-campus
//! datasets) and build runs (datasets -> canonical catalog -> node/edge
//! tables).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use coursegraph_adapters::{CampusSource, MineContext, UtmSource, UtscSource, UtsgSource};
use coursegraph_core::{Campus, CampusDataset};
use coursegraph_storage::{DatasetStore, HttpClientConfig, HttpFetcher};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

pub mod catalog;
pub mod extract;
pub mod normalize;
pub mod tables;

use catalog::{CourseCatalog, MergeStats};

pub const CRATE_NAME: &str = "coursegraph-pipeline";

/// Which subjects/departments to mine per campus, loaded from
/// `campuses.yaml`. The entry shapes are the adapters' own source configs.
#[derive(Debug, Clone, Deserialize)]
pub struct CampusRegistry {
    pub utsg: UtsgSource,
    pub utm: UtmSource,
    pub utsc: UtscSource,
}

impl CampusRegistry {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Sources in campus merge order.
    pub fn sources(&self) -> [&dyn CampusSource; 3] {
        [&self.utsg, &self.utm, &self.utsc]
    }
}

#[derive(Debug, Clone)]
pub struct MineConfig {
    pub registry_path: PathBuf,
    pub data_dir: PathBuf,
    pub user_agent: String,
    pub http_timeout_secs: u64,
}

impl MineConfig {
    pub fn from_env() -> Self {
        Self {
            registry_path: std::env::var("COURSEGRAPH_REGISTRY")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("campuses.yaml")),
            data_dir: std::env::var("COURSEGRAPH_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            user_agent: std::env::var("COURSEGRAPH_USER_AGENT")
                .unwrap_or_else(|_| "coursegraph-bot/0.1".to_string()),
            http_timeout_secs: std::env::var("COURSEGRAPH_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub data_dir: PathBuf,
    pub out_dir: PathBuf,
}

impl BuildConfig {
    pub fn from_env() -> Self {
        Self {
            data_dir: std::env::var("COURSEGRAPH_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            out_dir: std::env::var("COURSEGRAPH_OUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./csv")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CampusMineOutcome {
    pub campus: String,
    pub courses: usize,
    pub dataset: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MineRunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub campuses: Vec<CampusMineOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampusBuildOutcome {
    pub campus: String,
    pub loaded: bool,
    pub stats: Option<MergeStats>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildRunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub campuses: Vec<CampusBuildOutcome>,
    pub nodes: usize,
    pub placeholders: usize,
    pub edges: usize,
    pub nodes_path: String,
    pub edges_path: String,
    pub manifest_path: String,
}

/// Fetch every campus once and persist the datasets. Campuses fail
/// independently: a source that is down is reported in the summary and the
/// others still complete.
pub async fn mine_once(config: &MineConfig) -> Result<MineRunSummary> {
    let started_at = Utc::now();
    let run_id = Uuid::new_v4();

    let registry = CampusRegistry::load(&config.registry_path)?;
    let store = DatasetStore::new(&config.data_dir);
    let http = HttpFetcher::new(HttpClientConfig {
        timeout: Duration::from_secs(config.http_timeout_secs),
        user_agent: Some(config.user_agent.clone()),
        ..Default::default()
    })?;
    let ctx = MineContext { run_id };

    let mut campuses = Vec::new();
    for source in registry.sources() {
        let campus = source.campus();
        match source.mine(&http, &ctx).await {
            Ok(courses) => {
                let count = courses.len();
                let dataset = CampusDataset {
                    campus,
                    fetched_at: Utc::now(),
                    courses,
                };
                let path = store.save(&dataset)?;
                info!(campus = campus.tag(), courses = count, "campus mined");
                campuses.push(CampusMineOutcome {
                    campus: campus.tag().to_string(),
                    courses: count,
                    dataset: Some(path.display().to_string()),
                    error: None,
                });
            }
            Err(err) => {
                warn!(campus = campus.tag(), error = %err, "campus mine failed; continuing");
                campuses.push(CampusMineOutcome {
                    campus: campus.tag().to_string(),
                    courses: 0,
                    dataset: None,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    Ok(MineRunSummary {
        run_id,
        started_at,
        finished_at: Utc::now(),
        campuses,
    })
}

/// Run the full build: merge persisted datasets in campus order, parse
/// requirement references, resolve placeholders, emit the edge set and
/// write both tables plus the manifest.
///
/// A missing or malformed campus dataset is reported and skipped; the
/// build proceeds with the campuses that loaded (their absence only means
/// fewer presence flags and fragments).
pub fn build_tables(config: &BuildConfig) -> Result<BuildRunSummary> {
    let started_at = Utc::now();
    let store = DatasetStore::new(&config.data_dir);

    let mut catalog = CourseCatalog::new();
    let mut campuses = Vec::new();

    for campus in Campus::ALL {
        match store.load(campus) {
            Ok(dataset) => {
                let stats = catalog.merge_campus(campus, &dataset.courses);
                info!(
                    campus = campus.tag(),
                    created = stats.created,
                    merged = stats.merged,
                    skipped = stats.skipped_duplicates,
                    "campus merged"
                );
                campuses.push(CampusBuildOutcome {
                    campus: campus.tag().to_string(),
                    loaded: true,
                    stats: Some(stats),
                    error: None,
                });
            }
            Err(err) => {
                warn!(campus = campus.tag(), error = %err, "skipping campus dataset");
                campuses.push(CampusBuildOutcome {
                    campus: campus.tag().to_string(),
                    loaded: false,
                    stats: None,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    catalog.parse_requirements();
    let placeholders = catalog.resolve_placeholders();
    let edges = catalog.edges().context("emitting requirement edges")?;

    std::fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("creating {}", config.out_dir.display()))?;
    let nodes_path = config.out_dir.join("nodes.csv");
    let edges_path = config.out_dir.join("edges.csv");
    tables::write_node_table(&nodes_path, &catalog)?;
    tables::write_edge_table(&edges_path, &edges)?;
    let manifest_path = tables::write_manifest(
        &config.out_dir,
        &[("nodes", nodes_path.as_path()), ("edges", edges_path.as_path())],
    )?;

    info!(
        nodes = catalog.len(),
        placeholders,
        edges = edges.len(),
        "graph tables written"
    );

    Ok(BuildRunSummary {
        started_at,
        finished_at: Utc::now(),
        campuses,
        nodes: catalog.len(),
        placeholders,
        edges: edges.len(),
        nodes_path: nodes_path.display().to_string(),
        edges_path: edges_path.display().to_string(),
        manifest_path: manifest_path.display().to_string(),
    })
}
