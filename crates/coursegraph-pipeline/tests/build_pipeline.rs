//! End-to-end build over persisted campus datasets.

use std::collections::BTreeMap;

use chrono::Utc;
use coursegraph_core::{Campus, CampusDataset, RawCourseRecord};
use coursegraph_pipeline::{build_tables, BuildConfig};
use coursegraph_storage::DatasetStore;
use tempfile::tempdir;

fn record(
    title: &str,
    description: Option<&str>,
    prerequisites: Option<&str>,
    exclusions: Option<&str>,
) -> RawCourseRecord {
    RawCourseRecord {
        title: title.to_string(),
        description: description.map(str::to_string),
        prerequisites: prerequisites.map(str::to_string),
        corequisites: None,
        exclusions: exclusions.map(str::to_string),
    }
}

fn save(store: &DatasetStore, campus: Campus, entries: Vec<(&str, RawCourseRecord)>) {
    let courses: BTreeMap<String, RawCourseRecord> = entries
        .into_iter()
        .map(|(code, record)| (code.to_string(), record))
        .collect();
    store
        .save(&CampusDataset {
            campus,
            fetched_at: Utc::now(),
            courses,
        })
        .expect("save dataset");
}

#[test]
fn full_build_produces_node_and_edge_tables() {
    let dir = tempdir().expect("tempdir");
    let store = DatasetStore::new(dir.path().join("data"));

    save(
        &store,
        Campus::Utsg,
        vec![
            (
                "CSC108H1",
                record(
                    "Introduction to Computer Programming",
                    Some("Programming in Python, no prior experience."),
                    None,
                    None,
                ),
            ),
            (
                "CSC148H1",
                record(
                    "Introduction to Computer Science",
                    Some("Abstract data types."),
                    Some("CSC108H1"),
                    Some("CSC110Y1"),
                ),
            ),
        ],
    );
    save(
        &store,
        Campus::Utm,
        vec![
            // Section variants normalizing to the same canonical code.
            ("CSC108H5F", record("Introduction to Computer Programming", None, None, Some("CSC148H5"))),
            ("CSC108H5S", record("Introduction to Computer Programming", None, None, Some("CSC148H5"))),
        ],
    );
    save(
        &store,
        Campus::Utsc,
        vec![(
            "CSCA48H3",
            record(
                "Introduction to Computer Science II",
                None,
                Some("CSCA08H3"),
                None,
            ),
        )],
    );

    let config = BuildConfig {
        data_dir: dir.path().join("data"),
        out_dir: dir.path().join("csv"),
    };
    let summary = build_tables(&config).expect("build");

    assert_eq!(summary.nodes, 3);
    assert_eq!(summary.placeholders, 1);
    assert_eq!(summary.edges, 1);
    assert!(summary.campuses.iter().all(|c| c.loaded));

    let nodes = std::fs::read_to_string(&summary.nodes_path).expect("read nodes.csv");
    let lines: Vec<&str> = nodes.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Id,Label,Title,Description,Subject,UTSG,UTM,UTSC,Prerequisites,Corequisites,Exclusions",
            "0,CSC108,Introduction to Computer Programming,\"Programming in Python, no prior experience.\",CSC,True,True,False,,,[UTM: CSC148H5]",
            "1,CSC148,Introduction to Computer Science,Abstract data types.,CSC,True,False,True,[UTSG: CSC108H1] [UTSC: CSCA08H3],,[UTSG: CSC110Y1]",
            "2,CSC110,,,CSC,False,False,False,,,",
        ]
    );

    let edges = std::fs::read_to_string(&summary.edges_path).expect("read edges.csv");
    assert_eq!(edges, "Source,Target,Type,Weight\n0,1,Directed,1\n");

    let manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&summary.manifest_path).unwrap()).unwrap();
    let files = manifest["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["name"], "nodes");
    assert_eq!(files[0]["path"], "nodes.csv");
    assert_eq!(files[0]["sha256"].as_str().unwrap().len(), 64);
    assert!(files[1]["bytes"].as_u64().unwrap() > 0);
}

#[test]
fn missing_and_corrupt_campuses_are_skipped_not_fatal() {
    let dir = tempdir().expect("tempdir");
    let data_dir = dir.path().join("data");
    let store = DatasetStore::new(&data_dir);

    save(
        &store,
        Campus::Utsg,
        vec![(
            "CSC148H1",
            record("Introduction to Computer Science", None, Some("CSC108H1"), None),
        )],
    );
    // UTM dataset truncated on disk; UTSC dataset never mined.
    std::fs::write(store.dataset_path(Campus::Utm), "{ not json").expect("write");

    let config = BuildConfig {
        data_dir,
        out_dir: dir.path().join("csv"),
    };
    let summary = build_tables(&config).expect("build");

    assert!(summary.campuses[0].loaded);
    assert!(!summary.campuses[1].loaded);
    assert!(!summary.campuses[2].loaded);
    assert!(summary.campuses[1].error.as_deref().unwrap().contains("malformed"));
    assert!(summary.campuses[2].error.as_deref().unwrap().contains("not found"));

    // The loaded campus still produced a graph: CSC148 plus the CSC108
    // placeholder and the edge between them.
    assert_eq!(summary.nodes, 2);
    assert_eq!(summary.placeholders, 1);
    assert_eq!(summary.edges, 1);
}
