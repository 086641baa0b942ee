//! Heuristic repository analysis.
//!
//! Every answer here is a pure function of the snapshot: no network, no
//! subprocesses, no mutation. Port inference resolves in three tiers
//! (explicit literals, framework conventions, default) and short-circuits on
//! the first hit, so a given tree always yields the same answer.

use std::sync::LazyLock;

use regex::Regex;

use super::RepoSnapshot;

/// Used when no tier can pin down a port.
pub const DEFAULT_PORT: u16 = 8080;

/// Textual signatures that mark a codebase as serving HTTP.
static HTTP_HINTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Python
        r"from\s+flask\s+import\s+",
        r"from\s+fastapi\s+import\s+",
        r"django\.core",
        r"uvicorn\.run",
        r"app\.run\(",
        // Node
        r#"require\(['"]express['"]\)"#,
        r#"from\s+express\s+import|from\s+['"]express['"]"#,
        r"app\.listen\(",
        // Go
        r"http\.ListenAndServe\(",
        // Java/Spring
        r"@RestController",
        r"SpringApplication\.run\(",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Ordered port-literal extractors; the first capture in file order wins.
static PORT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"EXPOSE\s+(\d+)",
        r#"ports:\s*\n\s*-\s*['"]?(\d+):"#,
        r"port\s*=\s*(\d+)",
        r"listen\(\s*(\d+)\s*\)",
        r"run\([^)]*port\s*=\s*(\d+)",
        r"--port(?:=|\s+)(\d+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Framework tokens and their conventional ports, probed in table order.
const FRAMEWORK_PORTS: &[(&str, u16)] = &[
    ("flask", 5000),
    ("fastapi", 8000),
    ("django", 8000),
    ("express", 3000),
    ("next", 3000),
    ("rails", 3000),
    ("spring", 8080),
    ("go", 8080),
];

const SOURCE_EXTENSIONS: &[&str] = &[".py", ".js", ".ts", ".go", ".java", ".kt", ".rb", ".rs"];
const PORT_SCAN_EXTENSIONS: &[&str] = &[".py", ".js", ".ts", ".go"];
const FRAMEWORK_SCAN_EXTENSIONS: &[&str] = &[".py", ".js", ".ts", ".rb", ".java", ".go"];
const CONTAINER_FILES: &[&str] = &[
    "dockerfile",
    "docker-compose.yml",
    "compose.yaml",
    "compose.yml",
];

fn file_name(rel: &str) -> &str {
    rel.rsplit('/').next().unwrap_or(rel)
}

fn has_extension(name: &str, extensions: &[&str]) -> bool {
    extensions.iter().any(|ext| name.ends_with(ext))
}

fn is_container_file(name: &str) -> bool {
    CONTAINER_FILES.contains(&name.to_lowercase().as_str())
}

/// Gate: does this repository look like it serves HTTP at all? Scans source
/// and container manifests for framework import/listen idioms. Provisioning
/// is refused for anything that does not match.
pub fn is_http_service(snapshot: &RepoSnapshot) -> bool {
    for rel in snapshot.files() {
        let name = file_name(rel);
        if !has_extension(name, SOURCE_EXTENSIONS) && !is_container_file(name) {
            continue;
        }
        let Ok(content) = snapshot.read(rel) else {
            continue;
        };
        if HTTP_HINTS.iter().any(|hint| hint.is_match(&content)) {
            return true;
        }
    }
    false
}

/// How a port was determined, for the job log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortOrigin {
    /// An explicit literal matched in the named file.
    Literal { file: String },
    /// A framework token mapped through the convention table.
    Framework { name: &'static str },
    Default,
}

/// Infer the application's listen port.
///
/// Tier 1 extracts explicit literals (expose directives, compose mappings,
/// assignments, listen calls, `--port` flags); tier 2 maps framework tokens
/// to conventional defaults; tier 3 is [`DEFAULT_PORT`]. Literals outside
/// [1, 65535] are skipped rather than trusted.
pub fn infer_port(snapshot: &RepoSnapshot) -> (u16, PortOrigin) {
    for rel in snapshot.files() {
        let name = file_name(rel);
        if !has_extension(name, PORT_SCAN_EXTENSIONS) && !is_container_file(name) {
            continue;
        }
        let Ok(content) = snapshot.read(rel) else {
            continue;
        };
        for pattern in PORT_PATTERNS.iter() {
            let Some(captures) = pattern.captures(&content) else {
                continue;
            };
            let Some(m) = captures.get(1) else {
                continue;
            };
            if let Ok(port) = m.as_str().parse::<u16>() {
                if port >= 1 {
                    return (
                        port,
                        PortOrigin::Literal {
                            file: rel.to_string(),
                        },
                    );
                }
            }
        }
    }

    for (name, port) in FRAMEWORK_PORTS {
        for rel in snapshot.files() {
            if !has_extension(file_name(rel), FRAMEWORK_SCAN_EXTENSIONS) {
                continue;
            }
            let Ok(content) = snapshot.read(rel) else {
                continue;
            };
            if content.to_lowercase().contains(name) {
                return (*port, PortOrigin::Framework { name });
            }
        }
    }

    (DEFAULT_PORT, PortOrigin::Default)
}

/// Does the repository ship its own containerization? Only root-level build
/// or compose files count; a Dockerfile buried in a subdirectory does not
/// decide the deployment layout.
pub fn has_containerization(snapshot: &RepoSnapshot) -> bool {
    snapshot
        .files()
        .filter(|rel| !rel.contains('/'))
        .any(is_container_file)
}

/// True when the source mentions the loopback address and never the
/// all-interfaces one. Such services need an explicit `0.0.0.0` bind in the
/// container build file to be reachable.
pub fn binds_loopback_only(snapshot: &RepoSnapshot) -> bool {
    let mut loopback_seen = false;
    for rel in snapshot.files() {
        if !has_extension(file_name(rel), SOURCE_EXTENSIONS) {
            continue;
        }
        let Ok(content) = snapshot.read(rel) else {
            continue;
        };
        if content.contains("0.0.0.0") {
            return false;
        }
        if content.contains("127.0.0.1") || content.contains("localhost") {
            loopback_seen = true;
        }
    }
    loopback_seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn snapshot_with(files: &[(&str, &str)]) -> (tempfile::TempDir, RepoSnapshot) {
        let dir = tempfile::tempdir().expect("tempdir");
        for (rel, content) in files {
            let path = dir.path().join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("mkdir");
            }
            fs::write(&path, content).expect("write");
        }
        let snapshot = RepoSnapshot::capture(dir.path()).expect("capture");
        (dir, snapshot)
    }

    #[test]
    fn test_flask_import_marks_http_service() {
        let (_dir, snap) = snapshot_with(&[("app.py", "from flask import Flask\n")]);
        assert!(is_http_service(&snap));
    }

    #[test]
    fn test_express_listen_marks_http_service() {
        let (_dir, snap) = snapshot_with(&[(
            "server.js",
            "const express = require('express');\nconst app = express();\napp.listen(3000);\n",
        )]);
        assert!(is_http_service(&snap));
    }

    #[test]
    fn test_plain_library_is_not_http_service() {
        let (_dir, snap) = snapshot_with(&[
            ("lib.py", "def add(a, b):\n    return a + b\n"),
            ("README.md", "app.run( is mentioned here but markdown is not scanned"),
        ]);
        assert!(!is_http_service(&snap));
    }

    #[test]
    fn test_expose_directive_wins_tier_one() {
        let (_dir, snap) = snapshot_with(&[
            ("Dockerfile", "FROM python:3.12-slim\nEXPOSE 9001\n"),
            ("app.py", "from flask import Flask\n"),
        ]);
        let (port, origin) = infer_port(&snap);
        assert_eq!(port, 9001);
        assert_eq!(
            origin,
            PortOrigin::Literal {
                file: "Dockerfile".to_string()
            }
        );
    }

    #[test]
    fn test_compose_mapping_literal_is_extracted() {
        let (_dir, snap) = snapshot_with(&[(
            "docker-compose.yml",
            "services:\n  app:\n    ports:\n      - \"9090:9090\"\n",
        )]);
        let (port, _) = infer_port(&snap);
        assert_eq!(port, 9090);
    }

    #[test]
    fn test_cli_port_flag_is_extracted() {
        let (_dir, snap) = snapshot_with(&[(
            "start.go",
            "// launched as: server --port 7777\npackage main\n",
        )]);
        let (port, origin) = infer_port(&snap);
        assert_eq!(port, 7777);
        assert!(matches!(origin, PortOrigin::Literal { .. }));
    }

    #[test]
    fn test_framework_token_fills_tier_two() {
        let (_dir, snap) = snapshot_with(&[("main.py", "from fastapi import FastAPI\napp = FastAPI()\n")]);
        let (port, origin) = infer_port(&snap);
        assert_eq!(port, 8000);
        assert_eq!(origin, PortOrigin::Framework { name: "fastapi" });
    }

    #[test]
    fn test_flask_maps_to_5000() {
        let (_dir, snap) = snapshot_with(&[("app.py", "from flask import Flask\napp = Flask(__name__)\n")]);
        assert_eq!(infer_port(&snap).0, 5000);
    }

    #[test]
    fn test_unknown_tree_defaults_to_8080() {
        let (_dir, snap) = snapshot_with(&[("main.rs", "fn main() {}\n")]);
        let (port, origin) = infer_port(&snap);
        assert_eq!(port, DEFAULT_PORT);
        assert_eq!(origin, PortOrigin::Default);
    }

    #[test]
    fn test_out_of_range_literal_falls_through() {
        let (_dir, snap) = snapshot_with(&[
            ("Dockerfile", "FROM scratch\nEXPOSE 99999\n"),
            ("app.py", "from flask import Flask\n"),
        ]);
        let (port, origin) = infer_port(&snap);
        assert_eq!(port, 5000, "invalid literal must not shadow tier two");
        assert_eq!(origin, PortOrigin::Framework { name: "flask" });
    }

    #[test]
    fn test_infer_port_is_deterministic() {
        let (_dir, snap) = snapshot_with(&[
            ("a.py", "from flask import Flask\n"),
            ("b.py", "import uvicorn\nuvicorn.run(app, port = 8443)\n"),
        ]);
        let first = infer_port(&snap);
        for _ in 0..5 {
            assert_eq!(infer_port(&snap), first);
        }
    }

    #[test]
    fn test_root_level_dockerfile_counts_as_containerized() {
        let (_dir, snap) = snapshot_with(&[("Dockerfile", "FROM alpine\n")]);
        assert!(has_containerization(&snap));
    }

    #[test]
    fn test_nested_dockerfile_does_not_count() {
        let (_dir, snap) = snapshot_with(&[("demos/Dockerfile", "FROM alpine\n")]);
        assert!(!has_containerization(&snap));
    }

    #[test]
    fn test_loopback_only_binding_is_detected() {
        let (_dir, snap) = snapshot_with(&[(
            "app.py",
            "app.run(host=\"127.0.0.1\", port=5000)\n",
        )]);
        assert!(binds_loopback_only(&snap));
    }

    #[test]
    fn test_all_interfaces_bind_clears_loopback_flag() {
        let (_dir, snap) = snapshot_with(&[(
            "app.py",
            "host = \"127.0.0.1\" if debug else \"0.0.0.0\"\napp.run(host=host)\n",
        )]);
        assert!(!binds_loopback_only(&snap));
    }
}
