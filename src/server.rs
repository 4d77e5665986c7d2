//! Demo generation service
//!
//! Accepts a protocol document over HTTP, generates the artifact tree into a
//! per-session directory, and serves the result back as a file tree, single
//! files, or a zip archive.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /api/generate` | parse + generate, returns `sessionId` |
//! | `GET /api/session/{id}` | file tree, directories first |
//! | `GET /api/session/{id}/file?path=` | one file's contents |
//! | `GET /api/download/{id}?targets=` | zip of the chosen groups |
//! | `GET /metrics` | metrics snapshot |

use crate::codegen::{Generator, GeneratorOptions};
use crate::config::ServiceConfig;
use crate::error::Error;
use crate::observability::metrics;
use crate::schema::Protocol;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::io::{Cursor, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error as ThisError;
use tokio::sync::RwLock;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Reply};
use zip::write::FileOptions;
use zip::ZipWriter;

const MAX_REQUEST_BYTES: u64 = 1024 * 1024;
const DEFAULT_TARGETS: &str = "server,client,webclient";
const SOURCE_FILE: &str = "protocol.yaml";

/// Request-level failures, each with its own status code
#[derive(Debug, ThisError)]
pub enum ServiceError {
    #[error("Session not found")]
    SessionNotFound,

    #[error("File not found")]
    FileNotFound,

    #[error("Invalid path")]
    InvalidPath,

    #[error(transparent)]
    Failed(#[from] Error),

    #[error("Failed to build archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::Failed(Error::Io(err))
    }
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::SessionNotFound | ServiceError::FileNotFound => StatusCode::NOT_FOUND,
            ServiceError::InvalidPath => StatusCode::FORBIDDEN,
            ServiceError::Failed(_) | ServiceError::Archive(_) | ServiceError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn public_message(&self) -> String {
        match self {
            ServiceError::Failed(err) => err.public_message(),
            other => other.to_string(),
        }
    }

    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            error: self.public_message(),
        };
        warp::reply::with_status(warp::reply::json(&body), self.status()).into_response()
    }
}

/// Body of `POST /api/generate`
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub yaml: String,
    /// Falls back to the configured defaults when absent
    #[serde(default)]
    pub options: Option<GeneratorOptions>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    success: bool,
    session_id: Uuid,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

#[derive(Debug, Serialize)]
struct TreeResponse {
    files: Vec<TreeEntry>,
}

#[derive(Debug, Serialize)]
struct FileResponse {
    content: String,
}

/// Node in a session's file tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeEntry {
    Directory {
        name: String,
        children: Vec<TreeEntry>,
    },
    /// `path` is relative to the session root, `/`-separated
    File { name: String, path: String },
}

impl TreeEntry {
    pub fn name(&self) -> &str {
        match self {
            TreeEntry::Directory { name, .. } | TreeEntry::File { name, .. } => name,
        }
    }

    fn is_file(&self) -> bool {
        matches!(self, TreeEntry::File { .. })
    }
}

#[derive(Debug, Deserialize)]
struct FileQuery {
    path: String,
}

#[derive(Debug, Deserialize)]
struct DownloadQuery {
    #[serde(default = "default_targets")]
    targets: String,
}

fn default_targets() -> String {
    DEFAULT_TARGETS.to_string()
}

/// Session store plus the operations behind each route
pub struct GenerationService {
    config: ServiceConfig,
    sessions: Arc<RwLock<HashMap<Uuid, PathBuf>>>,
}

impl GenerationService {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Parse and generate into a fresh session directory
    ///
    /// The protocol is fully checked before anything touches disk.
    pub async fn generate(&self, request: GenerateRequest) -> Result<Uuid, ServiceError> {
        let protocol = Protocol::from_yaml(&request.yaml).map_err(Error::from)?;
        Generator::new(&protocol).check().map_err(Error::from)?;

        let options = request.options.unwrap_or(self.config.generator);
        let session_id = Uuid::new_v4();
        let dir = self.config.server.session_root.join(session_id.to_string());
        let protocol_name = protocol.name.clone();

        let session = dir.clone();
        tokio::task::spawn_blocking(move || {
            write_session(&protocol, &request.yaml, &session, &options)
        })
        .await??;

        self.sessions.write().await.insert(session_id, dir);
        metrics().record_session_created();
        info!(
            session_id = %session_id,
            protocol = %protocol_name,
            "Created generation session"
        );
        Ok(session_id)
    }

    async fn session_dir(&self, session_id: &str) -> Result<PathBuf, ServiceError> {
        let id = Uuid::parse_str(session_id).map_err(|_| ServiceError::SessionNotFound)?;
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(ServiceError::SessionNotFound)
    }

    pub async fn session_tree(&self, session_id: &str) -> Result<Vec<TreeEntry>, ServiceError> {
        let root = self.session_dir(session_id).await?;
        let tree = tokio::task::spawn_blocking(move || scan_tree(&root, &root)).await??;
        Ok(tree)
    }

    pub async fn read_file(&self, session_id: &str, path: &str) -> Result<String, ServiceError> {
        let root = self.session_dir(session_id).await?;
        let target = resolve_within(&root, path).ok_or(ServiceError::InvalidPath)?;

        match tokio::fs::metadata(&target).await {
            Ok(meta) if meta.is_file() => Ok(tokio::fs::read_to_string(&target).await?),
            _ => Err(ServiceError::FileNotFound),
        }
    }

    /// Zip the comma-separated target groups; missing groups are skipped
    pub async fn archive(&self, session_id: &str, targets: &str) -> Result<Vec<u8>, ServiceError> {
        let root = self.session_dir(session_id).await?;
        let targets = targets.to_string();
        let (bytes, count) =
            tokio::task::spawn_blocking(move || build_archive(&root, &targets)).await??;

        metrics().record_archive_built();
        info!(session_id, files = count, "Built session archive");
        Ok(bytes)
    }

    /// All routes, without CORS
    pub fn routes(self: Arc<Self>) -> BoxedFilter<(Response,)> {
        let service = warp::any().map({
            let service = self.clone();
            move || service.clone()
        });

        let generate = warp::path!("api" / "generate")
            .and(warp::post())
            .and(warp::body::content_length_limit(MAX_REQUEST_BYTES))
            .and(warp::body::json())
            .and(service.clone())
            .and_then(handle_generate);

        let tree = warp::path!("api" / "session" / String)
            .and(warp::get())
            .and(service.clone())
            .and_then(handle_tree);

        let file = warp::path!("api" / "session" / String / "file")
            .and(warp::get())
            .and(warp::query::<FileQuery>())
            .and(service.clone())
            .and_then(handle_file);

        let download = warp::path!("api" / "download" / String)
            .and(warp::get())
            .and(warp::query::<DownloadQuery>())
            .and(service)
            .and_then(handle_download);

        let metrics_route = warp::path!("metrics").and(warp::get()).and_then(|| async {
            Ok::<_, Infallible>(warp::reply::json(&metrics().get_metrics()).into_response())
        });

        let api = generate
            .or(tree)
            .unify()
            .or(file)
            .unify()
            .or(download)
            .unify()
            .or(metrics_route)
            .unify()
            .boxed();

        match &self.config.server.static_dir {
            Some(dir) => api
                .or(warp::fs::dir(dir.clone()).map(|file: warp::fs::File| file.into_response()))
                .unify()
                .boxed(),
            None => api,
        }
    }

    /// Serve until Ctrl-C
    pub async fn start(self: Arc<Self>) -> Result<(), Error> {
        let addr = self.config.listen_addr()?;
        tokio::fs::create_dir_all(&self.config.server.session_root).await?;

        let routes = self.clone().routes().with(warp::cors().allow_any_origin());

        let (bound, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(addr, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for shutdown signal: {}", e);
                }
            })
            .map_err(|e| Error::invalid_input(format!("cannot bind {addr}: {e}")))?;

        info!(
            address = %bound,
            session_root = %self.config.server.session_root.display(),
            "Generation service listening"
        );
        server.await;
        info!("Generation service stopped");
        Ok(())
    }
}

async fn handle_generate(
    request: GenerateRequest,
    service: Arc<GenerationService>,
) -> Result<Response, Infallible> {
    let span = crate::session_span!(route = "generate");
    let response = async {
        match service.generate(request).await {
            Ok(session_id) => warp::reply::json(&GenerateResponse {
                success: true,
                session_id,
            })
            .into_response(),
            Err(err) => {
                warn!(error = %err, "Generation request failed");
                err.into_response()
            }
        }
    }
    .instrument(span)
    .await;
    Ok(response)
}

async fn handle_tree(
    session_id: String,
    service: Arc<GenerationService>,
) -> Result<Response, Infallible> {
    let span = crate::session_span!(session_id = %session_id, route = "tree");
    let result = service.session_tree(&session_id).instrument(span).await;
    Ok(match result {
        Ok(files) => warp::reply::json(&TreeResponse { files }).into_response(),
        Err(err) => err.into_response(),
    })
}

async fn handle_file(
    session_id: String,
    query: FileQuery,
    service: Arc<GenerationService>,
) -> Result<Response, Infallible> {
    let span = crate::session_span!(session_id = %session_id, route = "file");
    let result = service
        .read_file(&session_id, &query.path)
        .instrument(span)
        .await;
    Ok(match result {
        Ok(content) => warp::reply::json(&FileResponse { content }).into_response(),
        Err(err) => err.into_response(),
    })
}

async fn handle_download(
    session_id: String,
    query: DownloadQuery,
    service: Arc<GenerationService>,
) -> Result<Response, Infallible> {
    let span = crate::session_span!(session_id = %session_id, route = "download");
    let result = service
        .archive(&session_id, &query.targets)
        .instrument(span)
        .await;
    Ok(match result {
        Ok(bytes) => {
            let short_id: String = session_id.chars().take(8).collect();
            let disposition = format!("attachment; filename=\"eventwire_{short_id}.zip\"");
            let reply = warp::reply::with_header(bytes, "content-type", "application/zip");
            warp::reply::with_header(reply, "content-disposition", disposition).into_response()
        }
        Err(err) => err.into_response(),
    })
}

/// Write the source document and the artifact tree into `dir`
///
/// A failure removes the partly written directory.
fn write_session(
    protocol: &Protocol,
    yaml: &str,
    dir: &Path,
    options: &GeneratorOptions,
) -> Result<(), ServiceError> {
    let written = std::fs::create_dir_all(dir)
        .and_then(|_| std::fs::write(dir.join(SOURCE_FILE), yaml))
        .map_err(ServiceError::from)
        .and_then(|_| {
            Generator::new(protocol)
                .write_all(dir, options)
                .map_err(|e| ServiceError::Failed(e.into()))
        });

    if written.is_err() {
        if let Err(cleanup) = std::fs::remove_dir_all(dir) {
            warn!(error = %cleanup, "Failed to remove incomplete session directory");
        }
    }
    written.map(|_| ())
}

/// Zip the files under each target group, returning the archive and file count
fn build_archive(root: &Path, targets: &str) -> Result<(Vec<u8>, usize), ServiceError> {
    let mut files = Vec::new();
    for target in targets.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let Some(path) = resolve_within(root, target) else {
            warn!(
                archive_target = target,
                "Ignoring archive target outside the session"
            );
            continue;
        };
        if path.is_dir() {
            collect_files(&path, &mut files)?;
        } else if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    files.dedup();

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for path in &files {
        let relative = path.strip_prefix(root).unwrap_or(path);
        zip.start_file(slash_path(relative), options)?;
        zip.write_all(&std::fs::read(path)?)?;
    }
    let bytes = zip.finish()?.into_inner();
    Ok((bytes, files.len()))
}

/// Join `requested` onto `root` lexically, refusing anything that escapes it
fn resolve_within(root: &Path, requested: &str) -> Option<PathBuf> {
    let mut resolved = root.to_path_buf();
    let mut depth = 0usize;

    for component in Path::new(requested).components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                resolved.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    Some(resolved)
}

fn scan_tree(root: &Path, dir: &Path) -> std::io::Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        if entry.file_type()?.is_dir() {
            entries.push(TreeEntry::Directory {
                name,
                children: scan_tree(root, &path)?,
            });
        } else {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            entries.push(TreeEntry::File {
                name,
                path: slash_path(relative),
            });
        }
    }

    entries.sort_by(|a, b| (a.is_file(), a.name()).cmp(&(b.is_file(), b.name())));
    Ok(entries)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    const CHAT_YAML: &str = r#"
name: chat
version: "1.0"
client:
  - name: join
    fields:
      - { name: room, type: string }
  - name: say
    fields:
      - { name: text, type: string }
server:
  - name: joined
    fields:
      - { name: members, type: "list[string]" }
"#;

    fn service(root: &TempDir) -> Arc<GenerationService> {
        Arc::new(GenerationService::new(ServiceConfig::test_config(
            root.path(),
        )))
    }

    fn request(yaml: &str) -> GenerateRequest {
        GenerateRequest {
            yaml: yaml.to_string(),
            options: None,
        }
    }

    fn body_json(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[test]
    fn test_resolve_within() {
        let root = Path::new("/sessions/abc");

        assert_eq!(
            resolve_within(root, "server/mod.rs"),
            Some(PathBuf::from("/sessions/abc/server/mod.rs"))
        );
        assert_eq!(
            resolve_within(root, "./server/../protocol.yaml"),
            Some(PathBuf::from("/sessions/abc/protocol.yaml"))
        );
        assert_eq!(resolve_within(root, "../other/secret"), None);
        assert_eq!(resolve_within(root, "server/../../x"), None);
        assert_eq!(resolve_within(root, "/etc/passwd"), None);
    }

    #[test]
    fn test_slash_path() {
        assert_eq!(
            slash_path(Path::new("server/handlers.rs")),
            "server/handlers.rs"
        );
        assert_eq!(slash_path(Path::new("./a/b")), "a/b");
    }

    #[tokio::test]
    async fn test_generate_writes_session() {
        let root = TempDir::new().unwrap();
        let service = service(&root);

        let session_id = service.generate(request(CHAT_YAML)).await.unwrap();
        let dir = root.path().join(session_id.to_string());

        assert_eq!(
            std::fs::read_to_string(dir.join("protocol.yaml")).unwrap(),
            CHAT_YAML
        );
        assert!(dir.join("server/handlers.rs").is_file());
        assert!(dir.join("client/messages.rs").is_file());
        assert!(dir.join("webclient/protocol.ts").is_file());
    }

    #[tokio::test]
    async fn test_generate_respects_options() {
        let root = TempDir::new().unwrap();
        let service = service(&root);

        let session_id = service
            .generate(GenerateRequest {
                yaml: CHAT_YAML.to_string(),
                options: Some(GeneratorOptions {
                    include_server: false,
                    include_client: true,
                    include_webclient: true,
                    integrate_webclient: true,
                }),
            })
            .await
            .unwrap();
        let dir = root.path().join(session_id.to_string());

        assert!(!dir.join("server").exists());
        assert!(dir.join("client/protocol.ts").is_file());
        assert!(!dir.join("webclient").exists());
    }

    #[tokio::test]
    async fn test_invalid_protocol_creates_nothing() {
        let root = TempDir::new().unwrap();
        let service = service(&root);

        let result = service
            .generate(request("name: broken\nclient:\n  - fields: []\n"))
            .await;
        assert!(matches!(
            result,
            Err(ServiceError::Failed(Error::Schema(_)))
        ));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unwritable_session_root_is_internal_error() {
        let not_a_dir = tempfile::NamedTempFile::new().unwrap();
        let service = Arc::new(GenerationService::new(ServiceConfig::test_config(
            not_a_dir.path(),
        )));

        let err = service.generate(request(CHAT_YAML)).await.unwrap_err();

        assert!(matches!(err, ServiceError::Failed(Error::Io(_))));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(service.sessions.read().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_sessions_on_worker_threads() {
        let root = TempDir::new().unwrap();
        let service = service(&root);

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    let id = service
                        .generate(request(CHAT_YAML))
                        .await
                        .unwrap()
                        .to_string();
                    service.archive(&id, DEFAULT_TARGETS).await.unwrap()
                })
            })
            .collect();

        for task in tasks {
            let bytes = task.await.unwrap();
            let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
            assert_eq!(archive.len(), 7);
        }
        assert_eq!(service.sessions.read().await.len(), 4);
    }

    #[tokio::test]
    async fn test_tree_lists_directories_first() {
        let root = TempDir::new().unwrap();
        let service = service(&root);
        let session_id = service.generate(request(CHAT_YAML)).await.unwrap();

        let tree = service.session_tree(&session_id.to_string()).await.unwrap();
        let names: Vec<&str> = tree.iter().map(TreeEntry::name).collect();
        assert_eq!(
            names,
            vec!["client", "server", "webclient", "protocol.yaml"]
        );

        let TreeEntry::Directory { children, .. } = &tree[1] else {
            panic!("server should be a directory");
        };
        assert!(children.contains(&TreeEntry::File {
            name: "mod.rs".to_string(),
            path: "server/mod.rs".to_string(),
        }));
    }

    #[tokio::test]
    async fn test_read_file_and_traversal() {
        let root = TempDir::new().unwrap();
        let service = service(&root);
        let id = service
            .generate(request(CHAT_YAML))
            .await
            .unwrap()
            .to_string();

        let content = service.read_file(&id, "server/messages.rs").await.unwrap();
        assert!(content.contains("pub struct Join "));

        assert!(matches!(
            service.read_file(&id, "../../etc/passwd").await,
            Err(ServiceError::InvalidPath)
        ));
        assert!(matches!(
            service.read_file(&id, "server/missing.rs").await,
            Err(ServiceError::FileNotFound)
        ));
        assert!(matches!(
            service.read_file(&id, "server").await,
            Err(ServiceError::FileNotFound)
        ));
    }

    #[tokio::test]
    async fn test_unknown_sessions() {
        let root = TempDir::new().unwrap();
        let service = service(&root);

        for id in [Uuid::new_v4().to_string(), "not-a-uuid".to_string()] {
            assert!(matches!(
                service.session_tree(&id).await,
                Err(ServiceError::SessionNotFound)
            ));
        }
    }

    #[tokio::test]
    async fn test_archive_selected_targets() {
        let root = TempDir::new().unwrap();
        let service = service(&root);
        let id = service
            .generate(request(CHAT_YAML))
            .await
            .unwrap()
            .to_string();

        let bytes = service
            .archive(&id, "server, ../escape,,missing")
            .await
            .unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();

        assert_eq!(
            names,
            vec!["server/handlers.rs", "server/messages.rs", "server/mod.rs"]
        );
        assert!(archive.by_name("server/mod.rs").is_ok());
    }

    #[tokio::test]
    async fn test_routes_generate_and_browse() {
        let root = TempDir::new().unwrap();
        let routes = service(&root).routes();

        let res = warp::test::request()
            .method("POST")
            .path("/api/generate")
            .json(&json!({ "yaml": CHAT_YAML, "options": { "include_client": false } }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res.body());
        assert_eq!(body["success"], true);
        let id = body["sessionId"].as_str().unwrap().to_string();

        let res = warp::test::request()
            .path(&format!("/api/session/{id}"))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let files = body_json(res.body())["files"].clone();
        assert_eq!(files[0]["type"], "directory");
        assert_eq!(files[0]["name"], "server");

        let res = warp::test::request()
            .path(&format!("/api/session/{id}/file?path=protocol.yaml"))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res.body())["content"], CHAT_YAML);

        let res = warp::test::request()
            .path(&format!("/api/session/{id}/file?path=../secret"))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = warp::test::request()
            .path(&format!("/api/download/{id}"))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["content-type"], "application/zip");
    }

    #[tokio::test]
    async fn test_routes_report_failures() {
        let root = TempDir::new().unwrap();
        let routes = service(&root).routes();

        let res = warp::test::request()
            .method("POST")
            .path("/api/generate")
            .json(&json!({ "yaml": "name: bad\nevents:\n  - name: go\n    direction: sideways\n" }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(res.body());
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("sideways"));

        let res = warp::test::request()
            .path(&format!("/api/session/{}", Uuid::new_v4()))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = warp::test::request().path("/metrics").reply(&routes).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_json(res.body())["service"].is_object());
    }
}
