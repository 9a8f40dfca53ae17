// Process-backed semantic scorer
// Long-running child speaking line-delimited JSON over stdin/stdout.
// reason: tokio for async process management, nix for signals
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use talentmatch_core::application::constants::GRACEFUL_SHUTDOWN_TIMEOUT_MS;
use talentmatch_core::config::ScorerSettings;
use talentmatch_core::port::{RawMatch, ScorerError, ScorerLauncher, SemanticScorer};

type StdoutLines = Lines<BufReader<ChildStdout>>;
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>;

/// Startup banner, e.g. `{"status":"ready"}`
#[derive(Debug, Deserialize)]
struct Banner {
    status: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    id: u64,
    op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cv_text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_descriptions: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct Reply {
    success: bool,
    #[serde(default)]
    matches: Option<Vec<RawMatch>>,
    #[serde(default)]
    error: Option<String>,
}

/// Spawns the configured scorer command
///
/// The child only sees allowlisted variables from the parent environment
/// plus `extra_env`.
pub struct ProcessScorerLauncher {
    settings: ScorerSettings,
    shutdown_timeout: Duration,
}

impl ProcessScorerLauncher {
    pub fn new(settings: ScorerSettings) -> Self {
        Self {
            settings,
            shutdown_timeout: Duration::from_millis(GRACEFUL_SHUTDOWN_TIMEOUT_MS),
        }
    }

    pub fn with_shutdown_timeout(mut self, shutdown_timeout: Duration) -> Self {
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    /// Keep allowlisted variables, then layer `extra_env` on top
    fn filter_env(&self, vars: impl IntoIterator<Item = (String, String)>) -> HashMap<String, String> {
        let mut env: HashMap<String, String> = vars
            .into_iter()
            .filter(|(k, _)| self.settings.env_allowlist.contains(k))
            .collect();
        env.extend(
            self.settings
                .extra_env
                .iter()
                .map(|var| (var.name.clone(), var.value.clone())),
        );
        env
    }

    fn build_command(&self) -> Command {
        let mut command = Command::new(&self.settings.command);
        command
            .args(&self.settings.args)
            .current_dir(&self.settings.working_dir)
            .env_clear()
            .envs(self.filter_env(std::env::vars()))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl ScorerLauncher for ProcessScorerLauncher {
    async fn launch(&self) -> Result<Arc<dyn SemanticScorer>, ScorerError> {
        info!(
            command = %self.settings.command,
            args = ?self.settings.args,
            working_dir = %self.settings.working_dir,
            "Spawning semantic scorer"
        );

        let mut child = self
            .build_command()
            .spawn()
            .map_err(|e| ScorerError::SpawnFailed(format!("{}: {}", self.settings.command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ScorerError::SpawnFailed("stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ScorerError::SpawnFailed("stdout not captured".to_string()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr));
        }

        let mut lines = BufReader::new(stdout).lines();
        wait_for_banner(&mut lines).await?;

        let client = ProcessScorerClient::start(child, stdin, lines, self.shutdown_timeout);
        if let Err(e) = client.ping().await {
            client.shutdown().await;
            return Err(ScorerError::StartupFailed(format!("liveness probe: {}", e)));
        }

        info!(pid = ?client.pid(), "Semantic scorer passed liveness probe");
        Ok(Arc::new(client))
    }
}

/// Read stdout until the ready banner. Anything that is not a banner is logged and skipped.
async fn wait_for_banner(lines: &mut StdoutLines) -> Result<(), ScorerError> {
    loop {
        let line = lines
            .next_line()
            .await
            .map_err(|e| ScorerError::Io(e.to_string()))?
            .ok_or_else(|| {
                ScorerError::StartupFailed("process exited before ready banner".to_string())
            })?;

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<Banner>(trimmed) {
            Ok(banner) if banner.status == "ready" => return Ok(()),
            Ok(banner) if banner.status == "error" => {
                return Err(ScorerError::StartupFailed(
                    banner
                        .error
                        .unwrap_or_else(|| "scorer reported an error".to_string()),
                ));
            }
            Ok(banner) => debug!(status = %banner.status, "Ignoring scorer status line"),
            Err(_) => debug!(line = %trimmed, "Ignoring scorer output before ready banner"),
        }
    }
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(target: "talentmatch::scorer", "{}", line);
    }
}

/// Lock that survives a panicked holder; the map stays usable either way
fn lock_pending(pending: &Mutex<HashMap<u64, oneshot::Sender<Value>>>) -> MutexGuard<'_, HashMap<u64, oneshot::Sender<Value>>> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Removes a pending entry when its caller stops waiting
struct PendingGuard<'a> {
    pending: &'a PendingMap,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock_pending(self.pending).remove(&self.id);
    }
}

/// Handle to a running scorer process.
///
/// A writer task owns stdin, a reader task owns stdout and routes replies
/// to callers by `id`. Replies nobody waits for any more are dropped.
pub struct ProcessScorerClient {
    next_id: AtomicU64,
    requests: mpsc::UnboundedSender<String>,
    pending: PendingMap,
    exited: watch::Receiver<bool>,
    child: tokio::sync::Mutex<Option<Child>>,
    pid: Option<u32>,
    shutdown_timeout: Duration,
}

impl ProcessScorerClient {
    fn start(child: Child, stdin: ChildStdin, lines: StdoutLines, shutdown_timeout: Duration) -> Self {
        let (requests, request_rx) = mpsc::unbounded_channel();
        let (exited_tx, exited) = watch::channel(false);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        tokio::spawn(write_requests(stdin, request_rx));
        tokio::spawn(route_replies(lines, Arc::clone(&pending), exited_tx));

        Self {
            next_id: AtomicU64::new(1),
            requests,
            pending,
            exited,
            pid: child.id(),
            child: tokio::sync::Mutex::new(Some(child)),
            shutdown_timeout,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    async fn ping(&self) -> Result<(), ScorerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let reply = self
            .call(
                id,
                &Request {
                    id,
                    op: "ping",
                    cv_text: None,
                    job_descriptions: None,
                    top_k: None,
                },
            )
            .await?;

        let reply: Reply = serde_json::from_value(reply)
            .map_err(|e| ScorerError::MalformedResponse(e.to_string()))?;
        if reply.success {
            Ok(())
        } else {
            Err(ScorerError::Rejected(
                reply.error.unwrap_or_else(|| "ping rejected".to_string()),
            ))
        }
    }

    async fn call(&self, id: u64, request: &Request<'_>) -> Result<Value, ScorerError> {
        if !self.is_alive() {
            return Err(ScorerError::ProcessExited("scorer is not running".to_string()));
        }

        let line = serde_json::to_string(request).map_err(|e| ScorerError::Io(e.to_string()))?;
        let (tx, rx) = oneshot::channel();
        lock_pending(&self.pending).insert(id, tx);
        let _guard = PendingGuard {
            pending: &self.pending,
            id,
        };

        // The reader marks exit before draining the map
        if !self.is_alive() {
            return Err(ScorerError::ProcessExited("scorer is not running".to_string()));
        }

        self.requests
            .send(line)
            .map_err(|_| ScorerError::ProcessExited("stdin closed".to_string()))?;

        rx.await
            .map_err(|_| ScorerError::ProcessExited("stdout closed".to_string()))
    }
}

async fn write_requests(mut stdin: ChildStdin, mut rx: mpsc::UnboundedReceiver<String>) {
    while let Some(line) = rx.recv().await {
        let written = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await
        }
        .await;

        if let Err(e) = written {
            warn!(error = %e, "Failed to write to semantic scorer");
            break;
        }
    }
}

async fn route_replies(mut lines: StdoutLines, pending: PendingMap, exited: watch::Sender<bool>) {
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let value: Value = match serde_json::from_str(line.trim()) {
                    Ok(value) => value,
                    Err(_) => {
                        debug!(line = %line, "Ignoring non-JSON scorer output");
                        continue;
                    }
                };
                let Some(id) = value.get("id").and_then(Value::as_u64) else {
                    debug!(line = %line, "Ignoring scorer output without id");
                    continue;
                };
                match lock_pending(&pending).remove(&id) {
                    Some(tx) => {
                        let _ = tx.send(value);
                    }
                    None => debug!(id, "Discarding reply nobody is waiting for"),
                }
            }
            Ok(None) => {
                info!("Semantic scorer closed its output");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read from semantic scorer");
                break;
            }
        }
    }

    exited.send_replace(true);
    // Dropping the senders fails every waiting call with ProcessExited
    lock_pending(&pending).clear();
}

/// SIGTERM, then SIGKILL once `grace` elapses
async fn terminate(child: &mut Child, grace: Duration) {
    if let Ok(Some(status)) = child.try_wait() {
        debug!(status = %status, "Semantic scorer already exited, reaped");
        return;
    }

    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            info!(pid = %pid, "Sending SIGTERM to semantic scorer");
            if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                warn!(pid = %pid, error = %e, "SIGTERM failed");
            }

            match timeout(grace, child.wait()).await {
                Ok(Ok(status)) => {
                    info!(pid = %pid, status = %status, "Semantic scorer exited");
                    return;
                }
                Ok(Err(e)) => warn!(pid = %pid, error = %e, "Failed to wait for semantic scorer"),
                Err(_) => warn!(pid = %pid, "Semantic scorer ignored SIGTERM, sending SIGKILL"),
            }
        }
    }

    if let Err(e) = child.kill().await {
        warn!(error = %e, "Failed to kill semantic scorer");
    }
}

#[async_trait]
impl SemanticScorer for ProcessScorerClient {
    async fn score(
        &self,
        resume_text: &str,
        job_descriptions: &[String],
        top_k: usize,
    ) -> Result<Vec<RawMatch>, ScorerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = Request {
            id,
            op: "match",
            cv_text: Some(resume_text),
            job_descriptions: Some(job_descriptions),
            top_k: Some(top_k),
        };
        debug!(id, jobs = job_descriptions.len(), top_k, "Sending match request");

        let reply = self.call(id, &request).await?;
        let reply: Reply = serde_json::from_value(reply)
            .map_err(|e| ScorerError::MalformedResponse(e.to_string()))?;

        if !reply.success {
            return Err(ScorerError::Rejected(
                reply
                    .error
                    .unwrap_or_else(|| "unspecified error".to_string()),
            ));
        }
        reply
            .matches
            .ok_or_else(|| ScorerError::MalformedResponse("missing 'matches'".to_string()))
    }

    fn is_alive(&self) -> bool {
        !*self.exited.borrow()
    }

    async fn closed(&self) {
        let mut exited = self.exited.clone();
        let _ = exited.wait_for(|exited| *exited).await;
    }

    async fn shutdown(&self) {
        let child = self.child.lock().await.take();
        if let Some(mut child) = child {
            terminate(&mut child, self.shutdown_timeout).await;
        }
    }
}
