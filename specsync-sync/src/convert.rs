//! Conversion service adapters.
//!
//! The OpenAPI → collection conversion itself lives outside this crate. Both
//! adapters speak one JSON envelope:
//!
//! ```text
//! request:  {"input": {"type": "json", "data": <document>}, "options": {...}}
//! response: {"result": true, "output": [{"type": "collection", "data": {...}}]}
//!           {"result": false, "reason": "..."}
//! ```
//!
//! The option set is fixed; callers cannot tune it.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::io_err;
use crate::SyncError;

/// Recursion limit handed to the conversion service; the item-tree walk in
/// [`crate::summary`] uses the same bound.
pub const STACK_LIMIT: usize = 50;

const CONVERT_TIMEOUT: Duration = Duration::from_secs(120);

const WAIT_POLL: Duration = Duration::from_millis(25);

/// Output of a successful conversion: one artifact, in whatever envelope the
/// service chose (`{type, data}`, `{collection}` or bare).
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedArtifact(pub Value);

/// Turns a raw source document into a collection artifact.
pub trait Converter: Send {
    fn convert(&self, document: &Value) -> Result<ConvertedArtifact, SyncError>;
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOptions {
    pub folder_strategy: &'static str,
    pub request_parameters_resolution: &'static str,
    pub example_parameters_resolution: &'static str,
    pub optimize_conversion: bool,
    pub stack_limit: usize,
}

impl ConversionOptions {
    /// Tag-based folders, example-based parameters, no optimization.
    pub const FIXED: ConversionOptions = ConversionOptions {
        folder_strategy: "Tags",
        request_parameters_resolution: "Example",
        example_parameters_resolution: "Example",
        optimize_conversion: false,
        stack_limit: STACK_LIMIT,
    };
}

#[derive(Debug, Serialize)]
struct ConversionInput<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    data: &'a Value,
}

#[derive(Debug, Serialize)]
struct ConversionRequest<'a> {
    input: ConversionInput<'a>,
    options: &'a ConversionOptions,
}

#[derive(Debug, Deserialize)]
struct ConversionResult {
    result: bool,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    output: Vec<Value>,
}

fn request_body(document: &Value) -> Result<Vec<u8>, SyncError> {
    let request = ConversionRequest {
        input: ConversionInput {
            kind: "json",
            data: document,
        },
        options: &ConversionOptions::FIXED,
    };
    Ok(serde_json::to_vec(&request)?)
}

fn interpret(result: ConversionResult) -> Result<ConvertedArtifact, SyncError> {
    if !result.result {
        return Err(SyncError::Conversion(
            result
                .reason
                .unwrap_or_else(|| "unknown conversion error".to_string()),
        ));
    }
    let artifact = result
        .output
        .into_iter()
        .next()
        .ok_or_else(|| SyncError::Conversion("service returned no output".to_string()))?;
    Ok(ConvertedArtifact(artifact))
}

fn parse_result(bytes: &[u8]) -> Result<ConvertedArtifact, SyncError> {
    let result: ConversionResult = serde_json::from_slice(bytes)
        .map_err(|e| SyncError::Conversion(format!("unreadable conversion result: {e}")))?;
    interpret(result)
}

// ---------------------------------------------------------------------------
// CommandConverter
// ---------------------------------------------------------------------------

/// Runs a local program: request on stdin, result on stdout.
///
/// The child is killed when it has not exited within the timeout
/// (120s unless set with [`CommandConverter::with_timeout`]).
#[derive(Debug, Clone)]
pub struct CommandConverter {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandConverter {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: CONVERT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Poll the child until it exits or the deadline passes.
    fn wait_with_deadline(&self, child: &mut Child) -> Result<ExitStatus, SyncError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait().map_err(|e| io_err(&self.program, e))? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                if let Err(err) = child.kill() {
                    tracing::warn!("could not kill {}: {err}", self.program.display());
                }
                // Reap the killed child.
                let _ = child.wait();
                return Err(SyncError::Conversion(format!(
                    "{} timed out after {}s",
                    self.program.display(),
                    self.timeout.as_secs_f64()
                )));
            }
            std::thread::sleep(WAIT_POLL);
        }
    }
}

/// Drain a child pipe on its own thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            if let Err(err) = pipe.read_to_end(&mut buf) {
                tracing::warn!("reading converter output: {err}");
            }
            buf
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

impl Converter for CommandConverter {
    fn convert(&self, document: &Value) -> Result<ConvertedArtifact, SyncError> {
        tracing::info!("converting document with {}", self.program.display());
        let payload = request_body(document)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| io_err(&self.program, e))?;

        // stdin and both output pipes run on their own threads so neither
        // side can block on a full pipe.
        let writer = child.stdin.take().map(|mut stdin| {
            std::thread::spawn(move || stdin.write_all(&payload))
        });
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        // On timeout the pipe threads are left detached: a grandchild may
        // still hold the pipes open.
        let status = self.wait_with_deadline(&mut child)?;

        let written = match writer.map(JoinHandle::join) {
            Some(Ok(result)) => result,
            Some(Err(_)) => Err(std::io::Error::other("stdin writer panicked")),
            None => Ok(()),
        };
        let stdout = collect(stdout);
        let stderr = collect(stderr);

        if !status.success() {
            if let Err(err) = &written {
                tracing::warn!("writing request to {}: {err}", self.program.display());
            }
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(SyncError::Conversion(format!(
                "{} exited with {}: {}",
                self.program.display(),
                status,
                stderr.trim()
            )));
        }
        if let Err(err) = written {
            return Err(SyncError::Conversion(format!(
                "{} did not read the full request: {err}",
                self.program.display()
            )));
        }
        parse_result(&stdout)
    }
}

// ---------------------------------------------------------------------------
// HttpConverter
// ---------------------------------------------------------------------------

/// POSTs the request envelope to a conversion endpoint.
pub struct HttpConverter {
    agent: ureq::Agent,
    url: String,
}

impl HttpConverter {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(CONVERT_TIMEOUT).build(),
            url: url.into(),
        }
    }
}

impl Converter for HttpConverter {
    fn convert(&self, document: &Value) -> Result<ConvertedArtifact, SyncError> {
        tracing::info!("converting document via {}", self.url);
        let payload = request_body(document)?;
        let response = self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json")
            .send_bytes(&payload)
            .map_err(|err| match err {
                ureq::Error::Status(code, response) => SyncError::Conversion(format!(
                    "service answered HTTP {code}: {}",
                    response.into_string().unwrap_or_default()
                )),
                ureq::Error::Transport(t) => {
                    SyncError::Conversion(format!("service unreachable: {t}"))
                }
            })?;

        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| SyncError::Conversion(format!("reading result: {e}")))?;
        parse_result(&body)
    }
}
