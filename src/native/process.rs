use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::resource::{Resource, setrlimit};
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::constants::READER_GRACE_MS;
use crate::core::{errors::SandboxError, language::Invocation};

const CHUNK_SIZE: usize = 8192;

/// Exit code reported when the process had to be killed.
pub const TIMED_OUT_EXIT_CODE: i32 = -1;

#[derive(Clone, Copy, Debug)]
pub struct ProcessRequest<'a> {
    pub invocation: &'a Invocation,
    pub cwd: &'a Path,
    /// `None` connects stdin to `/dev/null`.
    pub stdin: Option<&'a str>,
    pub timeout: Duration,
    pub max_output_bytes: usize,
    pub memory_limit_bytes: Option<u64>,
}

#[derive(Debug)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the deadline passed and the process was killed.
    pub status: Option<ExitStatus>,
    pub wall_time: Duration,
}

impl ProcessOutput {
    pub fn timed_out(&self) -> bool {
        self.status.is_none()
    }

    pub fn success(&self) -> bool {
        self.status.is_some_and(|status| status.success())
    }

    pub fn signal(&self) -> Option<i32> {
        self.status.and_then(|status| status.signal())
    }

    /// Death by signal maps to `128 + signal`, like a shell reports it.
    pub fn exit_code(&self) -> i32 {
        match self.status {
            None => TIMED_OUT_EXIT_CODE,
            Some(status) => status
                .code()
                .or_else(|| status.signal().map(|signal| 128 + signal))
                .unwrap_or(TIMED_OUT_EXIT_CODE),
        }
    }

    pub fn wall_time_ms(&self) -> u64 {
        u64::try_from(self.wall_time.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Runs a command in its own process group with a wall-clock deadline.
///
/// Both output streams are read concurrently with the wait. Bytes past
/// `max_output_bytes` are discarded, but the pipes keep being drained so the
/// child never blocks on a full pipe. Once the leader is gone the whole
/// group is killed, so background children cannot outlive the call.
pub async fn run(request: ProcessRequest<'_>) -> Result<ProcessOutput, SandboxError> {
    let program = request.invocation.program_name();

    let mut command = Command::new(&request.invocation.program);
    command
        .args(&request.invocation.args)
        .current_dir(request.cwd)
        .stdin(if request.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true);

    if let Some(limit) = request.memory_limit_bytes {
        // SAFETY: only async-signal-safe setrlimit calls run between fork and exec.
        unsafe {
            command.pre_exec(move || {
                setrlimit(Resource::RLIMIT_AS, limit, limit)?;
                setrlimit(Resource::RLIMIT_CORE, 0, 0)?;
                Ok(())
            });
        }
    }

    let started = Instant::now();
    let mut child = command.spawn().map_err(|source| SandboxError::Spawn {
        program: program.clone(),
        source,
    })?;
    let group = child
        .id()
        .and_then(|pid| i32::try_from(pid).ok())
        .map(Pid::from_raw);
    tracing::debug!("Spawned `{}` (pid {:?})", program, group);

    let writer = match (child.stdin.take(), request.stdin) {
        (Some(pipe), Some(input)) => Some(tokio::spawn(feed(pipe, input.to_owned()))),
        _ => None,
    };

    let (stop_tx, stop_rx) = watch::channel(false);
    let stdout = child
        .stdout
        .take()
        .map(|pipe| tokio::spawn(capture(pipe, request.max_output_bytes, stop_rx.clone())));
    let stderr = child
        .stderr
        .take()
        .map(|pipe| tokio::spawn(capture(pipe, request.max_output_bytes, stop_rx)));

    let waited = tokio::time::timeout_at(started + request.timeout, child.wait()).await;
    let wall_time = started.elapsed();
    kill_group(group);

    let status = match waited {
        Ok(Ok(status)) => Some(status),
        Ok(Err(source)) => return Err(SandboxError::Wait { program, source }),
        Err(_) => {
            tracing::debug!("`{}` exceeded {:?}, killed", program, request.timeout);
            if let Err(e) = child.start_kill() {
                tracing::debug!("Leader already gone: {}", e);
            }
            child
                .wait()
                .await
                .map_err(|source| SandboxError::Wait {
                    program: program.clone(),
                    source,
                })?;
            None
        }
    };

    let readers = async { tokio::join!(collect(stdout), collect(stderr)) };
    tokio::pin!(readers);
    let (stdout, stderr) =
        match tokio::time::timeout(Duration::from_millis(READER_GRACE_MS), &mut readers).await {
            Ok(streams) => streams,
            Err(_) => {
                tracing::warn!("Output of `{}` still open after exit, closing", program);
                let _ = stop_tx.send(true);
                readers.await
            }
        };

    if let Some(writer) = writer {
        writer.abort();
    }

    Ok(ProcessOutput {
        stdout,
        stderr,
        status,
        wall_time,
    })
}

fn kill_group(group: Option<Pid>) {
    let Some(group) = group else {
        return;
    };
    match killpg(group, Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!("Failed to kill process group {}: {}", group, e),
    }
}

async fn feed(mut pipe: tokio::process::ChildStdin, input: String) {
    match pipe.write_all(input.as_bytes()).await {
        Ok(()) => {}
        // the program exited without reading all of its input
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
        Err(e) => tracing::debug!("Failed to write stdin: {}", e),
    }
}

async fn capture<R>(mut pipe: R, cap: usize, mut stop: watch::Receiver<bool>) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    let mut captured = Vec::new();
    let mut chunk = vec![0u8; CHUNK_SIZE];

    loop {
        tokio::select! {
            read = pipe.read(&mut chunk) => match read {
                Ok(0) => break,
                Ok(n) => {
                    let room = cap.saturating_sub(captured.len());
                    captured.extend_from_slice(&chunk[..n.min(room)]);
                }
                Err(e) => {
                    tracing::debug!("Output pipe failed: {}", e);
                    break;
                }
            },
            _ = stop.wait_for(|stop| *stop) => break,
        }
    }

    captured
}

async fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    match reader {
        Some(reader) => reader.await.unwrap_or_default(),
        None => Vec::new(),
    }
}
