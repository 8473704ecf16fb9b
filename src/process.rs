use std::{
    io::{self, Read},
    process::{Child, Command, ExitStatus, Stdio},
    sync::{Arc, Mutex},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// How long a drain may trail the child's exit or kill before its buffer is
/// taken as-is.
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Result of a child process run under a wall-clock limit.
#[derive(Clone, Debug)]
pub struct BoundedOutput {
    /// `None` when the child was killed at the deadline.
    pub status: Option<ExitStatus>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl BoundedOutput {
    pub fn timed_out(&self) -> bool {
        self.status.is_none()
    }

    pub fn success(&self) -> bool {
        self.status.is_some_and(|s| s.success())
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.status.and_then(|s| s.code())
    }
}

type SharedBuf = Arc<Mutex<Vec<u8>>>;

struct Drain {
    buf: SharedBuf,
    handle: Option<JoinHandle<()>>,
}

impl Drain {
    fn spawn(reader: Option<impl Read + Send + 'static>) -> Self {
        let buf: SharedBuf = Arc::default();
        let handle = reader.map(|mut reader| {
            let sink = Arc::clone(&buf);
            thread::spawn(move || {
                let mut chunk = [0u8; 8192];
                loop {
                    match reader.read(&mut chunk) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => lock(&sink).extend_from_slice(&chunk[..n]),
                    }
                }
            })
        });
        Self { buf, handle }
    }

    /// Wait for EOF until `deadline`, then hand back everything read. A
    /// grandchild still holding the pipe open does not extend the wait.
    fn finish_by(mut self, deadline: Instant) -> String {
        if let Some(handle) = self.handle.take() {
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(POLL_INTERVAL.min(deadline.saturating_duration_since(Instant::now())));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                tracing::debug!("output pipe still open after child exit, not waiting for EOF");
            }
        }
        self.snapshot()
    }

    /// Whatever has been read so far. The reader thread is left to run
    /// until the pipe closes.
    fn snapshot(&self) -> String {
        String::from_utf8_lossy(&lock(&self.buf)).into_owned()
    }
}

fn lock(buf: &SharedBuf) -> std::sync::MutexGuard<'_, Vec<u8>> {
    buf.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Run `cmd` to completion or until `timeout` elapses, capturing stdout and
/// stderr separately.
///
/// On timeout the child is killed and reaped. Either way, output is collected
/// until EOF or `timeout` (plus a short grace after the child is gone),
/// whichever comes first, so grandchildren holding the pipes open never keep
/// the caller waiting.
pub fn run_bounded(cmd: &mut Command, timeout: Duration) -> io::Result<BoundedOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let started = Instant::now();
    let mut child = cmd.spawn()?;
    let stdout = Drain::spawn(child.stdout.take());
    let stderr = Drain::spawn(child.stderr.take());

    let deadline = started + timeout;
    let status = match wait_until(&mut child, deadline)? {
        Some(status) => Some(status),
        None => {
            tracing::debug!(?timeout, "deadline reached, killing child");
            // the child may have exited between the last poll and now
            let _ = child.kill();
            child.wait()?;
            None
        }
    };

    let drain_deadline = deadline.max(Instant::now() + DRAIN_GRACE);
    Ok(BoundedOutput {
        status,
        stdout: stdout.finish_by(drain_deadline),
        stderr: stderr.finish_by(drain_deadline),
        elapsed: started.elapsed(),
    })
}

fn wait_until(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

/// Render `cmd` as a single shell-like line for logs.
pub fn command_line(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", script]);
        cmd
    }

    #[test]
    fn captures_streams_separately() {
        let out = run_bounded(
            &mut sh("echo out; echo err 1>&2; exit 3"),
            Duration::from_secs(10),
        )
        .unwrap();
        assert!(!out.timed_out());
        assert!(!out.success());
        assert_eq!(out.exit_code(), Some(3));
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
    }

    #[test]
    fn kills_child_at_deadline() {
        let out = run_bounded(&mut sh("echo started; exec sleep 30"), Duration::from_millis(300))
            .unwrap();
        assert!(out.timed_out());
        assert_eq!(out.exit_code(), None);
        assert!(out.elapsed < Duration::from_secs(10));
    }

    #[test]
    fn background_grandchild_does_not_extend_wait() {
        let out = run_bounded(&mut sh("sleep 6 & echo done"), Duration::from_millis(500)).unwrap();
        assert!(!out.timed_out());
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "done");
        assert!(out.elapsed < Duration::from_secs(2), "took {:?}", out.elapsed);
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let err = run_bounded(
            &mut Command::new("scenebuild-definitely-not-installed"),
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn command_line_joins_program_and_args() {
        let mut cmd = Command::new("manim");
        cmd.args(["-qh", "-o", "out", "scene.py", "Demo"]);
        assert_eq!(command_line(&cmd), "manim -qh -o out scene.py Demo");
    }
}
