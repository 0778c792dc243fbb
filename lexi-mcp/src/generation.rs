//! Running the external text generator.
//!
//! The generator is any program that reads a prompt on stdin and writes its
//! answer to stdout, `ollama run <model>` by default. Each call starts a fresh
//! process with a hard deadline. On unix the child leads its own process
//! group, and the whole group is killed when the deadline passes or when the
//! caller drops the future, so wrapper scripts cannot leave helpers behind.

use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("failed to start generator: {0}")]
    Spawn(#[source] io::Error),

    #[error("generator I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("generator exited with {status}: {stderr}")]
    GenerationFailed { status: String, stderr: String },

    #[error("generator timed out after {timeout:?}")]
    GenerationTimeout { timeout: Duration },
}

/// Produces text from a prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, GenerationError>;
}

/// A [`Generator`] backed by a subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
}

impl CommandGenerator {
    pub fn new<S: Into<String>>(program: S, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Splits `[program, args...]`. Returns `None` for an empty command.
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

async fn read_all<R: tokio::io::AsyncRead + Unpin>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}

fn joined<T>(result: Result<io::Result<T>, tokio::task::JoinError>) -> io::Result<T> {
    result.map_err(io::Error::other)?
}

/// Kills the child's process group when dropped, unless released first.
struct ProcessGroup {
    #[cfg(unix)]
    leader: Option<nix::unistd::Pid>,
}

impl ProcessGroup {
    #[cfg(unix)]
    fn of(child: &tokio::process::Child) -> Self {
        Self {
            leader: child
                .id()
                .and_then(|id| i32::try_from(id).ok())
                .map(nix::unistd::Pid::from_raw),
        }
    }

    #[cfg(not(unix))]
    fn of(_child: &tokio::process::Child) -> Self {
        Self {}
    }

    #[cfg(unix)]
    fn kill(&mut self) {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, killpg};

        if let Some(leader) = self.leader.take() {
            match killpg(leader, Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => tracing::warn!("Failed to kill generator process group {}: {}", leader, e),
            }
        }
    }

    #[cfg(not(unix))]
    fn kill(&mut self) {}

    /// The child exited and its output pipes closed; nothing is left to kill.
    fn release(&mut self) {
        #[cfg(unix)]
        {
            self.leader = None;
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

#[async_trait]
impl Generator for CommandGenerator {
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, GenerationError> {
        tracing::debug!("Starting generator `{}`", self.display());

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(GenerationError::Spawn)?;
        let mut group = ProcessGroup::of(&child);

        let (Some(mut stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(io::Error::other("generator pipes were not captured").into());
        };

        let input = prompt.as_bytes().to_vec();
        let writer = tokio::spawn(async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await
        });
        let stdout_reader = tokio::spawn(read_all(stdout));
        let stderr_reader = tokio::spawn(read_all(stderr));
        let abort_handles = [
            writer.abort_handle(),
            stdout_reader.abort_handle(),
            stderr_reader.abort_handle(),
        ];

        let run = async {
            let status = child.wait().await?;
            let out = joined(stdout_reader.await)?;
            let err = joined(stderr_reader.await)?;
            Ok::<_, io::Error>((status, out, err))
        };

        let (status, out, err) = match tokio::time::timeout(timeout, run).await {
            Ok(result) => {
                let finished = result?;
                group.release();
                finished
            }
            Err(_) => {
                tracing::error!(
                    "Generator `{}` exceeded its {:?} budget; killing it",
                    self.display(),
                    timeout
                );
                group.kill();
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to kill generator: {}", e);
                }
                abort_handles.iter().for_each(|h| h.abort());
                return Err(GenerationError::GenerationTimeout { timeout });
            }
        };

        match joined(writer.await) {
            Ok(()) => {}
            // The child may exit without draining its input.
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                tracing::debug!("Generator closed stdin early");
            }
            Err(e) => return Err(e.into()),
        }

        if !status.success() {
            let stderr = String::from_utf8_lossy(&err).trim().to_string();
            tracing::error!("Generator exited with {}: {}", status, stderr);
            return Err(GenerationError::GenerationFailed {
                status: status.to_string(),
                stderr,
            });
        }

        let answer = String::from_utf8_lossy(&out).trim().to_string();
        tracing::debug!("Generator returned {} chars", answer.chars().count());
        Ok(answer)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Instant;
    use tempfile::tempdir;

    fn sh(script: &str) -> CommandGenerator {
        CommandGenerator::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    /// A shell that records its own pid and that of a background helper,
    /// then waits on the helper.
    fn with_helper(pid_file: &Path) -> CommandGenerator {
        let file = pid_file.display();
        sh(&format!(
            "echo $$ >> '{file}'; sleep 45 & echo $! >> '{file}'; wait"
        ))
    }

    fn recorded_pids(pid_file: &Path) -> Vec<i32> {
        std::fs::read_to_string(pid_file)
            .unwrap_or_default()
            .lines()
            .filter_map(|line| line.trim().parse().ok())
            .collect()
    }

    /// Zombies count as gone: they are dead but may wait on a reaper.
    #[cfg(target_os = "linux")]
    fn is_running(pid: i32) -> bool {
        std::fs::read_to_string(format!("/proc/{pid}/stat"))
            .ok()
            .and_then(|stat| {
                let (_, rest) = stat.rsplit_once(')')?;
                rest.trim_start().chars().next()
            })
            .is_some_and(|state| state != 'Z' && state != 'X')
    }

    #[cfg(target_os = "linux")]
    async fn all_exit(pids: &[i32]) -> bool {
        for _ in 0..150 {
            if !pids.iter().any(|&pid| is_running(pid)) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_prompt_goes_to_stdin_and_output_is_trimmed() {
        let generator = sh("printf '  '; tr a-z A-Z; printf '\\n\\n'");
        let out = generator
            .generate("define torque", Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(out, "DEFINE TORQUE");
    }

    #[tokio::test]
    async fn test_utf8_prompt_round_trips() {
        let out = sh("cat")
            .generate("ΔG = ΔH − TΔS", Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(out, "ΔG = ΔH − TΔS");
    }

    #[tokio::test]
    async fn test_non_zero_exit_carries_stderr() {
        let err = sh("cat > /dev/null; echo 'model not found' >&2; exit 3")
            .generate("prompt", Duration::from_secs(10))
            .await
            .unwrap_err();

        match err {
            GenerationError::GenerationFailed { stderr, .. } => {
                assert_eq!(stderr, "model not found")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exit_without_reading_stdin() {
        let err = sh("exit 1")
            .generate(&"x".repeat(1 << 20), Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::GenerationFailed { .. }));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let started = Instant::now();
        let err = sh("exec sleep 30")
            .generate("prompt", Duration::from_millis(200))
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::GenerationTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_timeout_kills_helper_processes() {
        let dir = tempdir().unwrap();
        let pid_file = dir.path().join("pids");

        let err = with_helper(&pid_file)
            .generate("prompt", Duration::from_millis(500))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::GenerationTimeout { .. }));

        let pids = recorded_pids(&pid_file);
        assert_eq!(pids.len(), 2);
        assert!(all_exit(&pids).await, "processes {pids:?} outlived the timeout");
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_dropping_the_call_kills_the_generator() {
        let dir = tempdir().unwrap();
        let pid_file = dir.path().join("pids");
        let generator = with_helper(&pid_file);

        let call = tokio::spawn(async move {
            generator.generate("prompt", Duration::from_secs(60)).await
        });
        for _ in 0..250 {
            if recorded_pids(&pid_file).len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let pids = recorded_pids(&pid_file);
        assert_eq!(pids.len(), 2);
        assert!(pids.iter().all(|&pid| is_running(pid)));

        call.abort();
        assert!(call.await.unwrap_err().is_cancelled());
        assert!(all_exit(&pids).await, "processes {pids:?} outlived the caller");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_calls_run_in_parallel() {
        let generator = sh("cat > /dev/null; sleep 1; echo done");
        let started = Instant::now();

        let (a, b) = tokio::join!(
            generator.generate("first", Duration::from_secs(10)),
            generator.generate("second", Duration::from_secs(10))
        );

        assert_eq!(a.unwrap(), "done");
        assert_eq!(b.unwrap(), "done");
        assert!(started.elapsed() < Duration::from_millis(1800));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let err = CommandGenerator::new("/nonexistent/lexi-generator", vec![])
            .generate("prompt", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Spawn(_)));
    }

    #[test]
    fn test_from_command() {
        let command = vec!["ollama".to_string(), "run".to_string(), "mistral:7b-instruct".to_string()];
        let generator = CommandGenerator::from_command(&command).unwrap();
        assert_eq!(generator.program(), "ollama");
        assert_eq!(generator.display(), "ollama run mistral:7b-instruct");
        assert!(CommandGenerator::from_command(&[]).is_none());
    }
}
