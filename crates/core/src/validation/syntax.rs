use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

use log::debug;
use regex::Regex;

const LUAC: &str = "luac";
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Parse-only syntax check through an installed `luac`.
#[derive(Debug, Clone)]
pub struct LuacChecker {
    path: PathBuf,
    timeout: Duration,
}

impl LuacChecker {
    /// `None` when `luac` is not on `PATH`.
    pub fn locate(timeout: Duration) -> Option<Self> {
        let Some(path) = find_in_path(LUAC) else {
            debug!("{} not found on PATH, syntax check disabled", LUAC);
            return None;
        };
        debug!("using {} for syntax checks", path.display());
        Some(Self { path, timeout })
    }

    /// Checker bound to an explicit executable instead of a `PATH` lookup.
    pub(crate) fn with_path(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    /// Runs `luac -p -` over `code`.
    ///
    /// `Ok(None)` means the code parses, `Ok(Some(msg))` carries the
    /// normalized parser message. Spawn failures and timeouts are `Err`.
    /// The child is always reaped before this returns.
    pub fn check(&self, code: &str) -> io::Result<Option<String>> {
        let mut child = Command::new(&self.path)
            .arg("-p")
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let (Some(mut stdin), Some(mut stderr)) = (child.stdin.take(), child.stderr.take()) else {
            kill_and_reap(&mut child);
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "luac pipes not captured"));
        };
        let stderr_handle = thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf);
            buf
        });
        // Fed from its own thread so a child that stops reading still hits the timeout.
        let source = code.to_owned();
        let stdin_handle = thread::spawn(move || stdin.write_all(source.as_bytes()));

        let start = Instant::now();
        let waited = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Ok(status),
                Ok(None) if start.elapsed() >= self.timeout => {
                    break Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("luac did not finish within {:?}", self.timeout),
                    ));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => break Err(e),
            }
        };
        if waited.is_err() {
            kill_and_reap(&mut child);
        }

        let written = stdin_handle
            .join()
            .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::Other, "luac stdin writer panicked")));
        let stderr = stderr_handle.join().unwrap_or_default();
        let status = waited?;

        match written {
            // luac stops reading at the first parse error
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!("luac exited before reading the whole script")
            }
            Err(e) => return Err(e),
            Ok(()) => {}
        }

        if status.success() {
            Ok(None)
        } else {
            Ok(Some(normalize_message(&stderr)))
        }
    }
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn find_in_path(command: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .flat_map(|dir| [dir.join(command), dir.join(format!("{}.exe", command))])
        .find(|candidate| candidate.is_file())
}

fn source_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:luac:\s*)?(?:[^\s:]+\.lua|stdin):").expect("constant regex"))
}

/// Replaces the tool's source-name prefix with `<script>:`.
pub fn normalize_message(raw: &str) -> String {
    let first = raw.trim().lines().next().unwrap_or_default();
    source_prefix_re().replace(first, "<script>:").into_owned()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_stdin_prefix() {
        assert_eq!(
            normalize_message("luac: stdin:3: 'end' expected near <eof>\n"),
            "<script>:3: 'end' expected near <eof>"
        );
    }

    #[test]
    fn test_normalize_file_prefix() {
        assert_eq!(
            normalize_message("/tmp/tmpab12.lua:7: unexpected symbol near '+'"),
            "<script>:7: unexpected symbol near '+'"
        );
    }

    #[test]
    fn test_normalize_keeps_unknown_text() {
        assert_eq!(normalize_message("  something odd  "), "something odd");
        assert_eq!(normalize_message(""), "");
    }

    #[test]
    fn test_missing_tool_is_none() {
        assert!(find_in_path("definitely-not-a-real-lua-compiler-7f3a").is_none());
    }

    #[test]
    fn test_missing_binary_is_err() {
        let checker = LuacChecker::with_path("/nonexistent/bin/luac", Duration::from_secs(5));
        assert!(checker.check("return 1").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_early_exit_on_large_script_reports_message() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = stub::write_luac(dir.path(), "echo \"stdin:1: unexpected symbol near 'x'\" >&2\nexit 1");
        let checker = LuacChecker::with_path(path, Duration::from_secs(10));

        // Well past any pipe buffer, and the stub never reads it.
        let code = format!("x x\n{}", "local a = 1\n".repeat(20_000));
        let verdict = checker.check(&code).unwrap();
        assert_eq!(verdict.as_deref(), Some("<script>:1: unexpected symbol near 'x'"));
    }

    #[cfg(unix)]
    #[test]
    fn test_clean_exit_is_none() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = stub::write_luac(dir.path(), "cat > /dev/null\nexit 0");
        let checker = LuacChecker::with_path(path, Duration::from_secs(10));
        assert_eq!(checker.check("return 1\n").unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_hung_checker_times_out() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = stub::write_luac(dir.path(), "exec sleep 30");
        let checker = LuacChecker::with_path(path, Duration::from_millis(200));

        let start = Instant::now();
        let err = checker.check("return 1\n").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
