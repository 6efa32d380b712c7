use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, MutexGuard};

static SERIAL: Mutex<()> = Mutex::const_new(());
static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// Tests that write and execute scripts hold this for their whole run, so no
/// other test forks while a script is still open for writing.
pub async fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().await
}

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name)
}

/// A scratch directory unique to this process and call.
pub fn scratch_dir(label: &str) -> anyhow::Result<PathBuf> {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("nmapr-{label}-{}-{id}", std::process::id()));
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    Ok(dir)
}

/// Writes an executable shell script that stands in for the scanner.
#[cfg(unix)]
pub fn stub_scanner(dir: &Path, body: &str) -> anyhow::Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("nmap");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n"))
        .with_context(|| format!("writing {}", path.display()))?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

/// A stub that records its arguments to `args.txt` and prints `fixture` as its report.
#[cfg(unix)]
pub fn replaying_scanner(dir: &Path, fixture_name: &str, stderr: &str) -> anyhow::Result<PathBuf> {
    let body = format!(
        "printf '%s\\n' \"$@\" > '{}'\ncat '{}'\nprintf '%s' '{}' >&2",
        dir.join("args.txt").display(),
        fixture(fixture_name).display(),
        stderr,
    );
    stub_scanner(dir, &body)
}

pub fn recorded_args(dir: &Path) -> anyhow::Result<Vec<String>> {
    let raw = std::fs::read_to_string(dir.join("args.txt"))?;
    Ok(raw.lines().map(str::to_string).collect())
}

/// Binds a listener on 127.0.0.1:`port`, or returns `None` if the port is taken.
pub async fn listen_on(port: u16) -> Option<TcpListener> {
    TcpListener::bind(("127.0.0.1", port)).await.ok()
}

/// True when nothing accepts connections on 127.0.0.1:`port`.
pub async fn port_is_closed(port: u16) -> bool {
    tokio::net::TcpStream::connect(("127.0.0.1", port)).await.is_err()
}

pub fn nmap_available() -> bool {
    std::process::Command::new("nmap")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}
