#![cfg(all(unix, feature = "cli"))]

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use nix::fcntl::OFlag;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tcumux::transport::Pty;

fn tcumux() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tcumux"));
    cmd.arg("--log-level").arg("error");
    cmd
}

fn open_terminal(path: &Path) -> File {
    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags((OFlag::O_NOCTTY | OFlag::O_NONBLOCK).bits())
        .open(path)
        .expect("terminal should open")
}

fn read_with_deadline(source: &mut impl Read, want: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 64];
    let deadline = Instant::now() + Duration::from_secs(5);
    while out.len() < want {
        assert!(Instant::now() < deadline, "timed out, got {out:?}");
        match source.read(&mut buf) {
            Ok(n) => out.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(e) => panic!("read failed: {e}"),
        }
    }
    out
}

/// Start `tcumux run` on `device` and wait for the registry it announces once
/// the link is open and locked.
fn spawn_run(device: &Path) -> (Child, serde_json::Value) {
    let mut child = tcumux()
        .arg("--format")
        .arg("json")
        .arg("run")
        .arg(device)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("run should start");

    let stdout = child.stdout.take().expect("stdout should be piped");
    let mut line = String::new();
    BufReader::new(stdout)
        .read_line(&mut line)
        .expect("registry line should be readable");
    let registry = serde_json::from_str(&line).expect("registry should be JSON");
    (child, registry)
}

fn console_path(registry: &serde_json::Value, name: &str) -> String {
    registry["consoles"]
        .as_array()
        .expect("consoles should be an array")
        .iter()
        .find(|row| row["name"] == name)
        .and_then(|row| row["path"].as_str())
        .expect("console should have a terminal")
        .to_string()
}

fn interrupt(child: &mut Child) -> std::process::ExitStatus {
    kill(Pid::from_raw(child.id() as i32), Signal::SIGINT).expect("SIGINT should be delivered");
    child.wait().expect("run should exit")
}

#[test]
fn tags_json_lists_every_console() {
    let output = tcumux()
        .arg("--format")
        .arg("json")
        .arg("tags")
        .output()
        .expect("tags should run");
    assert!(output.status.success());

    let rows: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("tags output should be JSON");
    let names: Vec<&str> = rows
        .as_array()
        .expect("tags output should be an array")
        .iter()
        .map(|row| row["name"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(names, vec!["SPE", "CCPLEX", "BPMP", "SCE", "TZ", "RCE"]);
    assert_eq!(rows[4]["tag"], "0xe4");
}

#[test]
fn run_rejects_unsupported_baud_rate() {
    let output = tcumux()
        .arg("run")
        .arg("/dev/null")
        .arg("--baud")
        .arg("9600")
        .output()
        .expect("run should start");
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unsupported baud rate"));
}

#[test]
fn run_missing_device_is_configuration_error() {
    let output = tcumux()
        .arg("run")
        .arg("/nonexistent/tcumux-device")
        .output()
        .expect("run should start");
    assert_eq!(output.status.code(), Some(78));
}

#[test]
fn reset_writes_exact_request() {
    let mut uart = Pty::open().expect("pty should open");

    let status = tcumux()
        .arg("reset")
        .arg(uart.peer_path())
        .status()
        .expect("reset should run");
    assert!(status.success());

    assert_eq!(read_with_deadline(&mut uart, 2), vec![0xff, 0xfd]);
}

#[test]
fn run_serves_consoles_in_both_directions() {
    let mut uart = Pty::open().expect("pty should open");
    let (mut child, registry) = spawn_run(uart.peer_path());
    let mut terminal = open_terminal(Path::new(&console_path(&registry, "CCPLEX")));

    uart.write_all(&[0xff, 0xe1, b'h', b'i']).unwrap();
    assert_eq!(read_with_deadline(&mut terminal, 2), b"hi");

    terminal.write_all(b"x").unwrap();
    assert_eq!(read_with_deadline(&mut uart, 3), vec![0xff, 0xe1, b'x']);

    assert!(interrupt(&mut child).success());
}

#[test]
fn second_instance_on_locked_device_is_busy() {
    let mut uart = Pty::open().expect("pty should open");
    let (mut child, registry) = spawn_run(uart.peer_path());

    let output = tcumux()
        .arg("reset")
        .arg(uart.peer_path())
        .output()
        .expect("reset should run");
    assert_eq!(output.status.code(), Some(69));
    assert!(String::from_utf8_lossy(&output.stderr).contains("locked by another process"));

    // The owner's line is untouched and keeps routing.
    let mut terminal = open_terminal(Path::new(&console_path(&registry, "BPMP")));
    uart.write_all(&[0xff, 0xe2, b'u', b'p']).unwrap();
    assert_eq!(read_with_deadline(&mut terminal, 2), b"up");

    assert!(interrupt(&mut child).success());
}

#[test]
fn device_can_be_reopened_after_orderly_shutdown() {
    let mut uart = Pty::open().expect("pty should open");
    let (mut child, _registry) = spawn_run(uart.peer_path());
    assert!(interrupt(&mut child).success());

    let status = tcumux()
        .arg("reset")
        .arg(uart.peer_path())
        .status()
        .expect("reset should run");
    assert!(status.success());
    assert_eq!(read_with_deadline(&mut uart, 2), vec![0xff, 0xfd]);
}
