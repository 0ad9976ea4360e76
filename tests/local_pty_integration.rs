//! Local pty integration tests.
//!
//! A real program runs on the slave side; the terminal reads what it
//! prints through the user-space line discipline.

#![cfg(unix)]

use std::time::Duration;

use portable_pty::CommandBuilder;
use pretty_assertions::assert_eq;
use ttyline::{BuiltinLookup, ReadStatus, TerminalBuilder};

const WAIT: Option<Duration> = Some(Duration::from_secs(5));

#[test]
fn test_program_output_arrives_once_and_untranslated() {
    let terminal = TerminalBuilder::new()
        .lookup(BuiltinLookup)
        .local_pty()
        .unwrap();
    assert!(terminal.backend().is_local_pty());

    let mut cmd = CommandBuilder::new("sh");
    cmd.args(["-c", "printf 'hi\\n'; sleep 1"]);
    let mut child = terminal.backend().spawn_command(cmd).unwrap();

    let mut got = Vec::new();
    while got.len() < 3 {
        match terminal.read(WAIT).unwrap() {
            ReadStatus::Byte(b) => got.push(b),
            other => panic!("expected program output, got {other:?}"),
        }
    }
    assert_eq!(got, b"hi\n");

    // Echo of the line must not loop back through the slave.
    let extra = terminal.read(Some(Duration::from_millis(300))).unwrap();
    assert!(
        matches!(extra, ReadStatus::Timeout | ReadStatus::Eof),
        "unexpected extra input: {extra:?}"
    );
    child.wait().unwrap();
    terminal.close().unwrap();
}

#[test]
fn test_terminal_writes_reach_the_program() {
    let terminal = TerminalBuilder::new()
        .lookup(BuiltinLookup)
        .local_pty()
        .unwrap();
    terminal.set_echo(false).unwrap();

    let mut cmd = CommandBuilder::new("head");
    cmd.args(["-c", "4"]);
    let mut child = terminal.backend().spawn_command(cmd).unwrap();
    terminal.write(b"ping").unwrap();
    terminal.flush().unwrap();

    let mut got = Vec::new();
    while got.len() < 4 {
        match terminal.read(WAIT).unwrap() {
            ReadStatus::Byte(b) => got.push(b),
            other => panic!("expected program output, got {other:?}"),
        }
    }
    assert_eq!(got, b"ping");
    child.wait().unwrap();
    terminal.close().unwrap();
}
