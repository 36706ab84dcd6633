//! Tests for the shell
//!
//! These tests verify:
//! - Command parsing, including errors
//! - Command execution against a registry
//! - Scripted sessions end to end

use std::io::SeekFrom;

use scull::shell::{Command, Reply, Session};
use scull::{AccessMode, Config, DeviceNumber, DeviceRegistry, ScullError};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_session() -> Session {
    let config = Config::builder()
        .quantum(10)
        .qset(2)
        .nr_devs(2)
        .major(70)
        .build();
    Session::new(DeviceRegistry::new(config).unwrap())
}

fn run_script(session: &mut Session, script: &str) -> String {
    let mut output = Vec::new();
    session.run(script.as_bytes(), &mut output).unwrap();
    String::from_utf8(output).unwrap()
}

// =============================================================================
// Parsing Tests
// =============================================================================

#[test]
fn test_parse_open() {
    assert_eq!(
        Command::parse("open 1 wo").unwrap(),
        Command::Open {
            minor: 1,
            mode: AccessMode::WriteOnly
        }
    );
    assert_eq!(
        Command::parse("  OPEN 0 rw ").unwrap(),
        Command::Open {
            minor: 0,
            mode: AccessMode::ReadWrite
        }
    );
}

#[test]
fn test_parse_write_keeps_spaces() {
    assert_eq!(
        Command::parse("write 3 hello  world").unwrap(),
        Command::Write {
            fd: 3,
            data: b"hello  world".to_vec()
        }
    );
}

#[test]
fn test_parse_seek() {
    assert_eq!(
        Command::parse("seek 4 end -2").unwrap(),
        Command::Seek {
            fd: 4,
            target: SeekFrom::End(-2)
        }
    );
    assert_eq!(
        Command::parse("seek 4 set 15").unwrap(),
        Command::Seek {
            fd: 4,
            target: SeekFrom::Start(15)
        }
    );
}

#[test]
fn test_parse_stat_optional_minor() {
    assert_eq!(Command::parse("stat").unwrap(), Command::Stat { minor: None });
    assert_eq!(Command::parse("stat 1").unwrap(), Command::Stat { minor: Some(1) });
}

#[test]
fn test_parse_errors() {
    for line in [
        "",
        "frobnicate",
        "open",
        "open 1",
        "open 1 xx",
        "read 3",
        "read x 10",
        "seek 3 middle 0",
        "seek 3 set -1",
        "size 1 2",
    ] {
        assert!(
            matches!(Command::parse(line), Err(ScullError::Command(_))),
            "expected parse error for {:?}",
            line
        );
    }
}

// =============================================================================
// Execution Tests
// =============================================================================

#[test]
fn test_execute_open_write_read() {
    let mut session = setup_session();

    let reply = session
        .execute(Command::Open {
            minor: 1,
            mode: AccessMode::ReadWrite,
        })
        .unwrap();
    assert_eq!(
        reply,
        Reply::Opened {
            fd: 3,
            number: DeviceNumber::new(70, 1)
        }
    );

    let reply = session
        .execute(Command::Write {
            fd: 3,
            data: b"spans several quanta".to_vec(),
        })
        .unwrap();
    assert_eq!(reply, Reply::Written(20));

    session
        .execute(Command::Seek {
            fd: 3,
            target: SeekFrom::Start(15),
        })
        .unwrap();
    let reply = session.execute(Command::Read { fd: 3, len: 10 }).unwrap();
    assert_eq!(reply, Reply::Data(b"uanta".to_vec()));

    assert_eq!(session.execute(Command::Size { minor: 1 }).unwrap(), Reply::Size(20));
}

#[test]
fn test_execute_close_releases_fd() {
    let mut session = setup_session();
    session
        .execute(Command::Open {
            minor: 0,
            mode: AccessMode::ReadOnly,
        })
        .unwrap();
    assert_eq!(session.registry().node(0).unwrap().open_count(), 1);

    assert_eq!(session.execute(Command::Close { fd: 3 }).unwrap(), Reply::Closed);
    assert_eq!(session.registry().node(0).unwrap().open_count(), 0);
    assert_eq!(session.open_fds().count(), 0);

    let result = session.execute(Command::Close { fd: 3 });
    assert!(matches!(result, Err(ScullError::Command(_))));
}

#[test]
fn test_execute_trim_and_stat() {
    let mut session = setup_session();
    session.registry().device(0).unwrap().write(0, b"abc").unwrap();

    let reply = session.execute(Command::Stat { minor: Some(0) }).unwrap();
    match reply {
        Reply::Stats(lines) => {
            assert_eq!(lines.len(), 1);
            assert_eq!(lines[0].name, "scull0");
            assert_eq!(lines[0].stats.size, 3);
            assert_eq!(lines[0].stats.quanta, 1);
        }
        other => panic!("unexpected reply {:?}", other),
    }

    assert_eq!(session.execute(Command::Trim { minor: 0 }).unwrap(), Reply::Trimmed);
    assert_eq!(session.execute(Command::Size { minor: 0 }).unwrap(), Reply::Size(0));

    match session.execute(Command::Stat { minor: None }).unwrap() {
        Reply::Stats(lines) => assert_eq!(lines.len(), 2),
        other => panic!("unexpected reply {:?}", other),
    }
}

#[test]
fn test_execute_unknown_device_and_fd() {
    let mut session = setup_session();

    assert!(matches!(
        session.execute(Command::Size { minor: 9 }),
        Err(ScullError::NoSuchDevice(9))
    ));
    assert!(matches!(
        session.execute(Command::Read { fd: 42, len: 1 }),
        Err(ScullError::Command(_))
    ));
}

// =============================================================================
// Scripted Session Tests
// =============================================================================

#[test]
fn test_script_round_trip() {
    let mut session = setup_session();

    let output = run_script(
        &mut session,
        "# fill scull0\n\
         open 0 rw\n\
         write 3 ABCDE\n\
         seek 3 set 0\n\
         read 3 5\n\
         size 0\n\
         quit\n\
         size 0\n",
    );

    let lines: Vec<_> = output.lines().collect();
    assert_eq!(
        lines,
        vec![
            "fd 3 (70:0)",
            "wrote 5 bytes",
            "position 0",
            "5 bytes: \"ABCDE\"",
            "size 5",
            "bye"
        ]
    );
}

#[test]
fn test_script_reports_errors_and_continues() {
    let mut session = setup_session();

    let output = run_script(&mut session, "open 0 ro\nwrite 3 nope\nsize 0\n");

    let lines: Vec<_> = output.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("error: "));
    assert_eq!(lines[2], "size 0");
}

#[test]
fn test_script_write_only_open_truncates() {
    let mut session = setup_session();

    let output = run_script(
        &mut session,
        "open 1 rw\n\
         write 3 some old content\n\
         close 3\n\
         open 1 wo\n\
         size 1\n\
         open 1 ro\n\
         read 5 10\n",
    );

    let lines: Vec<_> = output.lines().collect();
    assert_eq!(lines[4], "size 0");
    assert_eq!(lines[6], "0 bytes: \"\"");
}
