//! Integration tests for scull
//!
//! End-to-end scenarios through the registry: several handles, several
//! threads, and the lifecycle of a device from first write to truncation.

use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use scull::{AccessMode, Config, DeviceRegistry, ScullError, Signal};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_registry(nr_devs: u32) -> Arc<DeviceRegistry> {
    let config = Config::builder()
        .quantum(16)
        .qset(4)
        .nr_devs(nr_devs)
        .major(100)
        .build();
    Arc::new(DeviceRegistry::new(config).unwrap())
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_device_lifecycle() {
    let registry = setup_registry(1);

    // Writer fills 200 bytes across several sets
    let payload: Vec<u8> = (0..200u32).map(|i| (i % 251) as u8).collect();
    {
        let mut file = registry.open(0, AccessMode::WriteOnly).unwrap();
        file.write_all(&payload).unwrap();
    }
    assert_eq!(registry.device(0).unwrap().size(), 200);
    assert_eq!(registry.node(0).unwrap().open_count(), 0);

    // Reader sees it all
    {
        let mut file = registry.open(0, AccessMode::ReadOnly).unwrap();
        let mut back = Vec::new();
        file.read_to_end(&mut back).unwrap();
        assert_eq!(back, payload);
    }

    // Sparse write far out leaves a hole behind
    {
        let mut file = registry.open(0, AccessMode::ReadWrite).unwrap();
        file.seek(SeekFrom::Start(1_000)).unwrap();
        file.write_all(b"far").unwrap();
        assert_eq!(file.device().size(), 1_003);

        file.seek(SeekFrom::Start(500)).unwrap();
        assert!(file.read_chunk(16).unwrap().is_empty());
    }

    // Write-only reopen truncates
    let file = registry.open(0, AccessMode::WriteOnly).unwrap();
    assert_eq!(file.device().size(), 0);
    assert_eq!(file.device().stats().sets, 0);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_handles_on_many_devices_in_parallel() {
    let registry = setup_registry(4);

    let workers: Vec<_> = (0..4u32)
        .map(|minor| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let mut file = registry.open(minor, AccessMode::ReadWrite).unwrap();
                let data = vec![minor as u8 + 1; 300];
                file.write_all(&data).unwrap();
                file.seek(SeekFrom::Start(0)).unwrap();

                let mut back = Vec::new();
                file.read_to_end(&mut back).unwrap();
                assert_eq!(back, data);
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    for node in registry.iter() {
        assert_eq!(node.device().size(), 300);
        assert_eq!(node.open_count(), 0);
    }
}

#[test]
fn test_signal_interrupts_blocked_handle() {
    let registry = setup_registry(1);
    registry.device(0).unwrap().write(0, b"stable").unwrap();

    let signal = Signal::new();
    let mut file = registry
        .open_with_signal(0, AccessMode::ReadWrite, signal.clone())
        .unwrap();

    let guard = registry.device(0).unwrap().lock();
    let raiser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(40));
        signal.raise();
    });

    let result = file.write_chunk(b"XXXXXX");
    raiser.join().unwrap();
    drop(guard);

    assert!(matches!(result, Err(ScullError::Interrupted)));
    assert_eq!(file.position(), 0);
    assert_eq!(registry.device(0).unwrap().read(0, 6).unwrap(), b"stable");

    // Once acknowledged, the handle works again
    file.signal().clear();
    assert_eq!(file.write_chunk(b"fresh!").unwrap(), 6);
}
