mod common;

use common::{test_config, write_textured, TempDir};
use nexus_scan::{ScanEvent, ScanOutcome, Scanner};

#[test]
fn spawned_scan_streams_events_until_done() {
    let work = TempDir::new("spawn-src");
    let source = work.join("source.png");
    write_textured(&source, 42);
    let dir = TempDir::new("spawn");
    write_textured(&dir.join("a.png"), 42);
    write_textured(&dir.join("b.png"), 43);
    write_textured(&dir.join("c.png"), 44);

    let handle = Scanner::new(test_config()).unwrap().spawn(source, dir.path().to_path_buf());
    let events: Vec<ScanEvent> = handle.events().iter().collect();
    let outcome = handle.join().unwrap();

    let progress: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::Progress(p) => Some(p.index),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![1, 2, 3]);
    assert!(events.iter().any(|e| matches!(e, ScanEvent::Match(m) if m.path.ends_with("a.png"))));

    match events.last() {
        Some(ScanEvent::Completed(summary)) => assert_eq!(outcome, ScanOutcome::Completed(*summary)),
        other => panic!("expected completion, got {:?}", other),
    }
}

#[test]
fn spawned_scan_can_be_cancelled() {
    let work = TempDir::new("spawn-cancel-src");
    let source = work.join("source.png");
    write_textured(&source, 8);
    let dir = TempDir::new("spawn-cancel");
    for i in 0..6 {
        write_textured(&dir.join(&format!("img{}.png", i)), 200 + i);
    }

    let scanner = Scanner::new(test_config()).unwrap();
    let handle = scanner.spawn(source, dir.path().to_path_buf());

    // Stop as soon as the first candidate has been reported
    let mut events = Vec::new();
    for event in handle.events().iter() {
        if matches!(event, ScanEvent::Progress(_)) && events.is_empty() {
            handle.cancel();
        }
        events.push(event);
    }
    let outcome = handle.join().unwrap();

    let last = events.last().cloned();
    match (last, outcome) {
        (Some(ScanEvent::Cancelled(summary)), ScanOutcome::Cancelled(reported)) => {
            assert_eq!(summary, reported);
            assert!(summary.processed() < 6);
        }
        // The worker may finish the last candidates before it sees the flag
        (Some(ScanEvent::Completed(_)), ScanOutcome::Completed(_)) => {}
        other => panic!("unexpected end of scan: {:?}", other),
    }
}

#[test]
fn spawned_scan_reports_errors_on_join() {
    let work = TempDir::new("spawn-error");
    let handle = Scanner::new(test_config())
        .unwrap()
        .spawn(work.join("missing.png"), work.path().to_path_buf());
    assert_eq!(handle.events().iter().count(), 0);
    assert!(handle.join().is_err());
}
