//! End-to-end renderer behavior through the in-memory backend.
//!
//! Each test drives the public API only and inspects the bytes that reached
//! the "terminal" or the cells reported by the renderer.

use gridcast_terminal::{
    strip_escapes, ColorMode, MemoryBackend, RenderError, Renderer, RendererConfig,
    TerminalBackend,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn config() -> RendererConfig {
    RendererConfig {
        color_mode: Some(ColorMode::TrueColor),
        ..RendererConfig::synchronous()
    }
}

fn renderer(width: u16, height: u16) -> (Renderer<MemoryBackend>, MemoryBackend) {
    let backend = MemoryBackend::new(width, height);
    let handle = backend.clone();
    (Renderer::new(backend, config()).unwrap(), handle)
}

/// Poll `check` until it holds or two seconds pass.
fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    check()
}

// =============================================================================
// Inline color tags
// =============================================================================

#[test]
fn formatted_text_reaches_terminal_with_truecolor() {
    let (renderer, backend) = renderer(10, 1);
    renderer.draw_formatted("<cfFF0000>A</cf>B", 0, 0).unwrap();

    let a = renderer.frame_cell(0, 0).unwrap();
    let b = renderer.frame_cell(1, 0).unwrap();
    assert_eq!(renderer.color_key(a.fg).as_deref(), Some("FF0000"));
    assert_eq!(renderer.color_key(a.bg).as_deref(), Some("000000"));
    assert_eq!(renderer.color_key(b.fg).as_deref(), Some("FFFFFF"));
    assert_eq!(renderer.color_key(b.bg).as_deref(), Some("000000"));

    renderer.present();
    let out = backend.output();
    let red = out.find("38;2;255;0;0").unwrap();
    let white = out.find("38;2;255;255;255").unwrap();
    assert!(red < out.find('A').unwrap());
    assert!(white < out.find('B').unwrap());
    assert!(strip_escapes(&out).starts_with("AB"));
}

#[test]
fn malformed_tag_draws_nothing() {
    let (renderer, backend) = renderer(10, 1);
    let err = renderer.draw_formatted("<cfFF00>", 0, 0).unwrap_err();
    assert!(matches!(err, RenderError::Format(_)));
    assert!(renderer.present().is_empty());
    assert_eq!(backend.output(), "");
}

#[test]
fn formatted_text_spans_rows() {
    let (renderer, _) = renderer(10, 3);
    renderer.draw_formatted("<cb0000FF>ab\ncd", 2, 0).unwrap();
    assert_eq!(renderer.frame_cell(2, 0).unwrap().glyph, 'a');
    assert_eq!(renderer.frame_cell(2, 1).unwrap().glyph, 'c');
    let bg = renderer.frame_cell(2, 1).unwrap().bg;
    assert_eq!(renderer.color_key(bg).as_deref(), Some("0000FF"));
}

// =============================================================================
// Color table pressure
// =============================================================================

#[test]
fn evicted_color_id_shows_wrong_color() {
    let (renderer, _) = renderer(10, 1);
    renderer.set_color_capacity(4).unwrap();

    renderer.draw_colored("a", "FF0000", "000000", 0, 0).unwrap();
    renderer.draw_colored("b", "00FF00", "000000", 1, 0).unwrap();
    renderer.draw_colored("c", "0000FF", "000000", 2, 0).unwrap();

    let first = renderer.frame_cell(0, 0).unwrap();
    let third = renderer.frame_cell(2, 0).unwrap();
    assert_eq!(first.fg, third.fg);
    // The cell still holds the id, but the table now maps it elsewhere.
    assert_eq!(renderer.color_key(first.fg).as_deref(), Some("0000FF"));
}

#[test]
fn shrinking_capacity_drops_high_ids() {
    let (renderer, _) = renderer(10, 1);
    for (i, key) in ["110000", "220000", "330000", "440000"].iter().enumerate() {
        renderer.draw_colored("x", key, "000000", i as i32, 0).unwrap();
    }
    let last = renderer.frame_cell(3, 0).unwrap().fg;
    assert_eq!(last, 5);
    renderer.set_color_capacity(4).unwrap();
    assert_eq!(renderer.color_key(last), None);
    assert_eq!(renderer.color_key(2).as_deref(), Some("110000"));
}

// =============================================================================
// Present cycle
// =============================================================================

#[test]
fn present_twice_emits_nothing_the_second_time() {
    let (renderer, backend) = renderer(20, 4);
    renderer.draw("one", 0, 0);
    renderer.draw("two", 5, 3);
    let first = renderer.present();
    assert_eq!(first.rows_written, 2);
    let writes = backend.write_count();

    let second = renderer.present();
    assert!(second.is_empty());
    assert_eq!(backend.write_count(), writes);
}

#[test]
fn redrawing_same_content_emits_nothing() {
    let (renderer, backend) = renderer(20, 1);
    renderer.draw("same", 0, 0);
    renderer.present();
    let writes = backend.write_count();

    renderer.draw("same", 0, 0);
    let report = renderer.present();
    assert_eq!(report.cells_promoted, 0);
    assert_eq!(backend.write_count(), writes);
}

#[test]
fn sparse_row_is_one_span_split_at_color_changes() {
    let (renderer, backend) = renderer(12, 1);
    renderer.draw_colored("R", "FF0000", "000000", 3, 0).unwrap();
    renderer.draw_colored("B", "0000FF", "000000", 10, 0).unwrap();

    let report = renderer.present();
    assert_eq!(report.rows_written, 1);
    assert_eq!(report.chunks_written, 3);

    let out = backend.output();
    assert!(out.starts_with("\x1b[1;4H"));
    assert_eq!(strip_escapes(&out), "R      B");
}

#[test]
fn colorless_rendering_uses_default_colors() {
    let (renderer, backend) = renderer(12, 1);
    renderer.set_use_color(false);
    renderer.draw_colored("hi", "FF0000", "00FF00", 0, 0).unwrap();
    let report = renderer.present();
    assert_eq!(report.chunks_written, 1);

    let out = backend.output();
    assert!(out.contains("38;2;255;255;255"));
    assert!(out.contains("48;2;0;0;0"));
    assert!(!out.contains("38;2;255;0;0"));
    assert!(!out.contains("48;2;0;255;0"));
    assert_eq!(strip_escapes(&out), "hi");
}

#[test]
fn failed_rows_are_retried() {
    let (renderer, backend) = renderer(10, 2);
    renderer.draw("keep", 0, 1);
    backend.set_fail_writes(true);
    assert_eq!(renderer.present().skipped_writes, 1);

    backend.set_fail_writes(false);
    assert_eq!(renderer.present().rows_written, 1);
    assert!(backend.output().contains("keep"));
}

#[test]
fn size_drift_forces_full_repaint() {
    let (renderer, backend) = renderer(8, 3);
    renderer.draw("x", 0, 0);
    renderer.present();
    backend.take_output();

    backend.simulate_resize(20, 10);
    let report = renderer.present();
    assert!(report.forced_full);
    assert_eq!(report.rows_written, 3);
    assert_eq!(backend.size().unwrap(), (8, 3));

    assert!(!renderer.present().forced_full);
}

// =============================================================================
// Resize
// =============================================================================

#[test]
fn resize_preserves_overlap() {
    let (renderer, _) = renderer(10, 10);
    renderer.draw("X", 2, 2);
    renderer.resize(5, 5).unwrap();
    assert_eq!(renderer.frame_cell(2, 2).unwrap().glyph, 'X');
    renderer.resize(2, 2).unwrap();
    assert!(renderer.frame_cell(2, 2).is_none());
    renderer.resize(6, 6).unwrap();
    assert_eq!(renderer.frame_cell(2, 2).unwrap().glyph, ' ');
}

#[test]
fn resize_outside_bounds_keeps_state() {
    let backend = MemoryBackend::new(10, 10).with_max_size(50, 50);
    let renderer = Renderer::new(backend, config()).unwrap();
    renderer.draw("X", 2, 2);
    let err = renderer.resize(51, 10).unwrap_err();
    assert!(err.to_string().contains("51x10"));
    assert_eq!(renderer.size(), (10, 10));
    assert_eq!(renderer.frame_cell(2, 2).unwrap().glyph, 'X');
}

// =============================================================================
// Asynchronous pipeline
// =============================================================================

#[test]
fn async_draws_are_presented_by_background_loop() {
    let backend = MemoryBackend::new(20, 2);
    let handle = backend.clone();
    let config = RendererConfig {
        frame_period_ms: 5,
        ..RendererConfig::default()
    };
    let renderer = Renderer::new(backend, config).unwrap();
    assert!(renderer.is_async());

    renderer.draw("background", 0, 1);
    assert!(eventually(|| handle.output().contains("background")));
    assert!(eventually(|| renderer.canvas_cell(0, 1).map(|c| c.glyph) == Some('b')));
}

#[test]
fn concurrent_producers_lose_nothing() {
    let backend = MemoryBackend::new(40, 8);
    let config = RendererConfig {
        frame_period_ms: 2,
        ..RendererConfig::default()
    };
    let renderer = Arc::new(Renderer::new(backend, config).unwrap());

    let producers: Vec<_> = (0..8u8)
        .map(|row| {
            let renderer = Arc::clone(&renderer);
            thread::spawn(move || {
                for col in 0..40 {
                    renderer.draw_value(row, col, i32::from(row));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    renderer.set_async_mode(false).unwrap();
    renderer.present();
    for row in 0..8u16 {
        for col in 0..40u16 {
            let expected = char::from(b'0' + row as u8);
            assert_eq!(renderer.frame_cell(col, row).unwrap().glyph, expected);
            assert_eq!(renderer.canvas_cell(col, row).unwrap().glyph, expected);
        }
    }
}

#[test]
fn single_producer_order_is_kept() {
    let backend = MemoryBackend::new(10, 1);
    let renderer = Renderer::new(backend, RendererConfig::default()).unwrap();
    for glyph in ["a", "b", "c", "d"] {
        renderer.draw(glyph, 0, 0);
    }
    renderer.set_async_mode(false).unwrap();
    assert_eq!(renderer.frame_cell(0, 0).unwrap().glyph, 'd');
}

#[test]
fn async_mode_can_restart() {
    let backend = MemoryBackend::new(10, 1);
    let handle = backend.clone();
    let config = RendererConfig {
        frame_period_ms: 5,
        ..RendererConfig::default()
    };
    let renderer = Renderer::new(backend, config).unwrap();

    renderer.set_async_mode(false).unwrap();
    renderer.draw("s", 0, 0);
    assert_eq!(handle.output(), "");

    renderer.set_async_mode(true).unwrap();
    renderer.draw("a", 1, 0);
    assert!(eventually(|| strip_escapes(&handle.output()).contains("sa")));
}

#[test]
fn dropping_async_renderer_stops_loops_and_restores() {
    let backend = MemoryBackend::new(10, 1);
    let handle = backend.clone();
    let renderer = Renderer::new(backend, RendererConfig::default()).unwrap();
    renderer.draw("bye", 0, 0);
    drop(renderer);
    assert!(handle.is_restored());
}
