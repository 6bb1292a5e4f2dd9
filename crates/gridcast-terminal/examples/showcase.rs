//! Draws plain, colored, formatted and numeric text through the async
//! pipeline, then animates a counter for a couple of seconds.
//!
//! Run with `RUST_LOG=gridcast_terminal=trace cargo run --example showcase 2>log.txt`
//! to see present cycles and housekeeping in the log.

use gridcast_terminal::{RenderError, Renderer, RendererConfig};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), RenderError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let renderer = Renderer::stdout(RendererConfig::high_refresh())?;
    let (width, height) = renderer.size();

    renderer.draw("gridcast showcase", 2, 1);
    renderer.draw_colored(" colored ", "000000", "FFD700", 2, 3)?;
    renderer.draw_formatted(
        "<cf00FF00>ok</cf> build  <cfFF0000>err</cf> tests  <cb303030><cf87CEEB>info</cf></cb>",
        2,
        5,
    )?;
    renderer.draw("multi\nline\ntext", 2, 7);
    renderer.draw_value(format_args!("{width}x{height} terminal"), 2, 11);

    for tick in 0..=100u32 {
        let bar = "#".repeat((tick / 5) as usize);
        renderer.draw_value_colored(format_args!("{tick:>3}% {bar:<20}"), "00BFFF", "000000", 2, 13)?;
        thread::sleep(Duration::from_millis(20));
    }

    renderer.set_async_mode(false)?;
    renderer.present();
    renderer.raw_write("done", 2, 15);
    Ok(())
}
