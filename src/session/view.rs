use crate::assets::ingest::ImageAsset;
use crate::engine::EngineLoader;
use crate::session::app::App;
use crate::session::log::TimestampMode;
use crate::session::state::ProcessingState;
use chrono::{DateTime, Local};
use std::fmt::Write as _;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewOpts {
    pub timestamps: TimestampMode,
}

/// Draw the app as a text panel, stamping log lines with the current time.
pub fn render<L: EngineLoader>(app: &App<L>, opts: &ViewOpts) -> String {
    render_at(app, opts, Local::now())
}

pub fn render_at<L: EngineLoader>(app: &App<L>, opts: &ViewOpts, now: DateTime<Local>) -> String {
    let mut out = String::new();

    if app.state() == ProcessingState::LoadingEngine {
        out.push_str("Loading engine... [spinner]\n");
    } else {
        let input_state = if app.state().accepts_uploads() {
            "ready"
        } else {
            "disabled"
        };
        let _ = writeln!(out, "[choose image: image/*] ({input_state})");

        if let Some(input) = app.input() {
            let _ = writeln!(out, "Original Image: {}", describe(input));
        }
        if app.state() == ProcessingState::Processing {
            out.push_str("Converting... [spinner]\n");
        } else if let Some(output) = app.output() {
            let label = app.client().opts().preset.output_label();
            let _ = writeln!(out, "{label}: {}", describe(output));
        }
    }

    out.push_str("\nEngine Logs\n");
    for line in app.log().render_lines(opts.timestamps, now) {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn describe(asset: &ImageAsset) -> String {
    format!(
        "{}x{} {} ({} bytes)",
        asset.width,
        asset.height,
        asset.mime_type,
        asset.bytes.len()
    )
}
