//! FFmpeg filter graph builders.

use csplice_models::{Layout, Resolution};

use crate::error::{MediaError, MediaResult};

/// Label of the composed video stream
pub const VIDEO_OUT: &str = "[vout]";
/// Label of the mixed audio stream
pub const AUDIO_OUT: &str = "[aout]";

/// Watermark font size in pixels
pub const WATERMARK_FONT_SIZE: u32 = 24;
/// Distance between watermark baseline area and the bottom edge
pub const WATERMARK_MARGIN: u32 = 10;

/// Scale a labelled input to an exact size with square pixels.
pub fn scale(input: &str, width: u32, height: u32, output: &str) -> String {
    format!("{input}scale={width}:{height},setsar=1{output}")
}

/// Stack inputs vertically. Ended inputs hold their last frame.
pub fn vstack(inputs: &[&str], output: &str) -> String {
    format!("{}vstack=inputs={}:shortest=0{output}", inputs.concat(), inputs.len())
}

/// Stack inputs horizontally. Ended inputs hold their last frame.
pub fn hstack(inputs: &[&str], output: &str) -> String {
    format!("{}hstack=inputs={}:shortest=0{output}", inputs.concat(), inputs.len())
}

/// Pad to a full canvas, anchored top-left, with black.
pub fn pad_top_left(input: &str, width: u32, height: u32, output: &str) -> String {
    format!("{input}pad={width}:{height}:0:0:black{output}")
}

/// Mix audio streams for the length of the longest one.
///
/// A single stream passes through unchanged.
pub fn mix_audio(inputs: &[String], output: &str) -> Option<String> {
    match inputs.len() {
        0 => None,
        1 => Some(format!("{}anull{output}", inputs[0])),
        n => Some(format!(
            "{}amix=inputs={n}:duration=longest:dropout_transition=0{output}",
            inputs.concat()
        )),
    }
}

/// Filter graph for one composition.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionGraph {
    pub filter: String,
    /// Whether the graph produces [`AUDIO_OUT`]
    pub has_audio: bool,
}

/// Build the composition graph for `has_audio.len()` inputs.
///
/// `has_audio[i]` states whether input `i` carries an audio stream.
pub fn composition_graph(
    layout: Layout,
    resolution: Resolution,
    has_audio: &[bool],
) -> MediaResult<CompositionGraph> {
    let count = has_audio.len();
    layout
        .validate_clip_count(count)
        .map_err(|e| MediaError::unsupported_layout(e.to_string()))?;

    let mut parts = Vec::new();
    match layout {
        Layout::SplitScreen => {
            let half = resolution.half_height();
            parts.push(scale("[0:v]", resolution.width, half, "[v0]"));
            parts.push(scale("[1:v]", resolution.width, half, "[v1]"));
            parts.push(vstack(&["[v0]", "[v1]"], "[stack]"));
            parts.push(pad_top_left("[stack]", resolution.width, resolution.height, VIDEO_OUT));
        }
        Layout::Grid => {
            let (w, h) = (resolution.half_width(), resolution.half_height());
            // Only the top row is populated below four inputs
            let visible = if count == 4 { 4 } else { 2 };
            for i in 0..visible {
                parts.push(scale(&format!("[{i}:v]"), w, h, &format!("[v{i}]")));
            }
            if visible == 4 {
                parts.push(hstack(&["[v0]", "[v1]"], "[top]"));
                parts.push(hstack(&["[v2]", "[v3]"], "[bottom]"));
                parts.push(vstack(&["[top]", "[bottom]"], "[grid]"));
            } else {
                parts.push(hstack(&["[v0]", "[v1]"], "[grid]"));
            }
            parts.push(pad_top_left("[grid]", resolution.width, resolution.height, VIDEO_OUT));
        }
    }

    let audio_inputs: Vec<String> = has_audio
        .iter()
        .enumerate()
        .filter(|(_, has)| **has)
        .map(|(i, _)| format!("[{i}:a]"))
        .collect();
    let audio = mix_audio(&audio_inputs, AUDIO_OUT);
    let has_audio = audio.is_some();
    parts.extend(audio);

    Ok(CompositionGraph {
        filter: parts.join(";"),
        has_audio,
    })
}

/// Escape a value for use as a filter option inside a filter graph.
///
/// Two levels apply: the option value (`\`, `'`, `:`) and then the graph
/// (`\`, `'`, `[`, `]`, `,`, `;`).
pub fn escape_filter_value(value: &str) -> String {
    let option_level = escape_chars(value, &['\\', '\'', ':']);
    escape_chars(&option_level, &['\\', '\'', '[', ']', ',', ';'])
}

fn escape_chars(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Centered-bottom text watermark with a drop shadow.
pub fn drawtext_watermark(text: &str) -> String {
    format!(
        "drawtext=text={}:expansion=none:fontsize={}:fontcolor=white:\
         x=(w-text_w)/2:y=h-th-{}:shadowcolor=black:shadowx=2:shadowy=2",
        escape_filter_value(text),
        WATERMARK_FONT_SIZE,
        WATERMARK_MARGIN
    )
}

/// Video filter for a platform export: scale, then the optional watermark.
pub fn export_filter(resolution: Resolution, watermark: Option<&str>) -> String {
    let mut filter = format!("scale={}:{},setsar=1", resolution.width, resolution.height);
    if let Some(text) = watermark.filter(|t| !t.is_empty()) {
        filter.push(',');
        filter.push_str(&drawtext_watermark(text));
    }
    filter
}
