//! Text panels for the terminal front end.

use crate::studio::{GenerationState, UserInput};

pub fn header() -> String {
    "PixelEverskies  |  Style Transfer • Pixel Art • Character Design\n\
     Everskies Style Converter: upload any character illustration and get a pixel doll back."
        .to_string()
}

fn format_size(bytes: usize) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}

pub fn upload_panel(input: Option<&UserInput>) -> String {
    let mut out = String::from("[1] Upload Reference\n");
    match input {
        Some(i) => {
            out.push_str(&format!(
                "    {} ({}, {})\n    preview: {}",
                i.file.name,
                format_size(i.size),
                i.file.declared_type,
                i.preview
            ));
        }
        None => out.push_str("    Drop your character here: JPG, PNG or WebP"),
    }
    out
}

pub fn result_panel(state: &GenerationState) -> String {
    let mut out = String::from("[2] Result Preview\n");
    if state.is_generating {
        out.push_str(&format!(
            "    {}\n    Creating pixel-perfect details",
            state.status_message
        ));
    } else if let Some(url) = &state.result_image {
        let payload = url.split_once(',').map(|(_, b)| b.len()).unwrap_or(0);
        out.push_str(&format!("    Generated pixel art ready ({payload} base64 chars)"));
    } else {
        out.push_str("    Your pixel art will appear here");
    }
    out
}

pub fn error_banner(state: &GenerationState) -> Option<String> {
    state.error.as_ref().map(|e| format!("!! {e}"))
}

pub fn style_guide() -> String {
    [
        "Style Guide",
        "  • Body Shape: Emphasizes tall, thin proportions unique to Everskies bases.",
        "  • Faces: Focuses on soft, glossy eyes and delicate features.",
        "  • Items: Hair and clothes are rendered with crisp pixel outlines and smooth shading.",
    ]
    .join("\n")
}
