use serde::{Deserialize, Serialize};

pub const ASPECT_RATIO: &str = "3:4";

pub const STYLE_PROMPT: &str = r#"Transform the character in the attached image into the iconic "Everskies" pixel art style.
Strictly follow these rules:
1. Body Shape: Use the signature Everskies slim body base (tall, slender limbs, delicate proportions).
2. Facial Features: Create large, expressive, anime-like eyes with soft highlights, a small delicate nose, and specific facial expression from the reference.
3. Outfit & Hair: Replicate the hairstyle, clothing, and accessories from the provided image exactly, but adapted to the pixel art aesthetic.
4. Shading: Use soft, layered pixel shading typical of high-quality pixel dolls.
5. Background: Pure white background.
6. Composition: One single complete character, centered in the frame.
7. Style: High-fidelity pixel art, clean lines, no blur."#;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RequestPart {
    #[serde(rename_all = "camelCase")]
    InlineData { inline_data: InlineData },
    Text { text: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestContent {
    pub role: String,
    pub parts: Vec<RequestPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub image_config: ImageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<RequestContent>,
    pub generation_config: GenerationConfig,
}

/// Image first, then the fixed style instructions.
pub fn build_style_transfer_request(base64: &str, mime_type: &str) -> GenerateRequest {
    GenerateRequest {
        contents: vec![RequestContent {
            role: "user".to_string(),
            parts: vec![
                RequestPart::InlineData {
                    inline_data: InlineData {
                        mime_type: mime_type.to_string(),
                        data: base64.to_string(),
                    },
                },
                RequestPart::Text {
                    text: STYLE_PROMPT.to_string(),
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_modalities: vec!["IMAGE".to_string(), "TEXT".to_string()],
            image_config: ImageConfig {
                aspect_ratio: ASPECT_RATIO.to_string(),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn wire_shape_matches_generate_content() {
        let req = build_style_transfer_request("QUJD", "image/jpeg");
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "inlineData": { "mimeType": "image/jpeg", "data": "QUJD" } },
                        { "text": STYLE_PROMPT }
                    ]
                }],
                "generationConfig": {
                    "responseModalities": ["IMAGE", "TEXT"],
                    "imageConfig": { "aspectRatio": "3:4" }
                }
            })
        );
    }

    #[test]
    fn prompt_carries_seven_numbered_rules() {
        for n in 1..=7 {
            assert!(STYLE_PROMPT.contains(&format!("\n{n}. ")), "rule {n} missing");
        }
        assert!(!STYLE_PROMPT.contains("\n8. "));
        assert!(STYLE_PROMPT.contains("Pure white background"));
    }

    #[test]
    fn only_the_image_varies() {
        let a = build_style_transfer_request("AAAA", "image/png");
        let b = build_style_transfer_request("BBBB", "image/png");
        assert_eq!(a.generation_config, b.generation_config);
        assert_eq!(a.contents[0].parts[1], b.contents[0].parts[1]);
        assert_ne!(a.contents[0].parts[0], b.contents[0].parts[0]);
    }
}
