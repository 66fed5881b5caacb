//! Catalog records consumed by the pipeline. The catalog service returns these as
//! camelCase JSON.

/// A university the user can brand their photo with.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct University {
    pub id: String,
    pub name: String,
}

/// A transparent-background overlay drawn on top of the masked photo.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameAsset {
    pub id: String,
    pub university_id: String,
    pub name: String,
    pub url: String,
}

impl FrameAsset {
    /// Frame known only by its URL, e.g. one passed on the command line.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id: url.clone(),
            university_id: String::new(),
            name: url.rsplit('/').next().unwrap_or_default().to_string(),
            url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_json_uses_camel_case() {
        let f: FrameAsset = serde_json::from_str(
            r#"{"id":"f1","universityId":"u1","name":"Classic","url":"https://x/f1.png"}"#,
        )
        .unwrap();
        assert_eq!(f.university_id, "u1");
        assert_eq!(f.url, "https://x/f1.png");
    }

    #[test]
    fn from_url_names_frame_after_last_segment() {
        let f = FrameAsset::from_url("https://cdn.example.org/frames/gold.png");
        assert_eq!(f.name, "gold.png");
        assert_eq!(f.id, f.url);
    }
}
