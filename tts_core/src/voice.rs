//! Voice catalog.
//!
//! A voice is selectable in the studio; only voices carrying an `api_name`
//! can be synthesized by the remote API. Cloned voices are local-only.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Label shown to users and embedded in style prompts.
    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "Nam",
            Gender::Female => "Nữ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    North,
    Central,
    South,
    Us,
    Uk,
}

impl Region {
    pub fn label(self) -> &'static str {
        match self {
            Region::North => "Miền Bắc",
            Region::Central => "Miền Trung",
            Region::South => "Miền Nam",
            Region::Us => "Tiếng Anh - Mỹ",
            Region::Uk => "Tiếng Anh - Anh",
        }
    }

    /// Language prefix used to pick voices on a local speech engine.
    pub fn language_prefix(self) -> &'static str {
        match self {
            Region::Us | Region::Uk => "en",
            _ => "vi",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub id: String,
    pub name: String,
    pub gender: Gender,
    pub region: Region,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_cloned: bool,
    /// Voice name understood by the synthesis API, e.g. `vi-VN-Wavenet-A`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_name: Option<String>,
}

impl Voice {
    pub fn new(id: impl Into<String>, name: impl Into<String>, gender: Gender, region: Region) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            gender,
            region,
            description: None,
            is_cloned: false,
            api_name: None,
        }
    }

    #[must_use]
    pub fn with_api_name(mut self, api_name: impl Into<String>) -> Self {
        self.api_name = Some(api_name.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether the remote API can synthesize this voice.
    pub fn supports_remote_api(&self) -> bool {
        self.api_name.as_deref().is_some_and(|name| !name.is_empty())
    }

    /// Locale sent to the API, derived from the voice name prefix.
    pub fn language_code(&self) -> &'static str {
        language_code_for(self.api_name.as_deref().unwrap_or_default())
    }

    /// Newer voice families reject plain text input.
    pub fn requires_markup(&self) -> bool {
        self.api_name.as_deref().is_some_and(requires_markup)
    }

    pub fn profile(&self) -> VoiceProfile {
        VoiceProfile {
            name: self.name.clone(),
            gender: self.gender.label().to_string(),
            region: self.region.label().to_string(),
        }
    }
}

/// What a style script writer needs to know about the target voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceProfile {
    pub name: String,
    pub gender: String,
    pub region: String,
}

pub fn language_code_for(api_name: &str) -> &'static str {
    if api_name.starts_with("en-") {
        "en-US"
    } else {
        "vi-VN"
    }
}

pub fn requires_markup(api_name: &str) -> bool {
    api_name.contains("Neural2")
}

/// Ordered list of selectable voices.
#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    voices: Vec<Voice>,
}

impl Default for VoiceCatalog {
    fn default() -> Self {
        Self::new(builtin_voices())
    }
}

impl VoiceCatalog {
    pub fn new(voices: Vec<Voice>) -> Self {
        Self { voices }
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn get(&self, id: &str) -> Option<&Voice> {
        self.voices.iter().find(|v| v.id == id)
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Register the result of the cloning wizard. Cloned voices have no
    /// remote identifier.
    pub fn add_cloned(&mut self, name: impl Into<String>) -> &Voice {
        let id = format!("cloned-{}", chrono::Utc::now().timestamp_millis());
        let mut voice = Voice::new(id, name, Gender::Male, Region::South);
        voice.is_cloned = true;
        tracing::info!(voice_id = %voice.id, "registered cloned voice");
        self.voices.push(voice);
        &self.voices[self.voices.len() - 1]
    }
}

fn builtin_voices() -> Vec<Voice> {
    use Gender::*;
    use Region::*;

    vec![
        Voice::new("hn-female-le-minh", "Lê Minh", Female, North).with_api_name("vi-VN-Standard-A"),
        Voice::new("hn-male-trung-kien", "Trung Kiên", Male, North).with_api_name("vi-VN-Standard-B"),
        Voice::new("sg-female-linh-san", "Linh San", Female, South).with_api_name("vi-VN-Standard-C"),
        Voice::new("sg-male-thanh-long", "Thanh Long", Male, South).with_api_name("vi-VN-Standard-D"),
        Voice::new("hue-female-ngoc-huyen", "Ngọc Huyền", Female, Central).with_api_name("vi-VN-Wavenet-A"),
        Voice::new("hue-male-gia-huy", "Gia Huy", Male, Central).with_api_name("vi-VN-Wavenet-B"),
        Voice::new("sg-male-hoang-nam", "Hoàng Nam (Kể chuyện)", Male, South)
            .with_api_name("vi-VN-Wavenet-D")
            .with_description("Kể chuyện"),
        Voice::new("sg-female-mai-chi", "Mai Chi (Podcast)", Female, South)
            .with_api_name("vi-VN-Wavenet-C")
            .with_description("Podcast"),
        Voice::new("vn-male-neural2-d-horror", "Minh Tuấn (Truyện ma)", Male, South)
            .with_api_name("vi-VN-Neural2-D")
            .with_description("Truyện ma"),
        Voice::new("en-us-male-wavenet-d", "David (Trầm ấm)", Male, Us).with_api_name("en-US-Wavenet-D"),
        Voice::new("en-us-male-studio-m", "John (Studio)", Male, Us).with_api_name("en-US-Studio-M"),
        Voice::new("en-us-male-news-n", "News Anchor (Rõ ràng)", Male, Us).with_api_name("en-US-News-N"),
    ]
}
