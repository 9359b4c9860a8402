use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Game,
    Audio,
    Video,
    Social,
    Productivity,
    Other,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Game => "game",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Social => "social",
            Self::Productivity => "productivity",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "game" => Self::Game,
            "audio" => Self::Audio,
            "video" => Self::Video,
            "social" => Self::Social,
            "productivity" => Self::Productivity,
            _ => Self::Other,
        }
    }

    /// Coarse classification from platform category tokens. Earlier buckets win.
    pub fn classify<S: AsRef<str>>(hints: &[S]) -> Self {
        let lowered: Vec<String> = hints
            .iter()
            .map(|hint| hint.as_ref().trim().to_ascii_lowercase())
            .filter(|hint| !hint.is_empty())
            .collect();
        let has_any = |tokens: &[&str]| lowered.iter().any(|hint| tokens.contains(&hint.as_str()));

        if has_any(&["game", "games"]) {
            Self::Game
        } else if has_any(&["audio", "music", "audiovideo"]) {
            Self::Audio
        } else if has_any(&["video", "tv", "player"]) {
            Self::Video
        } else if has_any(&["chat", "instantmessaging", "social", "email", "network"]) {
            Self::Social
        } else if has_any(&["office", "development", "productivity", "utility", "calendar"]) {
            Self::Productivity
        } else {
            Self::Other
        }
    }
}

/// What a discovery strategy reports for one installed application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawApplicationDescriptor {
    pub id: String,
    pub label: Option<String>,
    pub raw_label: Option<String>,
    pub version_label: String,
    pub version_ordinal: i64,
    pub is_system_component: bool,
    pub installed_at: i64,
    pub updated_at: i64,
    pub category_hints: Vec<String>,
    pub enabled: bool,
}

impl RawApplicationDescriptor {
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: Some(label.to_string()),
            raw_label: None,
            version_label: String::new(),
            version_ordinal: 0,
            is_system_component: false,
            installed_at: 0,
            updated_at: 0,
            category_hints: Vec::new(),
            enabled: true,
        }
    }

    pub fn with_raw_label(mut self, raw_label: &str) -> Self {
        self.raw_label = Some(raw_label.to_string());
        self
    }

    pub fn with_version(mut self, label: &str, ordinal: i64) -> Self {
        self.version_label = label.to_string();
        self.version_ordinal = ordinal;
        self
    }

    pub fn with_categories(mut self, hints: &[&str]) -> Self {
        self.category_hints = hints.iter().map(|hint| hint.to_string()).collect();
        self
    }

    pub fn with_timestamps(mut self, installed_at: i64, updated_at: i64) -> Self {
        self.installed_at = installed_at;
        self.updated_at = updated_at;
        self
    }

    pub fn system(mut self) -> Self {
        self.is_system_component = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn display_name(&self) -> &str {
        non_blank(self.label.as_deref())
            .or_else(|| non_blank(self.raw_label.as_deref()))
            .unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: String,
    pub display_name: String,
    pub secondary_name: Option<String>,
    pub version_label: String,
    pub version_ordinal: i64,
    pub is_system_component: bool,
    pub installed_at: i64,
    pub updated_at: i64,
    pub category: Category,
    pub enabled: bool,
    pub launch_count: u32,
    pub last_launched_at: Option<i64>,
    pub is_favorite: bool,
    #[serde(skip)]
    pub transient_score: Option<f32>,
}

impl ApplicationRecord {
    pub fn new(id: &str, display_name: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            secondary_name: None,
            version_label: String::new(),
            version_ordinal: 0,
            is_system_component: false,
            installed_at: 0,
            updated_at: 0,
            category: Category::Other,
            enabled: true,
            launch_count: 0,
            last_launched_at: None,
            is_favorite: false,
            transient_score: None,
        }
    }

    /// Fresh record with zero statistics.
    pub fn from_descriptor(descriptor: &RawApplicationDescriptor) -> Self {
        let mut record = Self::new(&descriptor.id, descriptor.display_name());
        record.apply_descriptor(descriptor);
        record
    }

    /// Refreshes identity fields only; statistics stay as they are.
    pub fn apply_descriptor(&mut self, descriptor: &RawApplicationDescriptor) {
        self.display_name = descriptor.display_name().to_string();
        self.secondary_name = non_blank(descriptor.raw_label.as_deref()).map(str::to_string);
        self.version_label = descriptor.version_label.clone();
        self.version_ordinal = descriptor.version_ordinal;
        self.is_system_component = descriptor.is_system_component;
        self.installed_at = descriptor.installed_at;
        self.updated_at = descriptor.updated_at;
        self.category = Category::classify(&descriptor.category_hints);
        self.enabled = descriptor.enabled;
    }

    pub fn with_usage(mut self, launch_count: u32, last_launched_at: Option<i64>) -> Self {
        self.launch_count = launch_count;
        self.last_launched_at = last_launched_at;
        self
    }

    pub fn with_secondary_name(mut self, secondary_name: &str) -> Self {
        self.secondary_name = Some(secondary_name.to_string());
        self
    }

    pub fn favorite(mut self) -> Self {
        self.is_favorite = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

pub fn now_epoch_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
