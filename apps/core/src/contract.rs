use serde::{Deserialize, Serialize};

use crate::core_service::{CatalogStatus, RefreshOutcome};
use crate::model::{ApplicationRecord, Category};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppIdRequest {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MostUsedRequest {
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplicationDto {
    pub id: String,
    pub display_name: String,
    pub secondary_name: Option<String>,
    pub version_label: String,
    pub category: Category,
    pub is_system_component: bool,
    pub launch_count: u32,
    pub last_launched_at: Option<i64>,
    pub is_favorite: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub score: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultsResponse {
    pub query: String,
    pub status: StatusDto,
    pub results: Vec<ApplicationDto>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusDto {
    Loading,
    Ready,
    NoApplicationsFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshResponse {
    pub outcome: String,
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LaunchResponse {
    pub launched: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FavoriteResponse {
    pub id: String,
    pub is_favorite: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryResponse {
    pub queries: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum CoreRequest {
    Search(SearchRequest),
    ClearSearch,
    Results,
    Favorites,
    MostUsed(MostUsedRequest),
    Refresh,
    Launch(AppIdRequest),
    ToggleFavorite(AppIdRequest),
    History,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum CoreResponse {
    Results(ResultsResponse),
    Apps(Vec<ApplicationDto>),
    Refresh(RefreshResponse),
    Launch(LaunchResponse),
    Favorite(FavoriteResponse),
    History(HistoryResponse),
}

impl From<&ApplicationRecord> for ApplicationDto {
    fn from(value: &ApplicationRecord) -> Self {
        Self {
            id: value.id.clone(),
            display_name: value.display_name.clone(),
            secondary_name: value.secondary_name.clone(),
            version_label: value.version_label.clone(),
            category: value.category,
            is_system_component: value.is_system_component,
            launch_count: value.launch_count,
            last_launched_at: value.last_launched_at,
            is_favorite: value.is_favorite,
            score: value.transient_score,
        }
    }
}

impl From<CatalogStatus> for StatusDto {
    fn from(value: CatalogStatus) -> Self {
        match value {
            CatalogStatus::Loading => Self::Loading,
            CatalogStatus::Ready => Self::Ready,
            CatalogStatus::NoApplicationsFound => Self::NoApplicationsFound,
        }
    }
}

impl From<RefreshOutcome> for RefreshResponse {
    fn from(value: RefreshOutcome) -> Self {
        let (outcome, report) = match value {
            RefreshOutcome::Reconciled(report) => ("reconciled", report),
            RefreshOutcome::Merged(report) => ("merged", report),
            RefreshOutcome::NothingDiscovered => ("nothing_discovered", Default::default()),
            RefreshOutcome::Joined => ("joined", Default::default()),
        };
        Self {
            outcome: outcome.to_string(),
            inserted: report.inserted,
            updated: report.updated,
            removed: report.removed,
        }
    }
}

pub fn to_dtos(records: &[ApplicationRecord]) -> Vec<ApplicationDto> {
    records.iter().map(ApplicationDto::from).collect()
}
