use serde::{Deserialize, Serialize};

use crate::catalog_store::MOST_USED_LIMIT;
use crate::contract::{
    to_dtos, CoreRequest, CoreResponse, FavoriteResponse, HistoryResponse, LaunchResponse,
    ResultsResponse,
};
use crate::core_service::{CatalogService, ServiceError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidJson,
    Store,
    Config,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransportResponse {
    Ok { response: CoreResponse },
    Err { error: ErrorResponse },
}

/// `search` and `clear_search` answer with the list ranked for the new query
/// straight away; the debounced stream catches up on its own.
pub async fn handle_request(service: &CatalogService, request: CoreRequest) -> TransportResponse {
    match dispatch(service, request).await {
        Ok(response) => TransportResponse::Ok { response },
        Err(error) => TransportResponse::Err {
            error: map_service_error(error),
        },
    }
}

pub async fn handle_json(service: &CatalogService, payload: &str) -> String {
    let response = match serde_json::from_str::<CoreRequest>(payload) {
        Ok(request) => handle_request(service, request).await,
        Err(error) => TransportResponse::Err {
            error: ErrorResponse {
                code: ErrorCode::InvalidJson,
                message: error.to_string(),
            },
        },
    };

    serde_json::to_string(&response).unwrap_or_else(|error| {
        format!(
            r#"{{"status":"err","error":{{"code":"internal","message":"{}"}}}}"#,
            error.to_string().replace('"', "'")
        )
    })
}

async fn dispatch(
    service: &CatalogService,
    request: CoreRequest,
) -> Result<CoreResponse, ServiceError> {
    let response = match request {
        CoreRequest::Search(search) => {
            service.record_search(&search.query);
            service.search(&search.query);
            results_response(service)
        }
        CoreRequest::ClearSearch => {
            service.clear_search();
            results_response(service)
        }
        CoreRequest::Results => results_response(service),
        CoreRequest::Favorites => {
            let favorites = service.favorite_apps().borrow().clone();
            CoreResponse::Apps(to_dtos(&favorites))
        }
        CoreRequest::MostUsed(request) => {
            let limit = request.limit.unwrap_or(MOST_USED_LIMIT);
            let most_used = service.most_used_apps(limit).borrow().clone();
            CoreResponse::Apps(to_dtos(&most_used))
        }
        CoreRequest::Refresh => CoreResponse::Refresh(service.refresh().await?.into()),
        CoreRequest::Launch(target) => CoreResponse::Launch(LaunchResponse {
            launched: service.launch(&target.id).await,
        }),
        CoreRequest::ToggleFavorite(target) => {
            let is_favorite = service.toggle_favorite(&target.id).await;
            CoreResponse::Favorite(FavoriteResponse {
                id: target.id,
                is_favorite,
            })
        }
        CoreRequest::History => CoreResponse::History(HistoryResponse {
            queries: service.search_history(),
        }),
    };
    Ok(response)
}

fn results_response(service: &CatalogService) -> CoreResponse {
    let status = *service.status().borrow();
    CoreResponse::Results(ResultsResponse {
        query: service.current_query(),
        status: status.into(),
        results: to_dtos(&service.evaluate()),
    })
}

fn map_service_error(error: ServiceError) -> ErrorResponse {
    let code = match &error {
        ServiceError::Store(_) => ErrorCode::Store,
        ServiceError::Config(_) => ErrorCode::Config,
        ServiceError::Task(_) => ErrorCode::Internal,
    };
    ErrorResponse {
        code,
        message: error.to_string(),
    }
}
