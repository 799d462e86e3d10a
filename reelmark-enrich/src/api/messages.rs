//! Companion messaging endpoints
//!
//! `POST /message` takes a [`BackgroundRequest`] and always answers 200 with
//! a [`BackgroundResponse`] (errors travel in the payload). `GET /countries`
//! is the plain REST form of `getCountries`: lookup failures map to 502,
//! an unreadable stored list to 500.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::error::{ApiError, ApiResult};
use crate::services::country_service::CountryError;
use crate::services::{BackgroundRequest, BackgroundResponse};
use crate::types::Region;
use crate::AppState;

/// POST /message
pub async fn handle_message(
    State(state): State<AppState>,
    Json(request): Json<BackgroundRequest>,
) -> Json<BackgroundResponse> {
    let response = state.countries.handle(request).await;

    if let BackgroundResponse::Error { error } = &response {
        *state.last_error.write().await = Some(error.clone());
    }

    Json(response)
}

/// GET /countries
pub async fn get_countries(State(state): State<AppState>) -> ApiResult<Json<Vec<Region>>> {
    match state.countries.countries().await {
        Ok(countries) => Ok(Json(countries)),
        Err(e) => {
            *state.last_error.write().await = Some(e.to_string());
            Err(match e {
                CountryError::Lookup(lookup) => ApiError::Upstream(lookup.to_string()),
                CountryError::Storage(storage) => ApiError::Storage(storage),
            })
        }
    }
}

pub fn message_routes() -> Router<AppState> {
    Router::new()
        .route("/message", post(handle_message))
        .route("/countries", get(get_countries))
}
