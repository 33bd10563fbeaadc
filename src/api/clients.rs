use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::db::{
    CaseAssignmentQuery, CaseUpdate, Client, ClientCase, ClientCaseWithWorker, ClientFields,
    ClientListResponse, ClientSearchCriteria, ListClientsQuery, ServiceFlags, SuccessRateQuery,
};
use crate::services::Identity;
use crate::AppState;

use super::error::ApiError;
use super::extract::{ApiJson, ApiPath, ApiQuery};

/// List clients with pagination
pub async fn list_clients(
    State(state): State<Arc<AppState>>,
    _caller: Identity,
    ApiQuery(query): ApiQuery<ListClientsQuery>,
) -> Result<Json<ClientListResponse>, ApiError> {
    let page = state.clients.list_clients(query.skip, query.limit).await?;
    Ok(Json(page))
}

pub async fn create_client(
    State(state): State<Arc<AppState>>,
    caller: Identity,
    ApiJson(fields): ApiJson<ClientFields>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    let client = state.clients.create_client(&caller, fields).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn get_client(
    State(state): State<Arc<AppState>>,
    _caller: Identity,
    ApiPath(client_id): ApiPath<i64>,
) -> Result<Json<Client>, ApiError> {
    let client = state.clients.get_client(client_id).await?;
    Ok(Json(client))
}

pub async fn update_client(
    State(state): State<Arc<AppState>>,
    caller: Identity,
    ApiPath(client_id): ApiPath<i64>,
    ApiJson(fields): ApiJson<ClientFields>,
) -> Result<Json<Client>, ApiError> {
    let client = state
        .clients
        .update_client(&caller, client_id, fields)
        .await?;
    Ok(Json(client))
}

pub async fn delete_client(
    State(state): State<Arc<AppState>>,
    caller: Identity,
    ApiPath(client_id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.clients.delete_client(&caller, client_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn search_by_criteria(
    State(state): State<Arc<AppState>>,
    caller: Identity,
    ApiQuery(criteria): ApiQuery<ClientSearchCriteria>,
) -> Result<Json<Vec<Client>>, ApiError> {
    let clients = state.clients.search_by_criteria(&caller, &criteria).await?;
    Ok(Json(clients))
}

pub async fn search_by_services(
    State(state): State<Arc<AppState>>,
    caller: Identity,
    ApiQuery(flags): ApiQuery<ServiceFlags>,
) -> Result<Json<Vec<Client>>, ApiError> {
    let clients = state.clients.search_by_services(&caller, &flags).await?;
    Ok(Json(clients))
}

pub async fn search_by_success_rate(
    State(state): State<Arc<AppState>>,
    caller: Identity,
    ApiQuery(query): ApiQuery<SuccessRateQuery>,
) -> Result<Json<Vec<Client>>, ApiError> {
    let clients = state
        .clients
        .search_by_success_rate(&caller, query.min_rate)
        .await?;
    Ok(Json(clients))
}

pub async fn get_client_services(
    State(state): State<Arc<AppState>>,
    caller: Identity,
    ApiPath(client_id): ApiPath<i64>,
) -> Result<Json<Vec<ClientCaseWithWorker>>, ApiError> {
    let cases = state
        .clients
        .get_client_services(&caller, client_id)
        .await?;
    Ok(Json(cases))
}

pub async fn list_by_case_worker(
    State(state): State<Arc<AppState>>,
    _caller: Identity,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<Vec<Client>>, ApiError> {
    let clients = state.clients.list_by_case_worker(user_id).await?;
    Ok(Json(clients))
}

pub async fn update_case(
    State(state): State<Arc<AppState>>,
    caller: Identity,
    ApiPath((client_id, user_id)): ApiPath<(i64, i64)>,
    ApiJson(update): ApiJson<CaseUpdate>,
) -> Result<Json<ClientCase>, ApiError> {
    let case = state
        .clients
        .update_case(&caller, client_id, user_id, update)
        .await?;
    Ok(Json(case))
}

/// Update the caller's own case for a client
pub async fn update_own_case(
    State(state): State<Arc<AppState>>,
    caller: Identity,
    ApiPath(client_id): ApiPath<i64>,
    ApiJson(update): ApiJson<CaseUpdate>,
) -> Result<Json<ClientCase>, ApiError> {
    let case = state
        .clients
        .update_own_case(&caller, client_id, update)
        .await?;
    Ok(Json(case))
}

pub async fn create_case_assignment(
    State(state): State<Arc<AppState>>,
    caller: Identity,
    ApiPath(client_id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<CaseAssignmentQuery>,
) -> Result<Json<ClientCase>, ApiError> {
    let case = state
        .clients
        .create_case_assignment(&caller, client_id, query.case_worker_id)
        .await?;
    Ok(Json(case))
}
