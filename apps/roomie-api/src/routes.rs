use std::convert::Infallible;

use axum::{
	Json, Router,
	extract::{
		Path, Query, State,
		rejection::{JsonRejection, QueryRejection},
	},
	http::{HeaderMap, StatusCode, header::AUTHORIZATION},
	response::{
		IntoResponse, Response,
		sse::{Event, KeepAlive, Sse},
	},
	routing::{get, post, put},
};
use futures::{Stream, stream};
use serde::{Deserialize, Serialize};

use roomie_service::{
	AdminMatchesResponse, BioRequest, Error, FeedResponse, MatchesResponse, MessagesResponse,
	OwnProfile, QuestionnaireDefinition, QuestionnaireSubmission, RegisterRequest,
	SendMessageRequest, SendMessageResponse, SwipeRequest, SwipeResponse, TraitVector,
};
use roomie_storage::models::Message;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct FeedQuery {
	limit: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let status = match &err {
			Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
			Error::InvalidCredential { .. } | Error::Forbidden { .. } => StatusCode::FORBIDDEN,
			Error::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
			Error::NotFound { .. } => StatusCode::NOT_FOUND,
			Error::Conflict { .. } => StatusCode::CONFLICT,
			Error::FeedUnavailable { .. }
			| Error::SwipeFailed { .. }
			| Error::MatchQueryFailed { .. }
			| Error::StorageUnavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
			Error::Timeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
		};

		Self::new(status, err.code(), err.message())
	}
}
impl From<JsonRejection> for ApiError {
	fn from(rejection: JsonRejection) -> Self {
		Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", rejection.body_text())
	}
}
impl From<QueryRejection> for ApiError {
	fn from(rejection: QueryRejection) -> Self {
		Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", rejection.body_text())
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/questionnaire", get(questionnaire))
		.route("/users", post(register))
		.route("/users/me", get(me))
		.route("/users/me/bio", put(submit_bio))
		.route("/users/me/questionnaire", post(submit_questionnaire))
		.route("/feed", get(feed))
		.route("/swipe", post(swipe))
		.route("/matches", get(matches))
		.route("/messages/{match_id}", get(list_messages).post(send_message))
		.route("/messages/{match_id}/stream", get(stream_messages))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/v1/admin/users/{user_id}/matches", get(admin_matches))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn questionnaire(State(state): State<AppState>) -> Json<QuestionnaireDefinition> {
	Json(state.service.questionnaire())
}

async fn register(
	State(state): State<AppState>,
	headers: HeaderMap,
	payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OwnProfile>), ApiError> {
	let user_id = authenticate(&state, &headers).await?;
	let Json(payload) = payload?;
	let response = state.service.register(&user_id, payload).await?;

	Ok((StatusCode::CREATED, Json(response)))
}

async fn me(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<OwnProfile>, ApiError> {
	let user_id = authenticate(&state, &headers).await?;

	Ok(Json(state.service.me(&user_id).await?))
}

async fn submit_bio(
	State(state): State<AppState>,
	headers: HeaderMap,
	payload: Result<Json<BioRequest>, JsonRejection>,
) -> Result<Json<OwnProfile>, ApiError> {
	let user_id = authenticate(&state, &headers).await?;
	let Json(payload) = payload?;

	Ok(Json(state.service.submit_bio(&user_id, payload).await?))
}

async fn submit_questionnaire(
	State(state): State<AppState>,
	headers: HeaderMap,
	payload: Result<Json<QuestionnaireSubmission>, JsonRejection>,
) -> Result<Json<TraitVector>, ApiError> {
	let user_id = authenticate(&state, &headers).await?;
	let Json(payload) = payload?;

	Ok(Json(state.service.submit_questionnaire(&user_id, payload).await?))
}

async fn feed(
	State(state): State<AppState>,
	headers: HeaderMap,
	query: Result<Query<FeedQuery>, QueryRejection>,
) -> Result<Json<FeedResponse>, ApiError> {
	let user_id = authenticate(&state, &headers).await?;
	let Query(query) = query?;

	Ok(Json(state.service.feed(&user_id, query.limit).await?))
}

async fn swipe(
	State(state): State<AppState>,
	headers: HeaderMap,
	payload: Result<Json<SwipeRequest>, JsonRejection>,
) -> Result<Json<SwipeResponse>, ApiError> {
	let user_id = authenticate(&state, &headers).await?;
	let Json(payload) = payload?;

	Ok(Json(state.service.swipe(&user_id, payload).await?))
}

async fn matches(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<MatchesResponse>, ApiError> {
	let user_id = authenticate(&state, &headers).await?;

	Ok(Json(state.service.list_matches(&user_id).await?))
}

async fn list_messages(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(match_id): Path<String>,
) -> Result<Json<MessagesResponse>, ApiError> {
	let user_id = authenticate(&state, &headers).await?;
	let messages = state.service.list_messages(&user_id, &match_id).await?;

	Ok(Json(MessagesResponse::from_messages(&messages)))
}

/// Access problems are reported as errors; delivery failures only as `success: false`.
async fn send_message(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(match_id): Path<String>,
	payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<SendMessageResponse>, ApiError> {
	let user_id = authenticate(&state, &headers).await?;
	let Json(payload) = payload?;

	state.service.authorize_thread(&user_id, &match_id).await?;

	let success = state.service.send_message(&match_id, &user_id, &payload.text).await;

	Ok(Json(SendMessageResponse { success }))
}

async fn stream_messages(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(match_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
	let user_id = authenticate(&state, &headers).await?;
	let subscription = state.service.subscribe(&user_id, &match_id).await?;
	let events = stream::unfold((subscription, true), |(mut subscription, first)| async move {
		if first {
			let snapshot = subscription.take_snapshot();

			return Some((Ok(messages_event("snapshot", &snapshot)), (subscription, false)));
		}

		let batch = subscription.next_batch().await?;

		Some((Ok(messages_event("messages", &batch)), (subscription, false)))
	});

	Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

async fn admin_matches(
	State(state): State<AppState>,
	Path(user_id): Path<String>,
) -> Result<Json<AdminMatchesResponse>, ApiError> {
	Ok(Json(state.service.admin_list_matches(&user_id).await?))
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
	let authorization = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok());

	Ok(state.service.authenticate(authorization).await?)
}

fn messages_event(name: &str, messages: &[Message]) -> Event {
	match Event::default().event(name).json_data(MessagesResponse::from_messages(messages)) {
		Ok(event) => event,
		Err(err) => {
			tracing::error!(error = %err, "Failed to encode thread event.");

			Event::default().event(name).data("{\"messages\":[]}")
		},
	}
}
