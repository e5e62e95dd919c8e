use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension, Json as RequestJson,
};
use log::error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ErrorKind, FamilyError};
use crate::logic::{
    EditPreview, FamilyOperations, MemberDeletion, RelationshipEditOutcome,
    RelationshipEditRequest,
};
use crate::model::{
    FamilyLayout, FamilyTree, Id, LayoutConfig, Member, MemberUpdate, NewFamilyTree, NewMember,
    Relationship, UserContext,
};
use crate::store::traits::Store;

pub type AppState<S> = Arc<S>;

type ApiResult<T> = Result<T, (StatusCode, Json<ErrorResponse>)>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    /// Current member state on a stale-state conflict
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

/// Per-request overrides of the configured layout geometry
#[derive(Debug, Default, Deserialize)]
pub struct LayoutQuery {
    pub node_width: Option<f64>,
    pub spouse_gap: Option<f64>,
    pub unit_gap: Option<f64>,
    pub vertical_spacing: Option<f64>,
}

impl LayoutQuery {
    fn apply(&self, base: LayoutConfig) -> LayoutConfig {
        LayoutConfig {
            node_width: self.node_width.unwrap_or(base.node_width),
            spouse_gap: self.spouse_gap.unwrap_or(base.spouse_gap),
            unit_gap: self.unit_gap.unwrap_or(base.unit_gap),
            vertical_spacing: self.vertical_spacing.unwrap_or(base.vertical_spacing),
        }
    }
}

impl ErrorResponse {
    pub fn new(message: &str, code: &str) -> Self {
        Self {
            error: message.to_string(),
            code: code.to_string(),
            details: None,
        }
    }
}

impl From<FamilyError> for (StatusCode, Json<ErrorResponse>) {
    fn from(err: FamilyError) -> Self {
        let status = match err.kind() {
            ErrorKind::Rejected => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {:#}", err);
        }

        let mut body = ErrorResponse::new(&err.to_string(), err.code());
        if let FamilyError::StaleState(stale) = &err {
            body.details = serde_json::to_value(stale).ok();
        }
        (status, Json(body))
    }
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

// Family trees

pub async fn list_trees<S: Store>(
    State(store): State<AppState<S>>,
) -> ApiResult<Json<ListResponse<FamilyTree>>> {
    let trees = FamilyOperations::list_trees(&*store).await?;
    Ok(Json(trees.into()))
}

pub async fn create_tree<S: Store>(
    State(store): State<AppState<S>>,
    user: UserContext,
    RequestJson(input): RequestJson<NewFamilyTree>,
) -> ApiResult<(StatusCode, Json<FamilyTree>)> {
    let tree = FamilyOperations::create_tree(&*store, input, &user).await?;
    Ok((StatusCode::CREATED, Json(tree)))
}

pub async fn get_tree<S: Store>(
    State(store): State<AppState<S>>,
    Path(tree_id): Path<Id>,
) -> ApiResult<Json<FamilyTree>> {
    Ok(Json(FamilyOperations::get_tree(&*store, &tree_id).await?))
}

pub async fn delete_tree<S: Store>(
    State(store): State<AppState<S>>,
    Path(tree_id): Path<Id>,
) -> ApiResult<Json<serde_json::Value>> {
    FamilyOperations::delete_tree(&*store, &tree_id).await?;
    Ok(Json(serde_json::json!({
        "deleted": true,
        "id": tree_id,
    })))
}

// Members

pub async fn list_members<S: Store>(
    State(store): State<AppState<S>>,
    Path(tree_id): Path<Id>,
) -> ApiResult<Json<ListResponse<Member>>> {
    let members = FamilyOperations::list_members(&*store, &tree_id).await?;
    Ok(Json(members.into()))
}

pub async fn create_member<S: Store>(
    State(store): State<AppState<S>>,
    Path(tree_id): Path<Id>,
    user: UserContext,
    RequestJson(input): RequestJson<NewMember>,
) -> ApiResult<(StatusCode, Json<Member>)> {
    let member = FamilyOperations::create_member(&*store, &tree_id, input, &user).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn get_member<S: Store>(
    State(store): State<AppState<S>>,
    Path((tree_id, member_id)): Path<(Id, Id)>,
) -> ApiResult<Json<Member>> {
    Ok(Json(
        FamilyOperations::get_member(&*store, &tree_id, &member_id).await?,
    ))
}

pub async fn update_member<S: Store>(
    State(store): State<AppState<S>>,
    Path((tree_id, member_id)): Path<(Id, Id)>,
    user: UserContext,
    RequestJson(update): RequestJson<MemberUpdate>,
) -> ApiResult<Json<Member>> {
    let member =
        FamilyOperations::update_member_profile(&*store, &tree_id, &member_id, update, &user)
            .await?;
    Ok(Json(member))
}

pub async fn delete_member<S: Store>(
    State(store): State<AppState<S>>,
    Path((tree_id, member_id)): Path<(Id, Id)>,
    user: UserContext,
) -> ApiResult<Json<MemberDeletion>> {
    let deletion = FamilyOperations::delete_member(&*store, &tree_id, &member_id, &user).await?;
    Ok(Json(deletion))
}

// Relationships

pub async fn update_relationships<S: Store>(
    State(store): State<AppState<S>>,
    Path((tree_id, member_id)): Path<(Id, Id)>,
    user: UserContext,
    RequestJson(request): RequestJson<RelationshipEditRequest>,
) -> ApiResult<Json<RelationshipEditOutcome>> {
    let outcome =
        FamilyOperations::edit_relationships(&*store, &tree_id, &member_id, request, &user)
            .await?;
    Ok(Json(outcome))
}

/// Dry run of a relationship edit; `oldState` is ignored, the stored state is used
pub async fn validate_relationships<S: Store>(
    State(store): State<AppState<S>>,
    Path((tree_id, member_id)): Path<(Id, Id)>,
    RequestJson(request): RequestJson<RelationshipEditRequest>,
) -> ApiResult<Json<EditPreview>> {
    let preview = FamilyOperations::preview_relationship_edit(
        &*store,
        &tree_id,
        &member_id,
        &request.proposed,
    )
    .await?;
    Ok(Json(preview))
}

pub async fn list_relationships<S: Store>(
    State(store): State<AppState<S>>,
    Path(tree_id): Path<Id>,
) -> ApiResult<Json<ListResponse<Relationship>>> {
    let relationships = FamilyOperations::list_relationships(&*store, &tree_id).await?;
    Ok(Json(relationships.into()))
}

pub async fn create_relationship<S: Store>(
    State(store): State<AppState<S>>,
    Path(tree_id): Path<Id>,
    user: UserContext,
    RequestJson(relationship): RequestJson<Relationship>,
) -> ApiResult<Json<RelationshipEditOutcome>> {
    let outcome =
        FamilyOperations::add_relationship(&*store, &tree_id, &relationship, &user).await?;
    Ok(Json(outcome))
}

// Layout

pub async fn get_layout<S: Store>(
    State(store): State<AppState<S>>,
    Path(tree_id): Path<Id>,
    Query(query): Query<LayoutQuery>,
    defaults: Option<Extension<LayoutConfig>>,
) -> ApiResult<Json<FamilyLayout>> {
    let base = defaults.map(|Extension(config)| config).unwrap_or_default();
    let config = query.apply(base);
    let layout = FamilyOperations::compute_layout(&*store, &tree_id, &config).await?;
    Ok(Json(layout))
}
