use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::api::handlers;
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<Arc<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Family trees
        .route(
            "/trees",
            get(handlers::list_trees::<S>).post(handlers::create_tree::<S>),
        )
        .route(
            "/trees/:tree_id",
            get(handlers::get_tree::<S>).delete(handlers::delete_tree::<S>),
        )
        // Members
        .route(
            "/trees/:tree_id/members",
            get(handlers::list_members::<S>).post(handlers::create_member::<S>),
        )
        .route(
            "/trees/:tree_id/members/:member_id",
            get(handlers::get_member::<S>)
                .patch(handlers::update_member::<S>)
                .delete(handlers::delete_member::<S>),
        )
        // Relationship edits go through the validator before anything is written
        .route(
            "/trees/:tree_id/members/:member_id/relationships",
            put(handlers::update_relationships::<S>),
        )
        .route(
            "/trees/:tree_id/members/:member_id/relationships/validate",
            post(handlers::validate_relationships::<S>),
        )
        .route(
            "/trees/:tree_id/relationships",
            get(handlers::list_relationships::<S>).post(handlers::create_relationship::<S>),
        )
        // Layout
        .route("/trees/:tree_id/layout", get(handlers::get_layout::<S>))
}
