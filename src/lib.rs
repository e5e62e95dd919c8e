pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

pub use error::{ErrorKind, FamilyError};

// Export logic types
pub use logic::{
    BidirectionalSync, EditPreview, FamilyOperations, LayoutEngine, RelationshipEditOutcome,
    RelationshipEditRequest, RelationshipValidator, StaleStateError, ValidationError,
};

// Export all model types
pub use model::*;

// Export seed module
pub use seed::*;

// Export store types
pub use store::{InMemoryStore, Store};

/// Build the full application router over `store`
pub fn build_app<S: Store + 'static>(
    store: std::sync::Arc<S>,
    layout: LayoutConfig,
) -> axum::Router {
    crate::api::routes::create_router()
        .layer(axum::Extension(layout))
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(store)
}
