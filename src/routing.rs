//! Application router configuration.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
};

use crate::{
    AppState,
    dashboard::get_dashboard_endpoint,
    endpoints,
    ledger::record_transfer_endpoint,
    member::{
        adjust_post_count_endpoint, create_member_endpoint, delete_member_endpoint,
        list_members_endpoint, update_member_endpoint,
    },
    not_found::get_404_not_found,
};

/// The largest request body accepted, in bytes. Member images are sent
/// inline as data URLs, so this is well above axum's default.
pub const REQUEST_BODY_LIMIT: usize = 8 * 1024 * 1024;

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            endpoints::MEMBERS,
            get(list_members_endpoint).post(create_member_endpoint),
        )
        .route(
            endpoints::MEMBER,
            patch(update_member_endpoint)
                .delete(delete_member_endpoint)
                .post(adjust_post_count_endpoint),
        )
        .route(endpoints::WEBHOOK, post(record_transfer_endpoint))
        .route(endpoints::DASHBOARD, get(get_dashboard_endpoint))
        .fallback(get_404_not_found)
        .layer(DefaultBodyLimit::max(REQUEST_BODY_LIMIT))
        .with_state(state)
}
