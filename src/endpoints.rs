//! The API endpoints URIs.
//!
//! For the route of a single member use [member_endpoint].

use crate::member::MemberId;

/// The route to list and create members.
pub const MEMBERS: &str = "/members";
/// The route to update, delete and adjust the post count of a single member.
pub const MEMBER: &str = "/members/{member_id}";
/// The route payment gateways call for every bank transfer.
pub const WEBHOOK: &str = "/webhook";
/// The route for the dashboard data.
pub const DASHBOARD: &str = "/dashboard";

/// The [MEMBER] route for `member_id`.
pub fn member_endpoint(member_id: MemberId) -> String {
    format!("{MEMBERS}/{member_id}")
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::member_endpoint;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::MEMBERS);
        assert_endpoint_is_valid_uri(endpoints::MEMBER);
        assert_endpoint_is_valid_uri(endpoints::WEBHOOK);
        assert_endpoint_is_valid_uri(endpoints::DASHBOARD);
    }

    #[test]
    fn member_endpoint_fills_in_the_id() {
        let endpoint = member_endpoint(42);

        assert_eq!(endpoint, "/members/42");
        assert_endpoint_is_valid_uri(&endpoint);
        assert_eq!(
            endpoint,
            endpoints::MEMBER.replace("{member_id}", "42"),
            "want the same shape as the route"
        );
    }
}
