//! Community members and their post counts.

mod adjust;
mod create;
mod db;
mod delete;
mod domain;
mod edit;
mod list;

pub use adjust::adjust_post_count_endpoint;
pub use create::create_member_endpoint;
pub use db::{
    adjust_post_count, create_member, create_member_table, delete_member, get_all_members,
    reset_monthly_posts, update_member,
};
#[cfg(test)]
pub use db::get_member;
pub use delete::delete_member_endpoint;
pub use domain::{Member, MemberId, MemberName, MemberPatch, NewMember};
pub use edit::update_member_endpoint;
pub use list::list_members_endpoint;
