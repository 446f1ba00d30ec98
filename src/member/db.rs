//! Database operations for members.

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::{
    Error,
    member::{Member, MemberId, MemberName, MemberPatch, NewMember},
};

const MEMBER_COLUMNS: &str = "id, name, image, posts_this_month, total_posts, display_order";

/// Initialize the member table.
pub fn create_member_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS member (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            image TEXT,
            posts_this_month INTEGER NOT NULL DEFAULT 0 CHECK (posts_this_month >= 0),
            total_posts INTEGER NOT NULL DEFAULT 0 CHECK (total_posts >= 0),
            display_order INTEGER NOT NULL DEFAULT 0
        )",
        (),
    )?;

    Ok(())
}

/// Create a member with both post counters set to zero and return it with its generated ID.
pub fn create_member(new_member: NewMember, connection: &Connection) -> Result<Member, Error> {
    connection.execute(
        "INSERT INTO member (name, image, posts_this_month, total_posts, display_order)
        VALUES (?1, ?2, 0, 0, ?3)",
        params![new_member.name.as_ref(), new_member.image, new_member.order],
    )?;

    let id = connection.last_insert_rowid();

    Ok(Member {
        id,
        name: new_member.name,
        image: new_member.image,
        posts_this_month: 0,
        total_posts: 0,
        order: new_member.order,
    })
}

/// Retrieve a single member by ID.
pub fn get_member(member_id: MemberId, connection: &Connection) -> Result<Member, Error> {
    connection
        .prepare(&format!("SELECT {MEMBER_COLUMNS} FROM member WHERE id = :id"))?
        .query_row(&[(":id", &member_id)], map_row_to_member)
        .map_err(|error| error.into())
}

/// Retrieve all members in the order they were stored.
pub fn get_all_members(connection: &Connection) -> Result<Vec<Member>, Error> {
    connection
        .prepare(&format!("SELECT {MEMBER_COLUMNS} FROM member ORDER BY id ASC"))?
        .query_map([], map_row_to_member)?
        .map(|maybe_member| maybe_member.map_err(|error| error.into()))
        .collect()
}

/// Apply a partial update to a member and return the updated member.
///
/// An empty patch returns the member unchanged.
///
/// # Errors
/// Returns [Error::UpdateMissingMember] if the member does not exist, or
/// [Error::EmptyMemberName] if the patch sets an empty name.
pub fn update_member(
    member_id: MemberId,
    patch: &MemberPatch,
    connection: &Connection,
) -> Result<Member, Error> {
    let name = patch.name.as_deref().map(MemberName::new).transpose()?;

    if patch.is_empty() {
        return get_member(member_id, connection).map_err(|error| match error {
            Error::NotFound => Error::UpdateMissingMember,
            error => error,
        });
    }

    let (set_image, image) = match &patch.image {
        Some(image) => (true, image.clone()),
        None => (false, None),
    };

    connection
        .query_row(
            &format!(
                "UPDATE member
                SET \
                    name = COALESCE(?1, name), \
                    image = CASE WHEN ?2 THEN ?3 ELSE image END, \
                    display_order = COALESCE(?4, display_order) \
                WHERE id = ?5
                RETURNING {MEMBER_COLUMNS}"
            ),
            params![
                name.as_ref().map(|name| name.as_ref()),
                set_image,
                image,
                patch.order,
                member_id
            ],
            map_row_to_member,
        )
        .optional()?
        .ok_or(Error::UpdateMissingMember)
}

/// Delete a member by ID and return the deleted member.
///
/// # Errors
/// Returns [Error::DeleteMissingMember] if the member does not exist.
pub fn delete_member(member_id: MemberId, connection: &Connection) -> Result<Member, Error> {
    connection
        .query_row(
            &format!("DELETE FROM member WHERE id = ?1 RETURNING {MEMBER_COLUMNS}"),
            [member_id],
            map_row_to_member,
        )
        .optional()?
        .ok_or(Error::DeleteMissingMember)
}

/// Increment or decrement both post counters of a member in a single statement.
///
/// Decrementing clamps each counter at zero independently. The read and the
/// write happen inside SQLite, so concurrent adjustments cannot lose updates.
///
/// # Errors
/// Returns [Error::NotFound] if the member does not exist.
pub fn adjust_post_count(
    member_id: MemberId,
    increment: bool,
    connection: &Connection,
) -> Result<Member, Error> {
    connection
        .query_row(
            &format!(
                "UPDATE member
                SET \
                    posts_this_month = CASE WHEN ?1 THEN posts_this_month + 1 \
                        ELSE MAX(0, posts_this_month - 1) END, \
                    total_posts = CASE WHEN ?1 THEN total_posts + 1 \
                        ELSE MAX(0, total_posts - 1) END \
                WHERE id = ?2
                RETURNING {MEMBER_COLUMNS}"
            ),
            params![increment, member_id],
            map_row_to_member,
        )
        .map_err(Error::from)
}

/// Set `posts_this_month` to zero for every member and return the updated members.
pub fn reset_monthly_posts(connection: &Connection) -> Result<Vec<Member>, Error> {
    let mut members = connection
        .prepare(&format!(
            "UPDATE member SET posts_this_month = 0 RETURNING {MEMBER_COLUMNS}"
        ))?
        .query_map([], map_row_to_member)?
        .collect::<Result<Vec<_>, _>>()?;

    members.sort_by_key(|member| member.id);

    Ok(members)
}

pub fn map_row_to_member(row: &Row) -> Result<Member, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_name: String = row.get(1)?;
    let image = row.get(2)?;
    let posts_this_month = row.get(3)?;
    let total_posts = row.get(4)?;
    let order = row.get(5)?;

    Ok(Member {
        id,
        name: MemberName::new_unchecked(&raw_name),
        image,
        posts_this_month,
        total_posts,
        order,
    })
}

#[cfg(test)]
mod member_query_tests {
    use std::collections::HashSet;

    use rusqlite::Connection;

    use crate::{
        Error,
        member::{MemberName, MemberPatch, NewMember},
    };

    use super::{
        adjust_post_count, create_member, create_member_table, delete_member, get_all_members,
        get_member, reset_monthly_posts, update_member,
    };

    fn get_test_db_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        create_member_table(&connection).expect("Could not create member table");
        connection
    }

    fn new_member(name: &str) -> NewMember {
        NewMember {
            order: 1,
            name: MemberName::new_unchecked(name),
            image: None,
        }
    }

    #[test]
    fn create_member_starts_counters_at_zero() {
        let connection = get_test_db_connection();

        let member = create_member(new_member("Ann"), &connection).expect("Could not create member");

        assert!(member.id > 0);
        assert_eq!(member.posts_this_month, 0);
        assert_eq!(member.total_posts, 0);
        assert_eq!(get_member(member.id, &connection), Ok(member));
    }

    #[test]
    fn get_member_with_invalid_id_returns_not_found() {
        let connection = get_test_db_connection();
        let member = create_member(new_member("Ann"), &connection).unwrap();

        assert_eq!(get_member(member.id + 123, &connection), Err(Error::NotFound));
    }

    #[test]
    fn get_all_members_returns_every_member() {
        let connection = get_test_db_connection();
        let inserted = HashSet::from([
            create_member(new_member("Ann"), &connection).unwrap().id,
            create_member(new_member("Bo"), &connection).unwrap().id,
        ]);

        let selected = get_all_members(&connection).expect("Could not get members");

        assert_eq!(
            inserted,
            selected.iter().map(|member| member.id).collect::<HashSet<_>>()
        );
    }

    #[test]
    fn update_member_changes_only_given_fields() {
        let connection = get_test_db_connection();
        let member = create_member(
            NewMember {
                order: 3,
                name: MemberName::new_unchecked("Ann"),
                image: Some("https://example.com/ann.png".to_owned()),
            },
            &connection,
        )
        .unwrap();

        let updated = update_member(
            member.id,
            &MemberPatch {
                name: Some("Annie".to_owned()),
                ..Default::default()
            },
            &connection,
        )
        .expect("Could not update member");

        assert_eq!(updated.name.as_ref(), "Annie");
        assert_eq!(updated.image, member.image);
        assert_eq!(updated.order, 3);
    }

    #[test]
    fn update_member_clears_image_with_null() {
        let connection = get_test_db_connection();
        let member = create_member(
            NewMember {
                order: 1,
                name: MemberName::new_unchecked("Ann"),
                image: Some("data:image/png;base64,AAAA".to_owned()),
            },
            &connection,
        )
        .unwrap();

        let updated = update_member(
            member.id,
            &MemberPatch {
                image: Some(None),
                order: Some(7),
                ..Default::default()
            },
            &connection,
        )
        .unwrap();

        assert_eq!(updated.image, None);
        assert_eq!(updated.order, 7);
    }

    #[test]
    fn update_member_rejects_empty_name() {
        let connection = get_test_db_connection();
        let member = create_member(new_member("Ann"), &connection).unwrap();

        let result = update_member(
            member.id,
            &MemberPatch {
                name: Some("  ".to_owned()),
                ..Default::default()
            },
            &connection,
        );

        assert_eq!(result, Err(Error::EmptyMemberName));
        assert_eq!(get_member(member.id, &connection), Ok(member));
    }

    #[test]
    fn update_member_with_invalid_id_returns_error() {
        let connection = get_test_db_connection();

        let with_changes = update_member(
            999,
            &MemberPatch {
                order: Some(1),
                ..Default::default()
            },
            &connection,
        );
        let without_changes = update_member(999, &MemberPatch::default(), &connection);

        assert_eq!(with_changes, Err(Error::UpdateMissingMember));
        assert_eq!(without_changes, Err(Error::UpdateMissingMember));
    }

    #[test]
    fn delete_member_removes_row() {
        let connection = get_test_db_connection();
        let member = create_member(new_member("Ann"), &connection).unwrap();

        let deleted = delete_member(member.id, &connection);

        assert_eq!(deleted, Ok(member.clone()));
        assert_eq!(get_member(member.id, &connection), Err(Error::NotFound));
    }

    #[test]
    fn delete_member_with_invalid_id_returns_error() {
        let connection = get_test_db_connection();

        assert_eq!(
            delete_member(999, &connection),
            Err(Error::DeleteMissingMember)
        );
    }

    #[test]
    fn increment_increases_both_counters() {
        let connection = get_test_db_connection();
        let member = create_member(new_member("Ann"), &connection).unwrap();

        adjust_post_count(member.id, true, &connection).unwrap();
        let member = adjust_post_count(member.id, true, &connection).unwrap();

        assert_eq!(member.posts_this_month, 2);
        assert_eq!(member.total_posts, 2);
    }

    #[test]
    fn decrement_clamps_each_counter_at_zero() {
        let connection = get_test_db_connection();
        let member = create_member(new_member("Ann"), &connection).unwrap();
        connection
            .execute(
                "UPDATE member SET posts_this_month = 1, total_posts = 4 WHERE id = ?1",
                [member.id],
            )
            .unwrap();

        let mut adjusted = member;
        for _ in 0..3 {
            adjusted = adjust_post_count(adjusted.id, false, &connection).unwrap();
        }

        assert_eq!(adjusted.posts_this_month, 0);
        assert_eq!(adjusted.total_posts, 1);
    }

    #[test]
    fn adjust_missing_member_returns_not_found() {
        let connection = get_test_db_connection();

        assert_eq!(
            adjust_post_count(42, true, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn reset_monthly_posts_keeps_total_posts() {
        let connection = get_test_db_connection();
        let ann = create_member(new_member("Ann"), &connection).unwrap();
        let bo = create_member(new_member("Bo"), &connection).unwrap();
        adjust_post_count(ann.id, true, &connection).unwrap();
        adjust_post_count(bo.id, true, &connection).unwrap();
        adjust_post_count(bo.id, true, &connection).unwrap();

        let members = reset_monthly_posts(&connection).unwrap();

        assert_eq!(members.len(), 2);
        assert!(members.iter().all(|member| member.posts_this_month == 0));
        assert_eq!(members[0].total_posts, 1);
        assert_eq!(members[1].total_posts, 2);
    }
}
