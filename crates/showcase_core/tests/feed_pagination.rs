mod common;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use common::{days_ago, ids, noon, seed_project, seed_published, seed_user, service, today};
use showcase_core::db::open_db_in_memory;
use showcase_core::{
    FeedRequest, FeedSort, MemberRole, ProjectId, ProjectRepository, ProjectServiceError,
    SqliteProjectRepository,
};
use std::collections::HashSet;

fn new_feed(limit: i64, cursor: Option<String>) -> FeedRequest {
    FeedRequest {
        sort: Some(FeedSort::New),
        limit: Some(limit),
        cursor,
        ..FeedRequest::default()
    }
}

fn top_feed(limit: i64, cursor: Option<String>) -> FeedRequest {
    FeedRequest {
        sort: Some(FeedSort::Top),
        limit: Some(limit),
        cursor,
        ..FeedRequest::default()
    }
}

fn cursor_message(err: ProjectServiceError) -> String {
    match err {
        ProjectServiceError::Cursor(err) => err.message().to_string(),
        other => panic!("expected cursor error, got {other}"),
    }
}

#[test]
fn new_feed_pages_through_in_creation_order() {
    let conn = open_db_in_memory().unwrap();
    let author = seed_user(&conn, "ada@example.com");
    let t = noon();
    let newest = seed_published(&conn, author, 0, t);
    let middle = seed_published(&conn, author, 0, t - Duration::minutes(1));
    let oldest = seed_published(&conn, author, 0, t - Duration::minutes(2));
    let service = service(&conn);

    let first = service.list_projects_at(&new_feed(2, None), today()).unwrap();
    assert_eq!(ids(&first), vec![newest, middle]);
    assert!(first.next_cursor.is_some());

    let second = service
        .list_projects_at(&new_feed(2, first.next_cursor), today())
        .unwrap();
    assert_eq!(ids(&second), vec![oldest]);
    assert!(second.next_cursor.is_none());
}

#[test]
fn exact_page_boundary_has_no_continuation() {
    let conn = open_db_in_memory().unwrap();
    let author = seed_user(&conn, "ada@example.com");
    seed_published(&conn, author, 0, noon());
    seed_published(&conn, author, 0, noon() - Duration::hours(1));

    let page = service(&conn)
        .list_projects_at(&new_feed(2, None), today())
        .unwrap();
    assert_eq!(page.items.len(), 2);
    assert!(page.next_cursor.is_none());
}

#[test]
fn top_feed_excludes_projects_outside_default_window() {
    let conn = open_db_in_memory().unwrap();
    let author = seed_user(&conn, "ada@example.com");
    let hundred = seed_published(&conn, author, 100, days_ago(10));
    let ninety = seed_published(&conn, author, 90, days_ago(30));
    seed_published(&conn, author, 999, days_ago(150));

    let page = service(&conn)
        .list_projects_at(&top_feed(10, None), today())
        .unwrap();
    assert_eq!(ids(&page), vec![hundred, ninety]);
    assert!(page.next_cursor.is_none());
}

#[test]
fn top_feed_is_the_default_sort() {
    let conn = open_db_in_memory().unwrap();
    let author = seed_user(&conn, "ada@example.com");
    let low = seed_published(&conn, author, 1, days_ago(1));
    let high = seed_published(&conn, author, 7, days_ago(2));

    let page = service(&conn)
        .list_projects_at(&FeedRequest::default(), today())
        .unwrap();
    assert_eq!(ids(&page), vec![high, low]);
}

#[test]
fn vote_ties_break_on_created_at_then_id() {
    let conn = open_db_in_memory().unwrap();
    let author = seed_user(&conn, "ada@example.com");
    let older = seed_published(&conn, author, 42, days_ago(5));
    let newer = seed_published(&conn, author, 42, days_ago(4));
    let same_a = seed_published(&conn, author, 42, days_ago(6));
    let same_b = seed_published(&conn, author, 42, days_ago(6));
    let service = service(&conn);

    let mut same_instant = vec![same_a, same_b];
    same_instant.sort_by_key(|id| std::cmp::Reverse(id.to_string()));
    let mut expected = vec![newer, older];
    expected.extend(same_instant);

    let mut seen = Vec::new();
    let mut cursor = None;
    loop {
        let page = service
            .list_projects_at(&top_feed(1, cursor), today())
            .unwrap();
        seen.extend(ids(&page));
        cursor = page.next_cursor;
        if cursor.is_none() {
            break;
        }
    }
    assert_eq!(seen, expected);
}

#[test]
fn top_pagination_visits_every_row_exactly_once() {
    let conn = open_db_in_memory().unwrap();
    let author = seed_user(&conn, "ada@example.com");
    let votes = [5, 5, 5, 3, 3, 1, 0, 0, 7, 7, 2];
    let mut seeded: Vec<(i64, chrono::DateTime<Utc>, ProjectId)> = votes
        .iter()
        .enumerate()
        .map(|(idx, votes)| {
            let created_at = days_ago(i64::try_from(idx % 4).unwrap() + 1);
            (*votes, created_at, seed_published(&conn, author, *votes, created_at))
        })
        .collect();
    seeded.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then(b.1.cmp(&a.1))
            .then(b.2.to_string().cmp(&a.2.to_string()))
    });
    let expected: Vec<ProjectId> = seeded.iter().map(|(_, _, id)| *id).collect();

    let service = service(&conn);
    let mut seen = Vec::new();
    let mut cursor = None;
    loop {
        let page = service
            .list_projects_at(&top_feed(3, cursor), today())
            .unwrap();
        assert!(page.items.len() <= 3);
        seen.extend(ids(&page));
        cursor = page.next_cursor;
        if cursor.is_none() {
            break;
        }
    }

    assert_eq!(seen, expected);
    let unique: HashSet<_> = seen.iter().collect();
    assert_eq!(unique.len(), seen.len());
}

#[test]
fn first_page_is_idempotent_for_a_fixed_window() {
    let conn = open_db_in_memory().unwrap();
    let author = seed_user(&conn, "ada@example.com");
    for votes in 0..5 {
        seed_published(&conn, author, votes, days_ago(votes + 1));
    }
    let service = service(&conn);

    let first = service.list_projects_at(&top_feed(3, None), today()).unwrap();
    let again = service.list_projects_at(&top_feed(3, None), today()).unwrap();
    assert_eq!(ids(&first), ids(&again));
    assert_eq!(first.next_cursor, again.next_cursor);
}

#[test]
fn limit_is_clamped_into_supported_range() {
    let conn = open_db_in_memory().unwrap();
    let author = seed_user(&conn, "ada@example.com");
    for idx in 0..105 {
        seed_published(&conn, author, 0, noon() - Duration::minutes(idx));
    }
    let service = service(&conn);

    let tiny = service.list_projects_at(&new_feed(0, None), today()).unwrap();
    assert_eq!(tiny.items.len(), 1);
    assert!(tiny.next_cursor.is_some());

    let negative = service.list_projects_at(&new_feed(-3, None), today()).unwrap();
    assert_eq!(negative.items.len(), 1);

    let huge = service.list_projects_at(&new_feed(500, None), today()).unwrap();
    assert_eq!(huge.items.len(), 100);
    assert!(huge.next_cursor.is_some());
}

#[test]
fn drafts_never_appear_in_the_feed() {
    let conn = open_db_in_memory().unwrap();
    let author = seed_user(&conn, "ada@example.com");
    let published = seed_published(&conn, author, 1, days_ago(1));
    seed_project(&conn, author, 500, days_ago(1), None);

    let service = service(&conn);
    let top = service.list_projects_at(&top_feed(10, None), today()).unwrap();
    let new = service.list_projects_at(&new_feed(10, None), today()).unwrap();
    assert_eq!(ids(&top), vec![published]);
    assert_eq!(ids(&new), vec![published]);
}

#[test]
fn new_feed_ignores_publication_window() {
    let conn = open_db_in_memory().unwrap();
    let author = seed_user(&conn, "ada@example.com");
    let ancient = seed_published(&conn, author, 0, days_ago(400));

    let request = FeedRequest {
        published_from: NaiveDate::from_ymd_opt(2026, 6, 1),
        published_to: NaiveDate::from_ymd_opt(2026, 6, 10),
        ..new_feed(10, None)
    };
    let page = service(&conn).list_projects_at(&request, today()).unwrap();
    assert_eq!(ids(&page), vec![ancient]);
}

#[test]
fn top_cursor_resumes_its_explicit_window() {
    let conn = open_db_in_memory().unwrap();
    let author = seed_user(&conn, "ada@example.com");
    let winter = |day| Utc.with_ymd_and_hms(2025, 2, day, 9, 0, 0).unwrap();
    let first = seed_published(&conn, author, 9, winter(1));
    let second = seed_published(&conn, author, 8, winter(2));
    seed_published(&conn, author, 50, days_ago(1));
    let service = service(&conn);

    let request = FeedRequest {
        published_from: NaiveDate::from_ymd_opt(2025, 1, 1),
        published_to: NaiveDate::from_ymd_opt(2025, 3, 31),
        ..top_feed(1, None)
    };
    let page = service.list_projects_at(&request, today()).unwrap();
    assert_eq!(ids(&page), vec![first]);

    // Dates omitted: the window comes back out of the cursor.
    let resumed = service
        .list_projects_at(&top_feed(1, page.next_cursor.clone()), today())
        .unwrap();
    assert_eq!(ids(&resumed), vec![second]);
    assert!(resumed.next_cursor.is_none());

    let repeated = FeedRequest {
        cursor: page.next_cursor,
        ..request
    };
    let resumed = service.list_projects_at(&repeated, today()).unwrap();
    assert_eq!(ids(&resumed), vec![second]);
}

#[test]
fn top_cursor_replayed_with_other_window_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let author = seed_user(&conn, "ada@example.com");
    seed_published(&conn, author, 2, Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap());
    seed_published(&conn, author, 1, Utc.with_ymd_and_hms(2025, 2, 2, 9, 0, 0).unwrap());
    let service = service(&conn);

    let request = FeedRequest {
        published_from: NaiveDate::from_ymd_opt(2025, 1, 1),
        published_to: NaiveDate::from_ymd_opt(2025, 3, 31),
        ..top_feed(1, None)
    };
    let page = service.list_projects_at(&request, today()).unwrap();
    let cursor = page.next_cursor.unwrap();

    let other_window = FeedRequest {
        published_from: NaiveDate::from_ymd_opt(2020, 1, 1),
        published_to: NaiveDate::from_ymd_opt(2020, 12, 31),
        ..top_feed(1, Some(cursor))
    };
    let err = service.list_projects_at(&other_window, today()).unwrap_err();
    assert_eq!(cursor_message(err), "Invalid cursor");
}

#[test]
fn cursor_from_other_sort_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let author = seed_user(&conn, "ada@example.com");
    seed_published(&conn, author, 0, days_ago(1));
    seed_published(&conn, author, 0, days_ago(2));
    let service = service(&conn);

    let page = service.list_projects_at(&new_feed(1, None), today()).unwrap();
    let err = service
        .list_projects_at(&top_feed(1, page.next_cursor), today())
        .unwrap_err();
    assert_eq!(
        cursor_message(err),
        "Cursor sort does not match requested sort"
    );
}

#[test]
fn garbage_cursor_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    for garbage in ["not a cursor!!", "bm90IGpzb24", "WzEsMl0"] {
        let err = service
            .list_projects_at(&new_feed(5, Some(garbage.to_string())), today())
            .unwrap_err();
        assert_eq!(cursor_message(err), "Invalid cursor");
    }
}

#[test]
fn inverted_date_range_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let request = FeedRequest {
        published_from: NaiveDate::from_ymd_opt(2026, 5, 1),
        published_to: NaiveDate::from_ymd_opt(2026, 4, 1),
        ..top_feed(5, None)
    };

    let err = service(&conn).list_projects_at(&request, today()).unwrap_err();
    assert_eq!(cursor_message(err), "Invalid date range");
}

#[test]
fn author_filter_restricts_feed() {
    let conn = open_db_in_memory().unwrap();
    let ada = seed_user(&conn, "ada@example.com");
    let linus = seed_user(&conn, "linus@example.com");
    let mine = seed_published(&conn, ada, 3, days_ago(1));
    seed_published(&conn, linus, 9, days_ago(1));

    let request = FeedRequest {
        author: Some(ada),
        ..top_feed(10, None)
    };
    let page = service(&conn).list_projects_at(&request, today()).unwrap();
    assert_eq!(ids(&page), vec![mine]);
}

#[test]
fn page_items_carry_their_members() {
    let conn = open_db_in_memory().unwrap();
    let ada = seed_user(&conn, "ada@example.com");
    let grace = seed_user(&conn, "grace@example.com");
    let solo = seed_published(&conn, ada, 1, days_ago(2));
    let group = seed_published(&conn, ada, 2, days_ago(1));

    let repo = SqliteProjectRepository::try_new(&conn).unwrap();
    repo.add_member(group, grace, MemberRole::Contributor, noon())
        .unwrap();

    let page = service(&conn)
        .list_projects_at(&top_feed(10, None), today())
        .unwrap();
    assert_eq!(ids(&page), vec![group, solo]);

    let group_members: Vec<_> = page.items[0]
        .members
        .iter()
        .map(|member| (member.user_id, member.role))
        .collect();
    assert_eq!(
        group_members,
        vec![(ada, MemberRole::Owner), (grace, MemberRole::Contributor)]
    );
    assert_eq!(page.items[0].members[1].full_name.as_deref(), Some("grace"));
    assert_eq!(page.items[1].members.len(), 1);
}
