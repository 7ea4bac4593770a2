#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Content entity tests.

use std::time::Duration;

use bolt_kernel::storage::entity::{Content, STATUS_PUBLISHED};
use chrono::{TimeZone, Utc};
use serde_json::json;

#[test]
fn test_default_dates_are_not_memoized() {
    let content = Content::new();

    let first = content.datecreated();
    std::thread::sleep(Duration::from_millis(5));
    let second = content.datecreated();

    assert!(second > first);
}

#[test]
fn test_stored_dates_win() {
    let created = Utc.with_ymd_and_hms(2015, 11, 3, 9, 30, 0).unwrap();
    let changed = Utc.with_ymd_and_hms(2016, 1, 12, 14, 0, 0).unwrap();

    let mut content = Content::new();
    content.set_datecreated(created);
    content.set_datechanged(changed);

    assert_eq!(content.datecreated(), created);
    assert_eq!(content.datechanged(), changed);
}

#[test]
fn test_accessors() {
    let mut content = Content::new();
    content.set_id(42);
    content.set_slug("hello-world");
    content.set_ownerid(3);
    content.set_status(STATUS_PUBLISHED);
    content.set_templatefields(json!({"subtitle": "Hi"}));
    content.set_contenttype("entries");

    let publish = Utc.with_ymd_and_hms(2016, 2, 1, 0, 0, 0).unwrap();
    content.set_datepublish(Some(publish));

    assert_eq!(content.id(), Some(42));
    assert_eq!(content.slug(), "hello-world");
    assert_eq!(content.ownerid(), Some(3));
    assert_eq!(content.status(), "published");
    assert!(content.is_published());
    assert_eq!(content.templatefields()["subtitle"], "Hi");
    assert_eq!(content.contenttype(), Some("entries"));
    assert_eq!(content.datepublish(), Some(publish));
    assert!(content.datedepublish().is_none());
}

#[test]
fn test_round_trip_drops_contenttype() {
    let mut content = Content::new();
    content.set_slug("about");
    content.set_contenttype("pages");

    let value = serde_json::to_value(&content).unwrap();
    let back: Content = serde_json::from_value(value).unwrap();

    assert_eq!(back.slug(), "about");
    assert!(back.contenttype().is_none());
}
