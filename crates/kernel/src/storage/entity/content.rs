//! Content record.
//!
//! A single piece of content of some content type. Storage hydrates the
//! persisted columns and attaches the content type afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status of content that is visible to visitors.
pub const STATUS_PUBLISHED: &str = "published";

/// Content record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Content type slug, attached by storage after hydration.
    #[serde(skip)]
    contenttype: Option<String>,

    id: Option<i64>,

    #[serde(default)]
    slug: String,

    datecreated: Option<DateTime<Utc>>,
    datechanged: Option<DateTime<Utc>>,

    #[serde(default)]
    datepublish: Option<DateTime<Utc>>,

    #[serde(default)]
    datedepublish: Option<DateTime<Utc>>,

    ownerid: Option<i64>,

    #[serde(default)]
    status: String,

    /// Per-template field values.
    #[serde(default)]
    templatefields: Value,
}

impl Content {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn set_slug(&mut self, slug: impl Into<String>) {
        self.slug = slug.into();
    }

    /// Creation time, or the current time if it was never stored.
    ///
    /// The fallback is computed fresh on every call.
    pub fn datecreated(&self) -> DateTime<Utc> {
        self.datecreated.unwrap_or_else(Utc::now)
    }

    pub fn set_datecreated(&mut self, date: DateTime<Utc>) {
        self.datecreated = Some(date);
    }

    /// Last change time, or the current time if it was never stored.
    ///
    /// The fallback is computed fresh on every call.
    pub fn datechanged(&self) -> DateTime<Utc> {
        self.datechanged.unwrap_or_else(Utc::now)
    }

    pub fn set_datechanged(&mut self, date: DateTime<Utc>) {
        self.datechanged = Some(date);
    }

    pub fn datepublish(&self) -> Option<DateTime<Utc>> {
        self.datepublish
    }

    pub fn set_datepublish(&mut self, date: Option<DateTime<Utc>>) {
        self.datepublish = date;
    }

    pub fn datedepublish(&self) -> Option<DateTime<Utc>> {
        self.datedepublish
    }

    pub fn set_datedepublish(&mut self, date: Option<DateTime<Utc>>) {
        self.datedepublish = date;
    }

    pub fn ownerid(&self) -> Option<i64> {
        self.ownerid
    }

    pub fn set_ownerid(&mut self, ownerid: i64) {
        self.ownerid = Some(ownerid);
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn is_published(&self) -> bool {
        self.status == STATUS_PUBLISHED
    }

    pub fn templatefields(&self) -> &Value {
        &self.templatefields
    }

    pub fn set_templatefields(&mut self, fields: Value) {
        self.templatefields = fields;
    }

    pub fn contenttype(&self) -> Option<&str> {
        self.contenttype.as_deref()
    }

    pub fn set_contenttype(&mut self, contenttype: impl Into<String>) {
        self.contenttype = Some(contenttype.into());
    }
}
