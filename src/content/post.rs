//! Post records: raw documents from the content API and their validated forms

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::rich_text::Block;
use crate::error::{BlogError, Result};
use crate::helpers::{parse_timestamp, DateFormatter};

/// One page of a paginated document query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPage {
    /// Cursor to the next page; `None` or empty when this is the last page
    pub next_page: Option<String>,
    pub results: Vec<RawPost>,
}

impl RawPage {
    /// Validate an untyped response body against the page schema
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(mut object) = value else {
            return Err(BlogError::malformed("page is not a JSON object"));
        };

        let next_page = match object.remove("next_page") {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(url)) => Some(url),
            Some(other) => {
                return Err(BlogError::malformed(format!(
                    "next_page must be a string or null, got {}",
                    other
                )))
            }
        };

        let results = match object.remove("results") {
            Some(serde_json::Value::Array(results)) => results,
            _ => return Err(BlogError::malformed("page has no results array")),
        };

        let results = results
            .into_iter()
            .enumerate()
            .map(|(index, record)| RawPost::from_value(record, index))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { next_page, results })
    }

    /// The continuation cursor, treating an empty string as absent
    pub fn cursor(&self) -> Option<&str> {
        self.next_page.as_deref().filter(|url| !url.is_empty())
    }
}

/// A post document as stored in the content repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPost {
    pub uid: String,
    pub first_publication_date: Option<String>,
    pub data: RawPostData,
}

impl RawPost {
    /// Validate one record; `index` is its position in the page, for error messages
    pub fn from_value(value: serde_json::Value, index: usize) -> Result<Self> {
        let uid = value
            .get("uid")
            .and_then(|u| u.as_str())
            .unwrap_or("<no uid>")
            .to_string();

        let post: RawPost = serde_json::from_value(value)
            .map_err(|e| BlogError::malformed(format!("record {} ({}): {}", index, uid, e)))?;

        if post.uid.trim().is_empty() {
            return Err(BlogError::malformed(format!("record {} has an empty uid", index)));
        }
        if let Some(date) = post.first_publication_date.as_deref() {
            if parse_timestamp(date).is_none() {
                return Err(BlogError::malformed(format!(
                    "record {} ({}): invalid first_publication_date '{}'",
                    index, uid, date
                )));
            }
        }

        Ok(post)
    }
}

/// Custom fields of a post document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPostData {
    pub title: String,
    pub subtitle: String,
    pub author: String,
    #[serde(default)]
    pub banner: Option<RawImage>,
    #[serde(default)]
    pub content: Vec<RawSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawImage {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSection {
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default)]
    pub body: Vec<Block>,
}

/// A display-ready entry of the listing page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummary {
    pub slug: String,
    /// Localized publication date, e.g. "19 Abr 2021"
    pub first_publication_date: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

impl PostSummary {
    /// Normalize a raw record for display
    pub fn from_raw(raw: &RawPost, formatter: &DateFormatter) -> Result<Self> {
        Ok(Self {
            slug: raw.uid.clone(),
            first_publication_date: formatter.format_raw(raw.first_publication_date.as_deref())?,
            title: raw.data.title.clone(),
            subtitle: raw.data.subtitle.clone(),
            author: raw.data.author.clone(),
        })
    }
}

/// One titled section of a post body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub heading: String,
    pub body: Vec<Block>,
}

/// A fully resolved post
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostDetail {
    pub slug: String,
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner_url: String,
    pub sections: Vec<Section>,
}

impl PostDetail {
    /// Validate a raw record as a post with a banner and body
    pub fn from_raw(raw: RawPost) -> Result<Self> {
        let first_publication_date = match raw.first_publication_date.as_deref() {
            Some(date) => Some(parse_timestamp(date).ok_or_else(|| {
                BlogError::malformed(format!("{}: invalid first_publication_date '{}'", raw.uid, date))
            })?),
            None => None,
        };

        let banner_url = raw
            .data
            .banner
            .and_then(|banner| banner.url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| BlogError::malformed(format!("{}: missing banner url", raw.uid)))?;

        let sections = raw
            .data
            .content
            .into_iter()
            .map(|section| Section {
                heading: section.heading.unwrap_or_default(),
                body: section.body,
            })
            .collect();

        Ok(Self {
            slug: raw.uid,
            first_publication_date,
            title: raw.data.title,
            subtitle: raw.data.subtitle,
            author: raw.data.author,
            banner_url,
            sections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::Locale;
    use serde_json::json;

    fn formatter() -> DateFormatter {
        DateFormatter::new(Locale::PtBr, chrono_tz::UTC, "\u{2014}")
    }

    fn raw_record(uid: &str, date: serde_json::Value) -> serde_json::Value {
        json!({
            "uid": uid,
            "first_publication_date": date,
            "data": {
                "title": "Como utilizar Hooks",
                "subtitle": "Pensando em sincronização em vez de ciclos de vida",
                "author": "Joseph Oliveira"
            }
        })
    }

    #[test]
    fn test_page_from_value() {
        let page = RawPage::from_value(json!({
            "next_page": "https://cms/api?page=2",
            "results": [raw_record("como-utilizar-hooks", json!("2021-03-15T19:25:28+0000"))]
        }))
        .unwrap();
        assert_eq!(page.cursor(), Some("https://cms/api?page=2"));
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].uid, "como-utilizar-hooks");
    }

    #[test]
    fn test_empty_cursor_is_absent() {
        let page = RawPage::from_value(json!({ "next_page": "", "results": [] })).unwrap();
        assert_eq!(page.cursor(), None);
        let page = RawPage::from_value(json!({ "next_page": null, "results": [] })).unwrap();
        assert_eq!(page.cursor(), None);
    }

    #[test]
    fn test_malformed_records_are_rejected() {
        let missing_title = json!({
            "next_page": null,
            "results": [{ "uid": "x", "first_publication_date": null, "data": { "subtitle": "s", "author": "a" } }]
        });
        let err = RawPage::from_value(missing_title).unwrap_err();
        assert!(matches!(err, BlogError::MalformedRecord { .. }));
        assert!(err.to_string().contains("record 0 (x)"));

        let bad_date = json!({ "next_page": null, "results": [raw_record("y", json!("yesterday"))] });
        assert!(RawPage::from_value(bad_date).is_err());

        let empty_uid = json!({ "next_page": null, "results": [raw_record(" ", json!(null))] });
        assert!(RawPage::from_value(empty_uid).is_err());

        assert!(RawPage::from_value(json!({ "next_page": 3, "results": [] })).is_err());
        assert!(RawPage::from_value(json!({ "next_page": null })).is_err());
        assert!(RawPage::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn test_summary_from_raw() {
        let raw = RawPost::from_value(raw_record("hooks", json!("2021-04-19T12:00:00Z")), 0).unwrap();
        let summary = PostSummary::from_raw(&raw, &formatter()).unwrap();
        assert_eq!(summary.slug, "hooks");
        assert_eq!(summary.first_publication_date, "19 Abr 2021");
        assert_eq!(summary.author, "Joseph Oliveira");

        let undated = RawPost::from_value(raw_record("undated", json!(null)), 0).unwrap();
        let summary = PostSummary::from_raw(&undated, &formatter()).unwrap();
        assert_eq!(summary.first_publication_date, "\u{2014}");
    }

    #[test]
    fn test_detail_from_raw() {
        let mut record = raw_record("hooks", json!("2021-04-19T12:00:00Z"));
        record["data"]["banner"] = json!({ "url": "https://images.prismic.io/banner.png" });
        record["data"]["content"] = json!([
            { "heading": "Proin et varius", "body": [{ "type": "paragraph", "text": "Lorem ipsum", "spans": [] }] },
            { "heading": null, "body": [] }
        ]);
        let detail = PostDetail::from_raw(RawPost::from_value(record, 0).unwrap()).unwrap();
        assert_eq!(detail.banner_url, "https://images.prismic.io/banner.png");
        assert_eq!(detail.sections.len(), 2);
        assert_eq!(detail.sections[1].heading, "");
        assert!(detail.first_publication_date.is_some());
    }

    #[test]
    fn test_detail_requires_banner() {
        let raw = RawPost::from_value(raw_record("hooks", json!(null)), 0).unwrap();
        assert!(matches!(
            PostDetail::from_raw(raw),
            Err(BlogError::MalformedRecord { .. })
        ));
    }
}
