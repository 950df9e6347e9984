// ABOUTME: Opaque-cursor pagination for list endpoints
// ABOUTME: base64 tokens over a (sort key, row id) payload; keyset, not offsets

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use daybook_storage::{StorageError, StorageResult};

/// Default page size for paginated queries
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Maximum page size to prevent performance issues
pub const MAX_PAGE_SIZE: i64 = 100;

/// Query parameters shared by every list endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CursorParams {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

impl CursorParams {
    /// The effective page size, clamped to 1..=MAX_PAGE_SIZE
    pub fn limit(&self) -> i64 {
        clamp_limit(self.limit)
    }
}

/// The effective page size, clamped to 1..=MAX_PAGE_SIZE
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// What a cursor token actually carries: the last-seen row's sort key
/// (rendered as text) and its id as the tiebreaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CursorPayload {
    k: String,
    id: String,
}

fn encode(key: String, id: &str) -> String {
    let payload = CursorPayload {
        k: key,
        id: id.to_string(),
    };
    let bytes = serde_json::to_vec(&payload).expect("cursor payload serializes");
    URL_SAFE_NO_PAD.encode(bytes)
}

fn decode(token: &str) -> StorageResult<CursorPayload> {
    let invalid = || StorageError::InvalidState("Invalid pagination cursor".to_string());
    let bytes = URL_SAFE_NO_PAD.decode(token).map_err(|_| invalid())?;
    serde_json::from_slice(&bytes).map_err(|_| invalid())
}

/// Cursor over rows sorted by a timestamp (created_at)
pub fn encode_time_cursor(ts: DateTime<Utc>, id: &str) -> String {
    encode(ts.to_rfc3339(), id)
}

pub fn decode_time_cursor(token: &str) -> StorageResult<(DateTime<Utc>, String)> {
    let payload = decode(token)?;
    let ts = DateTime::parse_from_rfc3339(&payload.k)
        .map_err(|_| StorageError::InvalidState("Invalid pagination cursor".to_string()))?
        .with_timezone(&Utc);
    Ok((ts, payload.id))
}

/// Cursor over rows sorted by a calendar day (journals)
pub fn encode_date_cursor(date: NaiveDate, id: &str) -> String {
    encode(date.to_string(), id)
}

pub fn decode_date_cursor(token: &str) -> StorageResult<(NaiveDate, String)> {
    let payload = decode(token)?;
    let date = payload
        .k
        .parse::<NaiveDate>()
        .map_err(|_| StorageError::InvalidState("Invalid pagination cursor".to_string()))?;
    Ok((date, payload.id))
}

/// Cursor over rows sorted by a text column (tag names)
pub fn encode_text_cursor(key: &str, id: &str) -> String {
    encode(key.to_string(), id)
}

pub fn decode_text_cursor(token: &str) -> StorageResult<(String, String)> {
    let payload = decode(token)?;
    Ok((payload.k, payload.id))
}

/// One page of results plus the cursor for the next one
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(rename = "nextCursor")]
    pub next_cursor: Option<String>,
}

/// Turn a fetch of `limit + 1` rows into a page: the extra row only
/// signals that another page exists.
pub fn paginate<T>(mut items: Vec<T>, limit: i64, encode: impl Fn(&T) -> String) -> Page<T> {
    let has_more = items.len() as i64 > limit;
    if has_more {
        items.truncate(limit as usize);
    }
    let next_cursor = if has_more {
        items.last().map(&encode)
    } else {
        None
    };

    Page { items, next_cursor }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_clamping() {
        assert_eq!(CursorParams::default().limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(
            CursorParams {
                limit: Some(500),
                cursor: None
            }
            .limit(),
            MAX_PAGE_SIZE
        );
        assert_eq!(
            CursorParams {
                limit: Some(-3),
                cursor: None
            }
            .limit(),
            1
        );
    }

    #[test]
    fn test_time_cursor_round_trip() {
        let ts = Utc::now();
        let token = encode_time_cursor(ts, "task-abc");
        let (back_ts, back_id) = decode_time_cursor(&token).unwrap();
        assert_eq!(back_ts, ts);
        assert_eq!(back_id, "task-abc");
    }

    #[test]
    fn test_date_cursor_round_trip() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let token = encode_date_cursor(date, "jrnl-1");
        assert_eq!(decode_date_cursor(&token).unwrap(), (date, "jrnl-1".to_string()));
    }

    #[test]
    fn test_cursor_is_opaque_but_rejects_garbage() {
        let token = encode_text_cursor("admin", "tag-1");
        assert!(!token.contains("admin")); // base64, not plaintext

        assert!(decode_text_cursor("not!!base64").is_err());
        assert!(decode_time_cursor(&encode_text_cursor("not-a-date", "x")).is_err());
    }

    #[test]
    fn test_paginate_reports_next_cursor_only_when_more() {
        let page = paginate(vec![1, 2, 3], 2, |n| format!("c{}", n));
        assert_eq!(page.items, vec![1, 2]);
        assert_eq!(page.next_cursor.as_deref(), Some("c2"));

        let last = paginate(vec![1, 2], 2, |n| format!("c{}", n));
        assert_eq!(last.items, vec![1, 2]);
        assert!(last.next_cursor.is_none());
    }
}
