//! S3 ListObjects 响应解析
//!
//! 只发一次请求，不跟随续页标记：服务端单页最多返回 1000 条，超出部分会被截断。

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{Result, StorageError};
use crate::storage::ListEntry;

#[derive(Debug, Deserialize)]
struct ListBucketResult {
    #[serde(rename = "Contents", default)]
    contents: Vec<Contents>,
    #[serde(rename = "IsTruncated", default)]
    is_truncated: bool,
}

#[derive(Debug, Deserialize)]
struct Contents {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "LastModified")]
    last_modified: DateTime<Utc>,
    #[serde(rename = "Size")]
    size: u64,
}

/// 单页列表结果
#[derive(Debug, Clone, Default)]
pub struct Listing {
    /// 按服务端返回顺序
    pub entries: Vec<ListEntry>,
    /// 服务端是否还有未返回的条目
    pub is_truncated: bool,
}

/// 解析 ListBucketResult XML
pub fn parse_listing(body: &[u8]) -> Result<Listing> {
    let text = std::str::from_utf8(body).map_err(|e| StorageError::Parse(e.to_string()))?;
    let result: ListBucketResult = quick_xml::de::from_str(text)?;

    let entries = result
        .contents
        .into_iter()
        .map(|c| ListEntry {
            key: c.key,
            last_modified: c.last_modified,
            size: c.size,
        })
        .collect();

    Ok(Listing {
        entries,
        is_truncated: result.is_truncated,
    })
}

/// 规范化列举前缀：去掉开头的斜杠，结尾保证恰好一个斜杠；空前缀表示整个桶
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_start_matches('/').trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
    <Name>mongotool</Name>
    <Prefix>backups/</Prefix>
    <Marker></Marker>
    <MaxKeys>1000</MaxKeys>
    <IsTruncated>false</IsTruncated>
    <Contents>
        <Key>backups/b.bson</Key>
        <LastModified>2009-10-12T17:50:30.000Z</LastModified>
        <ETag>&quot;fba9dede5f27731c9771645a39863328&quot;</ETag>
        <Size>434234</Size>
        <StorageClass>STANDARD</StorageClass>
        <Owner>
            <ID>75aa57f09aa0c8caeab4f8c24e99d10f8e7faeebf76c078efc7c6caea54ba06a</ID>
            <DisplayName>mtd@amazon.com</DisplayName>
        </Owner>
    </Contents>
    <Contents>
        <Key>backups/a.bson</Key>
        <LastModified>2013-05-24T00:00:00Z</LastModified>
        <Size>3</Size>
    </Contents>
</ListBucketResult>"#;

    #[test]
    fn test_parse_listing_keeps_server_order() {
        let listing = parse_listing(SAMPLE.as_bytes()).unwrap();
        assert!(!listing.is_truncated);
        assert_eq!(listing.entries.len(), 2);

        assert_eq!(listing.entries[0].key, "backups/b.bson");
        assert_eq!(listing.entries[0].size, 434234);
        assert_eq!(
            listing.entries[0].last_modified,
            Utc.with_ymd_and_hms(2009, 10, 12, 17, 50, 30).unwrap()
        );
        assert_eq!(listing.entries[1].key, "backups/a.bson");
        assert_eq!(listing.entries[1].size, 3);
    }

    #[test]
    fn test_parse_empty_listing() {
        let body = r#"<ListBucketResult><Name>b</Name><IsTruncated>false</IsTruncated></ListBucketResult>"#;
        let listing = parse_listing(body.as_bytes()).unwrap();
        assert!(listing.entries.is_empty());
    }

    #[test]
    fn test_parse_truncated_flag() {
        let body = r#"<ListBucketResult><IsTruncated>true</IsTruncated><Contents><Key>k</Key><LastModified>2013-05-24T00:00:00Z</LastModified><Size>1</Size></Contents></ListBucketResult>"#;
        let listing = parse_listing(body.as_bytes()).unwrap();
        assert!(listing.is_truncated);
        assert_eq!(listing.entries.len(), 1);
    }

    #[test]
    fn test_parse_malformed_listing() {
        let bad_date = r#"<ListBucketResult><Contents><Key>k</Key><LastModified>yesterday</LastModified><Size>1</Size></Contents></ListBucketResult>"#;
        assert!(matches!(parse_listing(bad_date.as_bytes()), Err(StorageError::Parse(_))));

        let bad_size = r#"<ListBucketResult><Contents><Key>k</Key><LastModified>2013-05-24T00:00:00Z</LastModified><Size>big</Size></Contents></ListBucketResult>"#;
        assert!(matches!(parse_listing(bad_size.as_bytes()), Err(StorageError::Parse(_))));

        assert!(matches!(parse_listing(&[0xff, 0xfe]), Err(StorageError::Parse(_))));
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("backups"), "backups/");
        assert_eq!(normalize_prefix("/backups"), "backups/");
        assert_eq!(normalize_prefix("///backups/"), "backups/");
        assert_eq!(normalize_prefix("a/b//"), "a/b/");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix(""), "");
    }
}
