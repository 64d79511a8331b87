//! Deployment index retrieval

use logtail_core::error::FetchError;
use logtail_core::index::{INDEX_PATH, INDEX_TAIL_BYTES};
use logtail_core::{parse_index, IndexRecord, RangeFetcher, RangeRequest};
use std::fmt::Write as _;
use tracing::debug;
use url::Url;

/// URL of the latest index below `base`
///
/// # Errors
/// `url::ParseError` if the path cannot be joined
pub fn index_url(base: &Url) -> Result<Url, url::ParseError> {
    base.join(INDEX_PATH)
}

/// Fetch and parse the trailing part of the latest index
///
/// An empty index yields no records.
///
/// # Errors
/// Any fetch failure other than an empty file
pub async fn fetch_index(fetcher: &dyn RangeFetcher, url: &Url) -> Result<Vec<IndexRecord>, FetchError> {
    let chunk = match fetcher
        .fetch(url.as_str(), RangeRequest::suffix(INDEX_TAIL_BYTES))
        .await
    {
        Ok(chunk) => chunk,
        Err(FetchError::EmptyFile { .. }) => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let text = String::from_utf8_lossy(&chunk.bytes);
    let records = parse_index(&text, chunk.offset == 0);
    debug!(%url, offset = chunk.offset, records = records.len(), "index loaded");
    Ok(records)
}

/// One display line for a record
#[must_use]
pub fn format_record(record: &IndexRecord) -> String {
    let mut line = format!(
        "{} {} {:<12} {:?}",
        record.time,
        record.deployment,
        record.role.as_deref().unwrap_or("-"),
        record.marker,
    );
    let _ = write!(
        line,
        " {}@{}",
        record.pointer.view_path(),
        record.pointer.offset()
    );
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use logtail_core::{filtered, RoleFilter};
    use logtail_test_utils::{MemoryLog, MemoryRangeFetcher};

    const INDEX: &str = concat!(
        r#"["t1","d1",{"variant":"Global","fields":["2024",0]},"DeploymentStart"]"#,
        "\n",
        r#"["t2","d1",{"variant":"Role","fields":["web","2024",10]},"RoleStart"]"#,
        "\n",
        r#"["t3","d1",{"variant":"Role","fields":["web","2024",90]},"RoleFinish"]"#,
        "\n",
    );

    #[test]
    fn joins_index_path() {
        let base = Url::parse("http://cluster:8379/").unwrap();
        assert_eq!(
            index_url(&base).unwrap().as_str(),
            "http://cluster:8379/v1/log/index/latest"
        );
    }

    #[tokio::test]
    async fn whole_index_keeps_first_record() {
        let fetcher = MemoryRangeFetcher::new(MemoryLog::with_content(INDEX));
        let url = Url::parse("http://cluster/v1/log/index/latest").unwrap();

        let records = fetch_index(&fetcher, &url).await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].time, "t1");
        assert_eq!(
            fetcher.requests(),
            vec![RangeRequest::suffix(INDEX_TAIL_BYTES)]
        );

        let web = filtered(&records, &RoleFilter::parse("web"));
        assert_eq!(web.len(), 2);
        let line = format_record(web[0]);
        assert!(line.starts_with("t2 d1 web"));
        assert!(line.ends_with("/v1/log/role/web/log.2024.txt@10"));
    }

    #[tokio::test]
    async fn empty_index_has_no_records() {
        let fetcher = MemoryRangeFetcher::new(MemoryLog::new());
        let url = Url::parse("http://cluster/v1/log/index/latest").unwrap();
        assert!(fetch_index(&fetcher, &url).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failures_propagate() {
        let fetcher = MemoryRangeFetcher::new(MemoryLog::with_content(INDEX));
        fetcher.fail_next(FetchError::Status(503));
        let url = Url::parse("http://cluster/v1/log/index/latest").unwrap();
        assert_eq!(
            fetch_index(&fetcher, &url).await.unwrap_err(),
            FetchError::Status(503)
        );
    }
}
