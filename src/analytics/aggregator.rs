//! Analytics aggregation
//!
//! Summary queries over the append-only click log. All counts are derived
//! by scanning events inside the query window; nothing here maintains its
//! own mutable counters. The `click_count` on a LinkRecord is only the
//! fast-path total and must match `total_clicks` for an unrestricted
//! window, so pending recorder buffers are flushed before scanning.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::ClickRecorder;
use crate::errors::{LinksnipError, Result};
use crate::storage::LinkStore;

/// 时间桶粒度
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Hour,
    #[default]
    Day,
    Week,
    Month,
}

impl std::str::FromStr for Bucket {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            _ => Err(format!(
                "Invalid bucket: '{}'. Valid: hour, day, week, month",
                s
            )),
        }
    }
}

impl Bucket {
    /// 将时间戳截断到所在桶的起点
    pub fn truncate(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let day_start =
            |date: NaiveDate| date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());

        let truncated = match self {
            Bucket::Hour => ts
                .date_naive()
                .and_hms_opt(ts.hour(), 0, 0)
                .map(|dt| dt.and_utc()),
            Bucket::Day => day_start(ts.date_naive()),
            Bucket::Week => {
                // ISO 周，周一为起点
                let offset = ts.weekday().num_days_from_monday() as i64;
                day_start(ts.date_naive() - Duration::days(offset))
            }
            Bucket::Month => ts.date_naive().with_day(1).and_then(day_start),
        };
        truncated.unwrap_or(ts)
    }

    /// 桶起点推进到下一个桶
    fn advance(&self, bucket_start: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Bucket::Hour => bucket_start + Duration::hours(1),
            Bucket::Day => bucket_start + Duration::days(1),
            Bucket::Week => bucket_start + Duration::days(7),
            Bucket::Month => bucket_start
                .checked_add_months(Months::new(1))
                .unwrap_or(bucket_start + Duration::days(31)),
        }
    }
}

/// 时间线上的一个桶
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineBucket {
    pub bucket_start: DateTime<Utc>,
    pub count: u64,
}

/// 某别名在查询窗口内的点击汇总
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub alias: String,
    pub total_clicks: u64,
    pub by_source: HashMap<String, u64>,
    pub by_location: HashMap<String, u64>,
    /// 按桶起点升序，窗口内无点击的桶补零
    pub timeline: Vec<TimelineBucket>,
}

/// Analytics 聚合器
pub struct Aggregator {
    store: Arc<dyn LinkStore>,
    recorder: Arc<ClickRecorder>,
}

impl Aggregator {
    pub fn new(store: Arc<dyn LinkStore>, recorder: Arc<ClickRecorder>) -> Self {
        Self { store, recorder }
    }

    /// 严格解析查询窗口，支持 RFC3339 和 YYYY-MM-DD 格式
    ///
    /// 两端必须同时给出或同时省略；解析失败不静默回退
    pub fn parse_window_strict(
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>> {
        match (from, to) {
            (Some(s), Some(e)) => {
                let start = Self::parse_date(s).ok_or_else(|| {
                    LinksnipError::date_parse(format!(
                        "Invalid start date format: '{}'. Supported formats: RFC3339 or YYYY-MM-DD",
                        s
                    ))
                })?;
                let end = Self::parse_date(e).ok_or_else(|| {
                    LinksnipError::date_parse(format!(
                        "Invalid end date format: '{}'. Supported formats: RFC3339 or YYYY-MM-DD",
                        e
                    ))
                })?;
                if start > end {
                    return Err(LinksnipError::validation(
                        "Start date must not be later than end date",
                    ));
                }
                Ok(Some((start, end)))
            }
            (Some(_), None) => Err(LinksnipError::validation(
                "Start date is provided but end date is missing",
            )),
            (None, Some(_)) => Err(LinksnipError::validation(
                "End date is provided but start date is missing",
            )),
            (None, None) => Ok(None),
        }
    }

    fn parse_date(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| dt.and_utc())
            })
    }

    /// 汇总某别名的点击数据
    ///
    /// 窗口缺省为记录生命周期 `created_at .. min(now, expires_at)`
    pub async fn summarize(
        &self,
        alias: &str,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
        bucket: Bucket,
    ) -> Result<Summary> {
        self.summarize_at(alias, window, bucket, Utc::now()).await
    }

    pub async fn summarize_at(
        &self,
        alias: &str,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
        bucket: Bucket,
        now: DateTime<Utc>,
    ) -> Result<Summary> {
        let record = self.store.get(alias).await?.ok_or_else(|| {
            LinksnipError::alias_not_found(format!("Alias '{}' not found", alias))
        })?;

        // 先把缓冲中的事件刷入日志，保证扫描结果与 click_count 一致
        self.recorder.flush().await;

        let (start, end) = window.unwrap_or((record.created_at, record.expires_at.min(now)));

        let events = self.store.load_clicks(alias).await?;

        let mut total_clicks = 0u64;
        let mut by_source: HashMap<String, u64> = HashMap::new();
        let mut by_location: HashMap<String, u64> = HashMap::new();
        let mut bucket_counts: HashMap<DateTime<Utc>, u64> = HashMap::new();

        for event in &events {
            if event.occurred_at < start || event.occurred_at > end {
                continue;
            }
            total_clicks += 1;
            *by_source.entry(event.source.to_string()).or_insert(0) += 1;
            *by_location.entry(event.location.clone()).or_insert(0) += 1;
            *bucket_counts.entry(bucket.truncate(event.occurred_at)).or_insert(0) += 1;
        }

        // 时间线补零：从窗口起点所在桶走到窗口终点
        let mut timeline = Vec::new();
        if start <= end {
            let mut cursor = bucket.truncate(start);
            while cursor <= end {
                timeline.push(TimelineBucket {
                    bucket_start: cursor,
                    count: bucket_counts.get(&cursor).copied().unwrap_or(0),
                });
                cursor = bucket.advance(cursor);
            }
        }

        Ok(Summary {
            alias: record.alias,
            total_clicks,
            by_source,
            by_location,
            timeline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;
    use crate::storage::{ClickEvent, ClickSource, LinkRecord, LinkStore};
    use chrono::TimeZone;
    use tokio::time::Duration as TokioDuration;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn setup() -> (Arc<MemoryStore>, Arc<ClickRecorder>, Aggregator) {
        let store = Arc::new(MemoryStore::new());
        let sink = store.as_click_sink().expect("memory store is a sink");
        let recorder = Arc::new(ClickRecorder::new(
            sink,
            TokioDuration::from_secs(3600),
            100000,
        ));
        let aggregator = Aggregator::new(
            Arc::clone(&store) as Arc<dyn LinkStore>,
            Arc::clone(&recorder),
        );
        (store, recorder, aggregator)
    }

    async fn visit(
        store: &Arc<MemoryStore>,
        recorder: &Arc<ClickRecorder>,
        alias: &str,
        at: DateTime<Utc>,
        source: ClickSource,
        location: &str,
    ) {
        recorder.record(
            ClickEvent::new(alias.into(), at).with_context(source, Some(location.into())),
        );
        store.increment_clicks(alias).await.unwrap();
    }

    #[tokio::test]
    async fn test_summarize_unknown_alias() {
        let (_store, _recorder, aggregator) = setup();
        let err = aggregator
            .summarize_at("missing", None, Bucket::Day, t0())
            .await
            .unwrap_err();
        assert!(matches!(err, LinksnipError::AliasNotFound(_)));
    }

    #[tokio::test]
    async fn test_summarize_counts_and_breakdowns() {
        let (store, recorder, aggregator) = setup();
        let now = t0();
        store
            .insert(LinkRecord::new(
                "abc123".into(),
                "https://example.com".into(),
                120,
                now,
            ))
            .await
            .unwrap();

        visit(&store, &recorder, "abc123", now + Duration::minutes(1), ClickSource::Direct, "US")
            .await;
        visit(&store, &recorder, "abc123", now + Duration::minutes(2), ClickSource::Social, "US")
            .await;
        visit(&store, &recorder, "abc123", now + Duration::minutes(3), ClickSource::Social, "IN")
            .await;

        let summary = aggregator
            .summarize_at("abc123", None, Bucket::Day, now + Duration::minutes(10))
            .await
            .unwrap();

        assert_eq!(summary.total_clicks, 3);
        assert_eq!(summary.by_source.get("Direct"), Some(&1));
        assert_eq!(summary.by_source.get("Social"), Some(&2));
        assert_eq!(summary.by_location.get("US"), Some(&2));
        assert_eq!(summary.by_location.get("IN"), Some(&1));

        // 无限制窗口下与快速路径计数一致
        let record = store.get("abc123").await.unwrap().unwrap();
        assert_eq!(summary.total_clicks, record.click_count);
    }

    #[tokio::test]
    async fn test_summarize_flushes_pending_events() {
        let (store, recorder, aggregator) = setup();
        let now = t0();
        store
            .insert(LinkRecord::new(
                "abc123".into(),
                "https://example.com".into(),
                60,
                now,
            ))
            .await
            .unwrap();

        // 仅进入缓冲区，不手动刷盘
        visit(&store, &recorder, "abc123", now + Duration::minutes(1), ClickSource::Direct, "US")
            .await;
        assert_eq!(recorder.buffer_size(), 1);

        let summary = aggregator
            .summarize_at("abc123", None, Bucket::Day, now + Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(summary.total_clicks, 1);
        assert_eq!(recorder.buffer_size(), 0);
    }

    #[tokio::test]
    async fn test_timeline_zero_filled_daily_buckets() {
        let (store, recorder, aggregator) = setup();
        let now = t0();
        // 三天生命周期
        store
            .insert(LinkRecord::new(
                "abc123".into(),
                "https://example.com".into(),
                3 * 24 * 60,
                now,
            ))
            .await
            .unwrap();

        visit(&store, &recorder, "abc123", now + Duration::hours(1), ClickSource::Direct, "US")
            .await;
        // 第二天没有点击
        visit(&store, &recorder, "abc123", now + Duration::days(2), ClickSource::Search, "UK")
            .await;

        let summary = aggregator
            .summarize_at("abc123", None, Bucket::Day, now + Duration::days(2) + Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(summary.timeline.len(), 3);
        assert_eq!(summary.timeline[0].count, 1);
        assert_eq!(summary.timeline[1].count, 0);
        assert_eq!(summary.timeline[2].count, 1);
        // 升序且按天对齐
        assert_eq!(summary.timeline[0].bucket_start, Bucket::Day.truncate(now));
        assert!(summary.timeline[0].bucket_start < summary.timeline[1].bucket_start);
    }

    #[tokio::test]
    async fn test_explicit_window_restricts_counts() {
        let (store, recorder, aggregator) = setup();
        let now = t0();
        store
            .insert(LinkRecord::new(
                "abc123".into(),
                "https://example.com".into(),
                120,
                now,
            ))
            .await
            .unwrap();

        visit(&store, &recorder, "abc123", now + Duration::minutes(5), ClickSource::Direct, "US")
            .await;
        visit(&store, &recorder, "abc123", now + Duration::minutes(50), ClickSource::Direct, "US")
            .await;

        let window = Some((now, now + Duration::minutes(10)));
        let summary = aggregator
            .summarize_at("abc123", window, Bucket::Hour, now + Duration::minutes(60))
            .await
            .unwrap();
        assert_eq!(summary.total_clicks, 1);
    }

    #[test]
    fn test_bucket_truncate() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 10, 15, 42, 17).unwrap();

        assert_eq!(
            Bucket::Hour.truncate(ts),
            Utc.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap()
        );
        assert_eq!(
            Bucket::Day.truncate(ts),
            Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap()
        );
        // 2026-03-10 是周二，周起点为 03-09
        assert_eq!(
            Bucket::Week.truncate(ts),
            Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap()
        );
        assert_eq!(
            Bucket::Month.truncate(ts),
            Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_window_strict() {
        assert!(Aggregator::parse_window_strict(None, None).unwrap().is_none());

        let window =
            Aggregator::parse_window_strict(Some("2026-03-01"), Some("2026-03-10")).unwrap();
        assert!(window.is_some());

        assert!(matches!(
            Aggregator::parse_window_strict(Some("not-a-date"), Some("2026-03-10")),
            Err(LinksnipError::DateParse(_))
        ));
        assert!(matches!(
            Aggregator::parse_window_strict(Some("2026-03-10"), Some("2026-03-01")),
            Err(LinksnipError::Validation(_))
        ));
        assert!(matches!(
            Aggregator::parse_window_strict(Some("2026-03-01"), None),
            Err(LinksnipError::Validation(_))
        ));
    }
}
