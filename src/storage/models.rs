use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter};

/// 短链接记录
///
/// 除 `click_count` 外所有字段写入后不可变；过期是逻辑状态，
/// 记录永远不会被物理删除，别名因此始终保持占用。
#[derive(Debug, Clone)]
pub struct LinkRecord {
    pub alias: String,
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// 快速路径总点击数，只增不减
    pub click_count: u64,
}

impl LinkRecord {
    /// 以 `now` 为创建时间构造新记录，`expires_at = now + ttl_minutes`
    pub fn new(alias: String, target_url: String, ttl_minutes: i64, now: DateTime<Utc>) -> Self {
        Self {
            alias,
            target_url,
            created_at: now,
            expires_at: now + Duration::minutes(ttl_minutes),
            click_count: 0,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// 流量来源
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, EnumIter, AsRefStr,
)]
#[serde(rename_all = "PascalCase")]
#[strum(serialize_all = "PascalCase")]
pub enum ClickSource {
    Direct,
    Social,
    Email,
    Search,
    #[default]
    Other,
}

impl std::fmt::Display for ClickSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl std::str::FromStr for ClickSource {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "social" => Ok(Self::Social),
            "email" => Ok(Self::Email),
            "search" => Ok(Self::Search),
            "other" => Ok(Self::Other),
            _ => Err(format!(
                "Invalid click source: '{}'. Valid: Direct, Social, Email, Search, Other",
                s
            )),
        }
    }
}

/// 一次成功跳转产生的点击事件（追加写，不会删除）
#[derive(Debug, Clone)]
pub struct ClickEvent {
    /// 短链接别名
    pub alias: String,
    /// 点击时间戳
    pub occurred_at: DateTime<Utc>,
    /// 流量来源
    pub source: ClickSource,
    /// 国家/地区代码，未知时为 "unknown"
    pub location: String,
}

impl ClickEvent {
    /// 创建新的点击事件，来源与地区使用默认值
    pub fn new(alias: String, occurred_at: DateTime<Utc>) -> Self {
        Self {
            alias,
            occurred_at,
            source: ClickSource::default(),
            location: "unknown".to_string(),
        }
    }

    /// 设置来源与地区信息
    pub fn with_context(mut self, source: ClickSource, location: Option<String>) -> Self {
        self.source = source;
        if let Some(location) = location.filter(|l| !l.is_empty()) {
            self.location = location;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_expiry_boundary() {
        let now = Utc::now();
        let record = LinkRecord::new("abc123".into(), "https://example.com".into(), 30, now);

        assert_eq!(record.created_at, now);
        assert_eq!(record.expires_at, now + Duration::minutes(30));
        assert_eq!(record.click_count, 0);

        // expires_at 当下仍然有效，过后才算过期
        assert!(!record.is_expired_at(record.expires_at));
        assert!(record.is_expired_at(record.expires_at + Duration::seconds(1)));
        assert!(!record.is_expired_at(now + Duration::minutes(29)));
        assert!(record.is_expired_at(now + Duration::minutes(31)));
    }

    #[test]
    fn test_click_source_round_trip_names() {
        use strum::IntoEnumIterator;

        for source in ClickSource::iter() {
            let parsed: ClickSource = source.as_ref().parse().unwrap();
            assert_eq!(parsed, source);
        }
    }

    #[test]
    fn test_click_source_from_str() {
        assert_eq!("direct".parse::<ClickSource>().unwrap(), ClickSource::Direct);
        assert_eq!("Search".parse::<ClickSource>().unwrap(), ClickSource::Search);
        assert_eq!("EMAIL".parse::<ClickSource>().unwrap(), ClickSource::Email);
        assert!("unknown-thing".parse::<ClickSource>().is_err());
    }

    #[test]
    fn test_click_event_defaults() {
        let event = ClickEvent::new("abc123".into(), Utc::now());
        assert_eq!(event.source, ClickSource::Other);
        assert_eq!(event.location, "unknown");

        let event = event.with_context(ClickSource::Social, Some("US".into()));
        assert_eq!(event.source, ClickSource::Social);
        assert_eq!(event.location, "US");

        // 空字符串不覆盖默认地区
        let event = ClickEvent::new("abc123".into(), Utc::now())
            .with_context(ClickSource::Direct, Some(String::new()));
        assert_eq!(event.location, "unknown");
    }
}
