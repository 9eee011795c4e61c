use std::fmt;

#[derive(Debug, Clone)]
pub enum LinksnipError {
    InvalidUrl(String),
    InvalidAlias(String),
    InvalidTtl(String),
    AliasTaken(String),
    AliasAlreadyExists(String),
    AliasSpaceExhausted(String),
    AliasNotFound(String),
    AliasExpired(String),
    StorageUnavailable(String),
    StorageBackendNotFound(String),
    Validation(String),
    Serialization(String),
    DateParse(String),
}

impl LinksnipError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            LinksnipError::InvalidUrl(_) => "E001",
            LinksnipError::InvalidAlias(_) => "E002",
            LinksnipError::InvalidTtl(_) => "E003",
            LinksnipError::AliasTaken(_) => "E004",
            LinksnipError::AliasAlreadyExists(_) => "E005",
            LinksnipError::AliasSpaceExhausted(_) => "E006",
            LinksnipError::AliasNotFound(_) => "E007",
            LinksnipError::AliasExpired(_) => "E008",
            LinksnipError::StorageUnavailable(_) => "E009",
            LinksnipError::StorageBackendNotFound(_) => "E010",
            LinksnipError::Validation(_) => "E011",
            LinksnipError::Serialization(_) => "E012",
            LinksnipError::DateParse(_) => "E013",
        }
    }

    /// 获取稳定的错误类型名称（展示层按此分派，不做字符串匹配）
    pub fn kind(&self) -> &'static str {
        match self {
            LinksnipError::InvalidUrl(_) => "InvalidUrl",
            LinksnipError::InvalidAlias(_) => "InvalidAlias",
            LinksnipError::InvalidTtl(_) => "InvalidTtl",
            LinksnipError::AliasTaken(_) => "AliasTaken",
            LinksnipError::AliasAlreadyExists(_) => "AliasAlreadyExists",
            LinksnipError::AliasSpaceExhausted(_) => "AliasSpaceExhausted",
            LinksnipError::AliasNotFound(_) => "AliasNotFound",
            LinksnipError::AliasExpired(_) => "AliasExpired",
            LinksnipError::StorageUnavailable(_) => "StorageUnavailable",
            LinksnipError::StorageBackendNotFound(_) => "StorageBackendNotFound",
            LinksnipError::Validation(_) => "Validation",
            LinksnipError::Serialization(_) => "Serialization",
            LinksnipError::DateParse(_) => "DateParse",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            LinksnipError::InvalidUrl(msg) => msg,
            LinksnipError::InvalidAlias(msg) => msg,
            LinksnipError::InvalidTtl(msg) => msg,
            LinksnipError::AliasTaken(msg) => msg,
            LinksnipError::AliasAlreadyExists(msg) => msg,
            LinksnipError::AliasSpaceExhausted(msg) => msg,
            LinksnipError::AliasNotFound(msg) => msg,
            LinksnipError::AliasExpired(msg) => msg,
            LinksnipError::StorageUnavailable(msg) => msg,
            LinksnipError::StorageBackendNotFound(msg) => msg,
            LinksnipError::Validation(msg) => msg,
            LinksnipError::Serialization(msg) => msg,
            LinksnipError::DateParse(msg) => msg,
        }
    }

    /// 格式化为彩色输出（用于 Server 模式）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.kind().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.kind(), self.message())
    }
}

impl fmt::Display for LinksnipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 默认使用简洁格式
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for LinksnipError {}

// 便捷的构造函数
impl LinksnipError {
    pub fn invalid_url<T: Into<String>>(msg: T) -> Self {
        LinksnipError::InvalidUrl(msg.into())
    }

    pub fn invalid_alias<T: Into<String>>(msg: T) -> Self {
        LinksnipError::InvalidAlias(msg.into())
    }

    pub fn invalid_ttl<T: Into<String>>(msg: T) -> Self {
        LinksnipError::InvalidTtl(msg.into())
    }

    pub fn alias_taken<T: Into<String>>(msg: T) -> Self {
        LinksnipError::AliasTaken(msg.into())
    }

    pub fn alias_already_exists<T: Into<String>>(msg: T) -> Self {
        LinksnipError::AliasAlreadyExists(msg.into())
    }

    pub fn alias_space_exhausted<T: Into<String>>(msg: T) -> Self {
        LinksnipError::AliasSpaceExhausted(msg.into())
    }

    pub fn alias_not_found<T: Into<String>>(msg: T) -> Self {
        LinksnipError::AliasNotFound(msg.into())
    }

    pub fn alias_expired<T: Into<String>>(msg: T) -> Self {
        LinksnipError::AliasExpired(msg.into())
    }

    pub fn storage_unavailable<T: Into<String>>(msg: T) -> Self {
        LinksnipError::StorageUnavailable(msg.into())
    }

    pub fn storage_backend_not_found<T: Into<String>>(msg: T) -> Self {
        LinksnipError::StorageBackendNotFound(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        LinksnipError::Validation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        LinksnipError::Serialization(msg.into())
    }

    pub fn date_parse<T: Into<String>>(msg: T) -> Self {
        LinksnipError::DateParse(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<std::io::Error> for LinksnipError {
    fn from(err: std::io::Error) -> Self {
        LinksnipError::StorageUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for LinksnipError {
    fn from(err: serde_json::Error) -> Self {
        LinksnipError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for LinksnipError {
    fn from(err: chrono::ParseError) -> Self {
        LinksnipError::DateParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LinksnipError>;
