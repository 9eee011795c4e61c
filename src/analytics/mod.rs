//! 点击分析
//!
//! - `recorder`: 点击事件的并发缓冲与刷盘
//! - `aggregator`: 从事件日志派生的汇总查询
//! - `sink`: 事件写入端抽象

pub mod aggregator;
pub mod recorder;
pub mod sink;

pub use aggregator::{Aggregator, Bucket, Summary, TimelineBucket};
pub use recorder::ClickRecorder;
pub use sink::ClickSink;
