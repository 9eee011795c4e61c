use crate::storage::ClickEvent;

/// 点击事件 Sink
///
/// ClickRecorder 批量刷入的写端，由存储后端实现（追加写语义）。
#[async_trait::async_trait]
pub trait ClickSink: Send + Sync {
    async fn flush_clicks(&self, events: Vec<ClickEvent>) -> anyhow::Result<()>;
}
