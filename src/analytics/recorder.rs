//! 点击事件记录器
//!
//! 负责收集和刷新点击事件，支持：
//! - 高并发事件缓冲（使用 DashMap）
//! - 定时刷盘到存储后端
//! - 阈值触发刷盘
//! - 刷盘失败时恢复缓冲区，事件不丢失

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};
use tracing::{debug, trace, warn};

use crate::analytics::ClickSink;
use crate::storage::ClickEvent;

/// 事件缓冲区，封装所有可变状态
struct EventBuffer {
    /// 递增 ID -> 事件，ID 保持写入顺序
    data: DashMap<u64, ClickEvent>,
    next_id: AtomicU64,
    /// 刷盘锁，防止并发刷盘
    flush_lock: Mutex<()>,
    /// 是否有 flush 任务待处理（防止重复 spawn）
    flush_pending: AtomicBool,
}

impl EventBuffer {
    fn new() -> Self {
        Self {
            data: DashMap::new(),
            next_id: AtomicU64::new(0),
            flush_lock: Mutex::new(()),
            flush_pending: AtomicBool::new(false),
        }
    }

    fn push(&self, event: ClickEvent) -> usize {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.data.insert(id, event);
        self.data.len()
    }

    /// 收集所有事件并清空缓冲区（逐个 remove，窗口期新增不受影响）
    fn drain(&self) -> Vec<ClickEvent> {
        let mut ids: Vec<u64> = self.data.iter().map(|r| *r.key()).collect();
        ids.sort_unstable();

        let mut events = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some((_, event)) = self.data.remove(&id) {
                events.push(event);
            }
        }
        events
    }

    /// 恢复数据到缓冲区（用于刷盘失败时的恢复）
    fn restore(&self, events: Vec<ClickEvent>) {
        for event in events {
            self.push(event);
        }
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

/// 点击事件记录器
///
/// Resolver 在成功跳转时调用 `record()`，事件先进缓冲区，
/// 由后台任务、阈值或手动 `flush()` 批量写入 Sink。
/// 状态完全封装在结构体内部，便于测试和多实例使用。
#[derive(Clone)]
pub struct ClickRecorder {
    buffer: Arc<EventBuffer>,
    sink: Arc<dyn ClickSink>,
    flush_interval: Duration,
    /// 触发刷盘的最大缓冲事件数
    max_buffered_before_flush: usize,
}

impl ClickRecorder {
    pub fn new(
        sink: Arc<dyn ClickSink>,
        flush_interval: Duration,
        max_buffered_before_flush: usize,
    ) -> Self {
        Self {
            buffer: Arc::new(EventBuffer::new()),
            sink,
            flush_interval,
            max_buffered_before_flush,
        }
    }

    /// 记录一次点击事件（线程安全，无锁）
    pub fn record(&self, event: ClickEvent) {
        let current_size = self.buffer.push(event);
        trace!("ClickRecorder: Current buffer size: {}", current_size);

        // 检查是否达到阈值，尝试触发刷盘
        if current_size >= self.max_buffered_before_flush {
            // 使用 compare_exchange 防止任务风暴：
            // 只有成功将 flush_pending 从 false 设为 true 的线程才 spawn
            if self
                .buffer
                .flush_pending
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
                .is_ok()
            {
                let buffer = Arc::clone(&self.buffer);
                let sink = Arc::clone(&self.sink);
                tokio::spawn(async move {
                    if let Ok(_guard) = buffer.flush_lock.try_lock() {
                        Self::flush_buffer(&buffer, &sink).await;
                    } else {
                        trace!("ClickRecorder: flush already in progress, skipping");
                    }
                    // 无论成功与否都重置标志，允许下次触发
                    buffer.flush_pending.store(false, Ordering::Release);
                });
            }
        }
    }

    /// 启动后台刷盘任务（作为异步方法运行）
    pub async fn start_background_task(&self) {
        loop {
            sleep(self.flush_interval).await;

            debug!("ClickRecorder: Triggering scheduled flush");
            if let Ok(_guard) = self.buffer.flush_lock.try_lock() {
                Self::flush_buffer(&self.buffer, &self.sink).await;
            } else {
                trace!("ClickRecorder: flush already in progress, skipping scheduled flush");
            }
        }
    }

    /// 手动触发刷盘（阻塞直到完成）
    pub async fn flush(&self) {
        debug!("ClickRecorder: Manual flush triggered");
        let _guard = self.buffer.flush_lock.lock().await;
        Self::flush_buffer(&self.buffer, &self.sink).await;
    }

    /// 执行实际的刷盘操作
    async fn flush_buffer(buffer: &EventBuffer, sink: &Arc<dyn ClickSink>) {
        let events = buffer.drain();

        if events.is_empty() {
            trace!("ClickRecorder: No events to flush");
            return;
        }

        let count = events.len();
        match sink.flush_clicks(events.clone()).await {
            Ok(_) => {
                debug!("ClickRecorder: Successfully flushed {} events", count);
            }
            Err(e) => {
                // 刷盘失败，恢复数据到 buffer
                buffer.restore(events);
                warn!(
                    "ClickRecorder: flush_clicks failed: {}, {} events restored to buffer",
                    e, count
                );
            }
        }
    }

    /// 获取当前缓冲区事件数（用于监控）
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }
}
