//! 调用记录存储和异步写入服务

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::model::{AttemptRecord, AttemptStatus};
use super::types::{AttemptListResponse, AttemptQuery, AttemptRecordResponse, AttemptStatsResponse};

/// 写入通道容量
const CHANNEL_CAPACITY: usize = 10_000;
/// 单批最大写入条数
const MAX_BATCH: usize = 500;

/// 调用记录写入接口
///
/// 尽力而为：实现方不得向调用方返回错误
pub trait AttemptSink: Send + Sync {
    fn record(&self, record: AttemptRecord);
}

/// 存储用的时间格式（固定毫秒精度，保证字符串比较与时间顺序一致）
fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 规范化 RFC3339 时间为存储格式，解析失败时原样返回
fn normalize_time(value: &str) -> String {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| format_time(&dt.with_timezone(&Utc)))
        .unwrap_or_else(|_| value.to_string())
}

/// 底层 SQLite 存储（同步）
pub(crate) struct AttemptStore {
    conn: Mutex<Connection>,
}

impl AttemptStore {
    pub(crate) fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("打开调用记录数据库失败: {}", db_path))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS ai_request_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                request_id TEXT NOT NULL,
                resource_title TEXT NOT NULL,
                tokens_used INTEGER NOT NULL DEFAULT 0,
                latency_ms INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL CHECK (status IN ('success', 'error')),
                error_message TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_ai_logs_created_at ON ai_request_logs(created_at);
            CREATE INDEX IF NOT EXISTS idx_ai_logs_status ON ai_request_logs(status);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn insert_batch(&self, records: &[AttemptRecord]) -> Result<()> {
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;
        for record in records {
            tx.execute(
                "INSERT INTO ai_request_logs (request_id, resource_title, tokens_used, latency_ms, status, error_message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    record.request_id,
                    record.resource_title,
                    record.tokens_used,
                    record.latency_ms,
                    record.status.as_str(),
                    record.error_message,
                    format_time(&record.created_at),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub(crate) fn query(&self, filter: &AttemptQuery) -> Result<AttemptListResponse> {
        let conn = self.conn.lock();
        let page = filter.page.unwrap_or(1).max(1);
        let page_size = filter.page_size.unwrap_or(50).clamp(1, 200);
        let offset = (page - 1) as i64 * page_size as i64;

        let mut where_clauses = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(status) = filter.status.as_deref().and_then(AttemptStatus::parse) {
            where_clauses.push(format!("status = ?{}", params.len() + 1));
            params.push(Box::new(status.as_str()));
        }
        if let Some(ref start_time) = filter.start_time {
            where_clauses.push(format!("created_at >= ?{}", params.len() + 1));
            params.push(Box::new(normalize_time(start_time)));
        }
        if let Some(ref end_time) = filter.end_time {
            where_clauses.push(format!("created_at <= ?{}", params.len() + 1));
            params.push(Box::new(normalize_time(end_time)));
        }

        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", where_clauses.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM ai_request_logs {}", where_sql);
        let total: u64 = conn.query_row(
            &count_sql,
            rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
            |row| row.get(0),
        )?;

        let query_sql = format!(
            "SELECT id, request_id, resource_title, tokens_used, latency_ms, status, error_message, created_at
             FROM ai_request_logs {} ORDER BY id DESC LIMIT ?{} OFFSET ?{}",
            where_sql,
            params.len() + 1,
            params.len() + 2
        );
        params.push(Box::new(page_size as i64));
        params.push(Box::new(offset));

        let mut stmt = conn.prepare(&query_sql)?;
        let records = stmt
            .query_map(
                rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
                |row| {
                    Ok(AttemptRecordResponse {
                        id: row.get(0)?,
                        request_id: row.get(1)?,
                        resource_title: row.get(2)?,
                        tokens_used: row.get(3)?,
                        latency_ms: row.get(4)?,
                        status: row.get(5)?,
                        error_message: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(AttemptListResponse {
            total,
            page,
            page_size,
            records,
        })
    }

    pub(crate) fn get_stats(&self) -> Result<AttemptStatsResponse> {
        let conn = self.conn.lock();

        let (total_requests, error_count, total_tokens, avg_latency_ms): (u64, u64, i64, f64) = conn.query_row(
            "SELECT COUNT(*), COUNT(CASE WHEN status = 'error' THEN 1 END), COALESCE(SUM(tokens_used), 0), COALESCE(AVG(latency_ms), 0) FROM ai_request_logs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        let error_rate = if total_requests > 0 {
            error_count as f64 / total_requests as f64
        } else {
            0.0
        };

        Ok(AttemptStatsResponse {
            total_requests,
            success_count: total_requests - error_count,
            error_count,
            error_rate,
            total_tokens,
            avg_latency_ms,
        })
    }
}

/// 异步调用记录服务（公开 API）
pub struct AttemptLogger {
    /// `shutdown` 后为 None，之后的记录直接丢弃
    sender: Mutex<Option<mpsc::Sender<AttemptRecord>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    store: Arc<AttemptStore>,
}

impl AttemptLogger {
    /// 创建新的 AttemptLogger，启动后台写入任务
    pub fn new(db_path: &str) -> Result<Self> {
        let store = Arc::new(AttemptStore::new(db_path)?);
        let (sender, mut receiver) = mpsc::channel::<AttemptRecord>(CHANNEL_CAPACITY);

        let write_store = store.clone();
        let writer = tokio::spawn(async move {
            while let Some(first) = receiver.recv().await {
                // 取出当前所有可用记录组成一批
                let mut batch = vec![first];
                while let Ok(record) = receiver.try_recv() {
                    batch.push(record);
                    if batch.len() >= MAX_BATCH {
                        break;
                    }
                }
                let store = write_store.clone();
                let count = batch.len();
                let result = tokio::task::spawn_blocking(move || store.insert_batch(&batch)).await;
                match result {
                    Ok(Ok(())) => tracing::debug!(count, "调用记录已写入"),
                    Ok(Err(e)) => tracing::error!(count, "批量写入调用记录失败: {:#}", e),
                    Err(e) => tracing::error!(count, "调用记录写入任务异常: {}", e),
                }
            }
            tracing::debug!("调用记录写入循环已退出");
        });

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            writer: Mutex::new(Some(writer)),
            store,
        })
    }

    /// 关闭写入通道并等待后台任务写完剩余记录
    ///
    /// 重复调用是安全的
    pub async fn shutdown(&self) {
        drop(self.sender.lock().take());
        let writer = self.writer.lock().take();
        if let Some(writer) = writer {
            if let Err(e) = writer.await {
                tracing::error!("调用记录写入任务异常退出: {}", e);
            }
        }
    }

    /// 查询调用记录
    pub async fn query(&self, filter: AttemptQuery) -> Result<AttemptListResponse> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.query(&filter)).await?
    }

    /// 获取统计信息
    pub async fn get_stats(&self) -> Result<AttemptStatsResponse> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.get_stats()).await?
    }
}

impl AttemptSink for AttemptLogger {
    /// 非阻塞记录（发送到 channel）
    fn record(&self, record: AttemptRecord) {
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            tracing::warn!(request_id = %record.request_id, "调用记录服务已关闭，丢弃记录");
            return;
        };
        if let Err(e) = sender.try_send(record) {
            tracing::warn!("调用记录通道不可用，丢弃记录: {}", e);
        }
    }
}
