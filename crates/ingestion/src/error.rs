//! Ingestion 错误类型

use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 监听地址绑定失败
    #[error("failed to bind endpoint on {addr}: {source}")]
    Bind {
        /// 监听地址
        addr: String,
        /// 底层 IO 错误
        #[source]
        source: std::io::Error,
    },

    /// 队列已关闭（消费端已退出）
    #[error("message queue closed")]
    QueueClosed,

    /// IO 错误
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
