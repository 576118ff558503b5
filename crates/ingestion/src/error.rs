//! Ingestion 错误类型

use contracts::SpaceId;
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 同一空间注册了多个帧源
    #[error("duplicate frame source for {space}")]
    DuplicateSpace {
        /// 空间 ID
        space: SpaceId,
    },

    /// 帧 ID 不递增
    #[error("frames of {space} are not in order: {message}")]
    OutOfOrder {
        /// 空间 ID
        space: SpaceId,
        /// 错误消息
        message: String,
    },

    /// 合成数据配置无效
    #[error("invalid synthetic colony: {message}")]
    InvalidSynthetic {
        /// 错误消息
        message: String,
    },
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
