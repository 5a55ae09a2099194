// crates/sf_foundation/src/error.rs

//! 统一错误类型
//!
//! 全 workspace 共享的错误枚举与 `SfResult` 别名。
//! 库代码一律通过 `?` 传播错误，不在非测试代码中 panic。

use thiserror::Error;

/// StoneFlow 统一错误类型
#[derive(Error, Debug)]
pub enum SfError {
    /// 物理量访问错误（缺失、类型不符、阶数不符）
    #[error("物理量错误: {0}")]
    Quantity(String),

    /// 求解器装配错误（方程项冲突、缺少必要项等）
    #[error("装配错误: {0}")]
    Setup(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 无效参数
    #[error("无效参数 {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// 索引越界
    #[error("索引越界: {index} >= {size}")]
    IndexOutOfBounds { index: usize, size: usize },

    /// 尺寸不匹配
    #[error("尺寸不匹配: 期望 {expected}, 实际 {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// 快照文件格式错误
    #[error("文件格式错误: {0}")]
    Format(String),

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// StoneFlow 统一结果类型
pub type SfResult<T> = Result<T, SfError>;

impl SfError {
    /// 创建物理量错误
    pub fn quantity(msg: impl Into<String>) -> Self {
        SfError::Quantity(msg.into())
    }

    /// 创建装配错误
    pub fn setup(msg: impl Into<String>) -> Self {
        SfError::Setup(msg.into())
    }

    /// 创建配置错误
    pub fn config(msg: impl Into<String>) -> Self {
        SfError::Config(msg.into())
    }

    /// 创建格式错误
    pub fn format(msg: impl Into<String>) -> Self {
        SfError::Format(msg.into())
    }

    /// 创建无效参数错误
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        SfError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// 检查索引有效性
#[inline]
pub fn check_index(index: usize, size: usize) -> SfResult<()> {
    if index >= size {
        return Err(SfError::IndexOutOfBounds { index, size });
    }
    Ok(())
}

/// 检查两个缓冲区尺寸一致
#[inline]
pub fn check_size(expected: usize, actual: usize) -> SfResult<()> {
    if expected != actual {
        return Err(SfError::SizeMismatch { expected, actual });
    }
    Ok(())
}

// ============================================================
// 测试
// ============================================================
