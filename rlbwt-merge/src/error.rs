//! 游程 BWT 与合并引擎的错误类型。

use thiserror::Error;

/// 索引构建、查询与合并轮次中的错误。
#[derive(Debug, Error)]
pub enum Error {
    /// 位置越界
    #[error("index out of bounds: {index} >= {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// 字母表之外的符号 rank
    #[error("invalid symbol rank: {0}")]
    InvalidSymbol(u8),

    /// 计数或符号字段越界的游程
    #[error("invalid run: {0}")]
    InvalidRun(String),

    /// Occ 采样间隔必须为正
    #[error("invalid sample rate {0}: must be at least 1")]
    InvalidSampleRate(usize),

    /// 一批 read 拼接后超出 `u32` 可表示的长度
    #[error("collection of {len} symbols exceeds the batch limit of {max}")]
    CollectionTooLarge { len: usize, max: usize },

    /// 删除模式下无法解析为序号的 id
    #[error("malformed sequence id '{0}': expected a numeric index")]
    MalformedId(String),

    /// 删除模式下与当前索引不符的 id（越界或来自其他代的索引）
    #[error("sequence id '{id}' does not match the index: {detail}")]
    StaleId { id: String, detail: String },

    /// 无法计算 rank 的序列（例如内部含有 `$`）
    #[error("sequence '{id}' rejected: {detail}")]
    InvalidSequence { id: String, detail: String },

    /// gap 计数器超出存储宽度
    #[error("gap counter overflow at slot {0}")]
    GapOverflow(usize),

    /// gap 计数与待合并的符号不一致
    #[error("gap array mismatch: {0}")]
    GapMismatch(String),

    /// 持久化数据无法解码
    #[error("invalid index format: {0}")]
    Format(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        match *e {
            bincode::ErrorKind::Io(io) => Error::Io(io),
            other => Error::Format(other.to_string()),
        }
    }
}

impl Error {
    /// 只影响单条输入序列的错误：该序列被拒绝，本轮继续。
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::MalformedId(_) | Error::StaleId { .. } | Error::InvalidSequence { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
