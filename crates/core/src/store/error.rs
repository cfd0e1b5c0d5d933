use thiserror::Error;

/// # Summary
/// 输出文件读写错误。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum StoreError {
    /// 目录或文件读写失败
    #[error("IO error at {path}: {message}")]
    Io { path: String, message: String },
    /// 序列化失败
    #[error("Serialize error: {0}")]
    Serialize(String),
    /// 反序列化失败
    #[error("Deserialize error: {0}")]
    Deserialize(String),
}
