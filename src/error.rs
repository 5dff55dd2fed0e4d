//! 错误类型
//!
//! 配置错误在任何查询开始之前上报并终止运行；查询错误只在单次查询内部
//! 流转，最终都会降级为“没有记录”。

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use trust_dns_resolver::proto::error::ProtoError;

/// 运行前的配置错误，全部是致命错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("字典文件不存在或为空: {}", .0.display())]
    EmptyWordlist(PathBuf),

    #[error("读取字典文件失败 {}: {source}", .path.display())]
    Wordlist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("无效的DNS服务器地址: {0}")]
    InvalidNameserver(String),

    #[error("不支持的记录类型: {0}")]
    UnknownRecordType(String),

    #[error("记录类型列表为空")]
    NoRecordTypes,

    #[error("无效的超时时间: {0}")]
    InvalidTimeout(f64),

    #[error("并发数必须大于0")]
    ZeroConcurrency,

    #[error("目标域名为空")]
    EmptyDomain,

    #[error("不支持的输出格式: {0}。支持的格式: json, csv, txt")]
    UnknownFormat(String),
}

/// 单次DNS查询的传输层错误
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("查询超时 ({0:?})")]
    Timeout(Duration),

    #[error("网络错误: {0}")]
    Io(#[from] io::Error),

    #[error("报文错误: {0}")]
    Proto(#[from] ProtoError),

    #[error("响应被截断")]
    Truncated,

    #[error("响应ID {got} 与查询ID {expected} 不匹配")]
    IdMismatch { expected: u16, got: u16 },
}
