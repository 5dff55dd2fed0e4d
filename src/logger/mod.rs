//! 日志初始化
//!
//! 日志统一写到stderr，不会与stdout上的命中结果交错。

mod rlogger;

pub use rlogger::{init_logger, level_for};
