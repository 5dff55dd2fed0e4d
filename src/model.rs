use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use trust_dns_resolver::proto::rr::RecordType;

/// 输出记录列表时使用的分隔符
pub const RECORD_SEPARATOR: &str = " | ";

/// 查询解析配置
///
/// 构造完成后不再修改，通过 `Arc` 在所有并发任务之间只读共享。
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    /// 目标DNS服务器
    pub nameserver: SocketAddr,
    /// 单次查询超时
    pub timeout: Duration,
    /// 失败后的重试次数
    pub retries: u32,
    /// UDP失败或无应答时是否改用TCP
    pub tcp_fallback: bool,
    /// 按顺序查询的记录类型
    pub record_types: Vec<RecordType>,
    /// 退避基准时长，第n次重试前等待 backoff * n
    pub backoff: Duration,
}

impl ResolverConfig {
    pub fn new(nameserver: SocketAddr) -> Self {
        ResolverConfig {
            nameserver,
            ..Default::default()
        }
    }

    /// 是否查询A记录（决定是否追踪CNAME）
    pub fn wants_address(&self) -> bool {
        self.record_types.contains(&RecordType::A)
    }

    /// 第 `attempt` 次尝试失败后的等待时长
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff * (attempt + 1)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            nameserver: SocketAddr::from((Ipv4Addr::new(8, 8, 8, 8), 53)),
            timeout: Duration::from_secs(2),
            retries: 2,
            tcp_fallback: false,
            record_types: vec![RecordType::A],
            backoff: Duration::from_millis(150),
        }
    }
}

/// 待解析的候选域名
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate(String);

impl Candidate {
    pub fn new(name: impl Into<String>) -> Self {
        Candidate(name.into())
    }

    /// 不带末尾点的域名
    pub fn name(&self) -> &str {
        self.0.trim_end_matches('.')
    }

    /// 带唯一末尾点的绝对域名，用于查询
    pub fn absolute(&self) -> String {
        absolute_name(&self.0)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn absolute_name(name: &str) -> String {
    format!("{}.", name.trim_end_matches('.'))
}

/// 一条应答：记录类型 + 值
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypedRecord {
    pub record_type: RecordType,
    pub value: String,
}

impl TypedRecord {
    pub fn new(record_type: RecordType, value: impl Into<String>) -> Self {
        TypedRecord {
            record_type,
            value: value.into(),
        }
    }
}

impl fmt::Display for TypedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.record_type, self.value)
    }
}

/// 单个候选域名的解析结果，每个候选恰好产生一个
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionOutcome {
    pub name: String,
    /// 去重后的记录，为空表示没有找到任何数据
    pub records: Vec<TypedRecord>,
}

impl ResolutionOutcome {
    pub fn new(name: impl Into<String>, records: Vec<TypedRecord>) -> Self {
        ResolutionOutcome {
            name: name.into(),
            records,
        }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn has_records(&self) -> bool {
        !self.records.is_empty()
    }

    /// 所有A记录的值
    pub fn address_values(&self) -> impl Iterator<Item = &str> {
        address_values(&self.records)
    }

    pub fn records_line(&self) -> String {
        records_line(&self.records)
    }
}

/// 通过过滤器的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub name: String,
    pub records: Vec<TypedRecord>,
}

impl Hit {
    pub fn address_values(&self) -> impl Iterator<Item = &str> {
        address_values(&self.records)
    }

    /// `TYPE:value | TYPE:value` 形式的记录列表
    pub fn records_line(&self) -> String {
        records_line(&self.records)
    }

    /// 结果文件中的一行：`name<TAB>records\n`
    pub fn file_line(&self) -> String {
        format!("{}\t{}\n", self.name, self.records_line())
    }
}

impl From<ResolutionOutcome> for Hit {
    fn from(outcome: ResolutionOutcome) -> Self {
        Hit {
            name: outcome.name,
            records: outcome.records,
        }
    }
}

/// 进度采样 (已完成, 总数, 速率)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgressSample {
    pub completed: usize,
    pub total: usize,
    /// 每秒完成的查询数
    pub rate: f64,
}

fn address_values(records: &[TypedRecord]) -> impl Iterator<Item = &str> {
    records
        .iter()
        .filter(|r| r.record_type == RecordType::A)
        .map(|r| r.value.as_str())
}

fn records_line(records: &[TypedRecord]) -> String {
    records
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(RECORD_SEPARATOR)
}
