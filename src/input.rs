use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use clap::{ArgAction, Parser};
use trust_dns_resolver::proto::rr::RecordType;

use crate::api::SubdomainBruteConfig;
use crate::error::ConfigError;
use crate::handle::HitFilter;
use crate::model::{Candidate, ResolverConfig};

/// 默认DNS端口
pub const DNS_PORT: u16 = 53;

/// 输出格式枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Csv,
    Txt,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "txt" => Ok(OutputFormat::Txt),
            _ => Err(ConfigError::UnknownFormat(s.to_string())),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "rdnsenum")]
#[command(version)]
#[command(about = "Fast DNS brute-force enumerator with realtime output and progress", long_about = None, arg_required_else_help = true)]
pub struct Opts {
    /// DNS server IP (authoritative), e.g. 10.129.22.65 or 10.129.22.65:5353
    #[arg(long)]
    pub dns: String,

    /// target domain, e.g. dev.inlanefreight.htb
    #[arg(short, long)]
    pub domain: String,

    /// path to wordlist (one label per line)
    #[arg(short, long)]
    pub wordlist: PathBuf,

    /// concurrency - too high can cause misses
    #[arg(short, long, default_value_t = 60)]
    pub threads: usize,

    /// timeout per query in seconds
    #[arg(long, default_value_t = 2.0)]
    pub timeout: f64,

    /// retry count on timeouts/throttle
    #[arg(long, default_value_t = 2)]
    pub retries: u32,

    /// fallback to TCP if UDP fails (recommended)
    #[arg(long)]
    pub tcp_fallback: bool,

    /// only show IPs ending with this suffix, e.g. .203
    #[arg(long, default_value = "")]
    pub suffix: String,

    /// save hits to file
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// print all resolved hosts (not just filtered)
    #[arg(long)]
    pub show_all: bool,

    /// record types to query, comma-separated, e.g. A,NS,MX
    #[arg(long, default_value = "A")]
    pub types: String,

    /// write a final report to this path
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// report format (json, csv, txt)
    #[arg(long, default_value = "json")]
    pub format: String,

    /// probe random labels for wildcard records before brute forcing
    #[arg(long)]
    pub detect_wildcard: bool,

    /// increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Opts {
    /// 校验参数并构造查询配置
    pub fn resolver_config(&self) -> Result<ResolverConfig, ConfigError> {
        Ok(ResolverConfig {
            nameserver: parse_nameserver(&self.dns)?,
            timeout: parse_timeout(self.timeout)?,
            retries: self.retries,
            tcp_fallback: self.tcp_fallback,
            record_types: parse_record_types(&self.types)?,
            ..Default::default()
        })
    }

    pub fn brute_config(&self) -> Result<SubdomainBruteConfig, ConfigError> {
        if self.domain.trim_matches('.').trim().is_empty() {
            return Err(ConfigError::EmptyDomain);
        }
        let config = SubdomainBruteConfig {
            resolver: self.resolver_config()?,
            concurrency: self.threads,
            filter: HitFilter::new(Some(self.suffix.clone()), self.show_all),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn output_format(&self) -> Result<OutputFormat, ConfigError> {
        self.format.parse()
    }
}

/// 解析DNS服务器地址，支持 `ip` 与 `ip:port` 两种写法
pub fn parse_nameserver(s: &str) -> Result<SocketAddr, ConfigError> {
    let s = s.trim();
    if let Ok(addr) = s.parse::<SocketAddr>() {
        return Ok(addr);
    }
    s.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, DNS_PORT))
        .map_err(|_| ConfigError::InvalidNameserver(s.to_string()))
}

pub fn parse_timeout(secs: f64) -> Result<Duration, ConfigError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ConfigError::InvalidTimeout(secs));
    }
    Ok(Duration::from_secs_f64(secs))
}

/// 解析逗号分隔的记录类型列表，为空时默认 `A`
pub fn parse_record_types(s: &str) -> Result<Vec<RecordType>, ConfigError> {
    let mut types = Vec::new();
    for name in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let name = name.to_uppercase();
        let record_type = RecordType::from_str(&name)
            .map_err(|_| ConfigError::UnknownRecordType(name.clone()))?;
        if let RecordType::Unknown(_) = record_type {
            return Err(ConfigError::UnknownRecordType(name));
        }
        types.push(record_type);
    }
    if types.is_empty() {
        types.push(RecordType::A);
    }
    Ok(types)
}

/// 读取字典文件
///
/// 跳过空行与 `#` 注释行，去掉每个标签首尾的点。
pub fn load_wordlist(path: &Path) -> Result<Vec<String>, ConfigError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(_) => return Err(ConfigError::EmptyWordlist(path.to_path_buf())),
    };
    if metadata.len() == 0 {
        return Err(ConfigError::EmptyWordlist(path.to_path_buf()));
    }

    let bytes = fs::read(path).map_err(|source| ConfigError::Wordlist {
        path: path.to_path_buf(),
        source,
    })?;
    let labels = parse_wordlist(&String::from_utf8_lossy(&bytes));
    if labels.is_empty() {
        return Err(ConfigError::EmptyWordlist(path.to_path_buf()));
    }
    Ok(labels)
}

pub fn parse_wordlist(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.trim_matches('.'))
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

/// 拼接 `<label>.<domain>` 得到候选域名
pub fn build_candidates(labels: &[String], domain: &str) -> Vec<Candidate> {
    labels
        .iter()
        .map(|label| Candidate::new(format!("{}.{}", label, domain).trim_matches('.')))
        .collect()
}
