use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use log::warn;

use crate::model::{Hit, ResolutionOutcome};

/// 结果输出接口（控制台、文件等）
pub trait HitSink: Send {
    fn emit(&mut self, hit: &Hit) -> io::Result<()>;
}

/// 结果过滤条件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HitFilter {
    /// 只保留A记录以该后缀结尾的结果，大小写敏感
    pub suffix: Option<String>,
    /// 忽略后缀，输出所有解析成功的域名
    pub show_all: bool,
}

impl HitFilter {
    pub fn new(suffix: Option<String>, show_all: bool) -> Self {
        let suffix = suffix.filter(|s| !s.is_empty());
        HitFilter { suffix, show_all }
    }

    /// 没有记录的结果永远不通过；没有配置A记录时后缀过滤不会命中
    pub fn accepts(&self, outcome: &ResolutionOutcome) -> bool {
        if !outcome.has_records() {
            return false;
        }
        if self.show_all {
            return true;
        }
        match &self.suffix {
            None => true,
            Some(suffix) => outcome
                .address_values()
                .any(|value| value.trim().ends_with(suffix.as_str())),
        }
    }
}

/// 结果收集器
///
/// 按到达顺序保存命中结果，并同步转发给所有输出端。
/// 输出端失败只记录日志，不影响收集。
pub struct ResultCollector {
    filter: HitFilter,
    hits: Vec<Hit>,
    sinks: Vec<Box<dyn HitSink>>,
}

impl ResultCollector {
    pub fn new(filter: HitFilter) -> Self {
        ResultCollector {
            filter,
            hits: Vec::new(),
            sinks: Vec::new(),
        }
    }

    pub fn add_sink(&mut self, sink: Box<dyn HitSink>) {
        self.sinks.push(sink);
    }

    /// 处理一个解析结果，命中时返回该结果
    pub fn collect(&mut self, outcome: ResolutionOutcome) -> Option<&Hit> {
        if !self.filter.accepts(&outcome) {
            return None;
        }

        let hit = Hit::from(outcome);
        for sink in self.sinks.iter_mut() {
            if let Err(e) = sink.emit(&hit) {
                warn!("输出 {} 失败: {}", hit.name, e);
            }
        }
        self.hits.push(hit);
        self.hits.last()
    }

    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    pub fn hit_count(&self) -> usize {
        self.hits.len()
    }

    pub fn into_hits(self) -> Vec<Hit> {
        self.hits
    }
}

/// 汇总统计信息
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub total_hits: usize,
    pub candidates: usize,
    pub completed: usize,
    pub unique_ips: BTreeSet<String>,
    pub ip_ranges: BTreeMap<String, Vec<String>>,
    pub record_types: BTreeMap<String, usize>,
    pub wildcard_ips: Vec<String>,
    pub nameserver: SocketAddr,
    pub elapsed: Duration,
    pub interrupted: bool,
}

/// 生成汇总统计
pub fn generate_summary(
    hits: &[Hit],
    candidates: usize,
    completed: usize,
    nameserver: SocketAddr,
    elapsed: Duration,
) -> SummaryStats {
    let mut unique_ips = BTreeSet::new();
    let mut ip_ranges: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut record_types = BTreeMap::new();

    for hit in hits {
        for record in &hit.records {
            *record_types.entry(record.record_type.to_string()).or_insert(0) += 1;
        }

        for value in hit.address_values() {
            if let Ok(ip) = value.parse::<IpAddr>() {
                if unique_ips.insert(value.to_string()) {
                    // 计算IP段
                    if let IpAddr::V4(ipv4) = ip {
                        let octets = ipv4.octets();
                        let range = format!("{}.{}.{}.0/24", octets[0], octets[1], octets[2]);
                        ip_ranges.entry(range).or_default().push(value.to_string());
                    }
                }
            }
        }
    }

    SummaryStats {
        total_hits: hits.len(),
        candidates,
        completed,
        unique_ips,
        ip_ranges,
        record_types,
        wildcard_ips: Vec::new(),
        nameserver,
        elapsed,
        interrupted: completed < candidates,
    }
}
