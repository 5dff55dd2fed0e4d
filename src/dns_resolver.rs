use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, trace};
use trust_dns_resolver::proto::rr::RecordType;

use crate::dns_query::{DnsClient, QueryExecutor};
use crate::model::{absolute_name, Candidate, ResolutionOutcome, ResolverConfig, TypedRecord};

/// 单个候选域名的解析流程
///
/// 依次查询配置的记录类型；没有A记录时追踪CNAME并解析其目标的A记录；
/// 结果去重后立即返回，查询不到则按退避间隔重试。任何错误都不会抛出，
/// 没有记录是正常结果。
pub struct DnsResolver<C> {
    executor: QueryExecutor<C>,
    config: Arc<ResolverConfig>,
}

impl<C: DnsClient> DnsResolver<C> {
    pub fn new(client: C, config: Arc<ResolverConfig>) -> Self {
        DnsResolver {
            executor: QueryExecutor::new(client, config.tcp_fallback),
            config,
        }
    }

    /// 解析一个候选域名，恰好返回一个结果
    pub async fn resolve(&self, candidate: &Candidate) -> ResolutionOutcome {
        let absolute = candidate.absolute();
        let attempts = self.config.retries + 1;

        for attempt in 0..attempts {
            let records = self.collect_records(&absolute).await;
            if !records.is_empty() {
                return ResolutionOutcome::new(candidate.name(), dedup_records(records));
            }

            if attempt + 1 < attempts {
                let delay = self.config.backoff_for(attempt);
                trace!("{} 第{}次查询无结果，{:?}后重试", candidate, attempt + 1, delay);
                tokio::time::sleep(delay).await;
            }
        }

        debug!("{} 在{}次尝试后仍无记录", candidate, attempts);
        ResolutionOutcome::empty(candidate.name())
    }

    /// 一轮查询：所有配置的类型，再视情况追踪CNAME
    async fn collect_records(&self, absolute: &str) -> Vec<TypedRecord> {
        let mut records = Vec::new();

        for &record_type in &self.config.record_types {
            for value in self.executor.query(absolute, record_type).await {
                records.push(TypedRecord::new(record_type, value));
            }
        }

        let has_address = records.iter().any(|r| r.record_type == RecordType::A);
        if self.config.wants_address() && !has_address {
            for target in self.executor.query(absolute, RecordType::CNAME).await {
                let target_absolute = absolute_name(&target);
                records.push(TypedRecord::new(RecordType::CNAME, target));
                for value in self.executor.query(&target_absolute, RecordType::A).await {
                    records.push(TypedRecord::new(RecordType::A, value));
                }
            }
        }

        records
    }
}

/// 去重并保留首次出现的顺序
pub fn dedup_records(records: Vec<TypedRecord>) -> Vec<TypedRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.clone()))
        .collect()
}
