use std::collections::BTreeSet;
use std::sync::Arc;

use log::{debug, info};
use rand::Rng;
use trust_dns_resolver::proto::rr::RecordType;

use crate::dns_query::ClientFactory;
use crate::dns_resolver::DnsResolver;
use crate::model::{Candidate, ResolverConfig};

/// 默认探测的随机子域名数量
pub const DEFAULT_PROBES: usize = 3;

/// 泛解析检测器
///
/// 在暴破前解析几个随机生成的子域名，如果全部返回A记录，则认为目标域名
/// 存在泛解析。检测结果只用于提示，不会改变命中结果。
pub struct WildcardDetector<F> {
    factory: F,
    config: Arc<ResolverConfig>,
    probes: usize,
}

impl<F: ClientFactory> WildcardDetector<F> {
    pub fn new(factory: F, config: &ResolverConfig) -> Self {
        // 探测只关心A记录，且不重试
        let config = ResolverConfig {
            record_types: vec![RecordType::A],
            retries: 0,
            ..config.clone()
        };
        WildcardDetector {
            factory,
            config: Arc::new(config),
            probes: DEFAULT_PROBES,
        }
    }

    pub fn with_probes(mut self, probes: usize) -> Self {
        self.probes = probes.max(1);
        self
    }

    /// 检测域名是否存在泛解析，存在时返回泛解析IP
    pub async fn detect_wildcard(&self, domain: &str) -> Option<Vec<String>> {
        let mut wildcard_ips = BTreeSet::new();

        for test_domain in self.generate_test_subdomains(domain, self.probes) {
            let resolver = DnsResolver::new(self.factory.build(&self.config), Arc::clone(&self.config));
            let outcome = resolver.resolve(&test_domain).await;
            let ips: Vec<&str> = outcome.address_values().collect();
            if ips.is_empty() {
                // 随机域名无法解析，说明不存在泛解析
                debug!("{} 无解析，未发现泛解析", test_domain);
                return None;
            }
            wildcard_ips.extend(ips.into_iter().map(str::to_string));
        }

        info!("{} 存在泛解析: {:?}", domain, wildcard_ips);
        Some(wildcard_ips.into_iter().collect())
    }

    /// 生成测试用的随机子域名
    fn generate_test_subdomains(&self, domain: &str, count: usize) -> Vec<Candidate> {
        let mut rng = rand::thread_rng();
        let chars = b"abcdefghijklmnopqrstuvwxyz0123456789";

        (0..count)
            .map(|_| {
                let random_str: String = (0..12)
                    .map(|_| chars[rng.gen_range(0..chars.len())] as char)
                    .collect();
                Candidate::new(format!("{}.{}", random_str, domain.trim_matches('.')))
            })
            .collect()
    }
}
