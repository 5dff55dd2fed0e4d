use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::dispatch::Dispatcher;
use crate::dns_query::{ClientFactory, NetworkClientFactory};
use crate::error::ConfigError;
use crate::handle::{HitFilter, HitSink, ResultCollector};
use crate::input::build_candidates;
use crate::model::{Candidate, Hit, ResolverConfig};
use crate::progress::{ProgressReporter, ProgressTracker};

/// 域名暴破配置
#[derive(Debug, Clone, PartialEq)]
pub struct SubdomainBruteConfig {
    /// 查询解析配置
    pub resolver: ResolverConfig,
    /// 同时进行的解析任务数
    pub concurrency: usize,
    /// 结果过滤
    pub filter: HitFilter,
}

impl Default for SubdomainBruteConfig {
    fn default() -> Self {
        SubdomainBruteConfig {
            resolver: ResolverConfig::default(),
            concurrency: 60,
            filter: HitFilter::default(),
        }
    }
}

impl SubdomainBruteConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.resolver.record_types.is_empty() {
            return Err(ConfigError::NoRecordTypes);
        }
        if self.resolver.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(0.0));
        }
        Ok(())
    }
}

/// 一次暴破运行的结果
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub hits: Vec<Hit>,
    /// 提交的候选域名数
    pub total: usize,
    /// 已收到结果的候选域名数
    pub completed: usize,
    pub elapsed: Duration,
    /// 是否被外部中断
    pub interrupted: bool,
}

/// 域名暴破引擎
pub struct SubdomainBruteEngine<F = NetworkClientFactory> {
    config: SubdomainBruteConfig,
    factory: F,
    reporter: Option<Arc<dyn ProgressReporter>>,
    sinks: Vec<Box<dyn HitSink>>,
}

impl SubdomainBruteEngine<NetworkClientFactory> {
    /// 创建使用真实网络查询的暴破引擎
    pub fn new(config: SubdomainBruteConfig) -> Result<Self, ConfigError> {
        Self::with_factory(config, NetworkClientFactory)
    }
}

impl<F: ClientFactory> SubdomainBruteEngine<F> {
    pub fn with_factory(config: SubdomainBruteConfig, factory: F) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(SubdomainBruteEngine {
            config,
            factory,
            reporter: None,
            sinks: Vec::new(),
        })
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn HitSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn config(&self) -> &SubdomainBruteConfig {
        &self.config
    }

    /// 执行域名暴破，直到所有候选域名都有结果
    pub async fn run_brute_force(self, candidates: Vec<Candidate>) -> Result<RunSummary, ConfigError> {
        self.run_until(candidates, std::future::pending::<()>()).await
    }

    /// 执行域名暴破，`shutdown` 完成时提前停止并返回已有结果
    pub async fn run_until<S>(self, candidates: Vec<Candidate>, shutdown: S) -> Result<RunSummary, ConfigError>
    where
        S: Future<Output = ()>,
    {
        let SubdomainBruteEngine {
            config,
            factory,
            reporter,
            sinks,
        } = self;

        let start = Instant::now();
        let total = candidates.len();
        let dispatcher = Dispatcher::new(factory, Arc::new(config.resolver), config.concurrency)?;

        let mut tracker = ProgressTracker::starting_at(total, start);
        if let Some(reporter) = reporter {
            tracker = tracker.with_reporter(reporter);
        }
        let mut collector = ResultCollector::new(config.filter);
        for sink in sinks {
            collector.add_sink(sink);
        }

        info!("开始解析 {} 个候选域名，并发 {}", total, config.concurrency);
        let mut outcomes = dispatcher.dispatch(candidates);
        let mut interrupted = false;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                outcome = outcomes.next() => match outcome {
                    Some(outcome) => {
                        tracker.record();
                        collector.collect(outcome);
                    }
                    None => break,
                },
                _ = &mut shutdown => {
                    warn!("收到中断信号，停止分发");
                    interrupted = true;
                    break;
                }
            }
        }

        let completed = tracker.snapshot().completed;
        let elapsed = start.elapsed();
        info!("完成 {}/{}，命中 {}，耗时 {:.1}s", completed, total, collector.hit_count(), elapsed.as_secs_f64());

        Ok(RunSummary {
            hits: collector.into_hits(),
            total,
            completed,
            elapsed,
            interrupted,
        })
    }
}

/// 便捷的域名暴破函数
pub async fn brute_force_subdomains(
    nameserver: SocketAddr,
    domain: &str,
    labels: &[String],
) -> Result<Vec<Hit>, ConfigError> {
    let config = SubdomainBruteConfig {
        resolver: ResolverConfig::new(nameserver),
        ..Default::default()
    };

    let engine = SubdomainBruteEngine::new(config)?;
    let summary = engine.run_brute_force(build_candidates(labels, domain)).await?;
    Ok(summary.hits)
}
