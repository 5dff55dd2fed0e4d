//! 有界并发调度
//!
//! 为每个候选域名启动一个解析任务，同时活跃的任务数不超过并发上限，
//! 结果按完成顺序从通道送出。所有任务结束后通道关闭。

use std::sync::Arc;

use log::debug;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

use crate::dns_query::ClientFactory;
use crate::dns_resolver::DnsResolver;
use crate::error::ConfigError;
use crate::model::{Candidate, ResolutionOutcome, ResolverConfig};

/// 结果通道的最大缓冲数
const MAX_BUFFERED: usize = 1024;

pub struct Dispatcher<F> {
    factory: Arc<F>,
    config: Arc<ResolverConfig>,
    limit: usize,
}

impl<F: ClientFactory> Dispatcher<F> {
    pub fn new(factory: F, config: Arc<ResolverConfig>, limit: usize) -> Result<Self, ConfigError> {
        if limit == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(Dispatcher {
            factory: Arc::new(factory),
            config,
            limit,
        })
    }

    /// 提交全部候选域名，返回按完成顺序产出结果的流
    pub fn dispatch(&self, candidates: Vec<Candidate>) -> OutcomeStream {
        let total = candidates.len();
        let permits = self.limit.min(Semaphore::MAX_PERMITS);
        let (tx, rx) = mpsc::channel(permits.min(MAX_BUFFERED));
        let semaphore = Arc::new(Semaphore::new(permits));
        let factory = Arc::clone(&self.factory);
        let config = Arc::clone(&self.config);

        let driver = tokio::spawn(async move {
            for candidate in candidates {
                let permit = match Arc::clone(&semaphore).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };

                // 每个任务持有独立的客户端
                let resolver = DnsResolver::new(factory.build(&config), Arc::clone(&config));
                let tx = tx.clone();
                tokio::spawn(async move {
                    let outcome = resolver.resolve(&candidate).await;
                    if tx.send(outcome).await.is_err() {
                        debug!("结果接收端已关闭，丢弃 {}", candidate);
                    }
                    drop(permit);
                });
            }
        });

        OutcomeStream { rx, total, driver }
    }
}

/// 解析结果流
///
/// 被丢弃时停止提交新任务，已在执行的任务会自然结束。
pub struct OutcomeStream {
    rx: mpsc::Receiver<ResolutionOutcome>,
    total: usize,
    driver: JoinHandle<()>,
}

impl OutcomeStream {
    /// 下一个完成的结果；全部完成后返回 `None`
    pub async fn next(&mut self) -> Option<ResolutionOutcome> {
        self.rx.recv().await
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

impl Drop for OutcomeStream {
    fn drop(&mut self) {
        self.driver.abort();
    }
}
