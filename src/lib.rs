//! # rdnsenum
//!
//! 一个基于Rust实现的DNS子域名暴破工具库：对字典中的每个候选名称向指定的
//! DNS服务器发起查询，实时统计进度并收集命中结果。
//!
//! ## 特性
//!
//! - 🚀 **有界并发**: 并发上限内同时解析，结果按完成顺序产出
//! - 🔁 **稳定可靠**: UDP失败时回退TCP，查询无结果时按退避间隔重试
//! - 🔗 **CNAME追踪**: 没有A记录时自动解析CNAME目标的A记录
//! - 🎯 **结果过滤**: 按A记录后缀过滤，命中结果可写入文件或导出报告
//!
//! ## 快速开始
//!
//! ```rust,no_run
//! use rdnsenum::brute_force_subdomains;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let nameserver = "10.129.22.65:53".parse()?;
//!     let labels = vec!["www".to_string(), "mail".to_string()];
//!     let hits = brute_force_subdomains(nameserver, "example.htb", &labels).await?;
//!
//!     for hit in &hits {
//!         println!("{} -> {}", hit.name, hit.records_line());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## 高级配置
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use rdnsenum::{
//!     build_candidates, HitFilter, ResolverConfig, SubdomainBruteConfig, SubdomainBruteEngine,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SubdomainBruteConfig {
//!         resolver: ResolverConfig {
//!             timeout: Duration::from_secs(1),
//!             tcp_fallback: true,
//!             ..ResolverConfig::new("10.129.22.65:53".parse()?)
//!         },
//!         concurrency: 40,
//!         filter: HitFilter::new(Some(".203".to_string()), false),
//!     };
//!
//!     let labels = vec!["www".to_string(), "dev".to_string()];
//!     let engine = SubdomainBruteEngine::new(config)?;
//!     let summary = engine.run_brute_force(build_candidates(&labels, "example.htb")).await?;
//!     println!("命中 {} 个，耗时 {:?}", summary.hits.len(), summary.elapsed);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod dispatch;
pub mod dns_query;
pub mod dns_resolver;
pub mod error;
pub mod handle;
pub mod input;
pub mod logger;
pub mod model;
pub mod output;
pub mod progress;
pub mod terminal;
pub mod wildcard;

// 重新导出主要的公共API
pub use api::{brute_force_subdomains, RunSummary, SubdomainBruteConfig, SubdomainBruteEngine};

pub use dispatch::{Dispatcher, OutcomeStream};
pub use dns_query::{
    ClientFactory, DnsClient, Lookup, NameserverClient, NetworkClientFactory, QueryExecutor, Transport,
};
pub use dns_resolver::DnsResolver;
pub use error::{ConfigError, QueryError};
pub use handle::{generate_summary, HitFilter, HitSink, ResultCollector, SummaryStats};
pub use input::{build_candidates, load_wordlist, OutputFormat};
pub use model::{Candidate, Hit, ProgressSample, ResolutionOutcome, ResolverConfig, TypedRecord};
pub use output::{export_results, FileSink};
pub use progress::{ProgressReporter, ProgressTracker};
pub use wildcard::WildcardDetector;
