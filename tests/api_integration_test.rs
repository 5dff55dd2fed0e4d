mod common;

use std::collections::HashMap;
use std::fs;
use std::time::Duration;

use rdnsenum::{
    build_candidates, Dispatcher, FileSink, HitFilter, NetworkClientFactory, ResolverConfig,
    SubdomainBruteConfig, SubdomainBruteEngine,
};
use trust_dns_resolver::proto::rr::RecordType;

use common::{lab_zone, FakeNameserver, UdpBehavior};

fn labels(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

fn resolver_for(server: &FakeNameserver, tcp_fallback: bool) -> ResolverConfig {
    ResolverConfig {
        timeout: Duration::from_millis(300),
        retries: 1,
        tcp_fallback,
        backoff: Duration::from_millis(10),
        ..ResolverConfig::new(server.addr)
    }
}

fn brute_config(resolver: ResolverConfig, filter: HitFilter) -> SubdomainBruteConfig {
    SubdomainBruteConfig {
        resolver,
        concurrency: 3,
        filter,
    }
}

#[tokio::test]
async fn test_end_to_end_outcomes() {
    let server = FakeNameserver::start(lab_zone(), UdpBehavior::Answer).await;
    let config = std::sync::Arc::new(resolver_for(&server, false));
    let dispatcher = Dispatcher::new(NetworkClientFactory, config, 3).unwrap();

    let candidates = build_candidates(&labels(&["www", "mail", "ghost"]), "example.htb");
    let mut stream = dispatcher.dispatch(candidates);
    let mut outcomes = HashMap::new();
    while let Some(outcome) = stream.next().await {
        assert!(outcomes.insert(outcome.name.clone(), outcome).is_none());
    }

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes["www.example.htb"].records_line(), "A:10.0.0.5");
    assert_eq!(
        outcomes["mail.example.htb"].records_line(),
        "CNAME:mailhost.example.htb. | A:10.0.0.9"
    );
    assert!(!outcomes["ghost.example.htb"].has_records());
    assert_eq!(server.tcp_queries(), 0);
}

#[tokio::test]
async fn test_hit_count_without_filter() {
    let server = FakeNameserver::start(lab_zone(), UdpBehavior::Answer).await;
    let engine = SubdomainBruteEngine::new(brute_config(
        resolver_for(&server, false),
        HitFilter::default(),
    ))
    .unwrap();

    let candidates = build_candidates(&labels(&["www", "mail", "ghost"]), "example.htb");
    let summary = engine.run_brute_force(candidates).await.unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.completed, 3);
    assert_eq!(summary.hits.len(), 2);
}

#[tokio::test]
async fn test_suffix_filter_end_to_end() {
    let server = FakeNameserver::start(lab_zone(), UdpBehavior::Answer).await;
    let candidates = build_candidates(&labels(&["dev", "ops"]), "example.htb");

    let filtered = SubdomainBruteEngine::new(brute_config(
        resolver_for(&server, false),
        HitFilter::new(Some(".203".to_string()), false),
    ))
    .unwrap()
    .run_brute_force(candidates.clone())
    .await
    .unwrap();
    assert_eq!(filtered.hits.len(), 1);
    assert_eq!(filtered.hits[0].name, "dev.example.htb");

    let show_all = SubdomainBruteEngine::new(brute_config(
        resolver_for(&server, false),
        HitFilter::new(Some(".203".to_string()), true),
    ))
    .unwrap()
    .run_brute_force(candidates)
    .await
    .unwrap();
    assert_eq!(show_all.hits.len(), 2);
}

#[tokio::test]
async fn test_tcp_fallback_recovers_dropped_udp() {
    let server = FakeNameserver::start(lab_zone(), UdpBehavior::Drop).await;
    let candidates = build_candidates(&labels(&["www"]), "example.htb");

    let with_fallback = SubdomainBruteEngine::new(brute_config(
        resolver_for(&server, true),
        HitFilter::default(),
    ))
    .unwrap()
    .run_brute_force(candidates.clone())
    .await
    .unwrap();
    assert_eq!(with_fallback.hits.len(), 1);
    assert_eq!(with_fallback.hits[0].records_line(), "A:10.0.0.5");
    assert!(server.tcp_queries() >= 1);

    let without_fallback = SubdomainBruteEngine::new(brute_config(
        ResolverConfig {
            retries: 0,
            ..resolver_for(&server, false)
        },
        HitFilter::default(),
    ))
    .unwrap()
    .run_brute_force(candidates)
    .await
    .unwrap();
    assert!(without_fallback.hits.is_empty());
    assert_eq!(without_fallback.completed, 1);
}

#[tokio::test]
async fn test_tcp_fallback_on_empty_udp_answer() {
    let server = FakeNameserver::start(lab_zone(), UdpBehavior::Empty).await;
    let config = ResolverConfig {
        record_types: vec![RecordType::A],
        ..resolver_for(&server, true)
    };
    let engine = SubdomainBruteEngine::new(brute_config(config, HitFilter::default())).unwrap();

    let summary = engine
        .run_brute_force(build_candidates(&labels(&["mail"]), "example.htb"))
        .await
        .unwrap();
    assert_eq!(summary.hits.len(), 1);
    assert_eq!(
        summary.hits[0].records_line(),
        "CNAME:mailhost.example.htb. | A:10.0.0.9"
    );
    assert!(server.udp_queries() >= 1);
}

#[tokio::test]
async fn test_retries_against_silent_server() {
    let server = FakeNameserver::start(lab_zone(), UdpBehavior::Drop).await;
    let config = ResolverConfig {
        timeout: Duration::from_millis(100),
        retries: 2,
        ..resolver_for(&server, false)
    };
    let engine = SubdomainBruteEngine::new(brute_config(config, HitFilter::default())).unwrap();

    let summary = engine
        .run_brute_force(build_candidates(&labels(&["www"]), "example.htb"))
        .await
        .unwrap();
    assert!(summary.hits.is_empty());
    // 每轮 A + CNAME，共三轮
    assert_eq!(server.udp_queries(), 6);
}

#[tokio::test]
async fn test_hits_written_to_file() {
    let server = FakeNameserver::start(lab_zone(), UdpBehavior::Answer).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hits.txt");

    let engine = SubdomainBruteEngine::new(brute_config(
        resolver_for(&server, false),
        HitFilter::default(),
    ))
    .unwrap()
    .with_sink(Box::new(FileSink::create(&path).unwrap()));

    let summary = engine
        .run_brute_force(build_candidates(&labels(&["www", "ghost"]), "example.htb"))
        .await
        .unwrap();
    assert_eq!(summary.hits.len(), 1);
    assert_eq!(fs::read_to_string(&path).unwrap(), "www.example.htb\tA:10.0.0.5\n");
}

#[tokio::test]
async fn test_brute_force_convenience() {
    let server = FakeNameserver::start(lab_zone(), UdpBehavior::Answer).await;
    let words = labels(&["www", "ghost"]);
    let hits = rdnsenum::brute_force_subdomains(server.addr, "example.htb", &words)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "www.example.htb");
}

#[test]
fn test_default_config() {
    let config = SubdomainBruteConfig::default();

    assert_eq!(config.concurrency, 60);
    assert_eq!(config.resolver.timeout, Duration::from_secs(2));
    assert_eq!(config.resolver.retries, 2);
    assert!(!config.resolver.tcp_fallback);
    assert_eq!(config.resolver.record_types, vec![RecordType::A]);
    assert!(config.filter.suffix.is_none());
    assert!(!config.filter.show_all);
}
