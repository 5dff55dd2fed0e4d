use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use log::warn;

use rdnsenum::handle::generate_summary;
use rdnsenum::input::{build_candidates, load_wordlist, Opts};
use rdnsenum::logger;
use rdnsenum::output::{export_results, FileSink};
use rdnsenum::terminal::{print_banner, print_summary, TerminalReporter};
use rdnsenum::{NetworkClientFactory, SubdomainBruteEngine, WildcardDetector};

#[tokio::main]
async fn main() {
    let opts = Opts::parse();
    logger::init_logger(opts.verbose);

    if let Err(e) = run_subdomain_brute(opts).await {
        eprintln!("{} {:#}", "[!]".red(), e);
        process::exit(1);
    }
}

/// 执行域名暴破主逻辑
async fn run_subdomain_brute(opts: Opts) -> Result<()> {
    // 所有配置错误在开始查询之前报告
    let config = opts.brute_config()?;
    let export_format = opts.output_format()?;
    let labels = load_wordlist(&opts.wordlist)?;
    let candidates = build_candidates(&labels, &opts.domain);
    let total = candidates.len();
    let nameserver = config.resolver.nameserver;

    let file_sink = match &opts.out {
        Some(path) => Some(
            FileSink::create(path)
                .with_context(|| format!("无法创建结果文件 {}", path.display()))?,
        ),
        None => None,
    };

    let saved_path = file_sink.as_ref().map(|sink| sink.path().to_path_buf());

    print_banner(&config, &opts.domain, total);

    // 泛解析检测
    let wildcard_ips = if opts.detect_wildcard {
        let detector = WildcardDetector::new(NetworkClientFactory, &config.resolver);
        match detector.detect_wildcard(&opts.domain).await {
            Some(ips) => {
                warn!("检测到泛解析域名: {} -> {}", opts.domain, ips.join(", "));
                println!("{} 检测到泛解析: {}\n", "[!]".yellow(), ips.join(", "));
                ips
            }
            None => Vec::new(),
        }
    } else {
        Vec::new()
    };

    let reporter = Arc::new(TerminalReporter::new(total));
    let mut engine = SubdomainBruteEngine::new(config)?
        .with_reporter(reporter.clone())
        .with_sink(Box::new(reporter.console_sink()));
    if let Some(sink) = file_sink {
        engine = engine.with_sink(Box::new(sink));
    }

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            // 无法监听信号时只等待正常结束
            std::future::pending::<()>().await;
        }
    };
    let run = engine.run_until(candidates, shutdown).await?;
    reporter.finish();

    let mut summary = generate_summary(&run.hits, run.total, run.completed, nameserver, run.elapsed);
    summary.interrupted = run.interrupted;
    summary.wildcard_ips = wildcard_ips;
    print_summary(&summary);

    if let Some(path) = &saved_path {
        println!("{} {}", "Saved hits:".bold(), path.display());
    }

    if let Some(path) = &opts.export {
        export_results(&run.hits, &summary, path, export_format)
            .with_context(|| format!("导出报告失败 {}", path.display()))?;
        println!("{} {}", "Report:".bold(), path.display());
    }

    Ok(())
}
