//! 终端展示：进度条、命中输出与汇总表

use std::io::{self, Write};
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::api::SubdomainBruteConfig;
use crate::handle::{HitSink, SummaryStats};
use crate::model::{Hit, ProgressSample};
use crate::progress::ProgressReporter;

const BAR_TEMPLATE: &str =
    "{spinner:.green} {prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} • {msg:.cyan} q/s • {elapsed_precise} • {eta}";

/// 基于 indicatif 的进度条
pub struct TerminalReporter {
    bar: ProgressBar,
}

impl TerminalReporter {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        bar.set_prefix("progress");
        bar.set_message("0.0");
        bar.enable_steady_tick(Duration::from_millis(120));
        TerminalReporter { bar }
    }

    /// 把命中结果打印到标准输出的输出端
    pub fn console_sink(&self) -> ConsoleSink {
        ConsoleSink::new(self.bar.clone(), Box::new(io::stdout()))
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for TerminalReporter {
    fn on_progress(&self, sample: &ProgressSample) {
        self.bar.set_position(sample.completed as u64);
        self.bar.set_message(format!("{:.1}", sample.rate));
    }
}

/// 控制台输出端
///
/// 进度条画在stderr上，命中结果写到stdout。写入时先收起进度条，
/// 进度条被隐藏（stderr不是终端）时照常写出。
pub struct ConsoleSink {
    bar: ProgressBar,
    out: Box<dyn Write + Send>,
}

impl ConsoleSink {
    pub fn new(bar: ProgressBar, out: Box<dyn Write + Send>) -> Self {
        ConsoleSink { bar, out }
    }
}

impl HitSink for ConsoleSink {
    fn emit(&mut self, hit: &Hit) -> io::Result<()> {
        let line = format_hit(hit);
        let out = &mut self.out;
        self.bar.suspend(|| {
            writeln!(out, "{}", line)?;
            out.flush()
        })
    }
}

pub fn format_hit(hit: &Hit) -> String {
    format!("{} {} -> {}", "[+]".green(), hit.name, hit.records_line())
}

/// 打印运行参数
pub fn print_banner(config: &SubdomainBruteConfig, domain: &str, words: usize) {
    let resolver = &config.resolver;
    println!(
        "{}  dns={}  domain={}  words={}  threads={}  timeout={:.1}s  retries={}",
        "rdnsenum".bold(),
        resolver.nameserver,
        domain,
        words,
        config.concurrency,
        resolver.timeout.as_secs_f64(),
        resolver.retries
    );
    let types: Vec<String> = resolver.record_types.iter().map(|t| t.to_string()).collect();
    println!(
        "Types: {}  | TCP fallback: {}",
        types.join(", "),
        if resolver.tcp_fallback { "ON" } else { "OFF" }
    );
    if let Some(suffix) = &config.filter.suffix {
        println!("Filter: only IP ending with {}", suffix.bold());
    }
    println!();
}

/// 打印汇总表
pub fn print_summary(summary: &SummaryStats) {
    let elapsed = format!("{:.1}s", summary.elapsed.as_secs_f64());
    let dns = summary.nameserver.to_string();

    println!();
    println!("{}", "Summary".bold());
    println!("{:>16} {:>10}  {:<24}", "Resolved hosts", "Elapsed", "DNS");
    println!("{}", "-".repeat(54));
    println!("{:>16} {:>10}  {:<24}", summary.total_hits, elapsed, dns);

    if summary.interrupted {
        println!(
            "{} 运行被中断，已完成 {}/{}",
            "[!]".yellow(),
            summary.completed,
            summary.candidates
        );
    }
    if !summary.wildcard_ips.is_empty() {
        println!(
            "{} 检测到泛解析: {}",
            "[!]".yellow(),
            summary.wildcard_ips.join(", ")
        );
    }
}
