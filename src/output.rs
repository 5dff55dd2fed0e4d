use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Sender};
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::handle::{HitSink, SummaryStats};
use crate::input::OutputFormat;
use crate::model::Hit;

/// 命中结果文件：每个结果追加一行 `name<TAB>records`
///
/// 磁盘写入在独立的写线程中完成，`emit` 只把行放进通道，不会阻塞结果
/// 的分发。被丢弃时关闭通道并等待写线程写完剩余的行。
pub struct FileSink {
    path: PathBuf,
    tx: Option<Sender<String>>,
    writer: Option<JoinHandle<()>>,
}

impl FileSink {
    /// 创建（或清空）结果文件
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        let (tx, rx) = unbounded::<String>();
        let display = path.display().to_string();
        let writer = thread::Builder::new()
            .name("hit-writer".to_string())
            .spawn(move || {
                let mut out = BufWriter::new(file);
                for line in rx {
                    // 逐行刷新，中途退出时文件内容也是完整的
                    if let Err(e) = out.write_all(line.as_bytes()).and_then(|_| out.flush()) {
                        warn!("写入结果文件 {} 失败: {}", display, e);
                        break;
                    }
                }
            })?;

        Ok(FileSink {
            path,
            tx: Some(tx),
            writer: Some(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HitSink for FileSink {
    fn emit(&mut self, hit: &Hit) -> io::Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "结果文件已关闭"))?;
        tx.send(hit.file_line())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "结果文件写线程已退出"))
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                warn!("结果文件写线程异常退出: {}", self.path.display());
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("写入报告失败: {0}")]
    Io(#[from] io::Error),
    #[error("序列化报告失败: {0}")]
    Json(#[from] serde_json::Error),
}

/// 可序列化的命中结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableHit {
    pub domain: String,
    pub records: Vec<String>,
    pub addresses: Vec<String>,
}

/// 可序列化的汇总统计结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableSummaryStats {
    pub total_hits: usize,
    pub candidates: usize,
    pub completed: usize,
    pub unique_ips: Vec<String>,
    pub ip_ranges: std::collections::BTreeMap<String, Vec<String>>,
    pub record_types: std::collections::BTreeMap<String, usize>,
    pub wildcard_ips: Vec<String>,
    pub nameserver: String,
    pub elapsed_secs: f64,
    pub interrupted: bool,
}

/// 完整的导出数据结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportData {
    pub hits: Vec<SerializableHit>,
    pub summary: SerializableSummaryStats,
    pub export_time: String,
}

impl From<&Hit> for SerializableHit {
    fn from(hit: &Hit) -> Self {
        SerializableHit {
            domain: hit.name.clone(),
            records: hit.records.iter().map(|r| r.to_string()).collect(),
            addresses: hit.address_values().map(str::to_string).collect(),
        }
    }
}

impl From<&SummaryStats> for SerializableSummaryStats {
    fn from(stats: &SummaryStats) -> Self {
        SerializableSummaryStats {
            total_hits: stats.total_hits,
            candidates: stats.candidates,
            completed: stats.completed,
            unique_ips: stats.unique_ips.iter().cloned().collect(),
            ip_ranges: stats.ip_ranges.clone(),
            record_types: stats.record_types.clone(),
            wildcard_ips: stats.wildcard_ips.clone(),
            nameserver: stats.nameserver.to_string(),
            elapsed_secs: stats.elapsed.as_secs_f64(),
            interrupted: stats.interrupted,
        }
    }
}

/// 导出结果报告到文件
pub fn export_results(
    hits: &[Hit],
    summary: &SummaryStats,
    output_path: impl AsRef<Path>,
    format: OutputFormat,
) -> Result<(), ExportError> {
    let export_data = ExportData {
        hits: hits.iter().map(SerializableHit::from).collect(),
        summary: summary.into(),
        export_time: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    };

    let content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&export_data)?,
        OutputFormat::Csv => export_to_csv(&export_data),
        OutputFormat::Txt => export_to_txt(&export_data),
    };

    let mut file = File::create(output_path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// 导出为CSV格式
fn export_to_csv(data: &ExportData) -> String {
    let mut csv = String::new();
    csv.push_str("Domain,Records,Addresses\n");
    for hit in &data.hits {
        csv.push_str(&format!(
            "{},{},{}\n",
            escape_csv(&hit.domain),
            escape_csv(&hit.records.join(" | ")),
            escape_csv(&hit.addresses.join(" ")),
        ));
    }
    csv
}

/// 导出为TXT格式
fn export_to_txt(data: &ExportData) -> String {
    let summary = &data.summary;
    let mut txt = String::new();

    txt.push_str("rdnsenum 扫描结果报告\n");
    txt.push_str(&format!("导出时间: {}\n", data.export_time));
    txt.push_str(&format!("{}\n\n", "=".repeat(60)));

    txt.push_str("汇总统计:\n");
    txt.push_str(&format!("  DNS服务器: {}\n", summary.nameserver));
    txt.push_str(&format!("  查询进度: {}/{}\n", summary.completed, summary.candidates));
    txt.push_str(&format!("  命中域名: {}\n", summary.total_hits));
    txt.push_str(&format!("  唯一IP数量: {}\n", summary.unique_ips.len()));
    txt.push_str(&format!("  耗时: {:.1}s\n", summary.elapsed_secs));
    if !summary.wildcard_ips.is_empty() {
        txt.push_str(&format!("  泛解析IP: {}\n", summary.wildcard_ips.join(", ")));
    }
    txt.push('\n');

    txt.push_str("记录类型分布:\n");
    for (record_type, count) in &summary.record_types {
        txt.push_str(&format!("  {}: {}\n", record_type, count));
    }
    txt.push('\n');

    txt.push_str("发现的域名:\n");
    txt.push_str(&format!("{}\n", "-".repeat(80)));
    for hit in &data.hits {
        txt.push_str(&format!("{:<30} {}\n", hit.domain, hit.records.join(" | ")));
    }

    txt
}

/// CSV转义
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
