use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// JSONL timing log shared by every encode of one `QuoteEncoder`.
///
/// Each line is either a `perf.span` (phase timing) or `perf.counts` record.
/// When the last handle is dropped a `<stem>_hot.log` summary ranks phases by
/// total time.
#[derive(Clone)]
pub(crate) struct PerfLogger {
    inner: Arc<Mutex<PerfState>>,
}

struct PerfState {
    writer: BufWriter<File>,
    path: PathBuf,
    span_totals: HashMap<String, f64>,
    span_counts: HashMap<String, u64>,
}

impl PerfLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(PerfState {
                writer: BufWriter::new(file),
                path,
                span_totals: HashMap::new(),
                span_counts: HashMap::new(),
            })),
        })
    }

    pub fn start(&self, name: &'static str, quote_id: Option<usize>) -> PerfSpan<'_> {
        PerfSpan {
            logger: self,
            name,
            quote_id,
            started: Instant::now(),
        }
    }

    pub fn log_span_ms(&self, name: &str, quote_id: Option<usize>, ms: f64) {
        let json = format!(
            "{{\"type\":\"perf.span\",\"name\":\"{}\",\"quote_id\":{},\"unit\":\"ms\",\"ms\":{:.3}}}",
            json_escape(name),
            json_id(quote_id),
            ms
        );
        if let Ok(mut state) = self.inner.lock() {
            *state.span_totals.entry(name.to_string()).or_insert(0.0) += ms;
            let entry = state.span_counts.entry(name.to_string()).or_insert(0);
            *entry = entry.saturating_add(1);
            let _ = writeln!(state.writer, "{json}");
        }
    }

    pub fn log_counts(&self, name: &str, quote_id: Option<usize>, counts: &[(&str, u64)]) {
        let fields: Vec<String> = counts
            .iter()
            .map(|(key, value)| format!("\"{}\":{}", json_escape(key), value))
            .collect();
        let json = format!(
            "{{\"type\":\"perf.counts\",\"name\":\"{}\",\"quote_id\":{},\"counts\":{{{}}}}}",
            json_escape(name),
            json_id(quote_id),
            fields.join(",")
        );
        if let Ok(mut state) = self.inner.lock() {
            let _ = writeln!(state.writer, "{json}");
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

/// Times one phase; the span is logged when `finish` is called.
pub(crate) struct PerfSpan<'a> {
    logger: &'a PerfLogger,
    name: &'static str,
    quote_id: Option<usize>,
    started: Instant,
}

impl PerfSpan<'_> {
    pub fn finish(self) -> f64 {
        let ms = self.started.elapsed().as_secs_f64() * 1000.0;
        self.logger.log_span_ms(self.name, self.quote_id, ms);
        ms
    }
}

impl Drop for PerfState {
    fn drop(&mut self) {
        let _ = self.writer.flush();
        let Ok(file) = File::create(hot_path_for(&self.path)) else {
            return;
        };
        let mut writer = BufWriter::new(file);

        let mut spans: Vec<(&String, &f64)> = self.span_totals.iter().collect();
        spans.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
        for (rank, (name, ms)) in spans.into_iter().enumerate() {
            let count = *self.span_counts.get(name).unwrap_or(&1);
            let avg = if count == 0 { 0.0 } else { ms / count as f64 };
            let _ = writeln!(
                writer,
                "{{\"type\":\"perf.hot.span\",\"rank\":{},\"name\":\"{}\",\"unit\":\"ms\",\"ms\":{:.3},\"count\":{},\"avg_ms\":{:.3}}}",
                rank + 1,
                json_escape(name),
                ms,
                count,
                avg
            );
        }
    }
}

fn json_id(quote_id: Option<usize>) -> String {
    quote_id
        .map(|v| v.to_string())
        .unwrap_or_else(|| "null".to_string())
}

fn hot_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("quotepdf_perf.log");
    let stem = file_name
        .rsplit_once('.')
        .map(|(s, _)| s)
        .unwrap_or(file_name);
    path.with_file_name(format!("{stem}_hot.log"))
}

fn json_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}
