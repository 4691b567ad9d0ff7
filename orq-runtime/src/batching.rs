//! Batching: split a vector-level protocol invocation into
//! batches of at most `batch_size` elements, dispatch each to a worker
//! thread, and autotune that batch size the way the original benchmark
//! harness does ("measure throughput at batch sizes {2^10..2^20}, then
//! refine in a x1/4..x4 range around the best"). The persisted
//! `auto_batchsize.txt` format lives here too, since it's the
//! external interface this module's autotuner feeds.

use std::path::Path;
use std::time::Duration;

use orq_error::{OrqError, OrqResult};

/// Contiguous `[start, end)` row ranges covering `0..len`, each at most
/// `batch_size` wide ("Any vector-level protocol longer than B
/// is split into batches of B elements").
pub fn batch_ranges(len: usize, batch_size: usize) -> Vec<(usize, usize)> {
    if len == 0 {
        return Vec::new();
    }
    if batch_size == 0 {
        return vec![(0, len)];
    }
    let mut ranges = Vec::with_capacity(len.div_ceil(batch_size));
    let mut start = 0;
    while start < len {
        let end = (start + batch_size).min(len);
        ranges.push((start, end));
        start = end;
    }
    ranges
}

/// Run `f` over each disjoint batch, one worker per batch, round-robin
/// across `workers.len()` threads ("Workers are assigned
/// contiguous row ranges of each batched vector op; ranges are disjoint so
/// no intra-batch locking is needed"). Results come back in row order
/// regardless of which worker finished first.
pub fn dispatch_batches<W, F, R>(workers: &mut [W], len: usize, batch_size: usize, f: F) -> Vec<R>
where
    W: Send,
    F: Fn(&mut W, usize, usize) -> R + Sync,
    R: Send,
{
    let ranges = batch_ranges(len, batch_size);
    if ranges.is_empty() {
        return Vec::new();
    }
    if workers.len() <= 1 || ranges.len() == 1 {
        let w = &mut workers[0];
        let mut out = Vec::with_capacity(ranges.len());
        for (s, e) in ranges {
            out.push(f(w, s, e));
        }
        return out;
    }

    let num_workers = workers.len();
    let mut per_worker: Vec<Vec<usize>> = vec![Vec::new(); num_workers];
    for i in 0..ranges.len() {
        per_worker[i % num_workers].push(i);
    }

    let mut results: Vec<Option<R>> = (0..ranges.len()).map(|_| None).collect();
    std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(num_workers);
        let ranges = &ranges;
        let f = &f;
        for (w, batch_indices) in workers.iter_mut().zip(per_worker.into_iter()) {
            handles.push(scope.spawn(move || {
                let mut out = Vec::with_capacity(batch_indices.len());
                for i in batch_indices {
                    out.push((i, f(w, ranges[i].0, ranges[i].1)));
                }
                out
            }));
        }
        for h in handles {
            for (i, r) in h.join().expect("batch worker thread panicked") {
                results[i] = Some(r);
            }
        }
    });
    results.into_iter().map(|r| r.expect("every batch index assigned to exactly one worker")).collect()
}

/// Coarse candidate batch sizes, `2^10..=2^20`.
fn coarse_candidates() -> Vec<usize> {
    (10..=20).map(|p| 1usize << p).collect()
}

fn best_by_throughput(candidates: &[usize], bench: &mut impl FnMut(usize) -> Duration) -> usize {
    let mut best = candidates[0];
    let mut best_throughput = -1.0f64;
    for &b in candidates {
        let elapsed = bench(b);
        let throughput = b as f64 / elapsed.as_secs_f64().max(1e-12);
        if throughput > best_throughput {
            best_throughput = throughput;
            best = b;
        }
    }
    best
}

/// Autotune the batch size: coarse sweep over `{2^10..2^20}`,
/// then refine in a `x1/4..x4` range around the coarse winner. `bench`
/// measures wall-clock time to run one protocol at a given batch size;
/// the caller supplies it so this module stays free of any particular
/// protocol's setup cost.
pub fn autotune_batch_size(mut bench: impl FnMut(usize) -> Duration) -> usize {
    let coarse = coarse_candidates();
    let best_coarse = best_by_throughput(&coarse, &mut bench);
    let lo = (best_coarse / 4).max(1);
    let hi = best_coarse * 4;
    let mut refine = vec![lo, lo * 2, best_coarse, hi / 2, hi];
    refine.sort_unstable();
    refine.dedup();
    best_by_throughput(&refine, &mut bench)
}

/// The `auto_batchsize.txt` persisted-file format: `# timestamp`,
/// `# protocol`, `# threads`, then a `BATCHSIZE: <n>` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoBatchSize {
    pub timestamp: String,
    pub protocol: String,
    pub threads: usize,
    pub batch_size: usize,
}

impl AutoBatchSize {
    pub fn write(&self, path: impl AsRef<Path>) -> OrqResult<()> {
        let path = path.as_ref();
        let content =
            format!("# {}\n# {}\n# {}\nBATCHSIZE: {}\n", self.timestamp, self.protocol, self.threads, self.batch_size);
        std::fs::write(path, content)
            .map_err(|e| OrqError::invalid_shape(format!("writing {}: {e}", path.display())))
    }

    pub fn read(path: impl AsRef<Path>) -> OrqResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| OrqError::invalid_shape(format!("reading {}: {e}", path.display())))?;
        let mut lines = content.lines();
        let timestamp = lines.next().unwrap_or("").trim_start_matches('#').trim().to_string();
        let protocol = lines.next().unwrap_or("").trim_start_matches('#').trim().to_string();
        let threads: usize = lines
            .next()
            .unwrap_or("")
            .trim_start_matches('#')
            .trim()
            .parse()
            .map_err(|_| OrqError::invalid_shape("auto_batchsize.txt: malformed threads line"))?;
        let batch_size = lines
            .next()
            .and_then(|l| l.strip_prefix("BATCHSIZE:"))
            .map(|s| s.trim())
            .ok_or_else(|| OrqError::invalid_shape("auto_batchsize.txt: missing BATCHSIZE line"))?
            .parse()
            .map_err(|_| OrqError::invalid_shape("auto_batchsize.txt: malformed BATCHSIZE value"))?;
        Ok(AutoBatchSize { timestamp, protocol, threads, batch_size })
    }
}
