use std::borrow::Cow;
use std::collections::HashSet;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::index::bwt::build_rlbwt;
use crate::index::sa;
use crate::index::rlbwt::RlBwt;
use crate::io::SequenceItem;
use crate::merge::gap::{analyze_gap_array, DenseGapArray, GapArray, GapKind, GapStats, SparseGapArray};
use crate::merge::rank::{Direction, RankAggregator, RankComputer, RankMode, RankVector};
use crate::merge::MergeOpt;
use crate::util::dna::{Symbol, SENTINEL};

/// 被拒绝的序列及原因。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub id: String,
    pub reason: String,
}

/// 一轮 rank 计算的结果：聚合器 + 被接受的序列下标 + 被拒绝的序列。
#[derive(Debug)]
pub struct GapRound<G: GapArray> {
    pub aggregator: RankAggregator<G>,
    pub accepted: Vec<usize>,
    pub rejected: Vec<Rejected>,
}

/// 一轮合并的汇总。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundReport {
    pub accepted: usize,
    pub symbols: usize,
    pub rejected: Vec<Rejected>,
    pub gap_stats: GapStats,
}

/// 一轮合并所需的 gap array 大小。
#[inline]
pub fn gap_array_size(prior: &RlBwt, num_sequences: usize) -> usize {
    prior.num_symbols() + num_sequences + 1
}

/// 单条序列的串行路径：计算插入 rank 并累加进 gap array。
pub fn update_gap_array<G: GapArray + ?Sized>(item: &SequenceItem, prior: &RlBwt, gaps: &mut G) -> Result<()> {
    let ranks = RankComputer::new(prior, Direction::Forward, RankMode::Insert).process(item)?;
    for r in ranks {
        gaps.increment(r)?;
    }
    Ok(())
}

/// 并行计算一批序列的 rank，串行累加进 `gaps`。
///
/// 每个分块内的序列在 rayon 线程池上并行计算（只读访问 `prior`），
/// 随后按输入顺序逐条累加，所以计数是精确且确定的。可恢复的错误
/// （id 非法、与索引不符）只拒绝对应序列；其余错误中止整轮。
pub fn compute_gap_array<G: GapArray>(
    prior: &RlBwt,
    items: &[SequenceItem],
    mode: RankMode,
    opt: &MergeOpt,
    gaps: G,
) -> Result<GapRound<G>> {
    let computer = RankComputer::new(prior, opt.direction, mode);
    let chunk_size = opt.chunk_size.max(1);
    let mut aggregator = RankAggregator::new(gaps);
    let mut accepted = Vec::with_capacity(items.len());
    let mut rejected = Vec::new();

    for (ci, chunk) in items.chunks(chunk_size).enumerate() {
        let results: Vec<Result<RankVector>> = chunk.par_iter().map(|it| computer.process(it)).collect();
        for (j, (item, res)) in chunk.iter().zip(results).enumerate() {
            match res {
                Ok(ranks) => {
                    aggregator.process(&ranks)?;
                    accepted.push(ci * chunk_size + j);
                }
                Err(e) if e.is_recoverable() => {
                    warn!("skipping sequence '{}': {}", item.id, e);
                    rejected.push(Rejected { id: item.id.clone(), reason: e.to_string() });
                }
                Err(e) => return Err(e),
            }
        }
        debug!("chunk {}: ranked {} sequences", ci, chunk.len());
    }

    Ok(GapRound { aggregator, accepted, rejected })
}

/// 合并：对先前 BWT 的每个位置 i，先写出 `gaps[i]` 个新批次的 BWT 符号，再写出 `prior[i]`。
///
/// `batch` 必须是被插入序列（按同样的方向、同样的顺序）从头构建的 BWT。
pub fn merge_insertions<G: GapArray + ?Sized>(prior: &RlBwt, batch: &RlBwt, gaps: &G) -> Result<RlBwt> {
    let n = prior.num_symbols();
    if gaps.size() < n + 1 {
        return Err(Error::GapMismatch(format!(
            "gap array has {} slots, prior BWT needs {}",
            gaps.size(),
            n + 1
        )));
    }
    let total = gaps.total();
    if total != batch.num_symbols() {
        return Err(Error::GapMismatch(format!(
            "{} gap increments for a batch BWT of {} symbols",
            total,
            batch.num_symbols()
        )));
    }

    let mut out = RlBwt::new(prior.sample_rate());
    let mut new_syms = batch.symbols();
    let mut old_syms = prior.symbols();
    for i in 0..gaps.size() {
        let g = gaps.get(i);
        if g > 0 && i > n {
            return Err(Error::GapMismatch(format!("slot {} past the end of the prior BWT is set", i)));
        }
        for _ in 0..g {
            let a = new_syms
                .next()
                .ok_or_else(|| Error::GapMismatch("batch BWT exhausted".to_string()))?;
            out.append(a);
        }
        if i < n {
            let a = old_syms
                .next()
                .ok_or_else(|| Error::GapMismatch("prior BWT exhausted".to_string()))?;
            out.append(a);
        }
    }
    out.set_num_strings(prior.num_strings() + batch.num_strings());
    out.initialize_fm_index();
    Ok(out)
}

/// 删除：去掉所有被标记的先前 BWT 位置。每个位置最多被标记一次。
pub fn merge_removals<G: GapArray + ?Sized>(prior: &RlBwt, gaps: &G, removed_strings: usize) -> Result<RlBwt> {
    let n = prior.num_symbols();
    if gaps.size() < n {
        return Err(Error::GapMismatch(format!("gap array has {} slots, prior BWT has {}", gaps.size(), n)));
    }
    let mut out = RlBwt::new(prior.sample_rate());
    let mut sentinels = 0usize;
    for (i, a) in prior.symbols().enumerate() {
        match gaps.get(i) {
            0 => out.append(a),
            1 => {
                if a == SENTINEL {
                    sentinels += 1;
                }
            }
            c => {
                return Err(Error::GapMismatch(format!("position {} marked for removal {} times", i, c)));
            }
        }
    }
    if (n..gaps.size()).any(|i| gaps.get(i) > 0) {
        return Err(Error::GapMismatch("removal mark past the end of the prior BWT".to_string()));
    }
    if sentinels != removed_strings {
        return Err(Error::GapMismatch(format!(
            "removed {} sentinels for {} sequences",
            sentinels, removed_strings
        )));
    }
    out.set_num_strings(prior.num_strings() - removed_strings);
    out.initialize_fm_index();
    Ok(out)
}

fn oriented(seq: &[Symbol], direction: Direction) -> Cow<'_, [Symbol]> {
    match direction {
        Direction::Forward => Cow::Borrowed(seq),
        Direction::Reverse => Cow::Owned(seq.iter().rev().copied().collect()),
    }
}

/// 从头为一批序列构建索引（`$` 按输入顺序）。
pub fn build_index(items: &[SequenceItem], opt: &MergeOpt) -> Result<RlBwt> {
    if opt.sample_rate == 0 {
        return Err(Error::InvalidSampleRate(opt.sample_rate));
    }
    let reads: Vec<Cow<'_, [Symbol]>> = items.iter().map(|it| oriented(&it.seq, opt.direction)).collect();
    sa::check_text_len(sa::text_len(&reads))?;
    info!("building index from {} sequences", reads.len());
    Ok(build_rlbwt(&reads, opt.sample_rate))
}

/// 把一批新序列加入索引，返回下一代索引；`prior` 不会被修改。
///
/// 新序列的 `$` 排在所有已有序列之前（按批次内顺序），即合并后第 i 条新序列
/// 的序号为 i，已有序列的序号整体后移。
pub fn extend_index(prior: &RlBwt, items: &[SequenceItem], opt: &MergeOpt) -> Result<(RlBwt, RoundReport)> {
    let size = gap_array_size(prior, items.len());
    match opt.gap_kind {
        GapKind::Dense => extend_with(prior, items, opt, DenseGapArray::new(size)),
        GapKind::Sparse => extend_with(prior, items, opt, SparseGapArray::new(size)),
    }
}

fn extend_with<G: GapArray>(
    prior: &RlBwt,
    items: &[SequenceItem],
    opt: &MergeOpt,
    gaps: G,
) -> Result<(RlBwt, RoundReport)> {
    info!(
        "extending index ({} strings, {} symbols) with {} sequences",
        prior.num_strings(),
        prior.num_symbols(),
        items.len()
    );
    sa::check_text_len(items.iter().map(|it| it.seq.len() + 1).sum())?;
    let round = compute_gap_array(prior, items, RankMode::Insert, opt, gaps)?;
    let gap_stats = analyze_gap_array(round.aggregator.gaps());

    let reads: Vec<Cow<'_, [Symbol]>> =
        round.accepted.iter().map(|&i| oriented(&items[i].seq, opt.direction)).collect();
    let batch = build_rlbwt(&reads, prior.sample_rate());
    let mut merged = merge_insertions(prior, &batch, round.aggregator.gaps())?;

    let mut meta = prior.meta().clone();
    meta.merge_rounds += 1;
    merged.set_meta(meta);

    info!(
        "merged index: {} strings, {} symbols, {} runs",
        merged.num_strings(),
        merged.num_symbols(),
        merged.num_runs()
    );
    let report = RoundReport {
        accepted: round.aggregator.num_strings(),
        symbols: round.aggregator.num_symbols(),
        rejected: round.rejected,
        gap_stats,
    };
    Ok((merged, report))
}

/// 从索引中删除一批序列（id 为其当前序号），返回下一代索引。
///
/// 重复的 id 以及与索引不符的序列会被拒绝并记录，其余序列照常删除。
pub fn remove_from_index(prior: &RlBwt, items: &[SequenceItem], opt: &MergeOpt) -> Result<(RlBwt, RoundReport)> {
    let mut seen = HashSet::new();
    let mut rejected = Vec::new();
    let unique: Vec<SequenceItem> = items
        .iter()
        .filter(|it| {
            // 按解析后的序号去重："1" 与 "01" 指向同一条序列；无法解析的 id 留给 rank 计算拒绝
            let fresh = match it.id.trim().parse::<usize>() {
                Ok(seed) => seen.insert(seed),
                Err(_) => true,
            };
            if !fresh {
                warn!("skipping duplicate removal id '{}'", it.id);
                rejected.push(Rejected { id: it.id.clone(), reason: "duplicate id".to_string() });
            }
            fresh
        })
        .cloned()
        .collect();

    info!("removing {} sequences from index ({} strings)", unique.len(), prior.num_strings());
    let size = gap_array_size(prior, unique.len());
    let (merged, mut report) = match opt.gap_kind {
        GapKind::Dense => remove_with(prior, &unique, opt, DenseGapArray::new(size))?,
        GapKind::Sparse => remove_with(prior, &unique, opt, SparseGapArray::new(size))?,
    };
    rejected.append(&mut report.rejected);
    report.rejected = rejected;
    Ok((merged, report))
}

fn remove_with<G: GapArray>(
    prior: &RlBwt,
    items: &[SequenceItem],
    opt: &MergeOpt,
    gaps: G,
) -> Result<(RlBwt, RoundReport)> {
    let round = compute_gap_array(prior, items, RankMode::Remove, opt, gaps)?;
    let gap_stats = analyze_gap_array(round.aggregator.gaps());
    let mut merged = merge_removals(prior, round.aggregator.gaps(), round.aggregator.num_strings())?;

    let mut meta = prior.meta().clone();
    meta.merge_rounds += 1;
    merged.set_meta(meta);

    let report = RoundReport {
        accepted: round.aggregator.num_strings(),
        symbols: round.aggregator.num_symbols(),
        rejected: round.rejected,
        gap_stats,
    };
    Ok((merged, report))
}
