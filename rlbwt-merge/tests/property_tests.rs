use proptest::prelude::*;
use rlbwt_merge::index::rle::RunLengthString;
use rlbwt_merge::index::RlBwt;
use rlbwt_merge::io::SequenceItem;
use rlbwt_merge::merge::{self, MergeOpt};

fn symbols() -> impl Strategy<Value = Vec<u8>> {
    // 偏向长游程：先选符号，再选重复次数
    prop::collection::vec((0u8..6, 1usize..70), 0..40)
        .prop_map(|runs| runs.into_iter().flat_map(|(a, n)| std::iter::repeat(a).take(n)).collect::<Vec<u8>>())
}

fn reads() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(prop::sample::select(vec![b'A', b'C', b'G', b'T']), 0..12), 0..8)
}

fn as_items(reads: &[Vec<u8>]) -> Vec<SequenceItem> {
    reads.iter().enumerate().map(|(i, s)| SequenceItem::from_bases(i.to_string(), s)).collect()
}

fn index_of(text: &[u8], rate: usize) -> RlBwt {
    let mut bwt = RlBwt::new(rate);
    for &a in text {
        bwt.append(a);
    }
    bwt.set_num_strings(text.iter().filter(|&&a| a == 0).count());
    bwt.initialize_fm_index();
    bwt
}

proptest! {
    #[test]
    fn run_length_string_roundtrip(text in symbols()) {
        let s: RunLengthString = text.iter().copied().collect();
        prop_assert_eq!(s.len(), text.len());
        prop_assert_eq!(s.symbols().collect::<Vec<_>>(), text.clone());
        for w in s.units().windows(2) {
            prop_assert!(w[0].symbol() != w[1].symbol() || w[0].is_full());
        }
    }

    #[test]
    fn occurrence_matches_scan_and_is_monotone(text in symbols(), rate in 1usize..80) {
        let bwt = index_of(&text, rate);
        let mut running = [0usize; 6];
        for (pos, &a) in text.iter().enumerate() {
            running[a as usize] += 1;
            prop_assert_eq!(bwt.get_char(pos).unwrap(), a);
            for b in 0..6u8 {
                prop_assert_eq!(bwt.get_occ(b, pos), running[b as usize]);
                if pos > 0 {
                    prop_assert!(bwt.get_occ(b, pos) >= bwt.get_occ(b, pos - 1));
                }
            }
        }
    }

    #[test]
    fn occ_diff_matches_full_vectors(text in symbols(), rate in 1usize..80, a in 0usize..2000, b in 0usize..2000) {
        prop_assume!(!text.is_empty());
        let bwt = index_of(&text, rate);
        let (lo, hi) = (a.min(b) % text.len(), a.max(b) % text.len());
        let (lo, hi) = (lo.min(hi), lo.max(hi));
        prop_assert_eq!(bwt.get_occ_diff(lo, hi), bwt.get_full_occ(hi) - bwt.get_full_occ(lo));
    }

    #[test]
    fn f_column_is_sorted_and_complete(text in symbols()) {
        let bwt = index_of(&text, 16);
        let f: Vec<u8> = (0..bwt.num_symbols()).map(|i| bwt.get_f(i).unwrap()).collect();
        let mut sorted = text.clone();
        sorted.sort_unstable();
        prop_assert_eq!(f, sorted);
    }

    #[test]
    fn merge_equals_rebuild(old in reads(), new in reads(), rate in 1usize..20) {
        let opt = MergeOpt { sample_rate: rate, chunk_size: 3, ..MergeOpt::default() };
        let prior = merge::build_index(&as_items(&old), &opt).unwrap();
        let (merged, report) = merge::extend_index(&prior, &as_items(&new), &opt).unwrap();
        let expected: usize = new.iter().map(|s| s.len() + 1).sum();
        prop_assert_eq!(report.gap_stats.total, expected);

        let mut all = new.clone();
        all.extend(old.iter().cloned());
        prop_assert_eq!(merged, merge::build_index(&as_items(&all), &opt).unwrap());
    }
}
