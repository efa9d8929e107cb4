use formula_colgroup::{
    builder_for, MapError, MapToData, MatrixBlock, OffsetList, RowCodes, SparseBlock,
};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_map(rng: &mut StdRng, unique: u32, size: usize) -> MapToData {
    let mut b = builder_for(unique, size);
    for pos in 0..size {
        b.set(pos, rng.gen_range(0..unique)).unwrap();
    }
    b.finish()
}

/// Small integers keep every sum exact regardless of accumulation order.
fn random_matrix(rng: &mut StdRng, rows: usize, cols: usize, density: f64) -> Vec<f64> {
    (0..rows * cols)
        .map(|_| {
            if rng.gen_bool(density) {
                rng.gen_range(-50..50) as f64
            } else {
                0.0
            }
        })
        .collect()
}

fn to_csr(values: &[f64], rows: usize, cols: usize) -> SparseBlock {
    let mut row_ptr = vec![0];
    let mut col_idx = Vec::new();
    let mut nnz = Vec::new();
    for r in 0..rows {
        for c in 0..cols {
            let v = values[r * cols + c];
            if v != 0.0 {
                col_idx.push(c as u32);
                nnz.push(v);
            }
        }
        row_ptr.push(col_idx.len());
    }
    SparseBlock::new(row_ptr, col_idx, nnz).unwrap()
}

#[test]
fn dense_rows_match_naive_for_both_widths() {
    let mut rng = StdRng::seed_from_u64(1);
    let (rows, cols) = (9, 70);
    let values = random_matrix(&mut rng, rows, cols, 0.8);
    let m = MatrixBlock::dense(rows, cols, values.clone()).unwrap();

    for unique in [2u32, 5] {
        let map = random_map(&mut rng, unique, cols);
        let n_val = unique as usize;
        let (rl, ru, cl, cu) = (2, 7, 3, 66);

        let mut pre_av = vec![0.0; (ru - rl) * n_val];
        map.pre_aggregate_dense_rows(&m, &mut pre_av, rl, ru, cl, cu)
            .unwrap();

        let mut expected = vec![0.0; (ru - rl) * n_val];
        for r in rl..ru {
            for c in cl..cu {
                expected[(r - rl) * n_val + map.get_index(c) as usize] += values[r * cols + c];
            }
        }
        assert_eq!(pre_av, expected);
    }
}

#[test]
fn dense_to_row_matches_dense_rows_for_one_row() {
    let mut rng = StdRng::seed_from_u64(2);
    let cols = 40;
    let values = random_matrix(&mut rng, 3, cols, 1.0);
    let m = MatrixBlock::dense(3, cols, values.clone()).unwrap();
    let map = random_map(&mut rng, 2, cols);

    let mut by_block = vec![0.0; 2];
    map.pre_aggregate_dense_rows(&m, &mut by_block, 1, 2, 0, cols)
        .unwrap();
    let mut by_row = vec![0.0; 2];
    map.pre_aggregate_dense_to_row(&values, cols, &mut by_row, 0, cols)
        .unwrap();
    assert_eq!(by_block, by_row);
}

#[test]
fn dense_rows_reject_sparse_and_blocked_storage() {
    let map = builder_for(2, 4).finish();
    let blocked = MatrixBlock::dense_blocked(4, 4, vec![1.0; 16], 3).unwrap();
    let sparse = MatrixBlock::sparse(4, 4, to_csr(&[1.0; 16], 4, 4)).unwrap();
    for m in [&blocked, &sparse] {
        let mut pre_av = vec![0.0; 8];
        let err = map
            .pre_aggregate_dense_rows(m, &mut pre_av, 0, 4, 0, 4)
            .unwrap_err();
        assert!(matches!(err, MapError::NotImplemented(_)));
        assert_eq!(pre_av, vec![0.0; 8]);
    }
}

#[test]
fn dense_rows_check_extents() {
    let map = builder_for(2, 3).finish();
    let m = MatrixBlock::dense(2, 4, vec![0.0; 8]).unwrap();
    let mut pre_av = vec![0.0; 4];
    assert!(matches!(
        map.pre_aggregate_dense_rows(&m, &mut pre_av, 0, 3, 0, 3),
        Err(MapError::InvalidBlock(_))
    ));
    assert!(matches!(
        map.pre_aggregate_dense_rows(&m, &mut pre_av, 0, 2, 0, 4),
        Err(MapError::OutOfBounds { pos: 3, size: 3 })
    ));
}

#[test]
fn offset_kernels_match_naive() {
    let mut rng = StdRng::seed_from_u64(4);
    let (rows, cols) = (12, 150);
    let values = random_matrix(&mut rng, rows, cols, 0.3);
    let contiguous = MatrixBlock::dense(rows, cols, values.clone()).unwrap();
    let blocked = MatrixBlock::dense_blocked(rows, cols, values.clone(), 5).unwrap();
    let sparse = MatrixBlock::sparse(rows, cols, to_csr(&values, rows, cols)).unwrap();

    let offsets: Vec<u32> = (0..cols as u32).filter(|_| rng.gen_bool(0.4)).collect();
    let indexes = OffsetList::new(offsets.clone()).unwrap();

    for unique in [2u32, 3] {
        let map = random_map(&mut rng, unique, offsets.len());
        let n_val = unique as usize;
        let (rl, ru) = (1, 11);

        let mut expected = vec![0.0; (ru - rl) * n_val];
        for r in rl..ru {
            for (i, &col) in offsets.iter().enumerate() {
                expected[(r - rl) * n_val + map.get_index(i) as usize] +=
                    values[r * cols + col as usize];
            }
        }

        for m in [&contiguous, &blocked] {
            let mut pre_av = vec![0.0; (ru - rl) * n_val];
            map.pre_aggregate_dense(m, &mut pre_av, rl, ru, 0, cols, &indexes)
                .unwrap();
            assert_eq!(pre_av, expected);
        }

        let mut pre_av = vec![0.0; (ru - rl) * n_val];
        map.pre_aggregate_sparse(&sparse, &mut pre_av, rl, ru, &indexes)
            .unwrap();
        assert_eq!(pre_av, expected);
    }
}

#[test]
fn offset_kernels_require_matching_map_size() {
    let map = builder_for(2, 3).finish();
    let indexes = OffsetList::new(vec![0, 2]).unwrap();
    let m = MatrixBlock::dense(1, 3, vec![1.0, 2.0, 3.0]).unwrap();
    let mut pre_av = vec![0.0; 2];
    assert!(matches!(
        map.pre_aggregate_dense(&m, &mut pre_av, 0, 1, 0, 3, &indexes),
        Err(MapError::SizeMismatch {
            expected: 3,
            actual: 2
        })
    ));
}

#[test]
fn read_phase_kernels_run_on_disjoint_row_ranges_in_parallel() {
    let mut rng = StdRng::seed_from_u64(9);
    let (rows, cols) = (64, 100);
    let values = random_matrix(&mut rng, rows, cols, 0.9);
    let m = MatrixBlock::dense(rows, cols, values).unwrap();
    let map = random_map(&mut rng, 2, cols);

    let mut serial = vec![0.0; rows * 2];
    map.pre_aggregate_dense_rows(&m, &mut serial, 0, rows, 0, cols)
        .unwrap();

    let mut parallel = vec![0.0; rows * 2];
    std::thread::scope(|s| {
        for (block, out) in parallel.chunks_mut(16 * 2).enumerate() {
            let (map, m) = (&map, &m);
            s.spawn(move || {
                let rl = block * 16;
                map.pre_aggregate_dense_rows(m, out, rl, rl + 16, 0, cols)
                    .unwrap();
            });
        }
    });
    assert_eq!(parallel, serial);
}
