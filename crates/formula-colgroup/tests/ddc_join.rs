use formula_colgroup::{
    builder_for, ddc_multi_col_fallback, ddc_single_col_fallback, MapError, MapToBit, MapToData,
    RowCodes, ValueDictionary,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TOLERANCE: f64 = 1e-9;

fn random_bit_map(rng: &mut StdRng, size: usize, density: f64) -> MapToData {
    let mut b = MapToBit::builder(2, size);
    for pos in 0..size {
        if rng.gen_bool(density) {
            b.set(pos, 1).unwrap();
        }
    }
    MapToData::Bit(b.finish())
}

fn random_map(rng: &mut StdRng, unique: u32, size: usize) -> MapToData {
    let mut b = builder_for(unique, size);
    for pos in 0..size {
        b.set(pos, rng.gen_range(0..unique)).unwrap();
    }
    b.finish()
}

fn random_values(rng: &mut StdRng, len: usize) -> Vec<f64> {
    (0..len).map(|_| rng.gen_range(-100.0..100.0)).collect()
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        let scale = e.abs().max(1.0);
        assert!(
            (a - e).abs() <= TOLERANCE * scale,
            "slot {i}: bitwise {a} vs per-row {e}"
        );
    }
}

#[test]
fn single_col_fast_path_matches_per_row_loop() {
    let mut rng = StdRng::seed_from_u64(7);
    for size in [0usize, 1, 5, 63, 64, 65, 128, 200, 1_000] {
        for density in [0.0, 0.03, 0.5, 0.97, 1.0] {
            let this = random_bit_map(&mut rng, size, density);
            let other = random_bit_map(&mut rng, size, 1.0 - density);
            let dict = ValueDictionary::new(random_values(&mut rng, 2));

            let seed = random_values(&mut rng, 2);
            let mut fast = seed.clone();
            this.pre_aggregate_ddc_single_col(&other, &dict, &mut fast)
                .unwrap();
            let mut slow = seed;
            ddc_single_col_fallback(&this, &other, &dict, &mut slow);

            assert_close(&fast, &slow);
        }
    }
}

#[test]
fn multi_col_fast_path_matches_per_row_loop() {
    let mut rng = StdRng::seed_from_u64(11);
    for size in [1usize, 64, 65, 333] {
        for n_col in [1usize, 2, 5] {
            let this = random_bit_map(&mut rng, size, 0.4);
            let other = random_bit_map(&mut rng, size, 0.6);
            let dict = ValueDictionary::new(random_values(&mut rng, 2 * n_col));

            let mut fast = vec![0.0; 2 * n_col];
            this.pre_aggregate_ddc_multi_col(&other, &dict, &mut fast, n_col)
                .unwrap();
            let mut slow = vec![0.0; 2 * n_col];
            ddc_multi_col_fallback(&this, &other, &dict, &mut slow, n_col);

            assert_close(&fast, &slow);
        }
    }
}

#[test]
fn single_col_join_by_hand() {
    // this = [1,1,0,1,0], other = [1,0,1,1,0]
    let mut b = MapToBit::builder(2, 5);
    for pos in [0, 1, 3] {
        b.set(pos, 1).unwrap();
    }
    let this = MapToData::Bit(b.finish());
    let mut b = MapToBit::builder(2, 5);
    for pos in [0, 2, 3] {
        b.set(pos, 1).unwrap();
    }
    let other = MapToData::Bit(b.finish());

    let dict = ValueDictionary::new(vec![10.0, 1.0]);
    let mut ret = vec![0.0; 2];
    this.pre_aggregate_ddc_single_col(&other, &dict, &mut ret)
        .unwrap();
    // Rows with this=0: 2 (other=1), 4 (other=0). Rows with this=1: 0, 3 (other=1), 1 (other=0).
    assert_eq!(ret, vec![1.0 + 10.0, 1.0 + 1.0 + 10.0]);
}

#[test]
fn mixed_variants_use_per_row_loop() {
    let mut rng = StdRng::seed_from_u64(3);
    let size = 150;
    let wide = random_map(&mut rng, 4, size);
    let bit = random_bit_map(&mut rng, size, 0.5);
    assert!(wide.as_bit().is_none());

    let dict = ValueDictionary::new(random_values(&mut rng, 4));
    let mut ret = vec![0.0; 2];
    bit.pre_aggregate_ddc_single_col(&wide, &dict, &mut ret)
        .unwrap();

    let mut expected = vec![0.0; 2];
    for r in 0..size {
        expected[bit.get_index(r) as usize] += dict_value(&dict, wide.get_index(r));
    }
    assert_close(&ret, &expected);

    // And the other direction: a wide map collecting a 1-bit map's dictionary.
    let dict = ValueDictionary::new(random_values(&mut rng, 2));
    let mut ret = vec![0.0; 4];
    wide.pre_aggregate_ddc_single_col(&bit, &dict, &mut ret)
        .unwrap();
    let mut expected = vec![0.0; 4];
    ddc_single_col_fallback(&wide, &bit, &dict, &mut expected);
    assert_eq!(ret, expected);
}

fn dict_value(dict: &ValueDictionary, code: u32) -> f64 {
    use formula_colgroup::Dictionary;
    dict.values()[code as usize]
}

#[test]
fn size_mismatch_is_rejected() {
    let mut rng = StdRng::seed_from_u64(5);
    let a = random_bit_map(&mut rng, 10, 0.5);
    let b = random_bit_map(&mut rng, 11, 0.5);
    let dict = ValueDictionary::new(vec![1.0, 2.0]);
    let mut ret = vec![0.0; 2];
    let err = a
        .pre_aggregate_ddc_single_col(&b, &dict, &mut ret)
        .unwrap_err();
    assert!(matches!(
        err,
        MapError::SizeMismatch {
            expected: 10,
            actual: 11
        }
    ));
    assert_eq!(ret, vec![0.0; 2]);
}

#[test]
fn one_code_maps_join_through_the_per_row_loop() {
    let one_code = |size| MapToData::Bit(MapToBit::builder(1, size).finish());
    let this = one_code(10);
    let other = one_code(10);
    let dict = ValueDictionary::new(vec![3.0]);

    let mut ret = vec![0.0];
    this.pre_aggregate_ddc_single_col(&other, &dict, &mut ret)
        .unwrap();
    assert_eq!(ret, vec![30.0]);

    let dict = ValueDictionary::new(vec![1.0, -2.0]);
    let mut ret = vec![0.0; 2];
    this.pre_aggregate_ddc_multi_col(&other, &dict, &mut ret, 2)
        .unwrap();
    assert_eq!(ret, vec![10.0, -20.0]);

    // A one-code map joined with a two-code map only ever hits code 0 on its own side.
    let mut rng = StdRng::seed_from_u64(13);
    let two_codes = random_bit_map(&mut rng, 10, 0.5);
    let dict = ValueDictionary::new(vec![4.0, 5.0]);
    let mut ret = vec![0.0];
    this.pre_aggregate_ddc_single_col(&two_codes, &dict, &mut ret)
        .unwrap();
    let mut expected = vec![0.0];
    ddc_single_col_fallback(&this, &two_codes, &dict, &mut expected);
    assert_eq!(ret, expected);

    let dict = ValueDictionary::new(vec![6.0]);
    let mut ret = vec![0.0; 2];
    two_codes
        .pre_aggregate_ddc_single_col(&other, &dict, &mut ret)
        .unwrap();
    let ones = two_codes.counts(&mut [0usize; 2])[1] as f64;
    assert_eq!(ret, vec![6.0 * (10.0 - ones), 6.0 * ones]);
}
