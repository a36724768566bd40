use crate::data_types::Number;
use crate::tests::utils::{compress_to_vec, decompress_frame, round_trip, uniform_f64s};
use crate::{Context, Dims, Hints};

fn assert_bit_exact<T: Number>(nums: &[T], hints: Hints) {
  let ctx = Context::new::<T>(&[], hints).unwrap();
  let recovered = round_trip(&ctx, nums);
  for (i, (x, y)) in nums.iter().zip(&recovered).enumerate() {
    assert_eq!(
      x.to_bits_u64(),
      y.to_bits_u64(),
      "{} != {} at {}",
      x,
      y,
      i,
    );
  }
}

#[test]
fn test_lossless_round_trip_all_datatypes() {
  assert_bit_exact::<f32>(
    &[0.0, -0.0, 1.5, f32::NAN, f32::INFINITY, f32::MIN, 3.1e-41],
    Hints::default(),
  );
  assert_bit_exact::<f64>(
    &[0.0, -0.0, -2.25, f64::NAN, f64::NEG_INFINITY, f64::MAX],
    Hints::default(),
  );
  assert_bit_exact::<i8>(&[i8::MIN, -1, 0, 1, i8::MAX], Hints::default());
  assert_bit_exact::<i16>(&[i16::MIN, -300, 0, 299, i16::MAX], Hints::default());
  assert_bit_exact::<i32>(&[i32::MIN, -70000, 0, 1, i32::MAX], Hints::default());
  assert_bit_exact::<i64>(&[i64::MIN, -1, 0, 1, i64::MAX], Hints::default());
}

#[test]
fn test_special_values_survive_lossy_chains() {
  let special = [999.25_f64, f64::NAN];
  let hints = Hints {
    absolute_tolerance: Some(0.5),
    ..Default::default()
  };
  let ctx = Context::new::<f64>(&special, hints).unwrap();

  let nums = [1.0, 999.25, f64::NAN, 2.0, 999.25, -3.5];
  let recovered = round_trip(&ctx, &nums);
  for (x, y) in nums.iter().zip(&recovered) {
    if x.to_bits_u64() == (999.25_f64).to_bits() || x.is_nan() {
      assert_eq!(x.to_bits_u64(), y.to_bits_u64());
    } else {
      assert!((x - y).abs() <= 0.5);
    }
  }
}

#[test]
fn test_fill_value_is_bit_exact() {
  let hints = Hints {
    absolute_tolerance: Some(1.0),
    fill_value: Some(-9999.0),
    ..Default::default()
  };
  let ctx = Context::new::<f64>(&[], hints).unwrap();

  let nums = [-9999.0, 0.3, -9999.0, 17.77, -9999.0];
  let recovered = round_trip(&ctx, &nums);
  assert_eq!(recovered[0], -9999.0);
  assert_eq!(recovered[2], -9999.0);
  assert_eq!(recovered[4], -9999.0);

  let dims = Dims::d1(nums.len() as u64);
  let frame = compress_to_vec(&ctx, &nums, &dims);
  crate::validate(&ctx, &nums, &dims, &frame).unwrap();
}

#[test]
fn test_lossless_ranges_pass_through_unchanged() {
  let hints = Hints {
    absolute_tolerance: Some(0.25),
    lossless_data_range_from: Some(100.0),
    lossless_data_range_up_to: Some(-50.0),
    ..Default::default()
  };
  let ctx = Context::new::<f64>(&[], hints).unwrap();

  let nums: [f64; 6] = [-123.456789, -50.0, -0.37, 42.42, 100.0, 31337.125];
  let recovered = round_trip(&ctx, &nums);
  for (x, y) in nums.iter().zip(&recovered) {
    if *x >= 100.0 || *x <= -50.0 {
      assert_eq!(x.to_bits(), y.to_bits(), "{} came back as {}", x, y);
    } else {
      assert!((x - y).abs() <= 0.25);
    }
  }
}

#[test]
fn test_infinities_survive_lossy_chains() {
  let hints = Hints {
    absolute_tolerance: Some(0.1),
    ..Default::default()
  };
  let ctx = Context::new::<f64>(&[], hints).unwrap();
  let nums = [f64::INFINITY, 1.0, f64::NEG_INFINITY, f64::NAN];
  let recovered = round_trip(&ctx, &nums);
  assert_eq!(recovered[0], f64::INFINITY);
  assert!((recovered[1] - 1.0).abs() <= 0.1);
  assert_eq!(recovered[2], f64::NEG_INFINITY);
  assert!(recovered[3].is_nan());
}

#[test]
fn test_monotone_sigbits() {
  let nums = uniform_f64s(2000, 0.1, 1000.0, 31415);
  let mut last_worst = f64::INFINITY;
  for k in 1..=20 {
    let hints = Hints {
      significant_bits: Some(k),
      ..Default::default()
    };
    let ctx = Context::new::<f64>(&[], hints).unwrap();
    let recovered = round_trip(&ctx, &nums);
    let worst = nums
      .iter()
      .zip(&recovered)
      .map(|(x, y)| ((x - y) / x).abs())
      .fold(0.0_f64, f64::max);
    assert!(
      worst <= last_worst,
      "error grew from {:e} to {:e} at {} significant bits",
      last_worst,
      worst,
      k,
    );
    last_worst = worst;
  }
}

#[test]
fn test_relative_tolerance_tracks_magnitude() {
  let pct = 1.0;
  let finest = 1e-9;
  let hints = Hints {
    relative_tolerance_percent: Some(pct),
    relative_err_finest_abs_tolerance: Some(finest),
    ..Default::default()
  };
  let ctx = Context::new::<f64>(&[], hints).unwrap();
  assert_eq!(
    ctx.chain_description(),
    "reltol,delta,bitpack,zstd"
  );

  let mut nums = uniform_f64s(3000, -1e6, 1e6, 1618);
  nums.extend_from_slice(&[0.0, 1e-12, -2.5e-8, 4.2e-3, 9.9e9]);
  let recovered = round_trip(&ctx, &nums);
  for (x, y) in nums.iter().zip(&recovered) {
    let permitted = (x.abs() * pct / 100.0).max(finest);
    assert!(
      (x - y).abs() <= permitted,
      "{} -> {} exceeds {}",
      x,
      y,
      permitted,
    );
  }

  let dims = Dims::d1(nums.len() as u64);
  let frame = compress_to_vec(&ctx, &nums, &dims);
  let observed = crate::validate(&ctx, &nums, &dims, &frame).unwrap();
  assert!(observed.relative_tolerance_percent.unwrap() <= pct);
}

#[test]
fn test_f32_abstol_stays_within_tolerance() {
  let tolerance = 0.005;
  let hints = Hints {
    absolute_tolerance: Some(tolerance),
    ..Default::default()
  };
  let ctx = Context::new::<f32>(&[], hints).unwrap();
  let nums: Vec<f32> = uniform_f64s(5000, -100.0, 100.0, 424242)
    .iter()
    .map(|x| *x as f32)
    .collect();
  let recovered = round_trip(&ctx, &nums);
  for (x, y) in nums.iter().zip(&recovered) {
    assert!(
      (*x as f64 - *y as f64).abs() <= tolerance,
      "{} -> {} violates the tolerance",
      x,
      y,
    );
  }

  let dims = Dims::d1(nums.len() as u64);
  let frame = compress_to_vec(&ctx, &nums, &dims);
  let observed = crate::validate(&ctx, &nums, &dims, &frame).unwrap();
  assert!(observed.absolute_tolerance.unwrap() <= tolerance);
}

#[test]
fn test_f32_relative_tolerance_tracks_magnitude() {
  let pct = 0.5;
  let finest = 1e-5;
  let hints = Hints {
    relative_tolerance_percent: Some(pct),
    relative_err_finest_abs_tolerance: Some(finest),
    ..Default::default()
  };
  let ctx = Context::new::<f32>(&[], hints).unwrap();

  let mut nums: Vec<f32> = uniform_f64s(3000, -1e6, 1e6, 321)
    .iter()
    .map(|x| *x as f32)
    .collect();
  nums.extend_from_slice(&[0.0, 1.0e-7, -3.25e-4, 100.25, -6.5e8, 3.0e30]);
  let recovered = round_trip(&ctx, &nums);
  for (x, y) in nums.iter().zip(&recovered) {
    let permitted = ((*x as f64).abs() * pct / 100.0).max(finest);
    assert!(
      (*x as f64 - *y as f64).abs() <= permitted,
      "{} -> {} exceeds {}",
      x,
      y,
      permitted,
    );
  }

  let dims = Dims::d1(nums.len() as u64);
  let frame = compress_to_vec(&ctx, &nums, &dims);
  let observed = crate::validate(&ctx, &nums, &dims, &frame).unwrap();
  assert!(observed.relative_tolerance_percent.unwrap() <= pct);
}

#[test]
fn test_sigbits_keeps_the_top_binade_finite() {
  let hints = Hints {
    significant_bits: Some(2),
    ..Default::default()
  };
  let ctx = Context::new::<f32>(&[], hints).unwrap();
  let nums = [f32::MAX, 3.0e38, -f32::MAX, 1.5, -2.75e38];
  let recovered = round_trip(&ctx, &nums);
  for (x, y) in nums.iter().zip(&recovered) {
    assert!(y.is_finite(), "{} came back as {}", x, y);
    // 2 significant bits guarantee a relative error within one half
    assert!(((x - y) / x).abs() <= 0.5, "{} -> {}", x, y);
  }

  let dims = Dims::d1(nums.len() as u64);
  let frame = compress_to_vec(&ctx, &nums, &dims);
  crate::validate(&ctx, &nums, &dims, &frame).unwrap();
}

#[test]
fn test_combined_sigbits_and_abstol() {
  let hints = Hints {
    significant_bits: Some(12),
    absolute_tolerance: Some(0.001),
    ..Default::default()
  };
  let ctx = Context::new::<f64>(&[], hints).unwrap();
  assert_eq!(
    ctx.chain_description(),
    "sigbits,abstol,delta,bitpack,zstd"
  );

  let nums = uniform_f64s(4000, -10.0, 10.0, 99);
  let dims = Dims::d1(nums.len() as u64);
  let frame = compress_to_vec(&ctx, &nums, &dims);
  crate::validate(&ctx, &nums, &dims, &frame).unwrap();
}

#[test]
fn test_quantized_integers_round_trip_exactly() {
  let hints = Hints {
    absolute_tolerance: Some(0.49),
    ..Default::default()
  };
  let ctx = Context::new::<i16>(&[], hints).unwrap();
  // a tolerance under one half reproduces integers exactly
  let nums: Vec<i16> = (-1000..1000).map(|i| (i * 13 % 4999) as i16).collect();
  let recovered = round_trip(&ctx, &nums);
  assert_eq!(recovered, nums);
}

#[test]
fn test_multi_dimensional_shapes() {
  let hints = Hints {
    absolute_tolerance: Some(0.01),
    ..Default::default()
  };
  let ctx = Context::new::<f64>(&[], hints).unwrap();
  let nums = uniform_f64s(3 * 4 * 5 * 2, -1.0, 1.0, 55);

  for dims in [Dims::d2(12, 10), Dims::d3(3, 4, 10), Dims::d4(3, 4, 5, 2)] {
    let frame = compress_to_vec(&ctx, &nums, &dims);
    let recovered: Vec<f64> = decompress_frame(&frame, &dims);
    for (x, y) in nums.iter().zip(&recovered) {
      assert!((x - y).abs() <= 0.01);
    }
  }
}
