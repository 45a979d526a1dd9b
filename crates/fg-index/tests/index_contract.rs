use fg_core::{DType, Device, Tensor};
use fg_index::{ArgValue, INDEX_DTYPES, Index, IndexArgs, IndexErrorKind, IndexOptions};

const DEVICES: [Device; 2] = [Device::Cpu, Device::Cuda];

fn each_placement(mut check: impl FnMut(DType, Device)) {
    for dtype in INDEX_DTYPES {
        for device in DEVICES {
            check(dtype, device);
        }
    }
}

#[test]
fn basic_construction_and_tensor_escape() {
    each_placement(|dtype, device| {
        let mut index = Index::new(
            vec![0i64, 1, 1, 2],
            IndexOptions::new().dtype(dtype).device(device).dim_size(3),
        )
        .expect("valid index");
        index.validate().expect("consistent index");

        let text = index.to_string();
        assert!(text.starts_with("Index([0, 1, 1, 2], "));
        assert!(text.contains("dim_size=3"));
        assert_eq!(text.contains("device='cuda'"), device == Device::Cuda);
        assert_eq!(text.contains(&format!("dtype={dtype}")), dtype != DType::I64);

        assert_eq!(index.dtype(), dtype);
        assert_eq!(index.device(), device);
        assert_eq!(index.dim_size(), Some(3));
        assert!(!index.is_sorted());

        let out: Tensor = index.as_tensor();
        assert_eq!(out.dtype(), dtype);
        assert_eq!(out.device(), device);

        let out: Tensor = (&index * 1).expect("scalar mul");
        assert_eq!(out.dtype(), dtype);
        assert_eq!(out.device(), device);
    });
}

#[test]
fn identity_shares_storage_and_metadata() {
    each_placement(|dtype, device| {
        let index = Index::new(
            vec![0i64, 1, 1, 2],
            IndexOptions::new()
                .dtype(dtype)
                .device(device)
                .dim_size(3)
                .sorted(true),
        )
        .expect("valid index");

        let out = Index::new(index.clone(), IndexOptions::new()).expect("identity");
        assert_eq!(out.storage_id(), index.storage_id());
        assert_eq!(out.dtype(), index.dtype());
        assert_eq!(out.device(), index.device());
        assert_eq!(out.dim_size(), index.dim_size());
        assert_eq!(out.is_sorted(), index.is_sorted());

        let out = Index::new(index.clone(), IndexOptions::new().dim_size(4).sorted(false))
            .expect("override");
        assert_eq!(out.dim_size(), Some(4));
        assert_eq!(out.is_sorted(), index.is_sorted());
    });
}

#[test]
fn intake_and_validation_failures() {
    let err = Index::new(vec![0.0, 1.0], IndexOptions::new()).expect_err("float data");
    assert_eq!(err.kind(), IndexErrorKind::Type);
    assert!(err.to_string().contains("unsupported data type"));

    let err = Index::new(vec![vec![0i64], vec![1]], IndexOptions::new()).expect_err("2-d data");
    assert_eq!(err.kind(), IndexErrorKind::Shape);
    assert!(err.to_string().contains("needs to be one-dimensional"));

    let tensor = Tensor::int_vector(vec![0, 1], DType::I64, Device::Cpu).expect("tensor");
    let err = Index::from_call(tensor.clone(), &IndexArgs::new().arg(DType::I64))
        .expect_err("positional dtype");
    assert_eq!(err.kind(), IndexErrorKind::Argument);
    assert!(err.to_string().contains("invalid combination of arguments"));

    let err = Index::from_call(tensor.clone(), &IndexArgs::new().kwarg("dtype", ArgValue::DType(DType::I64)))
        .expect_err("dtype keyword");
    assert_eq!(err.kind(), IndexErrorKind::Argument);
    assert!(err.to_string().contains("invalid keyword arguments"));

    let index = Index::new(tensor, IndexOptions::new()).expect("index");
    let err = Index::from_call(index.clone(), &IndexArgs::new().arg(DType::I64))
        .expect_err("positional dtype on index");
    assert_eq!(err.kind(), IndexErrorKind::Argument);
    assert!(err.to_string().contains("invalid combination of arguments"));

    let err = Index::from_call(index, &IndexArgs::new().kwarg("device", Device::Cpu))
        .expect_err("device keyword on index");
    assert_eq!(err.kind(), IndexErrorKind::Argument);
    assert!(err.to_string().contains("invalid keyword arguments"));

    let mut negative = Index::new(vec![-1i64, 0], IndexOptions::new()).expect("index");
    let err = negative.validate().expect_err("negative");
    assert!(err.to_string().contains("contains negative indices"));

    let mut large = Index::new(vec![0i64, 10], IndexOptions::new().dim_size(2)).expect("index");
    let err = large.validate().expect_err("too large");
    assert!(err.to_string().contains("than its registered size"));

    let mut unsorted = Index::new(vec![1i64, 0], IndexOptions::new().sorted(true)).expect("index");
    let err = unsorted.validate().expect_err("unsorted");
    assert!(err.to_string().contains("not sorted"));
}

#[test]
fn fill_cache_skips_dim_size_beyond_memory() {
    each_placement(|dtype, device| {
        let args = IndexArgs::new()
            .kwarg("dtype", dtype)
            .kwarg("device", device)
            .kwarg("dim_size", i64::MAX)
            .kwarg("is_sorted", true);
        let mut index = Index::from_call(vec![0i64, 1], &args).expect("index");
        index.validate().expect("claims hold").fill_cache();
        assert!(index.indptr().is_none());
        assert!(index.get_indptr().is_err());

        let options = IndexOptions::new().dtype(dtype).device(device);
        let mut index = Index::new(vec![0i64, 1], options.dim_size(usize::MAX).sorted(true))
            .expect("index");
        index.fill_cache();
        assert!(index.indptr().is_none());
    });
}

#[test]
fn fill_cache_on_sorted_and_unsorted_data() {
    each_placement(|dtype, device| {
        let options = IndexOptions::new().dtype(dtype).device(device);

        let mut index = Index::new(vec![0i64, 1, 1, 2], options.sorted(true)).expect("index");
        index.validate().expect("valid").fill_cache();
        assert_eq!(index.dim_size(), Some(3));
        let indptr = index.indptr().expect("cache filled");
        assert_eq!(indptr.dtype(), dtype);
        assert_eq!(indptr.device(), device);
        let expected = Tensor::int_vector(vec![0, 1, 3, 4], DType::I64, device).expect("tensor");
        assert!(indptr.equal(&expected));

        let mut index = Index::new(vec![1i64, 0, 2, 1], options).expect("index");
        index.validate().expect("valid").fill_cache();
        assert_eq!(index.dim_size(), Some(3));
        assert!(index.indptr().is_none());
    });
}
