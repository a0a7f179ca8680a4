//! Fixed- and variable-length string datasets.

use std::num::NonZeroUsize;
use std::sync::Arc;

use slabfile::dataset::{Dataset, DatasetError};
use slabfile::dataspace::Dataspace;
use slabfile::file::{CreateMode, File, OpenMode};
use slabfile::group::GroupScope;
use slabfile::slab;
use slabfile::storage::{Datatype, MemoryBackend};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

#[test]
fn variable_length_round_trip() {
    let backend = Arc::new(MemoryBackend::new());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vlen_round_trip.sf");
    let values = strings(&["why", "hello", "there", "", "world"]);
    {
        let file = File::create(backend.clone(), &path, CreateMode::Truncate).unwrap();
        file.create_and_write_dataset("names", vec![5], &values)
            .unwrap();
    }
    let file = File::open(backend, &path, OpenMode::ReadOnly).unwrap();
    let dataset: Dataset<String> = file.open_dataset("names").unwrap();
    assert!(dataset.datatype().is_variable_length());
    assert_eq!(dataset.read_all().unwrap(), values);
}

#[test]
fn variable_length_slices() {
    let backend = Arc::new(MemoryBackend::new());
    let dir = tempfile::tempdir().unwrap();
    let file = File::create(
        backend,
        dir.path().join("vlen_slices.sf"),
        CreateMode::Truncate,
    )
    .unwrap();
    let values = strings(&["a", "bb", "ccc", "dddd"]);
    let dataset = file
        .create_and_write_dataset("names", vec![4], &values)
        .unwrap();

    assert_eq!(
        dataset.read_slice(&slab![1..3]).unwrap(),
        strings(&["bb", "ccc"])
    );

    dataset
        .write_slice(&strings(&["x", "y"]), &slab![(0, 2, 2, 1)])
        .unwrap();
    assert_eq!(
        dataset.read_all().unwrap(),
        strings(&["x", "bb", "y", "dddd"])
    );
}

#[test]
fn fixed_length_round_trip() {
    let backend = Arc::new(MemoryBackend::new());
    let dir = tempfile::tempdir().unwrap();
    let file = File::create(
        backend,
        dir.path().join("fixed_round_trip.sf"),
        CreateMode::Truncate,
    )
    .unwrap();
    let datatype = Datatype::fixed_string(NonZeroUsize::new(5).unwrap());
    let dataset: Dataset<String> = file
        .create_dataset_with("names", datatype, &Dataspace::new(vec![3]), None)
        .unwrap();

    // "exact" fills its record with no trailing null
    let values = strings(&["ab", "exact", ""]);
    dataset.write_all(&values).unwrap();
    assert_eq!(dataset.read_all().unwrap(), values);

    assert!(matches!(
        dataset.write_all(&strings(&["toolong", "b", "c"])),
        Err(DatasetError::InvalidElementValue(_))
    ));
}

#[test]
fn string_appends() {
    let backend = Arc::new(MemoryBackend::new());
    let dir = tempfile::tempdir().unwrap();
    let file = File::create(
        backend,
        dir.path().join("string_append.sf"),
        CreateMode::Truncate,
    )
    .unwrap();
    let space = Dataspace::new_bounded(vec![0], vec![slabfile::extent::MaxDim::Unlimited]).unwrap();
    let dataset: Dataset<String> = file.create_chunked_dataset("log", &space, &[8]).unwrap();

    dataset.append(&strings(&["one", "two"]), &[2], 0).unwrap();
    dataset.append(&strings(&["three"]), &[1], 0).unwrap();
    assert_eq!(
        dataset.read_all().unwrap(),
        strings(&["one", "two", "three"])
    );
}

#[test]
fn type_mismatch_is_rejected_at_open() {
    let backend = Arc::new(MemoryBackend::new());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("type_mismatch.sf");
    let file = File::create(backend, &path, CreateMode::Truncate).unwrap();
    file.create_and_write_dataset("values", vec![2], &[1.0f64, 2.0])
        .unwrap();

    assert!(matches!(
        file.open_dataset::<String>("values"),
        Err(DatasetError::UnknownDataType { .. })
    ));
    assert!(matches!(
        file.open_dataset::<i64>("values"),
        Err(DatasetError::UnknownDataType { .. })
    ));
    assert!(file.open_dataset::<f64>("values").is_ok());
}
