//! Slice indexing over a 3x3 dataset of doubles holding `0..9` row-major.

use std::sync::Arc;

use slabfile::dataset::Dataset;
use slabfile::dataspace::Dataspace;
use slabfile::file::{CreateMode, File};
use slabfile::group::GroupScope;
use slabfile::slab;
use slabfile::storage::MemoryBackend;

fn dataset_3x3(name: &str) -> (File, Dataset<f64>) {
    let backend = Arc::new(MemoryBackend::new());
    let dir = tempfile::tempdir().unwrap();
    let file = File::create(backend, dir.path().join(name), CreateMode::Truncate).unwrap();
    let data: Vec<f64> = (0..9).map(f64::from).collect();
    let dataset = file
        .create_and_write_dataset("values", vec![3, 3], &data)
        .unwrap();
    (file, dataset)
}

#[test]
fn read_all() {
    let (_file, dataset) = dataset_3x3("read_all.sf");
    let expected: Vec<f64> = (0..9).map(f64::from).collect();
    assert_eq!(dataset.read_all().unwrap(), expected);
}

#[test]
fn slice_first_two_columns() {
    let (_file, dataset) = dataset_3x3("first_two_columns.sf");
    let result = dataset.read_slice(&slab![.., 0..2]).unwrap();
    assert_eq!(result, vec![0.0, 1.0, 3.0, 4.0, 6.0, 7.0]);
}

#[test]
fn slice_first_two_rows() {
    let (_file, dataset) = dataset_3x3("first_two_rows.sf");
    let result = dataset.read_slice(&slab![0..2]).unwrap();
    assert_eq!(result, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
}

#[test]
fn slice_last_two_rows() {
    let (_file, dataset) = dataset_3x3("last_two_rows.sf");
    let result = dataset.read_slice(&slab![1.., ..]).unwrap();
    assert_eq!(result, vec![3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
}

#[test]
fn slice_last_two_columns() {
    let (_file, dataset) = dataset_3x3("last_two_columns.sf");
    let result = dataset.read_slice(&slab![.., 1..]).unwrap();
    assert_eq!(result, vec![1.0, 2.0, 4.0, 5.0, 7.0, 8.0]);
}

#[test]
fn slice_lower_right_corner() {
    let (_file, dataset) = dataset_3x3("lower_right.sf");
    let result = dataset.read_slice(&slab![1.., 1..]).unwrap();
    assert_eq!(result, vec![4.0, 5.0, 7.0, 8.0]);
}

#[test]
fn slice_middle_value() {
    let (_file, dataset) = dataset_3x3("middle_value.sf");
    let result = dataset.read_slice(&slab![1, 1]).unwrap();
    assert_eq!(result, vec![4.0]);
}

#[test]
fn slice_middle_row() {
    let (_file, dataset) = dataset_3x3("middle_row.sf");
    let result = dataset.read_slice(&slab![1]).unwrap();
    assert_eq!(result, vec![3.0, 4.0, 5.0]);
}

#[test]
fn slice_last_column() {
    let (_file, dataset) = dataset_3x3("last_column.sf");
    let result = dataset.read_slice(&slab![.., 2]).unwrap();
    assert_eq!(result, vec![2.0, 5.0, 8.0]);
}

#[test]
fn slice_agrees_with_explicit_dataspaces() {
    let (_file, dataset) = dataset_3x3("equivalence.sf");
    let expressions = slab![.., 0..2];

    let mut file_space = dataset.space().unwrap();
    file_space.select(&expressions).unwrap();
    let mem_space = Dataspace::new(file_space.selection().shape());
    let explicit = dataset
        .read(Some(&mem_space), Some(&file_space))
        .unwrap();

    assert_eq!(dataset.read_slice(&expressions).unwrap(), explicit);
}

#[test]
fn write_slice_agrees_with_explicit_dataspaces() {
    let (_file, dataset) = dataset_3x3("write_equivalence.sf");
    dataset
        .write_slice(&[-1.0, -2.0, -3.0, -4.0], &slab![1.., 1..])
        .unwrap();
    assert_eq!(
        dataset.read_all().unwrap(),
        vec![0.0, 1.0, 2.0, 3.0, -1.0, -2.0, 6.0, -3.0, -4.0]
    );

    let (_file, dataset) = dataset_3x3("write_equivalence_explicit.sf");
    let mut file_space = dataset.space().unwrap();
    file_space.select(&slab![1.., 1..]).unwrap();
    let mem_space = Dataspace::new(file_space.selection().shape());
    dataset
        .write(&[-1.0, -2.0, -3.0, -4.0], Some(&mem_space), Some(&file_space))
        .unwrap();
    assert_eq!(
        dataset.read_all().unwrap(),
        vec![0.0, 1.0, 2.0, 3.0, -1.0, -2.0, 6.0, -3.0, -4.0]
    );
}

#[test]
fn strided_slice() {
    let (_file, dataset) = dataset_3x3("strided.sf");
    // every other column: 2 single-element blocks, stride 2
    let result = dataset.read_slice(&slab![.., (0, 2, 2, 1)]).unwrap();
    assert_eq!(result, vec![0.0, 2.0, 3.0, 5.0, 6.0, 8.0]);
}

#[test]
fn out_of_bounds_slice_is_an_error() {
    let (_file, dataset) = dataset_3x3("oob.sf");
    assert!(dataset.read_slice(&slab![0..4]).is_err());
    assert!(dataset.read_slice(&slab![0, 0, 0]).is_err());
}
