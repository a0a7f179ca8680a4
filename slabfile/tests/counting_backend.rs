//! Precondition checks never reach the storage runtime.
//!
//! A counting backend wraps the in-memory runtime and tallies transfer
//! calls, so tests can assert that a failed precondition issued none.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use slabfile::dataset::{Dataset, DatasetError};
use slabfile::dataspace::Dataspace;
use slabfile::file::{CreateMode, File};
use slabfile::group::GroupScope;
use slabfile::slab;
use slabfile::storage::{
    Bytes, CreateMode as StorageCreateMode, Datatype, MaxDims, MemoryBackend, ObjectId, OpenMode,
    RawSelection, StorageBackend, StorageError, VariableBuffer,
};

#[derive(Debug, Default)]
struct Counters {
    reads: AtomicUsize,
    writes: AtomicUsize,
    extent_sets: AtomicUsize,
}

#[derive(Debug)]
struct CountingBackend {
    inner: MemoryBackend,
    counters: Arc<Counters>,
}

impl CountingBackend {
    fn new() -> (Arc<Self>, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let backend = Arc::new(Self {
            inner: MemoryBackend::new(),
            counters: counters.clone(),
        });
        (backend, counters)
    }
}

impl StorageBackend for CountingBackend {
    fn create_file(&self, path: &Path, mode: StorageCreateMode) -> Result<ObjectId, StorageError> {
        self.inner.create_file(path, mode)
    }

    fn open_file(&self, path: &Path, mode: OpenMode) -> Result<ObjectId, StorageError> {
        self.inner.open_file(path, mode)
    }

    fn flush_file(&self, file: ObjectId) -> Result<(), StorageError> {
        self.inner.flush_file(file)
    }

    fn create_group(&self, parent: ObjectId, name: &str) -> Result<ObjectId, StorageError> {
        self.inner.create_group(parent, name)
    }

    fn open_group(&self, parent: ObjectId, name: &str) -> Result<ObjectId, StorageError> {
        self.inner.open_group(parent, name)
    }

    fn list_objects(&self, parent: ObjectId) -> Result<Vec<String>, StorageError> {
        self.inner.list_objects(parent)
    }

    fn close_object(&self, id: ObjectId) -> Result<(), StorageError> {
        self.inner.close_object(id)
    }

    fn create_dataset(
        &self,
        parent: ObjectId,
        name: &str,
        datatype: &Datatype,
        dims: &[u64],
        max_dims: Option<&[Option<u64>]>,
        chunk: Option<&[u64]>,
    ) -> Result<ObjectId, StorageError> {
        self.inner
            .create_dataset(parent, name, datatype, dims, max_dims, chunk)
    }

    fn open_dataset(&self, parent: ObjectId, name: &str) -> Result<ObjectId, StorageError> {
        self.inner.open_dataset(parent, name)
    }

    fn dataset_datatype(&self, dataset: ObjectId) -> Result<Datatype, StorageError> {
        self.inner.dataset_datatype(dataset)
    }

    fn dataset_extent(
        &self,
        dataset: ObjectId,
    ) -> Result<(Vec<u64>, Option<MaxDims>), StorageError> {
        self.inner.dataset_extent(dataset)
    }

    fn set_dataset_extent(&self, dataset: ObjectId, dims: &[u64]) -> Result<(), StorageError> {
        self.counters.extent_sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set_dataset_extent(dataset, dims)
    }

    fn dataset_chunk_shape(&self, dataset: ObjectId) -> Result<Option<Vec<u64>>, StorageError> {
        self.inner.dataset_chunk_shape(dataset)
    }

    fn read_fixed(
        &self,
        dataset: ObjectId,
        datatype: &Datatype,
        mem: Option<&RawSelection>,
        file: Option<&RawSelection>,
    ) -> Result<Bytes, StorageError> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_fixed(dataset, datatype, mem, file)
    }

    fn write_fixed(
        &self,
        dataset: ObjectId,
        datatype: &Datatype,
        data: &[u8],
        mem: Option<&RawSelection>,
        file: Option<&RawSelection>,
    ) -> Result<(), StorageError> {
        self.counters.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write_fixed(dataset, datatype, data, mem, file)
    }

    fn read_variable(
        &self,
        dataset: ObjectId,
        mem: Option<&RawSelection>,
        file: Option<&RawSelection>,
    ) -> Result<VariableBuffer, StorageError> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_variable(dataset, mem, file)
    }

    fn write_variable(
        &self,
        dataset: ObjectId,
        runs: &[Vec<u8>],
        mem: Option<&RawSelection>,
        file: Option<&RawSelection>,
    ) -> Result<(), StorageError> {
        self.counters.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write_variable(dataset, runs, mem, file)
    }
}

fn counted_dataset(name: &str) -> (Arc<Counters>, File, Dataset<f64>) {
    let (backend, counters) = CountingBackend::new();
    let dir = tempfile::tempdir().unwrap();
    let file = File::create(backend, dir.path().join(name), CreateMode::Truncate).unwrap();
    let dataset = file
        .create_and_write_dataset("values", vec![2, 3], &vec![0.0f64; 6])
        .unwrap();
    (counters, file, dataset)
}

#[test]
fn shape_mismatch_issues_no_native_write() {
    let (counters, _file, dataset) = counted_dataset("no_write_on_mismatch.sf");
    assert_eq!(counters.writes.load(Ordering::SeqCst), 1);

    assert!(matches!(
        dataset.write_all(&[1.0, 2.0]),
        Err(DatasetError::ShapeMismatch { got: 2, expected: 6 })
    ));
    assert!(dataset.write_slice(&[1.0], &slab![0, 0..2]).is_err());
    assert_eq!(counters.writes.load(Ordering::SeqCst), 1);
}

#[test]
fn invalid_selection_issues_no_native_call() {
    let (counters, _file, dataset) = counted_dataset("no_call_on_invalid.sf");
    let reads_before = counters.reads.load(Ordering::SeqCst);

    // stale dataspace: selected, then slid past the extent
    let mut window = dataset.space().unwrap();
    window.select(&slab![0..2, 0..3]).unwrap();
    window.offset(&[1, 0]).unwrap();
    assert!(matches!(
        dataset.read(None, Some(&window)),
        Err(DatasetError::Selection(_))
    ));
    assert_eq!(counters.reads.load(Ordering::SeqCst), reads_before);
}

#[test]
fn failed_growth_issues_no_write() {
    let (backend, counters) = CountingBackend::new();
    let dir = tempfile::tempdir().unwrap();
    let file = File::create(
        backend,
        dir.path().join("no_write_on_failed_growth.sf"),
        CreateMode::Truncate,
    )
    .unwrap();
    let dataset = file
        .create_and_write_dataset("values", vec![2], &[1.0f64, 2.0])
        .unwrap();
    let writes_before = counters.writes.load(Ordering::SeqCst);

    assert!(matches!(
        dataset.append(&[3.0], &[1], 0),
        Err(DatasetError::ExtentFixed { axis: 0 })
    ));
    assert_eq!(counters.extent_sets.load(Ordering::SeqCst), 0);
    assert_eq!(counters.writes.load(Ordering::SeqCst), writes_before);
}

#[test]
fn mismatched_dataspace_pair_issues_no_read() {
    let (counters, _file, dataset) = counted_dataset("no_read_on_mismatch.sf");
    let reads_before = counters.reads.load(Ordering::SeqCst);

    let mut file_space = dataset.space().unwrap();
    file_space.select(&slab![0..1]).unwrap();
    let mem_space = Dataspace::new(vec![5]);
    assert!(dataset.read(Some(&mem_space), Some(&file_space)).is_err());
    assert_eq!(counters.reads.load(Ordering::SeqCst), reads_before);
}
