//! A synchronous in-memory storage backend.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bytes::BytesMut;

use crate::selection::ravel_indices;
use crate::{
    Bytes, CreateMode, Datatype, IncompatibleShapeError, MaxDims, ObjectId, OpenMode,
    RawSelection, StorageBackend, StorageError, VariableBuffer,
};

/// A synchronous in-memory storage backend.
///
/// Files are kept in a process-local table keyed by path, so re-opening a
/// path observes previously written content and exclusive creation fails on
/// an existing path. Fixed-width dataset payloads are flat row-major byte
/// buffers; variable-length payloads are per-element byte runs.
#[derive(Debug)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    files: BTreeMap<PathBuf, FileEntry>,
    handles: BTreeMap<ObjectId, HandleEntry>,
    next_id: u64,
}

#[derive(Debug, Default)]
struct FileEntry {
    objects: BTreeMap<String, StoredObject>,
}

#[derive(Debug)]
enum StoredObject {
    Group,
    Dataset(StoredDataset),
}

#[derive(Debug)]
struct StoredDataset {
    datatype: Datatype,
    dims: Vec<u64>,
    max_dims: Option<MaxDims>,
    chunk: Option<Vec<u64>>,
    payload: Payload,
}

#[derive(Debug)]
enum Payload {
    Fixed(BytesMut),
    Variable(Vec<Vec<u8>>),
}

#[derive(Clone, Debug)]
struct HandleEntry {
    file: PathBuf,
    path: String,
    read_only: bool,
}

fn child_path(parent: &str, name: &str) -> Result<String, StorageError> {
    if name.is_empty() || name.contains('/') {
        return Err(StorageError::Other(format!("invalid object name: {name}")));
    }
    if parent == "/" {
        Ok(format!("/{name}"))
    } else {
        Ok(format!("{parent}/{name}"))
    }
}

fn num_elements(dims: &[u64]) -> usize {
    usize::try_from(dims.iter().product::<u64>()).unwrap()
}

impl State {
    fn issue(&mut self, file: PathBuf, path: String, read_only: bool) -> ObjectId {
        let id = ObjectId::new(self.next_id);
        self.next_id += 1;
        self.handles.insert(
            id,
            HandleEntry {
                file,
                path,
                read_only,
            },
        );
        id
    }

    fn handle(&self, id: ObjectId) -> Result<HandleEntry, StorageError> {
        self.handles
            .get(&id)
            .cloned()
            .ok_or(StorageError::StaleHandle(id))
    }

    fn file(&self, handle: &HandleEntry) -> Result<&FileEntry, StorageError> {
        self.files
            .get(&handle.file)
            .ok_or_else(|| StorageError::FileNotFound(handle.file.clone()))
    }

    fn file_mut(&mut self, handle: &HandleEntry) -> Result<&mut FileEntry, StorageError> {
        self.files
            .get_mut(&handle.file)
            .ok_or_else(|| StorageError::FileNotFound(handle.file.clone()))
    }

    fn dataset(&self, handle: &HandleEntry) -> Result<&StoredDataset, StorageError> {
        match self.file(handle)?.objects.get(&handle.path) {
            Some(StoredObject::Dataset(dataset)) => Ok(dataset),
            Some(StoredObject::Group) | None => {
                Err(StorageError::WrongObjectKind(handle.path.clone()))
            }
        }
    }

    fn dataset_mut(&mut self, handle: &HandleEntry) -> Result<&mut StoredDataset, StorageError> {
        match self.file_mut(handle)?.objects.get_mut(&handle.path) {
            Some(StoredObject::Dataset(dataset)) => Ok(dataset),
            Some(StoredObject::Group) | None => {
                Err(StorageError::WrongObjectKind(handle.path.clone()))
            }
        }
    }
}

impl StoredDataset {
    fn check_kind(&self, datatype: &Datatype) -> Result<(), StorageError> {
        if datatype.kind() == self.datatype.kind() {
            Ok(())
        } else {
            Err(StorageError::DatatypeMismatch(*datatype, self.datatype))
        }
    }

    fn resize(&mut self, new_dims: &[u64]) -> Result<(), StorageError> {
        let old_dims = std::mem::replace(&mut self.dims, new_dims.to_vec());
        if old_dims == new_dims {
            return Ok(());
        }
        let overlap: Vec<u64> = std::iter::zip(&old_dims, new_dims)
            .map(|(&old, &new)| old.min(new))
            .collect();
        let overlap = RawSelection::all(&overlap);
        match &mut self.payload {
            Payload::Fixed(data) => {
                let size = self.datatype.size().unwrap();
                let mut resized = BytesMut::zeroed(num_elements(new_dims) * size);
                let gather = overlap.contiguous_linearised_indices(&old_dims)?;
                let scatter = overlap.contiguous_linearised_indices(new_dims)?;
                for ((from, len), (to, _)) in std::iter::zip(gather, scatter) {
                    let from = usize::try_from(from).unwrap() * size;
                    let to = usize::try_from(to).unwrap() * size;
                    let len = usize::try_from(len).unwrap() * size;
                    resized[to..to + len].copy_from_slice(&data[from..from + len]);
                }
                *data = resized;
            }
            Payload::Variable(runs) => {
                let mut resized = vec![Vec::new(); num_elements(new_dims)];
                for coords in overlap.indices() {
                    let from = usize::try_from(ravel_indices(&coords, &old_dims)).unwrap();
                    let to = usize::try_from(ravel_indices(&coords, new_dims)).unwrap();
                    resized[to] = std::mem::take(&mut runs[from]);
                }
                *runs = resized;
            }
        }
        Ok(())
    }
}

/// Resolve the file-side selection and check the memory side agrees on the
/// transfer size.
fn resolve_transfer(
    dims: &[u64],
    mem: Option<&RawSelection>,
    file: Option<&RawSelection>,
) -> Result<RawSelection, StorageError> {
    let file = file.cloned().unwrap_or_else(|| RawSelection::all(dims));
    if let Some(mem) = mem {
        if mem.num_elements() != file.num_elements() {
            return Err(StorageError::InvalidTransfer(format!(
                "memory selection has {} elements, file selection has {}",
                mem.num_elements(),
                file.num_elements()
            )));
        }
    }
    Ok(file)
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create a new memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::default(),
        }
    }
}

impl StorageBackend for MemoryBackend {
    fn create_file(&self, path: &Path, mode: CreateMode) -> Result<ObjectId, StorageError> {
        let mut state = self.state.lock().unwrap();
        if mode == CreateMode::Exclusive && state.files.contains_key(path) {
            return Err(StorageError::FileExists(path.to_path_buf()));
        }
        let mut entry = FileEntry::default();
        entry.objects.insert("/".to_string(), StoredObject::Group);
        state.files.insert(path.to_path_buf(), entry);
        log::debug!("created file {}", path.display());
        Ok(state.issue(path.to_path_buf(), "/".to_string(), false))
    }

    fn open_file(&self, path: &Path, mode: OpenMode) -> Result<ObjectId, StorageError> {
        let mut state = self.state.lock().unwrap();
        if !state.files.contains_key(path) {
            return Err(StorageError::FileNotFound(path.to_path_buf()));
        }
        log::debug!("opened file {}", path.display());
        Ok(state.issue(
            path.to_path_buf(),
            "/".to_string(),
            mode == OpenMode::ReadOnly,
        ))
    }

    fn flush_file(&self, file: ObjectId) -> Result<(), StorageError> {
        let state = self.state.lock().unwrap();
        state.handle(file).map(|_| ())
    }

    fn create_group(&self, parent: ObjectId, name: &str) -> Result<ObjectId, StorageError> {
        let mut state = self.state.lock().unwrap();
        let handle = state.handle(parent)?;
        if handle.read_only {
            return Err(StorageError::ReadOnly);
        }
        let path = child_path(&handle.path, name)?;
        let file = state.file_mut(&handle)?;
        if file.objects.contains_key(&path) {
            return Err(StorageError::ObjectExists(path));
        }
        file.objects.insert(path.clone(), StoredObject::Group);
        Ok(state.issue(handle.file, path, handle.read_only))
    }

    fn open_group(&self, parent: ObjectId, name: &str) -> Result<ObjectId, StorageError> {
        let mut state = self.state.lock().unwrap();
        let handle = state.handle(parent)?;
        let path = child_path(&handle.path, name)?;
        match state.file(&handle)?.objects.get(&path) {
            Some(StoredObject::Group) => Ok(state.issue(handle.file, path, handle.read_only)),
            Some(StoredObject::Dataset(_)) => Err(StorageError::WrongObjectKind(path)),
            None => Err(StorageError::ObjectNotFound(path)),
        }
    }

    fn list_objects(&self, parent: ObjectId) -> Result<Vec<String>, StorageError> {
        let state = self.state.lock().unwrap();
        let handle = state.handle(parent)?;
        let prefix = if handle.path == "/" {
            "/".to_string()
        } else {
            format!("{}/", handle.path)
        };
        Ok(state
            .file(&handle)?
            .objects
            .keys()
            .filter_map(|path| path.strip_prefix(&prefix))
            .filter(|name| !name.is_empty() && !name.contains('/'))
            .map(str::to_string)
            .collect())
    }

    fn close_object(&self, id: ObjectId) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        state
            .handles
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::StaleHandle(id))
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
        let mut state = self.state.lock().unwrap();
        let handle = state.handle(parent)?;
        if handle.read_only {
            return Err(StorageError::ReadOnly);
        }
        let path = child_path(&handle.path, name)?;
        if let Some(max_dims) = max_dims {
            if max_dims.len() != dims.len() {
                return Err(StorageError::Other(format!(
                    "maximum extent rank {} does not match extent rank {}",
                    max_dims.len(),
                    dims.len()
                )));
            }
            if let Some(axis) = std::iter::zip(dims, max_dims)
                .position(|(dim, max)| max.is_some_and(|max| max < *dim))
            {
                return Err(StorageError::ExtentBounds { axis });
            }
        }
        let payload = match datatype.size() {
            Some(size) => Payload::Fixed(BytesMut::zeroed(num_elements(dims) * size)),
            None => Payload::Variable(vec![Vec::new(); num_elements(dims)]),
        };
        let file = state.file_mut(&handle)?;
        if file.objects.contains_key(&path) {
            return Err(StorageError::ObjectExists(path));
        }
        file.objects.insert(
            path.clone(),
            StoredObject::Dataset(StoredDataset {
                datatype: *datatype,
                dims: dims.to_vec(),
                max_dims: max_dims.map(<[Option<u64>]>::to_vec),
                chunk: chunk.map(<[u64]>::to_vec),
                payload,
            }),
        );
        Ok(state.issue(handle.file, path, handle.read_only))
    }

    fn open_dataset(&self, parent: ObjectId, name: &str) -> Result<ObjectId, StorageError> {
        let mut state = self.state.lock().unwrap();
        let handle = state.handle(parent)?;
        let path = child_path(&handle.path, name)?;
        match state.file(&handle)?.objects.get(&path) {
            Some(StoredObject::Dataset(_)) => Ok(state.issue(handle.file, path, handle.read_only)),
            Some(StoredObject::Group) => Err(StorageError::WrongObjectKind(path)),
            None => Err(StorageError::ObjectNotFound(path)),
        }
    }

    fn dataset_datatype(&self, dataset: ObjectId) -> Result<Datatype, StorageError> {
        let state = self.state.lock().unwrap();
        let handle = state.handle(dataset)?;
        Ok(state.dataset(&handle)?.datatype)
    }

    fn dataset_extent(
        &self,
        dataset: ObjectId,
    ) -> Result<(Vec<u64>, Option<MaxDims>), StorageError> {
        let state = self.state.lock().unwrap();
        let handle = state.handle(dataset)?;
        let dataset = state.dataset(&handle)?;
        Ok((dataset.dims.clone(), dataset.max_dims.clone()))
    }

    fn set_dataset_extent(&self, dataset: ObjectId, dims: &[u64]) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        let handle = state.handle(dataset)?;
        if handle.read_only {
            return Err(StorageError::ReadOnly);
        }
        let stored = state.dataset_mut(&handle)?;
        if dims.len() != stored.dims.len() {
            return Err(StorageError::Other(format!(
                "extent rank {} does not match dataset rank {}",
                dims.len(),
                stored.dims.len()
            )));
        }
        let max_dims = stored
            .max_dims
            .as_ref()
            .ok_or(StorageError::ExtentBounds { axis: 0 })?;
        if let Some(axis) = std::iter::zip(dims, max_dims)
            .position(|(dim, max)| max.is_some_and(|max| max < *dim))
        {
            return Err(StorageError::ExtentBounds { axis });
        }
        stored.resize(dims)
    }

    fn dataset_chunk_shape(&self, dataset: ObjectId) -> Result<Option<Vec<u64>>, StorageError> {
        let state = self.state.lock().unwrap();
        let handle = state.handle(dataset)?;
        Ok(state.dataset(&handle)?.chunk.clone())
    }

    fn read_fixed(
        &self,
        dataset: ObjectId,
        datatype: &Datatype,
        mem: Option<&RawSelection>,
        file: Option<&RawSelection>,
    ) -> Result<Bytes, StorageError> {
        let state = self.state.lock().unwrap();
        let handle = state.handle(dataset)?;
        let stored = state.dataset(&handle)?;
        stored.check_kind(datatype)?;
        let size = stored
            .datatype
            .size()
            .ok_or(StorageError::DatatypeMismatch(*datatype, stored.datatype))?;
        let selection = resolve_transfer(&stored.dims, mem, file)?;
        let Payload::Fixed(data) = &stored.payload else {
            return Err(StorageError::DatatypeMismatch(*datatype, stored.datatype));
        };
        let mut out = BytesMut::with_capacity(selection.num_elements_usize() * size);
        for (index, len) in selection.contiguous_linearised_indices(&stored.dims)? {
            let offset = usize::try_from(index).unwrap() * size;
            let len = usize::try_from(len).unwrap() * size;
            out.extend_from_slice(&data[offset..offset + len]);
        }
        Ok(out.freeze())
    }

    fn write_fixed(
        &self,
        dataset: ObjectId,
        datatype: &Datatype,
        data: &[u8],
        mem: Option<&RawSelection>,
        file: Option<&RawSelection>,
    ) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        let handle = state.handle(dataset)?;
        if handle.read_only {
            return Err(StorageError::ReadOnly);
        }
        let stored = state.dataset_mut(&handle)?;
        stored.check_kind(datatype)?;
        let size = stored
            .datatype
            .size()
            .ok_or(StorageError::DatatypeMismatch(*datatype, stored.datatype))?;
        let selection = resolve_transfer(&stored.dims, mem, file)?;
        if data.len() != selection.num_elements_usize() * size {
            return Err(StorageError::InvalidTransfer(format!(
                "buffer of {} bytes does not match selection of {} elements of {} bytes",
                data.len(),
                selection.num_elements(),
                size
            )));
        }
        let dims = stored.dims.clone();
        let Payload::Fixed(payload) = &mut stored.payload else {
            return Err(StorageError::DatatypeMismatch(*datatype, stored.datatype));
        };
        let mut cursor = 0;
        for (index, len) in selection.contiguous_linearised_indices(&dims)? {
            let offset = usize::try_from(index).unwrap() * size;
            let len = usize::try_from(len).unwrap() * size;
            payload[offset..offset + len].copy_from_slice(&data[cursor..cursor + len]);
            cursor += len;
        }
        Ok(())
    }

    fn read_variable(
        &self,
        dataset: ObjectId,
        mem: Option<&RawSelection>,
        file: Option<&RawSelection>,
    ) -> Result<VariableBuffer, StorageError> {
        let state = self.state.lock().unwrap();
        let handle = state.handle(dataset)?;
        let stored = state.dataset(&handle)?;
        stored.check_kind(&Datatype::variable_string())?;
        let selection = resolve_transfer(&stored.dims, mem, file)?;
        let Payload::Variable(elements) = &stored.payload else {
            return Err(StorageError::DatatypeMismatch(
                Datatype::variable_string(),
                stored.datatype,
            ));
        };
        if !selection.inbounds_shape(&stored.dims) {
            return Err(
                IncompatibleShapeError::new(selection.end_exc(), stored.dims.clone()).into(),
            );
        }
        let mut runs = Vec::with_capacity(selection.num_elements_usize());
        for coords in selection.indices() {
            let index = usize::try_from(ravel_indices(&coords, &stored.dims)).unwrap();
            let mut run = elements[index].clone();
            run.push(0);
            runs.push(run);
        }
        Ok(VariableBuffer::new(runs))
    }

    fn write_variable(
        &self,
        dataset: ObjectId,
        runs: &[Vec<u8>],
        mem: Option<&RawSelection>,
        file: Option<&RawSelection>,
    ) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        let handle = state.handle(dataset)?;
        if handle.read_only {
            return Err(StorageError::ReadOnly);
        }
        let stored = state.dataset_mut(&handle)?;
        stored.check_kind(&Datatype::variable_string())?;
        let selection = resolve_transfer(&stored.dims, mem, file)?;
        if runs.len() != selection.num_elements_usize() {
            return Err(StorageError::InvalidTransfer(format!(
                "{} runs do not match selection of {} elements",
                runs.len(),
                selection.num_elements()
            )));
        }
        let dims = stored.dims.clone();
        let Payload::Variable(elements) = &mut stored.payload else {
            return Err(StorageError::DatatypeMismatch(
                Datatype::variable_string(),
                stored.datatype,
            ));
        };
        if !selection.inbounds_shape(&dims) {
            return Err(IncompatibleShapeError::new(selection.end_exc(), dims).into());
        }
        for (coords, run) in std::iter::zip(selection.indices(), runs) {
            let index = usize::try_from(ravel_indices(&coords, &dims)).unwrap();
            let terminator = run.iter().position(|&byte| byte == 0).unwrap_or(run.len());
            elements[index] = run[..terminator].to_vec();
        }
        Ok(())
    }
}
