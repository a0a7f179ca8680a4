//! `slabfile` is a typed, ergonomic access layer over a self-describing,
//! chunked, hierarchical array store.
//!
//! Callers describe a [`File`](file::File), [`Group`](group::Group)s, typed
//! [`Dataset`](dataset::Dataset)s, and rectangular hyperslab selections over
//! N-dimensional array data, then perform shape-correct, type-correct reads
//! and writes of hyperslab regions between host buffers and storage.
//!
//! The pieces:
//! - [`extent`]: the per-dimension shape of an array, with optional room to
//!   grow.
//! - [`hyperslab`]: index expressions ([`SlabIndex`](hyperslab::SlabIndex),
//!   built ergonomically with [`slab!`]) and their resolution into canonical
//!   `(start, stride, count, block)` selections.
//! - [`dataspace`]: an extent coupled with one active selection, describing
//!   one side of a transfer.
//! - [`dataset`]: typed read/write/append over memory- and file-side
//!   dataspaces, with per-kind element codecs.
//! - [`group`] and [`file`]: the naming and lifecycle entry points.
//!
//! Raw bytes move through the narrow, handle-based
//! [`StorageBackend`](storage::StorageBackend) interface of the
//! [`slabfile_storage`] crate, re-exported here as [`storage`]. Every storage
//! handle is wrapped in an owned [`ObjectHandle`](handle::ObjectHandle) that
//! releases it exactly once.
//!
//! I/O is synchronous and blocking; a call either completes or returns an
//! error, and precondition violations are reported before any native call
//! touches storage. A dataspace's selection is unsynchronised mutable state,
//! so sharing one handle across threads requires external serialisation.
//!
//! ## Example
//! ```
//! use std::sync::Arc;
//!
//! use slabfile::dataspace::Dataspace;
//! use slabfile::file::{CreateMode, File, OpenMode};
//! use slabfile::group::GroupScope;
//! use slabfile::slab;
//! use slabfile::storage::MemoryBackend;
//!
//! let backend = Arc::new(MemoryBackend::new());
//! let file = File::create(backend.clone(), "/data/example.sf", CreateMode::Truncate)?;
//!
//! // write a 3x3 array of doubles
//! let data: Vec<f64> = (0..9).map(f64::from).collect();
//! let dataset = file.create_and_write_dataset("values", vec![3, 3], &data)?;
//!
//! // all rows of the first two columns
//! assert_eq!(
//!     dataset.read_slice(&slab![.., 0..2])?,
//!     vec![0.0, 1.0, 3.0, 4.0, 6.0, 7.0],
//! );
//!
//! // the same selection, spelled out through explicit dataspaces
//! let mut file_space = dataset.space()?;
//! file_space.select(&slab![.., 0..2])?;
//! let mem_space = Dataspace::new(vec![3, 2]);
//! assert_eq!(
//!     dataset.read(Some(&mem_space), Some(&file_space))?,
//!     vec![0.0, 1.0, 3.0, 4.0, 6.0, 7.0],
//! );
//!
//! // re-open by path and read everything back
//! let reopened = File::open(backend, "/data/example.sf", OpenMode::ReadOnly)?;
//! let dataset = reopened.open_dataset::<f64>("values")?;
//! assert_eq!(dataset.read_all()?, data);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod dataset;
pub mod dataspace;
pub mod extent;
pub mod file;
pub mod group;
pub mod handle;
pub mod hyperslab;

pub use slabfile_storage as storage;
