//! Exact (brute-force) L2 index persisted as a single checksummed file.
//!
//! Layout, all integers little-endian:
//!
//! | field | size |
//! |---|---|
//! | magic `RAGBOTIX` | 8 |
//! | format version | 4 |
//! | dimensions | 4 |
//! | count | 8 |
//! | record ids | `count × 8` |
//! | vectors | `count × dimensions × 4` |
//! | blake3 digest of everything above | 32 |

use std::{fs, io::ErrorKind, path::Path};

use ragbot_domain::similarity;

use crate::{Error, Result};

pub const MAGIC: &[u8; 8] = b"RAGBOTIX";
pub const FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 8 + 4 + 4 + 8;
const DIGEST_LEN: usize = blake3::OUT_LEN;

/// Nearest neighbours ordered by ascending distance.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
	/// Squared Euclidean distances.
	pub distances: Vec<f32>,
	pub positions: Vec<i64>,
}
impl SearchResult {
	pub fn len(&self) -> usize {
		self.positions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.positions.is_empty()
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
	dimensions: usize,
	ids: Vec<i64>,
	vectors: Vec<f32>,
}
impl FlatIndex {
	/// Builds an index where slot `i` holds `entries[i]`.
	pub fn build(dimensions: usize, entries: Vec<(i64, Vec<f32>)>) -> Result<Self> {
		if dimensions == 0 {
			return Err(Error::InvalidArgument("Index dimensions must be greater than zero.".to_string()));
		}

		let mut ids = Vec::with_capacity(entries.len());
		let mut vectors = Vec::with_capacity(entries.len() * dimensions);

		for (id, vector) in entries {
			if vector.len() != dimensions {
				return Err(Error::DimensionMismatch { expected: dimensions, actual: vector.len() });
			}

			ids.push(id);
			vectors.extend_from_slice(&vector);
		}

		Ok(Self { dimensions, ids, vectors })
	}

	pub fn dimensions(&self) -> usize {
		self.dimensions
	}

	pub fn len(&self) -> usize {
		self.ids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}

	pub fn vector(&self, position: usize) -> Option<&[f32]> {
		let start = position.checked_mul(self.dimensions)?;

		self.vectors.get(start..start + self.dimensions)
	}

	/// Returns the `min(k, len)` closest slots. Ties go to the lower position.
	pub fn search(&self, query: &[f32], k: usize) -> Result<SearchResult> {
		if query.len() != self.dimensions {
			return Err(Error::DimensionMismatch { expected: self.dimensions, actual: query.len() });
		}

		let mut scored = self
			.vectors
			.chunks_exact(self.dimensions)
			.enumerate()
			.map(|(position, vector)| (similarity::squared_l2(query, vector), position))
			.collect::<Vec<_>>();

		scored.sort_by(|(left_dist, left_pos), (right_dist, right_pos)| {
			left_dist.total_cmp(right_dist).then(left_pos.cmp(right_pos))
		});
		scored.truncate(k);

		let (distances, positions) =
			scored.into_iter().map(|(distance, position)| (distance, position as i64)).unzip();

		Ok(SearchResult { distances, positions })
	}

	/// Maps an index slot to its record id. Negative and out-of-range slots yield `None`.
	pub fn record_id(&self, position: i64) -> Option<i64> {
		let position = usize::try_from(position).ok()?;

		self.ids.get(position).copied()
	}

	pub fn to_bytes(&self) -> Vec<u8> {
		let mut out = Vec::with_capacity(
			HEADER_LEN + self.ids.len() * 8 + self.vectors.len() * 4 + DIGEST_LEN,
		);

		out.extend_from_slice(MAGIC);
		out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
		out.extend_from_slice(&(self.dimensions as u32).to_le_bytes());
		out.extend_from_slice(&(self.ids.len() as u64).to_le_bytes());

		for id in &self.ids {
			out.extend_from_slice(&id.to_le_bytes());
		}
		for value in &self.vectors {
			out.extend_from_slice(&value.to_le_bytes());
		}

		let digest = blake3::hash(&out);

		out.extend_from_slice(digest.as_bytes());

		out
	}

	pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
		if bytes.len() < HEADER_LEN + DIGEST_LEN {
			return Err(corrupt("blob is shorter than the header"));
		}

		let (body, digest) = bytes.split_at(bytes.len() - DIGEST_LEN);

		if blake3::hash(body).as_bytes() != digest {
			return Err(corrupt("checksum mismatch"));
		}

		let mut reader = Reader { bytes: body, offset: 0 };

		if &reader.take::<8>()? != MAGIC {
			return Err(corrupt("bad magic"));
		}

		let version = u32::from_le_bytes(reader.take()?);

		if version != FORMAT_VERSION {
			return Err(corrupt(&format!("unsupported format version {version}")));
		}

		let dimensions = u32::from_le_bytes(reader.take()?) as usize;
		let count = usize::try_from(u64::from_le_bytes(reader.take()?))
			.map_err(|_| corrupt("record count does not fit in memory"))?;

		if dimensions == 0 {
			return Err(corrupt("zero dimensions"));
		}

		let expected = count
			.checked_mul(8 + dimensions * 4)
			.and_then(|payload| payload.checked_add(HEADER_LEN))
			.ok_or_else(|| corrupt("record count overflows"))?;

		if body.len() != expected {
			return Err(corrupt(&format!(
				"expected {expected} bytes before the digest, found {}",
				body.len()
			)));
		}

		let mut ids = Vec::with_capacity(count);

		for _ in 0..count {
			ids.push(i64::from_le_bytes(reader.take()?));
		}

		let mut vectors = Vec::with_capacity(count * dimensions);

		for _ in 0..count * dimensions {
			vectors.push(f32::from_le_bytes(reader.take()?));
		}

		Ok(Self { dimensions, ids, vectors })
	}

	/// Writes to a sibling temp file first so readers never observe a partial index.
	pub fn save(&self, path: &Path) -> Result<()> {
		if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|err| io_error(parent, err))?;
		}

		let tmp = path.with_extension("tmp");

		fs::write(&tmp, self.to_bytes()).map_err(|err| io_error(&tmp, err))?;
		fs::rename(&tmp, path).map_err(|err| io_error(path, err))?;

		tracing::info!(path = %path.display(), vectors = self.len(), "Saved vector index.");

		Ok(())
	}

	pub fn load(path: &Path) -> Result<Self> {
		let bytes = fs::read(path).map_err(|err| match err.kind() {
			ErrorKind::NotFound => Error::MissingIndex { path: path.to_path_buf() },
			_ => io_error(path, err),
		})?;

		Self::from_bytes(&bytes)
	}
}

struct Reader<'a> {
	bytes: &'a [u8],
	offset: usize,
}
impl Reader<'_> {
	fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
		let end = self.offset + N;
		let slice =
			self.bytes.get(self.offset..end).ok_or_else(|| corrupt("unexpected end of data"))?;
		let mut buf = [0_u8; N];

		buf.copy_from_slice(slice);

		self.offset = end;

		Ok(buf)
	}
}

fn corrupt(message: &str) -> Error {
	Error::CorruptIndex { message: message.to_string() }
}

fn io_error(path: &Path, source: std::io::Error) -> Error {
	Error::Io { path: path.to_path_buf(), source }
}
