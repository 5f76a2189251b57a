use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::engine::StoreError;
use crate::limits::MAX_SNAPSHOT_BYTES;
use crate::model::FloorState;

/// Encode a snapshot as `[u32 len][bincode FloorState][u32 crc32]`.
pub fn encode(writer: &mut impl Write, state: &FloorState) -> Result<(), StoreError> {
    let payload = bincode::serialize(state)?;
    let len = u32::try_from(payload.len()).map_err(|_| StoreError::Corrupt("snapshot too large"))?;
    let crc = crc32fast::hash(&payload);
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc.to_le_bytes())?;
    Ok(())
}

/// Decode one framed snapshot. Unlike a log, a snapshot has no valid prefix
/// to fall back to, so truncation and checksum mismatches are errors.
pub fn decode(reader: &mut impl Read) -> Result<FloorState, StoreError> {
    let mut len_buf = [0u8; 4];
    read_frame(reader, &mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_SNAPSHOT_BYTES {
        return Err(StoreError::Corrupt("length prefix out of range"));
    }

    let mut payload = vec![0u8; len];
    read_frame(reader, &mut payload)?;

    let mut crc_buf = [0u8; 4];
    read_frame(reader, &mut crc_buf)?;
    if u32::from_le_bytes(crc_buf) != crc32fast::hash(&payload) {
        return Err(StoreError::Corrupt("checksum mismatch"));
    }

    bincode::deserialize(&payload).map_err(|_| StoreError::Corrupt("undecodable payload"))
}

fn read_frame(reader: &mut impl Read, buf: &mut [u8]) -> Result<(), StoreError> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(StoreError::Corrupt("truncated")),
        Err(e) => Err(e.into()),
    }
}

/// Snapshot file on disk, replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("snapshot.tmp")
    }

    /// Load the snapshot. A missing file is an empty floor.
    pub async fn read(&self) -> Result<FloorState, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => decode(&mut bytes.as_slice()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(FloorState::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write to a temp file, fsync, then rename over the snapshot. On failure
    /// the temp file is removed and the previous snapshot stays in place.
    pub async fn write(&self, state: &FloorState) -> Result<(), StoreError> {
        let mut bytes = Vec::new();
        encode(&mut bytes, state)?;

        let tmp_path = self.tmp_path();
        let result = self.replace_with(&tmp_path, &bytes).await;
        if result.is_err()
            && let Err(e) = tokio::fs::remove_file(&tmp_path).await
            && e.kind() != io::ErrorKind::NotFound
        {
            tracing::warn!(path = %tmp_path.display(), error = %e, "could not remove temp snapshot");
        }
        result
    }

    async fn replace_with(&self, tmp_path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let mut file = tokio::fs::File::create(tmp_path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(tmp_path, &self.path).await?;
        Ok(())
    }
}
