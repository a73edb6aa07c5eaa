//! High-level storage operations handlers call directly, built on top of an
//! [`ObjectStore`] backend plus the upload-cap and content checks that apply
//! regardless of backend.

use std::sync::Arc;

use bytes::Bytes;
use gateway_error::{ErrorCode, GatewayError};
use uuid::Uuid;

use crate::traits::{ObjectStore, Result};
use crate::validate;

/// Upload kinds that share the same key scope (`fuzzer_id` + `revision_id`)
/// and the same cap-then-validate-then-store pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Binaries,
    Seeds,
    Config,
}

impl Kind {
    const fn segment(self) -> &'static str {
        match self {
            Self::Binaries => "binaries.tar.gz",
            Self::Seeds => "seeds.tar.gz",
            Self::Config => "config.json",
        }
    }
}

fn object_key(fuzzer_id: Uuid, revision_id: Uuid, kind: Kind) -> String {
    format!("fuzzers/{fuzzer_id}/revisions/{revision_id}/{}", kind.segment())
}

fn corpus_key(fuzzer_id: Uuid, active_revision_id: Uuid) -> String {
    format!("fuzzers/{fuzzer_id}/corpus/{active_revision_id}.tar.gz")
}

fn integration_config_key(config_id: Uuid) -> String {
    format!("integrations/{config_id}/config.json")
}

/// Object-storage façade exposed to request handlers. Cheap to clone: the
/// backend is held behind an `Arc`.
#[derive(Clone)]
pub struct GatewayStorage {
    backend: Arc<dyn ObjectStore>,
    upload_length_cap: u64,
}

impl GatewayStorage {
    #[must_use]
    pub fn new(backend: Arc<dyn ObjectStore>, upload_length_cap: u64) -> Self {
        Self {
            backend,
            upload_length_cap,
        }
    }

    async fn upload_archive(
        &self,
        fuzzer_id: Uuid,
        revision_id: Uuid,
        kind: Kind,
        bytes: Bytes,
    ) -> Result<()> {
        if bytes.len() as u64 > self.upload_length_cap {
            return Err(GatewayError::code(ErrorCode::FileTooLarge));
        }
        validate::looks_like_gzip_tar(&bytes)?;
        let key = object_key(fuzzer_id, revision_id, kind);
        self.backend.put(&key, bytes, "application/gzip").await
    }

    /// Streams a binaries archive to its scoped key. The caller has already
    /// peeked and validated the first chunk; this is the commit step.
    pub async fn upload_fuzzer_binaries(
        &self,
        fuzzer_id: Uuid,
        revision_id: Uuid,
        bytes: Bytes,
    ) -> Result<()> {
        self.upload_archive(fuzzer_id, revision_id, Kind::Binaries, bytes)
            .await
    }

    pub async fn upload_fuzzer_seeds(
        &self,
        fuzzer_id: Uuid,
        revision_id: Uuid,
        bytes: Bytes,
    ) -> Result<()> {
        self.upload_archive(fuzzer_id, revision_id, Kind::Seeds, bytes)
            .await
    }

    /// Fixed-size config upload; body must parse as a JSON object.
    pub async fn upload_fuzzer_config(
        &self,
        fuzzer_id: Uuid,
        revision_id: Uuid,
        bytes: Bytes,
    ) -> Result<()> {
        if bytes.len() as u64 > self.upload_length_cap {
            return Err(GatewayError::code(ErrorCode::FileTooLarge));
        }
        validate::validate_json_object(&bytes)?;
        let key = object_key(fuzzer_id, revision_id, Kind::Config);
        self.backend.put(&key, bytes, "application/json").await
    }

    async fn download(&self, fuzzer_id: Uuid, revision_id: Uuid, kind: Kind) -> Result<Bytes> {
        let key = object_key(fuzzer_id, revision_id, kind);
        if !self.backend.exists(&key).await? {
            return Err(GatewayError::code(ErrorCode::NoCorpusFound));
        }
        self.backend.get(&key).await
    }

    pub async fn download_fuzzer_binaries(&self, fuzzer_id: Uuid, revision_id: Uuid) -> Result<Bytes> {
        self.download(fuzzer_id, revision_id, Kind::Binaries).await
    }

    pub async fn download_fuzzer_seeds(&self, fuzzer_id: Uuid, revision_id: Uuid) -> Result<Bytes> {
        self.download(fuzzer_id, revision_id, Kind::Seeds).await
    }

    pub async fn download_fuzzer_config(&self, fuzzer_id: Uuid, revision_id: Uuid) -> Result<Bytes> {
        self.download(fuzzer_id, revision_id, Kind::Config).await
    }

    pub async fn download_fuzzer_corpus(
        &self,
        fuzzer_id: Uuid,
        active_revision_id: Uuid,
    ) -> Result<Bytes> {
        let key = corpus_key(fuzzer_id, active_revision_id);
        if !self.backend.exists(&key).await? {
            return Err(GatewayError::code(ErrorCode::NoCorpusFound));
        }
        self.backend.get(&key).await
    }

    /// Server-side copy of `src_revision`'s corpus object onto
    /// `dst_revision`'s. Caller has already checked the revision lifecycle
    /// preconditions; this only deals with object existence.
    pub async fn copy_corpus_files(
        &self,
        fuzzer_id: Uuid,
        src_revision: Uuid,
        dst_revision: Uuid,
    ) -> Result<()> {
        let src_key = corpus_key(fuzzer_id, src_revision);
        let dst_key = corpus_key(fuzzer_id, dst_revision);
        if !self.backend.exists(&src_key).await? {
            return Err(GatewayError::code(ErrorCode::NoCorpusFound));
        }
        self.backend.copy(&src_key, &dst_key).await
    }

    /// Persists a bug-tracker integration's connection secrets under its
    /// own `config_id`, out of the row the gateway exposes over the API.
    pub async fn store_integration_config(&self, config_id: Uuid, bytes: Bytes) -> Result<()> {
        let key = integration_config_key(config_id);
        self.backend.put(&key, bytes, "application/json").await
    }

    pub async fn load_integration_config(&self, config_id: Uuid) -> Result<Bytes> {
        let key = integration_config_key(config_id);
        self.backend.get(&key).await
    }

    pub async fn delete_integration_config(&self, config_id: Uuid) -> Result<()> {
        let key = integration_config_key(config_id);
        self.backend.delete(&key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::InMemoryObjectStore;

    fn storage() -> GatewayStorage {
        GatewayStorage::new(Arc::new(InMemoryObjectStore::default()), 1024)
    }

    fn gzip_tar() -> Bytes {
        use std::io::Write;
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_size(4);
        header.set_cksum();
        builder.append_data(&mut header, "f", &b"data"[..]).unwrap();
        let tar_bytes = builder.into_inner().unwrap();
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
        encoder.write_all(&tar_bytes).unwrap();
        Bytes::from(encoder.finish().unwrap())
    }

    #[tokio::test]
    async fn uploads_then_downloads_binaries() {
        let storage = storage();
        let fuzzer_id = Uuid::new_v4();
        let revision_id = Uuid::new_v4();
        let archive = gzip_tar();

        storage
            .upload_fuzzer_binaries(fuzzer_id, revision_id, archive.clone())
            .await
            .unwrap();
        let downloaded = storage
            .download_fuzzer_binaries(fuzzer_id, revision_id)
            .await
            .unwrap();
        assert_eq!(downloaded, archive);
    }

    #[tokio::test]
    async fn rejects_non_archive_uploads() {
        let storage = storage();
        let err = storage
            .upload_fuzzer_binaries(Uuid::new_v4(), Uuid::new_v4(), Bytes::from_static(b"nope"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_FILE_NOT_ARCHIVE");
    }

    #[tokio::test]
    async fn rejects_oversized_uploads() {
        let storage = GatewayStorage::new(Arc::new(InMemoryObjectStore::default()), 1);
        let err = storage
            .upload_fuzzer_binaries(Uuid::new_v4(), Uuid::new_v4(), gzip_tar())
            .await
            .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_FILE_TOO_LARGE");
    }

    #[tokio::test]
    async fn missing_corpus_is_not_found() {
        let storage = storage();
        let err = storage
            .download_fuzzer_corpus(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_NO_CORPUS_FOUND");
    }

    #[tokio::test]
    async fn copy_corpus_files_round_trips() {
        let storage = storage();
        let fuzzer_id = Uuid::new_v4();
        let src = Uuid::new_v4();
        let dst = Uuid::new_v4();
        let key = corpus_key(fuzzer_id, src);
        storage
            .backend
            .put(&key, gzip_tar(), "application/gzip")
            .await
            .unwrap();

        storage.copy_corpus_files(fuzzer_id, src, dst).await.unwrap();
        let copied = storage.download_fuzzer_corpus(fuzzer_id, dst).await.unwrap();
        assert_eq!(copied, gzip_tar());
    }
}
