//! PST upload and background-task endpoints.
//!
//! Two upload paths: a single multipart POST for ordinary files, and a
//! chunked session (init, N chunk POSTs, complete) for archives too large
//! for one request. Both come back with a task id to follow over the
//! event channel.

use std::path::Path;

use tokio::io::AsyncReadExt;

use mv_common::{ClientError, ClientResult};
use mv_protocol::rest::{ChunkUploadSession, PstFile, ProcessingTask, UploadAccepted};

use super::ApiClient;

impl ApiClient {
    /// Upload one PST/OST file as a single multipart request.
    pub async fn upload_pst(&self, path: &Path) -> ClientResult<UploadAccepted> {
        let filename = file_name(path)?;
        let contents = tokio::fs::read(path).await?;
        let part = reqwest::multipart::Part::bytes(contents).file_name(filename);
        let form = reqwest::multipart::Form::new().part("file", part);

        // Multipart bodies are not cloneable, so no 401 retry here.
        let response = self
            .send(self.http().post(self.url("/upload")).multipart(form))
            .await?;
        Ok(response.json().await?)
    }

    pub async fn list_pst_files(&self) -> ClientResult<Vec<PstFile>> {
        self.get_json("/upload/files").await
    }

    pub async fn get_pst_file(&self, id: &str) -> ClientResult<PstFile> {
        self.get_json(&format!("/upload/files/{id}")).await
    }

    pub async fn delete_pst_file(&self, id: &str) -> ClientResult<()> {
        self.delete(&format!("/upload/files/{id}")).await
    }

    pub async fn task_status(&self, task_id: &str) -> ClientResult<ProcessingTask> {
        self.get_json(&format!("/upload/tasks/{task_id}")).await
    }

    pub async fn cancel_task(&self, task_id: &str) -> ClientResult<()> {
        self.send(
            self.http()
                .post(self.url(&format!("/upload/tasks/{task_id}/cancel"))),
        )
        .await?;
        Ok(())
    }

    // ─── Chunked upload ──────────────────────────────────────

    pub async fn init_chunk_upload(
        &self,
        filename: &str,
        total_size: u64,
        total_chunks: u64,
    ) -> ClientResult<ChunkUploadSession> {
        self.post_json(
            "/upload/chunk/init",
            &serde_json::json!({
                "filename": filename,
                "total_size": total_size,
                "total_chunks": total_chunks,
            }),
        )
        .await
    }

    pub async fn upload_chunk(
        &self,
        upload_id: &str,
        chunk_index: u64,
        chunk: Vec<u8>,
    ) -> ClientResult<()> {
        let part = reqwest::multipart::Part::bytes(chunk).file_name("chunk");
        let form = reqwest::multipart::Form::new().part("file", part);
        self.send(
            self.http()
                .post(self.url(&format!("/upload/chunk/{upload_id}")))
                .query(&[("chunk_index", chunk_index.to_string())])
                .multipart(form),
        )
        .await?;
        Ok(())
    }

    pub async fn complete_chunk_upload(
        &self,
        upload_id: &str,
        filename: &str,
    ) -> ClientResult<UploadAccepted> {
        let response = self
            .send(
                self.http()
                    .post(self.url(&format!("/upload/chunk/{upload_id}/complete")))
                    .query(&[("filename", filename)]),
            )
            .await?;
        Ok(response.json().await?)
    }

    /// Drive a full chunked upload from a local file. The server picks the
    /// chunk size at init time.
    pub async fn upload_pst_chunked(&self, path: &Path) -> ClientResult<UploadAccepted> {
        let filename = file_name(path)?;
        let metadata = tokio::fs::metadata(path).await?;
        let total_size = metadata.len();

        // Provisional count from a 10 MiB guess; the server's answer wins.
        let provisional_chunks = total_size.div_ceil(10 * 1024 * 1024).max(1);
        let session = self
            .init_chunk_upload(&filename, total_size, provisional_chunks)
            .await?;
        let chunk_size = session.chunk_size.max(1) as usize;

        let mut file = tokio::fs::File::open(path).await?;
        let mut index: u64 = 0;
        loop {
            let mut buf = vec![0u8; chunk_size];
            let mut filled = 0;
            while filled < chunk_size {
                let n = file.read(&mut buf[filled..]).await?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
            if filled == 0 {
                break;
            }
            buf.truncate(filled);
            tracing::debug!(upload_id = %session.upload_id, index, bytes = filled, "uploading chunk");
            self.upload_chunk(&session.upload_id, index, buf).await?;
            index += 1;
        }

        self.complete_chunk_upload(&session.upload_id, &filename)
            .await
    }
}

fn file_name(path: &Path) -> ClientResult<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())
        .ok_or_else(|| {
            ClientError::Internal(anyhow::anyhow!("path has no usable file name: {path:?}"))
        })
}
