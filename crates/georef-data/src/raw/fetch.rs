use super::{GeoNamesDump, Result};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};
use zip::ZipArchive;

/// Download a GeoNames dump and extract its text file to `destination`.
#[instrument(name = "Download data", skip_all, fields(dump = dump.file_stem()), level = "info")]
pub fn download_dump(dump: GeoNamesDump, destination: &Path) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let url = dump.url();
    let destination = destination.to_path_buf();

    rt.block_on(async {
        let client = Client::new();
        let zip_temp_file = download_to_temp_file(&client, &url).await?;
        info!(path = ?zip_temp_file.path(), "ZIP download complete");

        let zip_file_path = zip_temp_file.path().to_path_buf();
        tokio::task::spawn_blocking(move || extract_first_entry(&zip_file_path, destination))
            .await??;
        Ok(())
    })
}

async fn download_to_temp_file(client: &Client, url: &str) -> Result<NamedTempFile> {
    info!(url, "Starting download");
    let response = client.get(url).send().await?.error_for_status()?;

    let total_size = response.content_length().unwrap_or(0);

    let pb = ProgressBar::new(total_size);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    ) {
        pb.set_style(style.progress_chars("█░"));
    }
    pb.set_message(format!(
        "Downloading {}",
        url.split('/').next_back().unwrap_or(url)
    ));

    let temp_file = NamedTempFile::new()?;
    let mut dest_file = tokio::fs::File::create(temp_file.path()).await?;

    let mut stream = response.bytes_stream();
    while let Some(item) = stream.next().await {
        let chunk = item?;
        dest_file.write_all(&chunk).await?;
        pb.inc(chunk.len() as u64);
    }
    dest_file.flush().await?;
    pb.finish_and_clear();
    Ok(temp_file)
}

fn extract_first_entry(zip_file_path: &Path, destination: PathBuf) -> Result<()> {
    let zip_fs_file = fs::File::open(zip_file_path)?;
    let mut archive = ZipArchive::new(zip_fs_file)?;

    if archive.is_empty() {
        return Err(zip::result::ZipError::FileNotFound.into());
    }

    let mut file_in_zip = archive.by_index(0)?;
    let mut extracted = fs::File::create(&destination)?;

    std::io::copy(&mut file_in_zip, &mut extracted)?;
    info!(path = ?destination, "File extracted successfully");

    Ok(())
}
