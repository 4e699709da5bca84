use cloud_storage_interface::storage::{StorageClientFactory, UploadOptions};
use cloud_storage_interface::util::tempfile::with_tempfile;
use cloud_storage_interface::util::timing::measure_dur_async;
use std::error::Error;
use tracing::info;

const MULTIPART_THRESHOLD: u64 = 100 * 1024 * 1024;
const PRESIGN_EXPIRY_SECS: u64 = 600;

/// Runs the upload, presign, delete and exists scenario against a real bucket.
///
/// Usage: `cloud-storage-smoke <bucket> <key>` with `CLOUD_STORAGE_PROVIDER`
/// and the provider credentials set in the environment.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let (bucket, key) = match (args.next(), args.next()) {
        (Some(bucket), Some(key)) => (bucket, key),
        _ => return Err("usage: cloud-storage-smoke <bucket> <key>".into()),
    };

    let client = StorageClientFactory::from_env(None)?;
    info!("Starting smoke test with {:?}", client);

    let (uploaded, _) = measure_dur_async(
        "upload_file",
        || {
            with_tempfile("hello from cloud-storage-smoke\n", |path| {
                let client = client.clone();
                let (bucket, key) = (bucket.clone(), key.clone());
                async move {
                    let options = UploadOptions::new().with_multipart_threshold(MULTIPART_THRESHOLD);
                    client.upload_file(&bucket, &key, &path, &options).await
                }
            })
        },
        None,
    )
    .await;
    println!("upload: {:?}", uploaded?);

    let (url, _) = measure_dur_async(
        "presigned_url",
        || client.presigned_url(&bucket, &key, PRESIGN_EXPIRY_SECS),
        None,
    )
    .await;
    println!("presigned url: {}", url?);

    let (deleted, _) =
        measure_dur_async("delete_file", || client.delete_file(&bucket, &key), None).await;
    deleted?;
    println!("deleted: {}/{}", bucket, key);

    let (exists, _) =
        measure_dur_async("file_exists", || client.file_exists(&bucket, &key), None).await;
    println!("exists after delete: {}", exists?);

    Ok(())
}
