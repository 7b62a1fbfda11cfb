//! Client for the remote image-store service.

// Standard library
use std::path::{Path, PathBuf};
use std::time::Duration;

// External crates
use futures_util::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

// Internal imports
use hark_core::error::{HarkError, Result};

use crate::cache::ImageCache;
use crate::image::Image;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct DownloadUrl {
    url: String,
}

fn network_error(context: &str, err: reqwest::Error) -> HarkError {
    HarkError::Network(format!("{}: {}", context, err))
}

#[derive(Debug)]
pub struct RemoteImageStore {
    client: Client,
    base: Url,
}

impl RemoteImageStore {
    pub fn new(base: &str) -> Result<Self> {
        let base = Url::parse(base.trim_end_matches('/'))
            .map_err(|e| HarkError::Config(format!("invalid image store url '{}': {}", base, e)))?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("hark/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| network_error("Failed to create HTTP client", e))?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let raw = format!("{}/{}", self.base.as_str().trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|e| HarkError::Internal(format!("bad url '{}': {}", raw, e)))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: Url) -> Result<T> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| network_error("Image store request failed", e))?;

        if !response.status().is_success() {
            return Err(HarkError::Network(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| network_error("Failed to parse image store response", e))
    }

    /// Every image the service offers.
    pub async fn images(&self) -> Result<Vec<Image>> {
        self.get_json(self.endpoint("images")?).await
    }

    /// Where `image` can be downloaded from.
    pub async fn download_url(&self, image: &Image) -> Result<String> {
        let path = format!("images/{}/{}/{}", image.driver, image.guest, image.version);
        let found: DownloadUrl = self.get_json(self.endpoint(&path)?).await?;
        Ok(found.url)
    }

    /// Download `image` into the cache. The file only appears under its
    /// final name once the download has completed.
    pub async fn pull(&self, image: &Image, cache: &ImageCache) -> Result<PathBuf> {
        let url = self.download_url(image).await?;
        let dest = cache.full_image_path(image);
        let partial = cache.path().join(format!(".{}.partial", image.file_name()));

        info!("Downloading image {} from {}", image, url);
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(60 * 60))
            .send()
            .await
            .map_err(|e| network_error("Image download failed", e))?;
        if !response.status().is_success() {
            return Err(HarkError::Network(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }

        if let Err(e) = write_body(response, &partial).await {
            if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                debug!("Could not remove {}: {}", partial.display(), cleanup);
            }
            return Err(e);
        }

        tokio::fs::rename(&partial, &dest).await?;
        info!("Saved image {} to {}", image, dest.display());
        Ok(dest)
    }
}

async fn write_body(response: reqwest::Response, path: &Path) -> Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| network_error("Image download interrupted", e))?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hark_store::{DriverKind, Guest};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn bind() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Failed to read local addr");
        (listener, format!("http://{}", addr))
    }

    /// Answer one request per body, in order, then stop.
    fn respond(listener: TcpListener, bodies: Vec<Vec<u8>>) {
        let replies = bodies.into_iter().map(|body| (body.len(), body)).collect();
        respond_with_length(listener, replies);
    }

    /// Like [`respond`], but each reply announces the given content length
    /// regardless of how many bytes are actually sent.
    fn respond_with_length(listener: TcpListener, replies: Vec<(usize, Vec<u8>)>) {
        tokio::spawn(async move {
            for (length, body) in replies {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = vec![0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    length
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            }
        });
    }

    #[tokio::test]
    async fn test_images_lists_descriptors() {
        let (listener, base) = bind().await;
        respond(
            listener,
            vec![br#"[{"driver":"virtualbox","guest":"Debian-8","version":2}]"#.to_vec()],
        );

        let store = RemoteImageStore::new(&base).unwrap();
        let images = store.images().await.unwrap();
        assert_eq!(
            images,
            vec![Image::new(DriverKind::VirtualBox, Guest::Debian8, 2)]
        );
    }

    #[tokio::test]
    async fn test_pull_writes_into_cache() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let cache = ImageCache::new(dir.path()).expect("Failed to create cache");

        // The download URL points back at the same server, which answers
        // with the descriptor first and the disk bytes second.
        let (listener, base) = bind().await;
        let descriptor = format!(r#"{{"url":"{}/blobs/disk"}}"#, base).into_bytes();
        respond(listener, vec![descriptor, b"disk bytes".to_vec()]);

        let store = RemoteImageStore::new(&base).unwrap();
        let image = Image::new(DriverKind::VirtualBox, Guest::Debian8, 5);
        let path = store.pull(&image, &cache).await.unwrap();

        assert_eq!(path, cache.full_image_path(&image));
        assert_eq!(std::fs::read(&path).unwrap(), b"disk bytes");
        assert_eq!(cache.images().unwrap(), vec![image]);
    }

    #[tokio::test]
    async fn test_interrupted_pull_leaves_no_partial_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let cache = ImageCache::new(dir.path()).expect("Failed to create cache");

        let (listener, base) = bind().await;
        let descriptor = format!(r#"{{"url":"{}/blobs/disk"}}"#, base).into_bytes();
        respond_with_length(
            listener,
            vec![(descriptor.len(), descriptor), (1024, b"partial".to_vec())],
        );

        let store = RemoteImageStore::new(&base).unwrap();
        let image = Image::new(DriverKind::VirtualBox, Guest::Debian8, 6);
        let err = store.pull(&image, &cache).await.unwrap_err();
        assert!(matches!(err, HarkError::Network(_)));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .expect("Failed to read cache dir")
            .collect();
        assert!(leftovers.is_empty(), "cache dir should be empty: {:?}", leftovers);
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            RemoteImageStore::new("not a url").unwrap_err(),
            HarkError::Config(_)
        ));
    }
}
