//! Thumbnail artwork for the current snapshot.
//!
//! Snapshots carry an image URL. Fetching and decoding happen on a worker
//! thread; the UI thread only drains finished results and uploads textures.
//! Any failure renders as "no artwork" — a broken thumbnail never surfaces
//! as a popup error.

use std::{
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
    thread,
    time::Duration,
};

use eframe::egui::{self, ColorImage, TextureHandle, TextureOptions};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

struct FetchRequest {
    id: u64,
    url: String,
}

struct FetchResult {
    id: u64,
    image: Option<ColorImage>,
}

fn decode_thumbnail_image(bytes: &[u8]) -> Option<ColorImage> {
    let image = image::load_from_memory(bytes).ok()?;
    let image = image.to_rgba8();
    let size = [image.width() as usize, image.height() as usize];
    let pixels = image.into_raw();
    Some(ColorImage::from_rgba_unmultiplied(size, &pixels))
}

fn fetch_thumbnail_bytes(client: &reqwest::blocking::Client, url: &str) -> Option<Vec<u8>> {
    let response = client.get(url).send().ok()?;
    if !response.status().is_success() {
        return None;
    }
    response.bytes().ok().map(|bytes| bytes.to_vec())
}

/// UI-side handle over the fetch worker. Tracks which URL the current
/// texture belongs to; a snapshot with a different URL invalidates it and
/// queues one fetch.
pub struct ThumbnailLoader {
    request_tx: Option<Sender<FetchRequest>>,
    result_rx: Receiver<FetchResult>,
    next_request_id: u64,
    inflight: Option<u64>,
    current_url: Option<String>,
    texture: Option<TextureHandle>,
}

impl ThumbnailLoader {
    pub fn new() -> Self {
        let (request_tx, request_rx) = mpsc::channel::<FetchRequest>();
        let (result_tx, result_rx) = mpsc::channel();

        thread::spawn(move || {
            let client = reqwest::blocking::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build();
            while let Ok(request) = request_rx.recv() {
                let image = match &client {
                    Ok(client) => {
                        fetch_thumbnail_bytes(client, &request.url)
                            .and_then(|bytes| decode_thumbnail_image(&bytes))
                    }
                    Err(_) => None,
                };
                if result_tx
                    .send(FetchResult {
                        id: request.id,
                        image,
                    })
                    .is_err()
                {
                    break;
                }
            }
        });

        Self {
            request_tx: Some(request_tx),
            result_rx,
            next_request_id: 1,
            inflight: None,
            current_url: None,
            texture: None,
        }
    }

    /// Call once per frame with the current snapshot's thumbnail URL (or
    /// `None` when disabled). Returns the texture to draw, if any.
    pub fn update(&mut self, ctx: &egui::Context, url: Option<&str>) -> Option<&TextureHandle> {
        let url = url.filter(|url| !url.is_empty());

        if self.current_url.as_deref() != url {
            self.texture = None;
            self.inflight = None;
            self.current_url = url.map(str::to_owned);
            if let (Some(url), Some(tx)) = (url, self.request_tx.as_ref()) {
                let id = self.next_request_id;
                self.next_request_id += 1;
                if tx
                    .send(FetchRequest {
                        id,
                        url: url.to_owned(),
                    })
                    .is_ok()
                {
                    self.inflight = Some(id);
                } else {
                    self.request_tx = None;
                }
            }
        }

        loop {
            match self.result_rx.try_recv() {
                Ok(result) => {
                    // Results for a superseded request are stale; drop them.
                    if self.inflight == Some(result.id) {
                        self.inflight = None;
                        if let Some(image) = result.image {
                            self.texture = Some(ctx.load_texture(
                                "popup.thumbnail",
                                image,
                                TextureOptions::LINEAR,
                            ));
                            ctx.request_repaint();
                        }
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.request_tx = None;
                    break;
                }
            }
        }

        self.texture.as_ref()
    }
}
