// QR codes for virtual meeting links, generated locally or fetched from a
// QR service, cached per link for the whole session.

use crate::config::QrMode;
use crate::http::{encode_query, HttpClient};
use ::image::{DynamicImage, Luma};
use qrcode::QrCode;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Pixel size requested from a remote QR service.
const REMOTE_QR_PIXELS: u32 = 150;

/// Looks up the QR image for a link. `None` means "draw text only".
pub trait QrSource {
    fn qr_for(&mut self, link: &str) -> Option<Arc<DynamicImage>>;
}

pub struct QrProvider {
    mode: QrMode,
    http: HttpClient,
    cache: HashMap<String, Option<Arc<DynamicImage>>>,
}

impl QrProvider {
    pub fn new(mode: QrMode, http: HttpClient) -> Self {
        QrProvider { mode, http, cache: HashMap::new() }
    }

    pub fn is_enabled(&self) -> bool {
        self.mode != QrMode::Off
    }

    #[cfg(test)]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    fn build(&self, link: &str) -> Result<DynamicImage, String> {
        match &self.mode {
            QrMode::Off => Err("QR codes are disabled".to_string()),
            QrMode::Local => generate_qr_image(link),
            QrMode::Remote(service) => {
                let url = remote_url(service, link);
                let bytes = self.http.get_bytes(&url)?;
                ::image::load_from_memory(&bytes)
                    .map_err(|e| format!("Failed to decode QR image: {}", e))
            }
        }
    }
}

impl QrSource for QrProvider {
    fn qr_for(&mut self, link: &str) -> Option<Arc<DynamicImage>> {
        if !self.is_enabled() || link.trim().is_empty() {
            return None;
        }
        if let Some(hit) = self.cache.get(link) {
            return hit.clone();
        }
        let image = match self.build(link) {
            Ok(image) => Some(Arc::new(image)),
            Err(e) => {
                warn!(%link, error = %e, "QR code unavailable, printing text only");
                None
            }
        };
        self.cache.insert(link.to_string(), image.clone());
        image
    }
}

pub fn generate_qr_image(data: &str) -> Result<DynamicImage, String> {
    let code = QrCode::new(data.as_bytes()).map_err(|e| e.to_string())?;
    let image = code.render::<Luma<u8>>().build();
    Ok(DynamicImage::ImageLuma8(image))
}

fn remote_url(service: &str, link: &str) -> String {
    let separator = if service.contains('?') { '&' } else { '?' };
    format!(
        "{}{}size={}x{}&data={}",
        service,
        separator,
        REMOTE_QR_PIXELS,
        REMOTE_QR_PIXELS,
        encode_query(link)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn provider(mode: QrMode) -> QrProvider {
        QrProvider::new(mode, HttpClient::new(Duration::from_millis(200)))
    }

    #[test]
    fn local_codes_are_square_and_cached() {
        let mut qr = provider(QrMode::Local);
        let first = qr.qr_for("https://zoom.us/j/123456").unwrap();
        assert_eq!(first.width(), first.height());
        let second = qr.qr_for("https://zoom.us/j/123456").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(qr.cached(), 1);
    }

    #[test]
    fn disabled_mode_returns_nothing() {
        let mut qr = provider(QrMode::Off);
        assert!(qr.qr_for("https://zoom.us/j/1").is_none());
        assert_eq!(qr.cached(), 0);
    }

    #[test]
    fn remote_failures_degrade_and_are_remembered() {
        let mut qr = provider(QrMode::Remote("http://127.0.0.1:9/qr".to_string()));
        assert!(qr.qr_for("https://meet.example.org/abc").is_none());
        assert_eq!(qr.cached(), 1);
        assert!(qr.qr_for("https://meet.example.org/abc").is_none());
    }

    #[test]
    fn remote_url_appends_query() {
        assert_eq!(
            remote_url("https://qr.example.org/create", "a b"),
            "https://qr.example.org/create?size=150x150&data=a%20b"
        );
        assert!(remote_url("https://qr.example.org/create?fmt=png", "x").contains("?fmt=png&size="));
    }
}
