/// Utility for building API URLs consistently across steps
pub struct UrlBuilder;

impl UrlBuilder {
    /// Join an API base URL and a resource path
    pub fn build_url(base_url: &str, path: &str) -> String {
        let base_path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        format!("{}{}", base_url.trim_end_matches('/'), base_path)
    }

    /// `/linkpage/` or `/linkpage/{id}/`
    pub fn linkpage_path(linkpage_id: Option<u64>) -> String {
        match linkpage_id {
            Some(id) => format!("/linkpage/{}/", id),
            None => "/linkpage/".to_string(),
        }
    }

    /// `/qrcodes/` for creation
    pub fn qrcodes_path() -> String {
        "/qrcodes/".to_string()
    }

    /// `/qrcodes/{id}` for the details read
    pub fn qrcode_path(qr_code_id: u64) -> String {
        format!("/qrcodes/{}", qr_code_id)
    }

    /// `/qrcodes/{id}/download/`
    pub fn qrcode_download_path(qr_code_id: u64) -> String {
        format!("/qrcodes/{}/download/", qr_code_id)
    }

    /// `/media/` or `/media/{id}/`
    pub fn media_path(media_id: Option<u64>) -> String {
        match media_id {
            Some(id) => format!("/media/{}/", id),
            None => "/media/".to_string(),
        }
    }

    /// Validate URL format
    pub fn validate_url(url: &str) -> bool {
        reqwest::Url::parse(url).is_ok()
    }
}
