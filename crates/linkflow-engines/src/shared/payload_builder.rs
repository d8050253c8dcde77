use serde_json::{json, Value};

/// Campaign content type that binds a QR code to a linkpage
pub const QR_CONTENT_TYPE_LINKPAGE: u32 = 18;
/// QR type of a dynamic (redirecting) code
pub const QR_TYPE_DYNAMIC: u32 = 2;
/// Link-type discriminator of a PDF link on a linkpage
pub const PDF_LINK_URL_TYPE: u32 = 10;
pub const PDF_LINK_IMAGE_TYPE: u32 = 1;
pub const DEFAULT_CAMPAIGN_TIMEZONE: &str = "Asia/Calcutta";
pub const MEDIA_STATUS_ACTIVE: &str = "Active";
/// State a media record is in between the signed-target request and activation
pub const MEDIA_STATUS_PENDING_UPLOAD: &str = "Pending Upload";
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Builds the JSON request bodies of the resource-management API
pub struct PayloadBuilder;

impl PayloadBuilder {
    pub fn create_linkpage(name: &str, org_id: u64) -> Value {
        json!({
            "name": name,
            "organization": org_id,
        })
    }

    /// Dynamic QR code whose campaign points at the linkpage
    pub fn create_qr_code(name: &str, org_id: u64, linkpage_id: u64) -> Value {
        json!({
            "campaign": {
                "content_type": QR_CONTENT_TYPE_LINKPAGE,
                "campaign_active": true,
                "timezone": DEFAULT_CAMPAIGN_TIMEZONE,
                "organization": org_id,
                "link_page": linkpage_id,
                "age_gate": 0,
            },
            "qr_type": QR_TYPE_DYNAMIC,
            "organization": org_id,
            "name": name,
        })
    }

    /// Request for a pre-signed upload target
    pub fn request_signed_target(org_id: u64, folder: Option<u64>) -> Value {
        let mut payload = json!({
            "organization": org_id,
            "public": true,
            "typeform_compatible": null,
        });
        if let Some(folder) = folder {
            payload["folder"] = json!(folder);
        }
        payload
    }

    /// Moves a media record to the active state; `media_record` is the verify read
    pub fn activate_media(media_id: u64, media_record: &Value, pdf_name: &str, org_id: u64) -> Value {
        let url = media_record
            .get("url")
            .and_then(Value::as_str)
            .or_else(|| media_record.get("media_url").and_then(Value::as_str))
            .unwrap_or("");

        json!({
            "id": media_id,
            "url": url,
            "status": MEDIA_STATUS_ACTIVE,
            "name": pdf_name,
            "content_type": PDF_CONTENT_TYPE,
            "organization": org_id,
            "typeform_url": null,
            "typeform_compatible": false,
        })
    }

    pub fn attach_pdf_link(linkpage_url: &str, pdf_url: &str, pdf_name: &str, org_id: u64) -> Value {
        json!({
            "links": [
                {
                    "url_type": PDF_LINK_URL_TYPE,
                    "deleted": false,
                    "url": "",
                    "title": pdf_name,
                    "image_type": PDF_LINK_IMAGE_TYPE,
                    "image_url": "",
                    "field_data": {
                        "pdf_url": pdf_url,
                        "pdf_name": pdf_name,
                    },
                }
            ],
            "url": linkpage_url,
            "organization": org_id,
        })
    }

    pub fn detach_links(link_ids: &[u64], linkpage_url: &str, org_id: u64) -> Value {
        json!({
            "deleted_links": link_ids,
            "links": [],
            "url": linkpage_url,
            "organization": org_id,
        })
    }
}
