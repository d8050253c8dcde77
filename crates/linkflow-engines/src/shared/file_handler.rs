use linkflow_core::config::file_name_of;
use linkflow_core::error::{LinkflowError, LinkflowResult};
use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio_util::codec::{BytesCodec, FramedRead};

use crate::shared::field_resolver::{UploadTarget, SIGNING_KEY_FIELD};
use crate::shared::payload_builder::PDF_CONTENT_TYPE;

/// Name of the form part carrying the file content
pub const FILE_PART_NAME: &str = "file";
/// Name of the form part declaring the uploaded object's content type
pub const CONTENT_TYPE_PART_NAME: &str = "Content-Type";

/// One part of the object-storage upload form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        content_type: String,
        path: PathBuf,
    },
}

impl FormPart {
    pub fn name(&self) -> &str {
        match self {
            FormPart::Text { name, .. } | FormPart::File { name, .. } => name,
        }
    }
}

/// Ordered description of a pre-signed multipart upload.
///
/// Parts are: `key`, the remaining signing fields in resolution order,
/// `Content-Type`, and the file last. The object-storage protocol ignores
/// fields that follow the file, so the order is part of the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadForm {
    pub upload_url: String,
    parts: Vec<FormPart>,
}

impl UploadForm {
    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    pub fn part_names(&self) -> Vec<&str> {
        self.parts.iter().map(FormPart::name).collect()
    }

    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            FormPart::Text { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// Opens the source file and produces the streaming reqwest form.
    ///
    /// The file handle is owned by the request body and closed when the
    /// request finishes or is dropped, on success and failure alike.
    pub async fn into_multipart(self) -> LinkflowResult<Form> {
        let mut form = Form::new();
        for part in self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name, value),
                FormPart::File {
                    name,
                    file_name,
                    content_type,
                    path,
                } => {
                    let file = File::open(&path).await.map_err(|e| {
                        LinkflowError::UploadForm(format!(
                            "failed to open {}: {}",
                            path.display(),
                            e
                        ))
                    })?;
                    let length = file.metadata().await?.len();
                    let stream = FramedRead::new(file, BytesCodec::new());
                    let file_part =
                        Part::stream_with_length(reqwest::Body::wrap_stream(stream), length)
                            .file_name(file_name)
                            .mime_str(&content_type)
                            .map_err(|e| {
                                LinkflowError::UploadForm(format!(
                                    "invalid content type '{}': {}",
                                    content_type, e
                                ))
                            })?;
                    form.part(name, file_part)
                }
            };
        }
        Ok(form)
    }
}

/// Shared file handling for uploads
pub struct FileHandler;

impl FileHandler {
    /// Lay out the upload form for `file_path` against a resolved target
    pub fn build_upload_form(target: &UploadTarget, file_path: &Path) -> LinkflowResult<UploadForm> {
        let key = target
            .key()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                LinkflowError::UploadForm("no 'key' field in the upload target".to_string())
            })?;

        let file_name = file_name_of(file_path)
            .map_err(|e| LinkflowError::UploadForm(e.to_string()))?;

        let mut parts = vec![FormPart::Text {
            name: SIGNING_KEY_FIELD.to_string(),
            value: key.to_string(),
        }];

        parts.extend(
            target
                .fields
                .iter()
                .filter(|(name, _)| {
                    name != SIGNING_KEY_FIELD && !name.eq_ignore_ascii_case(CONTENT_TYPE_PART_NAME)
                })
                .map(|(name, value)| FormPart::Text {
                    name: name.clone(),
                    value: value.clone(),
                }),
        );

        parts.push(FormPart::Text {
            name: CONTENT_TYPE_PART_NAME.to_string(),
            value: PDF_CONTENT_TYPE.to_string(),
        });

        parts.push(FormPart::File {
            name: FILE_PART_NAME.to_string(),
            file_name,
            content_type: PDF_CONTENT_TYPE.to_string(),
            path: file_path.to_path_buf(),
        });

        Ok(UploadForm {
            upload_url: target.upload_url.clone(),
            parts,
        })
    }

    /// Get file extension
    pub fn get_file_extension(file_path: &Path) -> Option<String> {
        file_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(fields: &[(&str, &str)]) -> UploadTarget {
        UploadTarget {
            upload_url: "https://s3.example/bucket".to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn key_first_file_last_for_any_field_order() {
        let orders: [&[(&str, &str)]; 3] = [
            &[("key", "k"), ("Policy", "p"), ("X-Amz-Signature", "s")],
            &[("Policy", "p"), ("key", "k"), ("X-Amz-Signature", "s")],
            &[("X-Amz-Signature", "s"), ("Policy", "p"), ("key", "k")],
        ];

        for fields in orders {
            let form =
                FileHandler::build_upload_form(&target(fields), Path::new("/tmp/doc.pdf")).unwrap();
            let names = form.part_names();

            assert_eq!(names.first(), Some(&"key"));
            assert_eq!(names.last(), Some(&"file"));
            assert_eq!(names[names.len() - 2], "Content-Type");
            assert_eq!(names.len(), 5);
        }
    }

    #[test]
    fn remaining_fields_keep_their_order() {
        let form = FileHandler::build_upload_form(
            &target(&[("X-Amz-Date", "d"), ("key", "k"), ("Policy", "p")]),
            Path::new("/tmp/doc.pdf"),
        )
        .unwrap();
        assert_eq!(
            form.part_names(),
            vec!["key", "X-Amz-Date", "Policy", "Content-Type", "file"]
        );
        assert_eq!(form.text_value("Content-Type"), Some("application/pdf"));
    }

    #[test]
    fn file_part_uses_base_name_and_pdf_type() {
        let form = FileHandler::build_upload_form(
            &target(&[("key", "k")]),
            Path::new("/some/dir/brochure.pdf"),
        )
        .unwrap();

        match form.parts().last().unwrap() {
            FormPart::File {
                file_name,
                content_type,
                ..
            } => {
                assert_eq!(file_name, "brochure.pdf");
                assert_eq!(content_type, "application/pdf");
            }
            other => panic!("expected file part, got {other:?}"),
        }
    }

    #[test]
    fn resolved_content_type_field_is_not_duplicated() {
        let form = FileHandler::build_upload_form(
            &target(&[("key", "k"), ("content-type", "text/plain")]),
            Path::new("/tmp/doc.pdf"),
        )
        .unwrap();
        assert_eq!(form.part_names(), vec!["key", "Content-Type", "file"]);
    }

    #[test]
    fn missing_key_is_a_builder_error() {
        let err = FileHandler::build_upload_form(&target(&[("Policy", "p")]), Path::new("/tmp/doc.pdf"))
            .unwrap_err();
        assert!(matches!(err, LinkflowError::UploadForm(_)));
    }

    #[tokio::test]
    async fn missing_file_fails_when_opening() {
        let form = FileHandler::build_upload_form(
            &target(&[("key", "k")]),
            Path::new("/definitely/not/here.pdf"),
        )
        .unwrap();
        let err = form.into_multipart().await.unwrap_err();
        assert!(matches!(err, LinkflowError::UploadForm(_)));
    }

    #[test]
    fn test_get_file_extension() {
        assert_eq!(
            FileHandler::get_file_extension(Path::new("doc.PDF")),
            Some("pdf".to_string())
        );
        assert_eq!(FileHandler::get_file_extension(Path::new("doc")), None);
    }
}
