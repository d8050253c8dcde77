use async_trait::async_trait;
use linkflow_core::error::{LinkflowError, LinkflowResult};
use linkflow_engines::shared::{PayloadBuilder, ResponseParser, UrlBuilder};
use log::{info, warn};
use serde_json::Value;

use super::{RECORD_DELETE_RESULT, RECORD_LINKPAGE, RECORD_UPDATED_LINKPAGE};
use crate::context::{ContextField, ContextValue, StepOutput, WorkflowContext};
use crate::step::{StepDescriptor, StepEnv, StepExecutor, StepGate};

static CREATE_LINKPAGE: StepDescriptor = StepDescriptor {
    name: "create-linkpage",
    title: "Create Linkpage",
    requires: &[],
    produces: &[ContextField::LinkpageId, ContextField::LinkpageUrl],
    gate: StepGate::Always,
};

static ATTACH_PDF_LINK: StepDescriptor = StepDescriptor {
    name: "attach-pdf-link",
    title: "Attach PDF Link to Linkpage",
    requires: &[
        ContextField::LinkpageId,
        ContextField::LinkpageUrl,
        ContextField::DerivedPdfUrl,
    ],
    produces: &[ContextField::AttachedLinkIds],
    gate: StepGate::Always,
};

static DETACH_PDF_LINKS: StepDescriptor = StepDescriptor {
    name: "detach-pdf-links",
    title: "Detach Links from Linkpage",
    requires: &[
        ContextField::LinkpageId,
        ContextField::LinkpageUrl,
        ContextField::AttachedLinkIds,
    ],
    produces: &[],
    gate: StepGate::WhenDetachRequested,
};

/// Creates the landing page the QR code will point at
pub struct CreateLinkpage;

#[async_trait]
impl StepExecutor for CreateLinkpage {
    fn descriptor(&self) -> &'static StepDescriptor {
        &CREATE_LINKPAGE
    }

    async fn execute(
        &self,
        _context: &WorkflowContext,
        env: &StepEnv<'_>,
        output: &mut StepOutput,
    ) -> LinkflowResult<()> {
        let step = self.name();
        let params = env.params;

        info!("Creating linkpage '{}'", params.linkpage_name);
        let payload = PayloadBuilder::create_linkpage(&params.linkpage_name, params.org_id);
        let response = env
            .api
            .post_json(step, &UrlBuilder::linkpage_path(None), &[], &payload)
            .await?;

        let id = ResponseParser::extract_id(&response, "id");
        let url = ResponseParser::extract_str(&response, "url").map(str::to_string);
        output.record(RECORD_LINKPAGE, response);

        let id = id.ok_or_else(|| LinkflowError::invalid_response(step, "no 'id' in linkpage"))?;
        let url = url.ok_or_else(|| LinkflowError::invalid_response(step, "no 'url' in linkpage"))?;

        info!("  Linkpage ID : {}", id);
        info!("  Linkpage URL: {}", url);
        output.set(ContextValue::LinkpageId(id));
        output.set(ContextValue::LinkpageUrl(url));
        Ok(())
    }
}

/// Adds a PDF link to the linkpage and reads the page back to confirm it
pub struct AttachPdfLink;

impl AttachPdfLink {
    fn log_links(linkpage: &Value) {
        let links = linkpage
            .get("links")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        if links.is_empty() {
            warn!("Linkpage reports no links after the update");
            return;
        }

        info!("  Links on page: {}", links.len());
        for link in links {
            info!(
                "    - {} (type {}) {}",
                ResponseParser::extract_str(link, "title").unwrap_or("<untitled>"),
                link.get("url_type").cloned().unwrap_or(Value::Null),
                link.get("field_data")
                    .and_then(|data| ResponseParser::extract_str(data, "pdf_url"))
                    .unwrap_or("")
            );
        }
    }
}

#[async_trait]
impl StepExecutor for AttachPdfLink {
    fn descriptor(&self) -> &'static StepDescriptor {
        &ATTACH_PDF_LINK
    }

    async fn execute(
        &self,
        context: &WorkflowContext,
        env: &StepEnv<'_>,
        output: &mut StepOutput,
    ) -> LinkflowResult<()> {
        let step = self.name();
        let linkpage_id = context.require(step, ContextField::LinkpageId, context.linkpage_id())?;
        let linkpage_url =
            context.require(step, ContextField::LinkpageUrl, context.linkpage_url())?;
        let pdf_url =
            context.require(step, ContextField::DerivedPdfUrl, context.derived_pdf_url())?;
        let pdf_name = env.params.pdf_name()?;

        let path = UrlBuilder::linkpage_path(Some(linkpage_id));
        let query = [env.api.org_query()];
        let payload =
            PayloadBuilder::attach_pdf_link(linkpage_url, pdf_url, &pdf_name, env.params.org_id);

        info!("Attaching '{}' -> {}", pdf_name, pdf_url);
        let updated = env.api.put_json(step, &path, &query, &payload).await?;

        // The update response does not always embed the links.
        let confirmed = match env.api.get_json(step, &path, &query).await {
            Ok(linkpage) => linkpage,
            Err(e) => {
                warn!(
                    "Could not re-read linkpage {}, using the update response: {}",
                    linkpage_id, e
                );
                updated
            }
        };

        Self::log_links(&confirmed);
        let link_ids = ResponseParser::extract_link_ids(&confirmed);
        output.record(RECORD_UPDATED_LINKPAGE, confirmed);
        output.set(ContextValue::AttachedLinkIds(link_ids));
        Ok(())
    }
}

/// Removes the links found by [`AttachPdfLink`] from the linkpage
pub struct DetachPdfLinks;

#[async_trait]
impl StepExecutor for DetachPdfLinks {
    fn descriptor(&self) -> &'static StepDescriptor {
        &DETACH_PDF_LINKS
    }

    async fn execute(
        &self,
        context: &WorkflowContext,
        env: &StepEnv<'_>,
        output: &mut StepOutput,
    ) -> LinkflowResult<()> {
        let step = self.name();
        let linkpage_id = context.require(step, ContextField::LinkpageId, context.linkpage_id())?;
        let linkpage_url =
            context.require(step, ContextField::LinkpageUrl, context.linkpage_url())?;
        let link_ids = context.require(
            step,
            ContextField::AttachedLinkIds,
            context.attached_link_ids(),
        )?;

        if link_ids.is_empty() {
            warn!("No link IDs found to delete, skipping");
            return Ok(());
        }

        info!("Deleting links {:?} from linkpage {}", link_ids, linkpage_id);
        let payload = PayloadBuilder::detach_links(link_ids, linkpage_url, env.params.org_id);
        let response = env
            .api
            .put_json(
                step,
                &UrlBuilder::linkpage_path(Some(linkpage_id)),
                &[env.api.org_query()],
                &payload,
            )
            .await?;

        info!(
            "  Remaining links: {}",
            ResponseParser::extract_link_ids(&response).len()
        );
        output.record(RECORD_DELETE_RESULT, response);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::test_support::Harness;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn attached_context(link_ids: Option<Vec<u64>>) -> WorkflowContext {
        let mut ctx = WorkflowContext::new();
        ctx.apply(ContextValue::LinkpageId(42)).unwrap();
        ctx.apply(ContextValue::LinkpageUrl("https://q.linkpages.pro/abc".into()))
            .unwrap();
        ctx.apply(ContextValue::DerivedPdfUrl("https://q.eddy.pro/pdf/99".into()))
            .unwrap();
        if let Some(ids) = link_ids {
            ctx.apply(ContextValue::AttachedLinkIds(ids)).unwrap();
        }
        ctx
    }

    #[tokio::test]
    async fn create_linkpage_produces_id_and_url() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/linkpage/")
            .match_query(Matcher::Any)
            .match_body(Matcher::Json(json!({"name": "Hersheys TLC 101", "organization": 949})))
            .with_status(201)
            .with_body(r#"{"id": 42, "url": "https://q.linkpages.pro/abc"}"#)
            .create_async()
            .await;

        let harness = Harness::new(&server);
        let mut output = StepOutput::new();
        CreateLinkpage
            .execute(&WorkflowContext::new(), &harness.env(), &mut output)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            output.values,
            vec![
                ContextValue::LinkpageId(42),
                ContextValue::LinkpageUrl("https://q.linkpages.pro/abc".into())
            ]
        );
        assert_eq!(output.records[0].0, "linkpage");
    }

    #[tokio::test]
    async fn create_linkpage_without_id_is_invalid_but_recorded() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/linkpage/")
            .match_query(Matcher::Any)
            .with_status(201)
            .with_body(r#"{"url": "https://q.linkpages.pro/abc"}"#)
            .create_async()
            .await;

        let harness = Harness::new(&server);
        let mut output = StepOutput::new();
        let err = CreateLinkpage
            .execute(&WorkflowContext::new(), &harness.env(), &mut output)
            .await
            .unwrap_err();

        assert!(matches!(err, LinkflowError::InvalidResponse { .. }));
        assert!(output.values.is_empty());
        assert_eq!(output.records.len(), 1);
    }

    #[tokio::test]
    async fn attach_tags_link_as_pdf_and_confirms_with_a_read() {
        let mut server = Server::new_async().await;
        let put = server
            .mock("PUT", "/linkpage/42/")
            .match_query(Matcher::UrlEncoded("organization".into(), "949".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(json!({
                    "url": "https://q.linkpages.pro/abc",
                    "organization": 949
                })),
                Matcher::Regex(r#""url_type":10"#.to_string()),
                Matcher::Regex(r#""title":"sample.pdf""#.to_string()),
                Matcher::Regex(r#""pdf_url":"https://q.eddy.pro/pdf/99""#.to_string()),
            ]))
            .with_status(200)
            .with_body(r#"{"id": 42}"#)
            .create_async()
            .await;
        let get = server
            .mock("GET", "/linkpage/42/")
            .match_query(Matcher::UrlEncoded("organization".into(), "949".into()))
            .with_status(200)
            .with_body(r#"{"id": 42, "links": [{"id": 5, "title": "sample.pdf", "url_type": 10}]}"#)
            .create_async()
            .await;

        let harness = Harness::new(&server);
        let mut output = StepOutput::new();
        AttachPdfLink
            .execute(&attached_context(None), &harness.env(), &mut output)
            .await
            .unwrap();

        put.assert_async().await;
        get.assert_async().await;
        assert_eq!(output.values, vec![ContextValue::AttachedLinkIds(vec![5])]);
        assert_eq!(output.records[0].0, "updated_linkpage");
        assert_eq!(output.records[0].1["links"][0]["id"], 5);
    }

    #[tokio::test]
    async fn attach_falls_back_to_update_response_when_read_fails() {
        let mut server = Server::new_async().await;
        let _put = server
            .mock("PUT", "/linkpage/42/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"id": 42, "links": [{"id": 8}]}"#)
            .create_async()
            .await;
        let _get = server
            .mock("GET", "/linkpage/42/")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let harness = Harness::new(&server);
        let mut output = StepOutput::new();
        AttachPdfLink
            .execute(&attached_context(None), &harness.env(), &mut output)
            .await
            .unwrap();

        assert_eq!(output.values, vec![ContextValue::AttachedLinkIds(vec![8])]);
    }

    #[tokio::test]
    async fn attach_failure_is_transport_error() {
        let mut server = Server::new_async().await;
        let _put = server
            .mock("PUT", "/linkpage/42/")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        let harness = Harness::new(&server);
        let mut output = StepOutput::new();
        let err = AttachPdfLink
            .execute(&attached_context(None), &harness.env(), &mut output)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(403));
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn detach_without_links_is_a_no_op() {
        let mut server = Server::new_async().await;
        let put = server
            .mock("PUT", "/linkpage/42/")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let harness = Harness::new(&server);
        let mut output = StepOutput::new();
        DetachPdfLinks
            .execute(&attached_context(Some(vec![])), &harness.env(), &mut output)
            .await
            .unwrap();

        put.assert_async().await;
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn detach_removes_exactly_the_attached_ids() {
        let mut server = Server::new_async().await;
        let put = server
            .mock("PUT", "/linkpage/42/")
            .match_query(Matcher::UrlEncoded("organization".into(), "949".into()))
            .match_body(Matcher::Json(json!({
                "deleted_links": [5, 6],
                "links": [],
                "url": "https://q.linkpages.pro/abc",
                "organization": 949
            })))
            .with_status(200)
            .with_body(r#"{"id": 42, "links": []}"#)
            .create_async()
            .await;

        let harness = Harness::new(&server);
        let mut output = StepOutput::new();
        DetachPdfLinks
            .execute(&attached_context(Some(vec![5, 6])), &harness.env(), &mut output)
            .await
            .unwrap();

        put.assert_async().await;
        assert_eq!(output.records[0].0, "delete_result");
    }
}
