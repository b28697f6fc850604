//! Sandbox HTML builder for the preview page.
//!
//! The document embeds the full preview payload as an inline script constant
//! and hands it to the external UI5 runtime (`/ui5-preview-runtime.js`).
//! When the runtime is missing, the page reports the failure to its parent
//! frame over the `fiori-preview` postMessage channel instead of rendering a
//! blank iframe.

use serde_json::{json, Value};

use crate::models::preview::PreviewPayload;

const HTML_BEFORE_TITLE: &str = r##"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>"##;

const HTML_BEFORE_PAYLOAD: &str = r##"</title>
    <script
      id="sap-ui-bootstrap"
      src="https://ui5.sap.com/resources/sap-ui-core.js"
      data-sap-ui-libs="sap.m"
      data-sap-ui-theme="sap_horizon"
      data-sap-ui-async="false"
      data-sap-ui-compatVersion="edge">
    </script>
    <script src="/ui5-preview-runtime.js"></script>
    <style>
      html, body, #content {
        margin: 0;
        width: 100%;
        height: 100%;
        overflow: hidden;
        font-family: "72", Arial, sans-serif;
        background: #fff;
      }
    </style>
  </head>
  <body>
    <div id="content"></div>
    <script>
      const previewPayload = "##;

const HTML_AFTER_PAYLOAD: &str = r##";

      function notifyPreviewRuntimeMissing(preview) {
        if (!window.parent) {
          return;
        }
        window.parent.postMessage(
          {
            channel: "fiori-preview",
            previewId: preview.previewId,
            status: "error",
            error: "UI5 preview runtime script not loaded"
          },
          "*"
        );
      }

      if (
        window.FioriPreviewRuntime &&
        typeof window.FioriPreviewRuntime.start === "function"
      ) {
        window.FioriPreviewRuntime.start(previewPayload);
      } else {
        notifyPreviewRuntimeMissing(previewPayload);
      }
    </script>
  </body>
</html>"##;

pub struct RenderService;

impl RenderService {
    /// Renders the full preview document for the given id and payload.
    pub fn build_preview_html(preview_id: &str, preview: &PreviewPayload) -> String {
        let payload = Self::serialize_for_inline_script(&json!({
            "previewId": preview_id,
            "name": preview.name,
            "viewXml": preview.view_xml,
            "controller": preview.controller,
            "modelData": preview.model_data,
        }));

        let mut html = String::with_capacity(
            HTML_BEFORE_TITLE.len()
                + HTML_BEFORE_PAYLOAD.len()
                + HTML_AFTER_PAYLOAD.len()
                + payload.len()
                + preview.name.len(),
        );
        html.push_str(HTML_BEFORE_TITLE);
        html.push_str(&Self::escape_html(&preview.name));
        html.push_str(HTML_BEFORE_PAYLOAD);
        html.push_str(&payload);
        html.push_str(HTML_AFTER_PAYLOAD);
        html
    }

    /// JSON serialization safe to inline inside a `<script>` element: angle
    /// brackets and ampersands become unicode escapes (which also neutralizes
    /// any `</script>` inside the data), and the two JS line separators that
    /// are invalid in string literals are escaped as well.
    pub fn serialize_for_inline_script(payload: &Value) -> String {
        payload
            .to_string()
            .replace('<', "\\u003c")
            .replace('>', "\\u003e")
            .replace('&', "\\u0026")
            .replace('\u{2028}', "\\u2028")
            .replace('\u{2029}', "\\u2029")
    }

    pub fn escape_html(value: &str) -> String {
        value
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;")
    }
}
