//! Interactive debug page.
//!
//! `GET /debug` renders an empty query form. `POST /debug` takes the submitted
//! form fields, runs them as a backend `query`, and renders the backend's
//! answer into the same page.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::handlers::{Handler, HandlerError, HandlerRequest, Payload, UpstreamClient};
use crate::http::response::{Responder, ResponseBody};

/// Template rendered for every debug request.
pub const DEBUG_VIEW: &str = "debug.html";

pub struct DebugHandler {
    client: UpstreamClient,
}

impl DebugHandler {
    pub fn new(client: UpstreamClient) -> Self {
        Self { client }
    }
}

fn render_result(body: &ResponseBody) -> String {
    match body {
        ResponseBody::Empty => String::new(),
        ResponseBody::Markup(text) => text.clone(),
        ResponseBody::Data(value) => serde_json::to_string_pretty(value).unwrap_or_default(),
    }
}

#[async_trait]
impl Handler for DebugHandler {
    async fn call(&self, request: HandlerRequest, responder: Responder) -> Result<(), HandlerError> {
        let options = match &request.payload {
            Payload::Form(_) => {
                let fields = request.payload.to_json();
                let query = Payload::Json(fields.clone());
                let reply = self.client.call("query", &query, &[]).await?;

                json!({
                    "fp_code": request.payload.field("fp_code").unwrap_or_default(),
                    "fields": fields,
                    "status": reply.status.as_u16(),
                    "result": render_result(&reply.body),
                })
            }
            _ => json!({
                "fp_code": request.context.query_param("fp_code").unwrap_or_default(),
                "fields": Value::Null,
                "status": Value::Null,
                "result": "",
            }),
        };

        responder.render_view(None, DEBUG_VIEW, &options, None).await;
        Ok(())
    }
}
