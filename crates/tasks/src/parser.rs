//! Turns a terminal task status into a [`TaskResult`].

use planlink_connection::ConnectionContext;
use planlink_protocol::constants::EXPORT_COMPLETED;
use planlink_protocol::{ActionKind, NestedResultBody, ResultDetail, TaskInfo};
use planlink_transfer::{DownloadOptions, download_object};
use tracing::{debug, info, warn};

use crate::error::TaskError;
use crate::result::{ErrorDump, NestedResult, TaskResult};

/// Parses the final status JSON of a task.
///
/// A `Failed.` step yields a failure result without further requests.
/// Otherwise the error dump is fetched when the server offers one, export
/// payloads are downloaded and process steps are expanded.
pub async fn parse(
    kind: ActionKind,
    ctx: &ConnectionContext,
    raw: &serde_json::Value,
    task_url: &str,
    options: &DownloadOptions,
) -> Result<TaskResult, TaskError> {
    let info = TaskInfo::from_value(raw).map_err(|e| TaskError::MalformedStatus(e.to_string()))?;
    let mut result = TaskResult::new(kind, &info.task_id, &info.current_step);
    let body = info.result.clone().unwrap_or_default();
    result.details = messages(&body.details);

    if info.is_failed() {
        warn!(task_id = %info.task_id, kind = %kind, "task failed");
        result.failure_dump_available = body.failure_dump_available;
        return Ok(result);
    }

    result.successful = info.result.as_ref().is_none_or(|r| r.successful);

    match kind {
        ActionKind::Import | ActionKind::Delete => {
            attach_dump(ctx, task_url, body.failure_dump_available, &mut result).await;
        }
        ActionKind::Export => {
            attach_dump(ctx, task_url, body.failure_dump_available, &mut result).await;
            let object_id = body
                .object_id
                .as_deref()
                .filter(|id| !id.is_empty())
                .ok_or_else(|| TaskError::MissingObjectId(info.task_id.clone()))?;
            let object = download_object(ctx, object_id, options).await?;
            info!(
                task_id = %info.task_id,
                object_id,
                bytes = object.bytes.len(),
                truncated = object.truncated,
                "export payload downloaded"
            );
            result.truncated = object.truncated;
            result.payload = Some(object.bytes);
            result.details.push(EXPORT_COMPLETED.to_string());
        }
        ActionKind::Process => {
            for nested in &body.nested_results {
                result.nested.push(parse_nested(ctx, task_url, nested).await);
            }
            result.failure_dump_available = body.failure_dump_available
                || result.nested.iter().any(|n| n.failure_dump_available);
        }
    }

    debug!(
        task_id = %result.task_id,
        successful = result.successful,
        dump = result.failure_dump_available,
        "task result parsed"
    );
    Ok(result)
}

async fn attach_dump(
    ctx: &ConnectionContext,
    task_url: &str,
    available: bool,
    result: &mut TaskResult,
) {
    result.failure_dump_available = available;
    if available {
        result.error_dump = fetch_dump(ctx, &format!("{task_url}/dump")).await;
        if let Some(dump) = &result.error_dump {
            info!(task_id = %result.task_id, rows = dump.len(), "error dump retrieved");
        }
    }
}

async fn parse_nested(
    ctx: &ConnectionContext,
    task_url: &str,
    nested: &NestedResultBody,
) -> NestedResult {
    let error_dump = if nested.failure_dump_available && !nested.object_id.is_empty() {
        fetch_dump(ctx, &format!("{task_url}/dumps/{}", nested.object_id)).await
    } else {
        None
    };

    NestedResult {
        object_id: nested.object_id.clone(),
        successful: nested.successful,
        failure_dump_available: nested.failure_dump_available,
        details: messages(&nested.details),
        error_dump,
    }
}

/// Dumps only describe skipped rows; failing to get one never fails the task.
async fn fetch_dump(ctx: &ConnectionContext, url: &str) -> Option<ErrorDump> {
    let raw = match ctx.get_bytes(url).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(url, error = %e, "error dump unavailable");
            return None;
        }
    };
    match ErrorDump::parse(&raw) {
        Ok(dump) => Some(dump),
        Err(e) => {
            warn!(url, error = %e, "error dump unreadable");
            None
        }
    }
}

fn messages(details: &[ResultDetail]) -> Vec<String> {
    details
        .iter()
        .map(|d| d.local_message_text.trim())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MODEL_PATH, context};
    use planlink_test_support::{MockResponse, MockServer, ranged_response};
    use serde_json::json;

    fn task_url(server: &MockServer, segment: &str, action: &str) -> String {
        format!("{}{MODEL_PATH}/{segment}/{action}/tasks/T1", server.url())
    }

    #[tokio::test]
    async fn failed_step_makes_no_requests() {
        let server = MockServer::always(MockResponse::status(500)).await;
        let ctx = context(server.url());
        let raw = json!({"task": {"taskId": "T1", "taskState": "COMPLETE", "currentStep": "Failed.",
            "result": {"successful": false, "failureDumpAvailable": true, "objectId": "116000000001",
                "details": [{"localMessageText": "Source file missing"}]}}});

        let result = parse(
            ActionKind::Export,
            &ctx,
            &raw,
            &task_url(&server, "exports", "116000000001"),
            &DownloadOptions::default(),
        )
        .await
        .unwrap();

        assert!(result.is_failed());
        assert!(!result.successful);
        assert!(result.payload.is_none());
        assert_eq!(result.details, vec!["Source file missing"]);
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn import_with_dump() {
        let dump_csv = "_Line_,_Error_1_,Name\n2,Item not found,Widget\n";
        let server = MockServer::always(MockResponse::text(200, dump_csv)).await;
        let ctx = context(server.url());
        let url = task_url(&server, "imports", "112000000001");
        let raw = json!({"task": {"taskId": "T1", "taskState": "COMPLETE", "currentStep": "Complete.",
            "result": {"successful": true, "failureDumpAvailable": true,
                "details": [{"localMessageText": "1 row ignored", "occurrences": 1, "type": "rowsIgnored"}]}}});

        let result = parse(ActionKind::Import, &ctx, &raw, &url, &DownloadOptions::default())
            .await
            .unwrap();

        assert!(result.successful);
        assert!(result.failure_dump_available);
        let dump = result.error_dump.expect("dump");
        assert!(!dump.is_empty());
        assert_eq!(dump.rows[0][1], "Item not found");
        assert_eq!(result.details, vec!["1 row ignored"]);
        assert_eq!(
            server.count("GET", &format!("{MODEL_PATH}/imports/112000000001/tasks/T1/dump")),
            1
        );
    }

    #[tokio::test]
    async fn import_without_dump_makes_no_requests() {
        let server = MockServer::always(MockResponse::status(500)).await;
        let ctx = context(server.url());
        let raw = json!({"taskId": "T1", "currentStep": "Complete.",
            "result": {"successful": true, "failureDumpAvailable": false}});

        let result = parse(
            ActionKind::Delete,
            &ctx,
            &raw,
            &task_url(&server, "actions", "117000000001"),
            &DownloadOptions::default(),
        )
        .await
        .unwrap();
        assert!(result.successful);
        assert!(result.error_dump.is_none());
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn export_downloads_payload() {
        let content = b"Code,Value\nA,1\nB,2\n".to_vec();
        let served = content.clone();
        let server = MockServer::start(move |req| ranged_response(&served, req)).await;
        let ctx = context(server.url());
        let raw = json!({"task": {"taskId": "T1", "currentStep": "Complete.",
            "result": {"successful": true, "failureDumpAvailable": false, "objectId": "116000000003"}}});

        let options = DownloadOptions {
            chunk_fetch_size: 8,
            workers: 2,
            skip_bytes: 0,
        };
        let result = parse(
            ActionKind::Export,
            &ctx,
            &raw,
            &task_url(&server, "exports", "116000000003"),
            &options,
        )
        .await
        .unwrap();

        assert_eq!(result.payload.as_deref(), Some(content.as_slice()));
        assert!(!result.truncated);
        assert_eq!(result.details, vec!["File export completed."]);
        assert!(
            server
                .requests()
                .iter()
                .all(|r| r.path == format!("{MODEL_PATH}/files/116000000003"))
        );
    }

    #[tokio::test]
    async fn unreachable_dump_keeps_export_successful() {
        let content = b"Code,Value\nA,1\n".to_vec();
        let served = content.clone();
        let server = MockServer::start(move |req| {
            if req.path.ends_with("/dump") {
                MockResponse::status(500)
            } else {
                ranged_response(&served, req)
            }
        })
        .await;
        let ctx = context(server.url());
        let raw = json!({"task": {"taskId": "T1", "currentStep": "Complete.",
            "result": {"successful": true, "failureDumpAvailable": true, "objectId": "116000000003"}}});

        let result = parse(
            ActionKind::Export,
            &ctx,
            &raw,
            &task_url(&server, "exports", "116000000003"),
            &DownloadOptions::default(),
        )
        .await
        .unwrap();

        assert!(result.successful);
        assert!(result.failure_dump_available);
        assert!(result.error_dump.is_none());
        assert_eq!(result.payload.as_deref(), Some(content.as_slice()));
        assert_eq!(
            server.count("GET", &format!("{MODEL_PATH}/exports/116000000003/tasks/T1/dump")),
            1
        );
    }

    #[tokio::test]
    async fn unreachable_nested_dump_is_skipped() {
        let server = MockServer::always(MockResponse::status(500)).await;
        let ctx = context(server.url());
        let raw = json!({"task": {"taskId": "T1", "currentStep": "Complete.",
            "result": {"successful": true, "nestedResults": [
                {"objectId": "112000000001", "successful": true, "failureDumpAvailable": true}
            ]}}});

        let result = parse(
            ActionKind::Process,
            &ctx,
            &raw,
            &task_url(&server, "processes", "118000000001"),
            &DownloadOptions::default(),
        )
        .await
        .unwrap();

        assert!(result.successful);
        assert!(result.failure_dump_available);
        assert!(result.nested[0].error_dump.is_none());
    }

    #[tokio::test]
    async fn export_without_object_id() {
        let server = MockServer::always(MockResponse::status(500)).await;
        let ctx = context(server.url());
        let raw = json!({"task": {"taskId": "T9", "currentStep": "Complete.",
            "result": {"successful": true, "objectId": ""}}});

        let err = parse(
            ActionKind::Export,
            &ctx,
            &raw,
            &task_url(&server, "exports", "116000000003"),
            &DownloadOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TaskError::MissingObjectId(ref t) if t == "T9"));
    }

    #[tokio::test]
    async fn process_fetches_nested_dumps() {
        let server = MockServer::start(|req| {
            if req.path.ends_with("/dumps/112000000001") {
                MockResponse::text(200, "_Line_,_Error_1_\n4,Bad value\n")
            } else {
                MockResponse::status(404)
            }
        })
        .await;
        let ctx = context(server.url());
        let raw = json!({"task": {"taskId": "T1", "currentStep": "Complete.",
            "result": {"successful": true, "failureDumpAvailable": false, "nestedResults": [
                {"objectId": "112000000001", "successful": true, "failureDumpAvailable": true,
                    "details": [{"localMessageText": "1 row invalid"}]},
                {"objectId": "117000000002", "successful": true, "failureDumpAvailable": false}
            ]}}});

        let result = parse(
            ActionKind::Process,
            &ctx,
            &raw,
            &task_url(&server, "processes", "118000000001"),
            &DownloadOptions::default(),
        )
        .await
        .unwrap();

        assert!(result.successful);
        assert!(result.failure_dump_available);
        assert_eq!(result.nested.len(), 2);
        let first = &result.nested[0];
        assert_eq!(first.details, vec!["1 row invalid"]);
        assert_eq!(first.error_dump.as_ref().unwrap().rows[0][1], "Bad value");
        assert!(result.nested[1].error_dump.is_none());
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn malformed_status() {
        let server = MockServer::always(MockResponse::status(500)).await;
        let ctx = context(server.url());
        let raw = json!({"task": {"currentStep": 7}});
        let err = parse(
            ActionKind::Import,
            &ctx,
            &raw,
            "http://unused",
            &DownloadOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TaskError::MalformedStatus(_)));
    }
}
