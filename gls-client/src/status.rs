//! Operation status mapping

use gls_core::domain::job::{PollResponse, RemoteStatus};
use gls_core::domain::task::ExitInfo;
use gls_core::dto::operation::{Event, Operation};

/// Reads the poll result out of an operation resource
///
/// - not done, not started: `Pending`
/// - not done, started: `Running`
/// - done with an error: `Failed`
/// - done otherwise: `Succeeded`
///
/// The exit code is the latest non-zero container exit status reported in the
/// operation events, or 0 when every container exited cleanly.
pub fn poll_response(op: &Operation) -> PollResponse {
    let metadata = op.metadata.clone().unwrap_or_default();

    if !op.done {
        let started = metadata.start_time.is_some() || !metadata.events.is_empty();
        return if started {
            PollResponse::running()
        } else {
            PollResponse::pending()
        };
    }

    let exit_code = exit_code(&metadata.events);

    match &op.error {
        Some(error) => {
            let mut message = error.message.clone();
            if let Some(cause) = failure_cause(&metadata.events) {
                if !message.contains(&cause) {
                    message = format!("{}: {}", message, cause);
                }
            }
            PollResponse {
                status: RemoteStatus::Failed,
                exit_info: Some(ExitInfo {
                    exit_code: exit_code.filter(|code| *code != 0),
                    error_message: Some(message),
                    completed_at: metadata.end_time.or_else(|| Some(chrono::Utc::now())),
                }),
            }
        }
        None => PollResponse {
            status: RemoteStatus::Succeeded,
            exit_info: Some(ExitInfo {
                exit_code: Some(exit_code.unwrap_or(0)),
                error_message: None,
                completed_at: metadata.end_time.or_else(|| Some(chrono::Utc::now())),
            }),
        },
    }
}

fn exit_code(events: &[Event]) -> Option<i32> {
    let stopped: Vec<_> = events
        .iter()
        .filter_map(|e| e.container_stopped.as_ref().map(|s| (e.timestamp, s.exit_status)))
        .collect();

    if stopped.is_empty() {
        return None;
    }

    stopped
        .iter()
        .filter(|(_, status)| *status != 0)
        .max_by_key(|(timestamp, _)| *timestamp)
        .map(|(_, status)| *status)
        .or(Some(0))
}

fn failure_cause(events: &[Event]) -> Option<String> {
    events
        .iter()
        .filter_map(|e| e.failed.as_ref().map(|f| (e.timestamp, f.cause.clone())))
        .filter(|(_, cause)| !cause.is_empty())
        .max_by_key(|(timestamp, _)| *timestamp)
        .map(|(_, cause)| cause)
}
