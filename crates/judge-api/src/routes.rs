//! Submission Gateway handlers: submit, point-read, and paginated list.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use judge_core::{JobStatus, JudgeError, Language};
use judge_store::{Job, ListFilter};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::AppState;
use crate::error::{ApiError, map_store_error};

const MAX_SOURCE_CODE_BYTES: usize = 64 * 1024;
const MAX_STDIN_BYTES: usize = 4 * 1024;
const DEFAULT_LIMIT: i64 = 10;
const DEFAULT_OFFSET: i64 = 0;

#[derive(Deserialize)]
pub struct SubmitRequest {
    source_code: String,
    language: String,
    stdin: Option<String>,
}

#[derive(Serialize)]
pub struct SubmitResponse {
    job_id: String,
    status: String,
    message: String,
}

pub async fn submit(
    State(state): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let language = Language::from_str(&req.language)
        .map_err(|_| JudgeError::Validation(format!("unknown language '{}'", req.language)))?;

    if req.source_code.len() > MAX_SOURCE_CODE_BYTES {
        return Err(JudgeError::Validation(format!(
            "source_code exceeds {MAX_SOURCE_CODE_BYTES} bytes"
        ))
        .into());
    }
    if let Some(stdin) = &req.stdin {
        if stdin.len() > MAX_STDIN_BYTES {
            return Err(JudgeError::Validation(format!("stdin exceeds {MAX_STDIN_BYTES} bytes")).into());
        }
    }

    let id = Ulid::new().to_string();
    state
        .store
        .insert(&id, &req.source_code, language, req.stdin.as_deref())
        .await
        .map_err(map_store_error)?;
    state.dispatcher.enqueue(id.clone());

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            job_id: id,
            status: JobStatus::Pending.as_str().to_string(),
            message: "submission accepted".to_string(),
        }),
    ))
}

#[derive(Serialize)]
pub struct ResultView {
    stdout: Option<String>,
    stderr: Option<String>,
    exit_code: Option<i32>,
    execution_time_ms: Option<u64>,
    memory_usage_kb: Option<u64>,
    compile_output: Option<String>,
}

#[derive(Serialize)]
pub struct JobView {
    id: String,
    source_code: String,
    language: String,
    stdin: Option<String>,
    status: String,
    worker_id: Option<i64>,
    error_message: Option<String>,
    created_at: String,
    started_at: Option<String>,
    completed_at: Option<String>,
    updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<ResultView>,
}

impl From<Job> for JobView {
    fn from(job: Job) -> Self {
        let result = job.status.is_terminal().then(|| ResultView {
            stdout: job.stdout.clone(),
            stderr: job.stderr.clone(),
            exit_code: job.exit_code,
            execution_time_ms: job.execution_time_ms,
            memory_usage_kb: job.memory_usage_kb,
            compile_output: job.compile_output.clone(),
        });
        Self {
            id: job.id,
            source_code: job.source_code,
            language: job.language.as_str().to_string(),
            stdin: job.stdin,
            status: job.status.as_str().to_string(),
            worker_id: job.worker_id,
            error_message: job.error_message,
            created_at: job.created_at.to_rfc3339(),
            started_at: job.started_at.map(|t| t.to_rfc3339()),
            completed_at: job.completed_at.map(|t| t.to_rfc3339()),
            updated_at: job.updated_at.to_rfc3339(),
            result,
        }
    }
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobView>, ApiError> {
    let job = state.store.get(&id).await.map_err(map_store_error)?;
    Ok(Json(job.into()))
}

#[derive(Deserialize)]
pub struct ListQuery {
    limit: Option<i64>,
    offset: Option<i64>,
    status: Option<String>,
}

#[derive(Serialize)]
pub struct ListResponse {
    items: Vec<JobView>,
    total: i64,
    limit: i64,
    offset: i64,
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let status = match &query.status {
        Some(raw) => {
            Some(JobStatus::from_str(raw).map_err(|_| JudgeError::Validation(format!("unknown status '{raw}'")))?)
        }
        None => None,
    };
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let offset = query.offset.unwrap_or(DEFAULT_OFFSET);
    let filter = ListFilter { status, limit, offset };

    let page = state.store.list(&filter).await.map_err(map_store_error)?;
    Ok(Json(ListResponse {
        items: page.items.into_iter().map(JobView::from).collect(),
        total: page.total,
        limit,
        offset,
    }))
}

#[derive(Serialize)]
pub struct LanguageView {
    id: String,
    extension: String,
    timeout_ms: u64,
    memory_limit_mb: u64,
}

pub async fn languages(State(state): State<AppState>) -> Json<Vec<LanguageView>> {
    let views = state
        .catalog
        .languages()
        .map(|(lang, spec)| LanguageView {
            id: lang.as_str().to_string(),
            extension: spec.source_filename.rsplit('.').next().unwrap_or("").to_string(),
            timeout_ms: spec.run_timeout_ms,
            memory_limit_mb: spec.memory_limit_mb,
        })
        .collect();
    Json(views)
}

#[derive(Serialize)]
pub struct Banner {
    service: &'static str,
    version: &'static str,
}

pub async fn root() -> Json<Banner> {
    Json(Banner { service: "judge-server", version: env!("CARGO_PKG_VERSION") })
}
