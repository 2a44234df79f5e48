// API client module: a small blocking HTTP client for the CasJobs REST API.
// Each call takes the token to attach explicitly; the client itself never
// stores one, so whoever owns the token decides what gets sent.

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::token::Token;

/// Header CasJobs reads the Keystone token from.
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Server-assigned identifier of an asynchronous job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobId(pub String);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job record as returned by `GET /jobs/{id}`. Only `Status` is interpreted;
/// every other field is kept as-is for display.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JobStatus {
    #[serde(rename = "Status")]
    pub status: i64,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

/// Body of a synchronous query.
#[derive(Serialize, Debug)]
struct QueryRequest<'a> {
    #[serde(rename = "Query")]
    query: &'a str,
}

/// Body of an asynchronous job submission.
#[derive(Serialize, Debug)]
struct SubmitRequest<'a> {
    #[serde(rename = "Query")]
    query: &'a str,
    #[serde(rename = "CreateTable")]
    create_table: bool,
    #[serde(rename = "TableName")]
    table_name: Option<&'a str>,
}

/// The remote operations of the batch-query service.
///
/// Implementations must report a rejected token as [`Error::Authorization`]
/// and nothing else, and must not retry on their own.
pub trait JobService {
    /// Run `sql` inline in `context` and return the result payload exactly
    /// as the server sent it.
    fn execute_query(&self, token: &Token, context: &str, sql: &str) -> Result<Vec<u8>>;

    /// Push `content` as table `table` in `context`. Returns bytes sent.
    fn upload_table(&self, token: &Token, context: &str, table: &str, content: &[u8])
        -> Result<usize>;

    fn get_job_status(&self, token: &Token, job_id: &JobId) -> Result<JobStatus>;

    /// Queue `sql` as a job, optionally storing the result in `table`.
    fn submit_job(
        &self,
        token: &Token,
        context: &str,
        sql: &str,
        create_table: bool,
        table: Option<&str>,
    ) -> Result<JobId>;

    fn cancel_job(&self, token: &Token, job_id: &JobId) -> Result<String>;
}

/// Blocking CasJobs client holding the reqwest client and the REST root.
#[derive(Clone)]
pub struct CasJobsClient {
    client: Client,
    rest_url: String,
}

impl CasJobsClient {
    /// `base_url` is the CasJobs root, e.g. `http://host/CasJobs`; requests
    /// are issued below `{base_url}/RestApi`.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(CasJobsClient {
            client,
            rest_url: format!("{}/RestApi", base_url.trim_end_matches('/')),
        })
    }

    fn context_url(&self, context: &str, rest: &str) -> String {
        format!(
            "{}/contexts/{}/{rest}",
            self.rest_url,
            urlencoding::encode(context)
        )
    }

    fn job_url(&self, job_id: &JobId) -> String {
        format!("{}/jobs/{}", self.rest_url, urlencoding::encode(&job_id.0))
    }

    /// Attach the token and content type every CasJobs call carries.
    fn authorized(&self, req: RequestBuilder, token: &Token) -> RequestBuilder {
        req.header(AUTH_TOKEN_HEADER, token.as_str())
            .header(CONTENT_TYPE, "application/json")
    }

    /// Send the request and turn 401 / non-2xx into the matching error,
    /// returning the undecoded body on success.
    fn send_raw(&self, req: RequestBuilder) -> Result<Vec<u8>> {
        let res: Response = req.send()?;
        let status = res.status();
        debug!(status = %status, url = %res.url(), "CasJobs response");

        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Authorization);
        }
        let body = res.bytes()?.to_vec();
        if !status.is_success() {
            return Err(Error::Service {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(body)
    }

    /// Like [`Self::send_raw`], for the endpoints whose answer is read as text.
    fn send(&self, req: RequestBuilder) -> Result<String> {
        let body = self.send_raw(req)?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

impl JobService for CasJobsClient {
    fn execute_query(&self, token: &Token, context: &str, sql: &str) -> Result<Vec<u8>> {
        let url = self.context_url(context, "query");
        debug!(%url, "POST query");
        let body = serde_json::to_vec(&QueryRequest { query: sql })?;
        let req = self.client.post(&url).body(body);
        self.send_raw(self.authorized(req, token))
    }

    fn upload_table(
        &self,
        token: &Token,
        context: &str,
        table: &str,
        content: &[u8],
    ) -> Result<usize> {
        let url = self.context_url(context, &format!("tables/{}", urlencoding::encode(table)));
        debug!(%url, bytes = content.len(), "POST table");
        let req = self.client.post(&url).body(content.to_vec());
        self.send_raw(self.authorized(req, token))?;
        Ok(content.len())
    }

    fn get_job_status(&self, token: &Token, job_id: &JobId) -> Result<JobStatus> {
        let url = self.job_url(job_id);
        debug!(%url, "GET job");
        let body = self.send(self.authorized(self.client.get(&url), token))?;
        serde_json::from_str(&body).map_err(|e| Error::Service {
            status: StatusCode::OK.as_u16(),
            body: format!("unreadable job record ({e}): {body}"),
        })
    }

    fn submit_job(
        &self,
        token: &Token,
        context: &str,
        sql: &str,
        create_table: bool,
        table: Option<&str>,
    ) -> Result<JobId> {
        let url = self.context_url(context, "jobs");
        debug!(%url, create_table, "PUT job");
        let body = serde_json::to_vec(&SubmitRequest {
            query: sql,
            create_table,
            table_name: table,
        })?;
        let req = self.client.put(&url).body(body);
        let body = self.send(self.authorized(req, token))?;
        Ok(parse_job_id(&body))
    }

    fn cancel_job(&self, token: &Token, job_id: &JobId) -> Result<String> {
        let url = self.job_url(job_id);
        debug!(%url, "DELETE job");
        self.send(self.authorized(self.client.delete(&url), token))
    }
}

/// The submit endpoint answers with the bare id, sometimes JSON-quoted.
fn parse_job_id(body: &str) -> JobId {
    let id = body.trim();
    let id = id
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(id);
    JobId(id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_accepts_plain_and_quoted_bodies() {
        assert_eq!(parse_job_id("12345\n"), JobId("12345".into()));
        assert_eq!(parse_job_id("\"12345\""), JobId("12345".into()));
    }

    #[test]
    fn urls_are_built_under_rest_api() {
        let client = CasJobsClient::new("http://host/CasJobs/").unwrap();
        assert_eq!(
            client.context_url("My DB", "query"),
            "http://host/CasJobs/RestApi/contexts/My%20DB/query"
        );
        assert_eq!(
            client.job_url(&JobId("42".into())),
            "http://host/CasJobs/RestApi/jobs/42"
        );
    }

    #[test]
    fn job_status_keeps_unknown_fields() {
        let status: JobStatus =
            serde_json::from_str(r#"{"JobID": 7, "Status": 5, "Message": "done"}"#).unwrap();
        assert_eq!(status.status, 5);
        assert_eq!(status.other["Message"], "done");
        assert_eq!(status.other["JobID"], 7);
    }

    #[test]
    fn submit_body_uses_casjobs_field_names() {
        let body = SubmitRequest {
            query: "select 1",
            create_table: true,
            table_name: Some("t1"),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"Query": "select 1", "CreateTable": true, "TableName": "t1"})
        );
    }
}
