use crate::application::use_cases::analysis::{AnalysisRequest, AnalyzeUseCase};
use crate::application::use_cases::current_upload::CurrentUpload;
use crate::application::use_cases::upload::UploadUseCase;
use crate::domain::error::AppError;
use crate::infrastructure::db::upload_store::UploadRepository;
use actix_cors::Cors;
use actix_web::http::StatusCode;
use actix_web::middleware::Logger;
use actix_web::{
    delete, dev::Server, error::JsonPayloadError, get, post, web, App, HttpRequest, HttpResponse,
    HttpServer, ResponseError,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

type HandlerResult = Result<HttpResponse, AppError>;

pub struct HttpState {
    pub repository: Arc<UploadRepository>,
    pub current_upload: Arc<CurrentUpload>,
    pub upload_use_case: Arc<UploadUseCase>,
    pub analyze_use_case: Arc<AnalyzeUseCase>,
    pub max_upload_bytes: usize,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            err if err.is_client_fault() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            warn!(%status, error = %self, "Request rejected");
        }
        HttpResponse::build(status).json(json!({ "detail": self.to_string() }))
    }
}

#[derive(Deserialize)]
pub struct UploadQuery {
    pub filename: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileInfo<'a> {
    original_filename: &'a str,
    row_count: usize,
    column_count: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeBody {
    pub upload_id: Option<i64>,
    pub analysis_type: Option<String>,
    pub chart_name: Option<String>,
    pub chart_data: Option<Value>,
    pub chart_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCurrentBody {
    pub upload_id: Option<i64>,
}

fn current_id(data: &HttpState) -> Result<i64, AppError> {
    data.current_upload
        .get()
        .ok_or_else(|| AppError::NotFound("No file has been uploaded yet".to_string()))
}

fn upload_not_found(upload_id: i64) -> AppError {
    AppError::NotFound(format!("Upload not found: {}", upload_id))
}

#[post("/upload")]
async fn upload(
    data: web::Data<HttpState>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> HandlerResult {
    let filename = query
        .filename
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("Missing filename".to_string()))?;

    info!(file = filename, bytes = body.len(), "Upload received");
    let outcome = data.upload_use_case.execute(filename, &body).await?;
    data.current_upload.set(outcome.upload_id);

    let file_info = FileInfo {
        original_filename: &outcome.original_filename,
        row_count: outcome.table.row_count,
        column_count: outcome.table.column_count,
    };

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "uploadId": outcome.upload_id,
        "data": outcome.table.rows,
        "statistics": outcome.statistics,
        "fileInfo": file_info,
    })))
}

async fn data_response(data: &HttpState, upload_id: i64) -> HandlerResult {
    let upload_row = data
        .repository
        .get_upload(upload_id)
        .await?
        .ok_or_else(|| upload_not_found(upload_id))?;
    let rows = data.repository.get_data_records(upload_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "uploadId": upload_id,
        "fileInfo": upload_row,
        "data": rows,
    })))
}

#[get("/data")]
async fn current_data(data: web::Data<HttpState>) -> HandlerResult {
    let upload_id = current_id(&data)?;
    data_response(&data, upload_id).await
}

#[get("/data/{upload_id}")]
async fn data_by_id(data: web::Data<HttpState>, path: web::Path<i64>) -> HandlerResult {
    data_response(&data, path.into_inner()).await
}

async fn statistics_response(data: &HttpState, upload_id: i64) -> HandlerResult {
    let snapshot = data
        .repository
        .get_statistics(upload_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Statistics not found for upload {}", upload_id))
        })?;

    Ok(HttpResponse::Ok().json(json!({ "statistics": snapshot.statistics_data })))
}

#[get("/statistics")]
async fn current_statistics(data: web::Data<HttpState>) -> HandlerResult {
    let upload_id = current_id(&data)?;
    statistics_response(&data, upload_id).await
}

#[get("/statistics/{upload_id}")]
async fn statistics_by_id(data: web::Data<HttpState>, path: web::Path<i64>) -> HandlerResult {
    statistics_response(&data, path.into_inner()).await
}

#[post("/analyze")]
async fn analyze(data: web::Data<HttpState>, body: web::Json<AnalyzeBody>) -> HandlerResult {
    let body = body.into_inner();
    let upload_id = body
        .upload_id
        .or_else(|| data.current_upload.get())
        .ok_or_else(|| AppError::InvalidRequest("Please upload a file first".to_string()))?;

    let request = AnalysisRequest::from_parts(
        body.analysis_type.as_deref(),
        body.chart_name,
        body.chart_data,
        body.chart_type,
    )?;

    let analysis = data.analyze_use_case.execute(upload_id, &request).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "analysis": analysis,
        "uploadId": upload_id,
    })))
}

#[get("/analyses/{upload_id}")]
async fn analyses_by_id(data: web::Data<HttpState>, path: web::Path<i64>) -> HandlerResult {
    let upload_id = path.into_inner();
    if data.repository.get_upload(upload_id).await?.is_none() {
        return Err(upload_not_found(upload_id));
    }
    let analyses = data.repository.get_ai_analyses(upload_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "analyses": analyses })))
}

#[get("/history")]
async fn history(data: web::Data<HttpState>) -> HandlerResult {
    let uploads = data.repository.get_all_uploads().await?;
    Ok(HttpResponse::Ok().json(json!({ "history": uploads })))
}

#[post("/set-current")]
async fn set_current(
    data: web::Data<HttpState>,
    body: web::Json<SetCurrentBody>,
) -> HandlerResult {
    let upload_id = body
        .upload_id
        .ok_or_else(|| AppError::InvalidRequest("Missing uploadId".to_string()))?;

    if data.repository.get_upload(upload_id).await?.is_none() {
        return Err(upload_not_found(upload_id));
    }
    data.current_upload.set(upload_id);

    Ok(HttpResponse::Ok().json(json!({ "success": true, "uploadId": upload_id })))
}

#[delete("/history/{upload_id}")]
async fn delete_history(data: web::Data<HttpState>, path: web::Path<i64>) -> HandlerResult {
    let upload_id = path.into_inner();
    if data.repository.get_upload(upload_id).await?.is_none() {
        return Err(upload_not_found(upload_id));
    }
    data.repository.delete_upload(upload_id).await?;
    if data.current_upload.clear_if(upload_id) {
        info!(upload_id, "Current upload cleared");
    }

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::InvalidRequest(err.to_string()).into()
}

/// Routes and extractor limits shared by the server and the tests.
pub fn configure(state: web::Data<HttpState>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        let max_upload_bytes = state.max_upload_bytes;
        cfg.app_data(state)
            .app_data(web::PayloadConfig::new(max_upload_bytes))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .service(health)
            .service(
                web::scope("/api")
                    .service(upload)
                    .service(current_data)
                    .service(data_by_id)
                    .service(current_statistics)
                    .service(statistics_by_id)
                    .service(analyze)
                    .service(analyses_by_id)
                    .service(history)
                    .service(set_current)
                    .service(delete_history),
            );
    }
}

pub fn start_server(state: HttpState, host: &str, port: u16) -> std::io::Result<Server> {
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .configure(configure(state.clone()))
    })
    .bind((host, port))?
    .run();

    info!(host, port, "HTTP server listening");
    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::Result;
    use crate::domain::llm_config::LLMConfig;
    use crate::infrastructure::db::upload_store::test_support::memory_repository;
    use crate::infrastructure::llm_clients::LLMClient;
    use crate::infrastructure::storage::UploadStorage;
    use actix_web::test as actix_test;
    use async_trait::async_trait;

    struct CannedClient;

    #[async_trait]
    impl LLMClient for CannedClient {
        async fn generate(&self, _config: &LLMConfig, _system: &str, user: &str) -> Result<String> {
            if user.contains("Chart name") {
                Ok("Chart looks steady.".to_string())
            } else {
                Ok("Overall the data is consistent.".to_string())
            }
        }
    }

    fn state(dir: &tempfile::TempDir) -> web::Data<HttpState> {
        let repository = Arc::new(memory_repository());
        let storage = Arc::new(UploadStorage::new(dir.path()));
        web::Data::new(HttpState {
            repository: repository.clone(),
            current_upload: Arc::new(CurrentUpload::new()),
            upload_use_case: Arc::new(UploadUseCase::new(repository.clone(), storage)),
            analyze_use_case: Arc::new(AnalyzeUseCase::new(
                Arc::new(CannedClient),
                repository,
                LLMConfig::default(),
            )),
            max_upload_bytes: 1024 * 1024,
        })
    }

    macro_rules! app {
        ($state:expr) => {
            actix_test::init_service(App::new().configure(configure($state.clone()))).await
        };
    }

    const CSV: &[u8] = b"region,sales\nnorth,10\nsouth,20\neast,\n";

    fn upload_request(filename: &str, body: &'static [u8]) -> actix_test::TestRequest {
        actix_test::TestRequest::post()
            .uri(&format!("/api/upload?filename={}", filename))
            .set_payload(body)
    }

    #[actix_web::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        let app = app!(state);

        let resp: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::get().uri("/health").to_request(),
        )
        .await;
        assert_eq!(resp, json!({ "status": "ok" }));
    }

    #[actix_web::test]
    async fn test_upload_fetch_statistics_delete_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        let app = app!(state);

        let resp = actix_test::call_service(&app, upload_request("sales.csv", CSV).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(resp).await;
        let id = body["uploadId"].as_i64().unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["fileInfo"]["rowCount"], 3);
        assert_eq!(body["fileInfo"]["columnCount"], 2);
        assert_eq!(body["fileInfo"]["originalFilename"], "sales.csv");
        assert_eq!(body["statistics"]["sales"]["count"], 2);
        assert_eq!(body["statistics"]["sales"]["stdDev"], 5.0);
        assert_eq!(body["data"][2]["sales"], "");
        assert_eq!(state.current_upload.get(), Some(id));

        let current: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::get().uri("/api/data").to_request(),
        )
        .await;
        assert_eq!(current["uploadId"], id);
        assert_eq!(current["data"][0]["region"], "north");
        assert_eq!(current["data"][1]["sales"], 20);
        assert_eq!(current["fileInfo"]["fileType"], "csv");

        let stats: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/statistics/{}", id))
                .to_request(),
        )
        .await;
        assert_eq!(stats["statistics"]["sales"]["mean"], 15.0);
        assert_eq!(stats["statistics"]["region"]["count"], 0);

        let listed: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::get().uri("/api/history").to_request(),
        )
        .await;
        assert_eq!(listed["history"].as_array().unwrap().len(), 1);

        let resp = actix_test::call_service(
            &app,
            actix_test::TestRequest::delete()
                .uri(&format!("/api/history/{}", id))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.current_upload.get(), None);

        for uri in [
            "/api/data".to_string(),
            "/api/statistics".to_string(),
            format!("/api/data/{}", id),
            format!("/api/statistics/{}", id),
        ] {
            let resp =
                actix_test::call_service(&app, actix_test::TestRequest::get().uri(&uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
        }

        let resp = actix_test::call_service(
            &app,
            actix_test::TestRequest::delete()
                .uri(&format!("/api/history/{}", id))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = actix_test::read_body_json(resp).await;
        assert!(body["detail"].as_str().unwrap().contains("Upload not found"));
    }

    #[actix_web::test]
    async fn test_upload_rejections_are_client_faults() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        let app = app!(state);

        for (filename, body) in [
            ("notes.txt", &b"hello"[..]),
            ("empty.csv", &b""[..]),
            ("broken.xlsx", &b"not a workbook"[..]),
        ] {
            let resp = actix_test::call_service(&app, upload_request(filename, body).to_request()).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", filename);
            let body: Value = actix_test::read_body_json(resp).await;
            assert!(body["detail"].is_string());
        }

        let resp = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/upload")
                .set_payload(CSV)
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.current_upload.get(), None);
    }

    #[actix_web::test]
    async fn test_analyze_uses_pointer_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        let app = app!(state);

        let resp = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/analyze")
                .set_json(json!({ "analysisType": "overall" }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let uploaded: Value =
            actix_test::call_and_read_body_json(&app, upload_request("sales.csv", CSV).to_request())
                .await;
        let id = uploaded["uploadId"].as_i64().unwrap();

        let overall: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/analyze")
                .set_json(json!({ "analysisType": "overall" }))
                .to_request(),
        )
        .await;
        assert_eq!(overall["success"], true);
        assert_eq!(overall["uploadId"], id);
        assert_eq!(overall["analysis"], "Overall the data is consistent.");

        let chart: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/analyze")
                .set_json(json!({
                    "uploadId": id,
                    "analysisType": "chart",
                    "chartName": "Sales by region",
                    "chartData": { "north": 10, "south": 20 }
                }))
                .to_request(),
        )
        .await;
        assert_eq!(chart["analysis"], "Chart looks steady.");

        let analyses: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/analyses/{}", id))
                .to_request(),
        )
        .await;
        let list = analyses["analyses"].as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["analysisType"], "chart_specific");
        assert_eq!(list[0]["chartName"], "Sales by region");
        assert_eq!(list[1]["analysisType"], "overall");

        let data: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/data/{}", id))
                .to_request(),
        )
        .await;
        assert!(data["fileInfo"]["analysisTime"].is_string());

        for payload in [
            json!({ "analysisType": "pie" }),
            json!({ "analysisType": "chart", "chartData": [1, 2] }),
            json!({ "analysisType": "chart", "chartName": "x" }),
        ] {
            let resp = actix_test::call_service(
                &app,
                actix_test::TestRequest::post()
                    .uri("/api/analyze")
                    .set_json(payload)
                    .to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[actix_web::test]
    async fn test_set_current_validates_and_switches() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        let app = app!(state);

        let first: Value =
            actix_test::call_and_read_body_json(&app, upload_request("a.csv", CSV).to_request()).await;
        let second: Value =
            actix_test::call_and_read_body_json(&app, upload_request("b.csv", CSV).to_request()).await;
        let first_id = first["uploadId"].as_i64().unwrap();
        let second_id = second["uploadId"].as_i64().unwrap();
        assert_eq!(state.current_upload.get(), Some(second_id));

        let resp: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/set-current")
                .set_json(json!({ "uploadId": first_id }))
                .to_request(),
        )
        .await;
        assert_eq!(resp["uploadId"], first_id);
        assert_eq!(state.current_upload.get(), Some(first_id));

        let resp = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/set-current")
                .set_json(json!({ "uploadId": 999 }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/set-current")
                .set_json(json!({}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.current_upload.get(), Some(first_id));

        // Deleting a different upload leaves the pointer alone.
        let resp = actix_test::call_service(
            &app,
            actix_test::TestRequest::delete()
                .uri(&format!("/api/history/{}", second_id))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.current_upload.get(), Some(first_id));
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (AppError::UnsupportedFileType(".txt".into()), StatusCode::BAD_REQUEST),
            (AppError::EmptyFile, StatusCode::BAD_REQUEST),
            (AppError::UnparsableFile("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::InvalidRequest("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (AppError::StorageFailure("db".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::AnalysisFailure("model".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{}", err);
        }
    }
}
