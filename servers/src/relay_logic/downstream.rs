use crate::relay_logic::page::render_page;
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use lib_common::store::{StoreReader, StoreView};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;

const NO_FILE: &str = "No file available for download.";

pub fn router(reader: Arc<StoreReader>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/download", get(download_handler))
        .route("/health", get(health_handler))
        .with_state(reader)
}

pub async fn run(
    addr: SocketAddr,
    reader: Arc<StoreReader>,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = router(reader);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Web view listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.recv().await.ok();
            log::info!("Web view shutting down.");
        })
        .await?;
    Ok(())
}

async fn index_handler(State(reader): State<Arc<StoreReader>>) -> Html<String> {
    // A read failure looks like "no data" to the browser; the log has the detail.
    let view = reader.view().unwrap_or_else(|e| {
        log::error!("Failed to read store for display: {}", e);
        StoreView::Absent
    });
    Html(render_page(&view))
}

async fn download_handler(State(reader): State<Arc<StoreReader>>) -> Response {
    match reader.raw() {
        Ok(Some(bytes)) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", reader.file_name()),
                ),
            ],
            bytes,
        )
            .into_response(),
        Ok(None) => NO_FILE.into_response(),
        Err(e) => {
            log::error!("Failed to read store for download: {}", e);
            NO_FILE.into_response()
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::fs;
    use tower::ServiceExt;

    async fn get(reader: Arc<StoreReader>, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
        let response = router(reader)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn index_without_store_says_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let reader = Arc::new(StoreReader::new(dir.path().join("data.csv")));

        let (status, _, body) = get(reader, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("No data available."));
    }

    #[tokio::test]
    async fn index_renders_store_rows() {
        let dir = tempfile::tempdir().unwrap();
        let reader = Arc::new(StoreReader::new(dir.path().join("data.csv")));
        fs::write(reader.path(), "a,b\n1,2\n3,4\n").unwrap();

        let (_, _, body) = get(reader, "/").await;

        assert!(body.contains("<th>a</th><th>b</th>"));
        assert!(body.contains("<td>3</td><td>4</td>"));
    }

    #[tokio::test]
    async fn download_is_an_attachment_named_after_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let reader = Arc::new(StoreReader::new(dir.path().join("nysm_latest_data.csv")));
        fs::write(reader.path(), "a,b\n1,2\n").unwrap();

        let (status, headers, body) = get(reader, "/download").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"nysm_latest_data.csv\""
        );
        assert_eq!(body, "a,b\n1,2\n");
    }

    #[tokio::test]
    async fn download_without_store() {
        let dir = tempfile::tempdir().unwrap();
        let reader = Arc::new(StoreReader::new(dir.path().join("data.csv")));

        let (status, _, body) = get(reader, "/download").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, NO_FILE);
    }

    #[tokio::test]
    async fn health() {
        let dir = tempfile::tempdir().unwrap();
        let reader = Arc::new(StoreReader::new(dir.path().join("data.csv")));
        let (status, _, body) = get(reader, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }
}
