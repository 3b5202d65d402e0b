use crate::{
    error::FileDeskError,
    file::models::{FilePatch, FileRecord, FileUpload},
    folder::models::{FolderNode, FolderPatch, FolderRecord, NewFolder},
    state::{BulkDeleteReport, CreateFile, FileManager, FilePreview},
    view::SortSpec,
};
use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_macros::debug_handler;
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub fn router(state: FileManager) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE]);

    Router::new()
        .merge(file_router())
        .merge(folder_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn file_router() -> Router<FileManager> {
    Router::new()
        .route("/files", get(list_files).post(create_file))
        .route("/files/upload", post(upload_file))
        .route("/files/bulk-delete", post(bulk_delete))
        .route(
            "/files/:id",
            get(get_file).patch(update_file).delete(delete_file),
        )
        .route("/files/:id/preview", get(preview_file))
        .route("/files/:id/move", post(move_file))
}

fn folder_router() -> Router<FileManager> {
    Router::new()
        .route("/folders", get(list_folders).post(create_folder))
        .route("/folders/roots", get(root_folders))
        .route("/folders/tree", get(folder_tree))
        .route(
            "/folders/:id",
            get(get_folder).patch(update_folder).delete(delete_folder),
        )
        .route("/folders/:id/children", get(folder_children))
        .route("/folders/:id/breadcrumb", get(breadcrumb))
        .route("/folders/:id/toggle", post(toggle_folder))
}

#[derive(Debug, Default, Deserialize)]
pub struct BrowseParams {
    pub folder: Option<String>,
    pub q: Option<String>,

    /// Either a field or the combined `field-direction` form
    pub sort: Option<String>,
    pub order: Option<String>,
}

impl BrowseParams {
    /// The UI always sends every parameter, blank ones mean "not set".
    fn folder(&self) -> Option<&str> {
        non_blank(&self.folder)
    }

    fn sort_spec(&self) -> Result<SortSpec, FileDeskError> {
        let mut spec = match non_blank(&self.sort) {
            Some(sort) => sort.parse()?,
            None => SortSpec::default(),
        };
        if let Some(order) = non_blank(&self.order) {
            spec.direction = order.parse()?;
        }
        Ok(spec)
    }
}

fn non_blank(param: &Option<String>) -> Option<&str> {
    param.as_deref().map(str::trim).filter(|p| !p.is_empty())
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[debug_handler]
pub async fn list_files(
    state: State<FileManager>,
    params: Query<BrowseParams>,
) -> Result<Json<Vec<FileRecord>>, FileDeskError> {
    let sort = params.sort_spec()?;
    let query = params.q.as_deref().unwrap_or_default();
    let files = state.browse(params.folder(), query, sort).await;
    Ok(Json(files))
}

pub async fn create_file(
    state: State<FileManager>,
    data: Json<CreateFile>,
) -> Result<impl IntoResponse, FileDeskError> {
    let file = state.create_file(data.0).await?;
    Ok((StatusCode::CREATED, Json(file)))
}

pub async fn upload_file(
    state: State<FileManager>,
    data: Json<FileUpload>,
) -> Result<impl IntoResponse, FileDeskError> {
    let file = state.upload_file(data.0).await?;
    Ok((StatusCode::CREATED, Json(file)))
}

pub async fn bulk_delete(
    state: State<FileManager>,
    request: Json<BulkDeleteRequest>,
) -> Json<BulkDeleteReport> {
    info!("Deleting {} files", request.ids.len());
    Json(state.bulk_delete(&request.ids).await)
}

pub async fn get_file(
    state: State<FileManager>,
    id: Path<String>,
) -> Result<Json<FileRecord>, FileDeskError> {
    let Some(file) = state.files.get_by_id(&id).await else {
        return Err(FileDeskError::file_not_found(&id));
    };
    Ok(Json(file))
}

pub async fn preview_file(
    state: State<FileManager>,
    id: Path<String>,
) -> Result<Json<FilePreview>, FileDeskError> {
    Ok(Json(state.preview(&id).await?))
}

pub async fn update_file(
    state: State<FileManager>,
    id: Path<String>,
    patch: Json<FilePatch>,
) -> Result<Json<FileRecord>, FileDeskError> {
    Ok(Json(state.update_file(&id, patch.0).await?))
}

pub async fn delete_file(
    state: State<FileManager>,
    id: Path<String>,
) -> Result<Json<FileRecord>, FileDeskError> {
    Ok(Json(state.delete_file(&id).await?))
}

pub async fn move_file(
    state: State<FileManager>,
    id: Path<String>,
    request: Json<MoveRequest>,
) -> Result<Json<FileRecord>, FileDeskError> {
    let MoveRequest { parent_id } = request.0;
    Ok(Json(state.move_file(&id, parent_id).await?))
}

pub async fn list_folders(state: State<FileManager>) -> Json<Vec<FolderRecord>> {
    Json(state.folders.list_all().await)
}

pub async fn create_folder(
    state: State<FileManager>,
    data: Json<NewFolder>,
) -> Result<impl IntoResponse, FileDeskError> {
    let folder = state.create_folder(data.0).await?;
    Ok((StatusCode::CREATED, Json(folder)))
}

pub async fn root_folders(state: State<FileManager>) -> Json<Vec<FolderRecord>> {
    Json(state.folders.get_root_folders().await)
}

#[debug_handler]
pub async fn folder_tree(state: State<FileManager>) -> Json<Vec<FolderNode>> {
    Json(state.folder_tree().await)
}

pub async fn get_folder(
    state: State<FileManager>,
    id: Path<String>,
) -> Result<Json<FolderRecord>, FileDeskError> {
    let Some(folder) = state.folders.get_by_id(&id).await else {
        return Err(FileDeskError::folder_not_found(&id));
    };
    Ok(Json(folder))
}

pub async fn update_folder(
    state: State<FileManager>,
    id: Path<String>,
    patch: Json<FolderPatch>,
) -> Result<Json<FolderRecord>, FileDeskError> {
    Ok(Json(state.update_folder(&id, patch.0).await?))
}

pub async fn delete_folder(
    state: State<FileManager>,
    id: Path<String>,
) -> Result<Json<FolderRecord>, FileDeskError> {
    Ok(Json(state.delete_folder(&id).await?))
}

pub async fn folder_children(
    state: State<FileManager>,
    id: Path<String>,
) -> Json<Vec<FolderRecord>> {
    Json(state.folders.get_children(&id).await)
}

pub async fn breadcrumb(
    state: State<FileManager>,
    id: Path<String>,
) -> Result<Json<Vec<FolderRecord>>, FileDeskError> {
    Ok(Json(state.breadcrumb(Some(id.as_str())).await?))
}

pub async fn toggle_folder(
    state: State<FileManager>,
    id: Path<String>,
) -> Result<Json<FolderRecord>, FileDeskError> {
    Ok(Json(state.toggle_folder(&id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::Latency, config::FolderDeletePolicy, seed::Seed};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let manager = FileManager::new(
            Seed::bundled().unwrap(),
            Latency::none(),
            FolderDeletePolicy::Reject,
        );
        router(manager)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn lists_and_sorts_files() {
        let app = app();

        let response = send(&app, Method::GET, "/files?folder=8&sort=size-desc", None).await;
        assert_eq!(StatusCode::OK, response.status());

        let body = json_body(response).await;
        let names = body
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(vec!["app.js", "index.html", "styles.css"], names);

        let response = send(&app, Method::GET, "/files?q=JPG&sort=name&order=desc", None).await;
        let body = json_body(response).await;
        let names = body
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(vec!["profile.jpg", "beach.jpg"], names);
    }

    async fn count(app: &Router, uri: &str) -> usize {
        let response = send(app, Method::GET, uri, None).await;
        assert_eq!(StatusCode::OK, response.status(), "{uri}");
        json_body(response).await.as_array().unwrap().len()
    }

    #[tokio::test]
    async fn blank_params_are_ignored() {
        let app = app();
        let all = count(&app, "/files").await;
        assert!(all > 0);

        assert_eq!(all, count(&app, "/files?folder=&q=&sort=&order=").await);
        assert_eq!(all, count(&app, "/files?folder=").await);
        assert_eq!(all, count(&app, "/files?q=%20%20").await);

        let pdfs = count(&app, "/files?q=pdf").await;
        assert!(pdfs > 0);
        assert_eq!(pdfs, count(&app, "/files?folder=&q=pdf&sort=&order=").await);
    }

    #[tokio::test]
    async fn unknown_sort_is_bad_request() {
        let response = send(&app(), Method::GET, "/files?sort=colour", None).await;
        assert_eq!(StatusCode::BAD_REQUEST, response.status());
    }

    #[tokio::test]
    async fn file_crud_round() {
        let app = app();

        let response = send(
            &app,
            Method::POST,
            "/files",
            Some(json!({"name": "plan", "type": "md", "parentId": "7"})),
        )
        .await;
        assert_eq!(StatusCode::CREATED, response.status());
        let created = json_body(response).await;
        assert_eq!("plan.md", created["name"]);
        assert_eq!(0, created["size"]);
        assert_eq!(false, created["isFolder"]);
        let id = created["id"].as_str().unwrap().to_string();

        let response = send(
            &app,
            Method::PATCH,
            &format!("/files/{id}"),
            Some(json!({"name": "roadmap.md", "size": 42})),
        )
        .await;
        assert_eq!(StatusCode::OK, response.status());
        let updated = json_body(response).await;
        assert_eq!("roadmap.md", updated["name"]);
        assert_eq!(42, updated["size"]);

        let response = send(
            &app,
            Method::POST,
            &format!("/files/{id}/move"),
            Some(json!({"parentId": null})),
        )
        .await;
        assert_eq!(Value::Null, json_body(response).await["parentId"]);

        let response = send(&app, Method::DELETE, &format!("/files/{id}"), None).await;
        assert_eq!(StatusCode::OK, response.status());

        let response = send(&app, Method::GET, &format!("/files/{id}"), None).await;
        assert_eq!(StatusCode::NOT_FOUND, response.status());

        let response = send(&app, Method::DELETE, &format!("/files/{id}"), None).await;
        assert_eq!(StatusCode::NOT_FOUND, response.status());
    }

    #[tokio::test]
    async fn blank_names_are_rejected() {
        let response = send(&app(), Method::POST, "/files", Some(json!({"name": " "}))).await;
        assert_eq!(StatusCode::BAD_REQUEST, response.status());

        let response = send(&app(), Method::POST, "/folders", Some(json!({"name": ""}))).await;
        assert_eq!(StatusCode::BAD_REQUEST, response.status());
    }

    #[tokio::test]
    async fn upload_and_preview() {
        let app = app();

        let response = send(
            &app,
            Method::POST,
            "/files/upload",
            Some(json!({"fileName": "Holiday.JPEG", "size": 1536, "parentId": "5"})),
        )
        .await;
        assert_eq!(StatusCode::CREATED, response.status());
        let uploaded = json_body(response).await;
        assert_eq!("jpeg", uploaded["type"]);

        let id = uploaded["id"].as_str().unwrap();
        let response = send(&app, Method::GET, &format!("/files/{id}/preview"), None).await;
        let preview = json_body(response).await;
        assert_eq!("1.5 KB", preview["sizeLabel"]);
        assert_eq!("Holiday.JPEG", preview["name"]);
    }

    #[tokio::test]
    async fn bulk_delete_reports_each_id() {
        let app = app();

        let response = send(
            &app,
            Method::POST,
            "/files/bulk-delete",
            Some(json!({"ids": ["109", "110", "missing"]})),
        )
        .await;
        assert_eq!(StatusCode::OK, response.status());

        let report = json_body(response).await;
        assert_eq!(2, report["deleted"].as_array().unwrap().len());
        assert_eq!("missing", report["failed"][0]["id"]);

        let response = send(&app, Method::GET, "/files?folder=6", None).await;
        assert!(json_body(response).await.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn folder_tree_and_toggle() {
        let app = app();

        let response = send(&app, Method::GET, "/folders/tree", None).await;
        let tree = json_body(response).await;
        let pictures = tree
            .as_array()
            .unwrap()
            .iter()
            .find(|n| n["id"] == "4")
            .unwrap()
            .clone();
        assert_eq!(true, pictures["hasChildren"]);
        assert!(pictures["children"].as_array().unwrap().is_empty());

        let response = send(&app, Method::POST, "/folders/4/toggle", None).await;
        assert_eq!(true, json_body(response).await["expanded"]);

        let response = send(&app, Method::GET, "/folders/tree", None).await;
        let tree = json_body(response).await;
        let pictures = tree
            .as_array()
            .unwrap()
            .iter()
            .find(|n| n["id"] == "4")
            .unwrap()
            .clone();
        assert_eq!("Vacation", pictures["children"][0]["name"]);

        let response = send(&app, Method::POST, "/folders/404/toggle", None).await;
        assert_eq!(StatusCode::NOT_FOUND, response.status());
    }

    #[tokio::test]
    async fn folder_navigation() {
        let app = app();

        let response = send(&app, Method::GET, "/folders/roots", None).await;
        assert_eq!(4, json_body(response).await.as_array().unwrap().len());

        let response = send(&app, Method::GET, "/folders/1/children", None).await;
        assert_eq!(2, json_body(response).await.as_array().unwrap().len());

        let response = send(&app, Method::GET, "/folders/5/breadcrumb", None).await;
        let crumbs = json_body(response).await;
        assert_eq!("Pictures", crumbs[0]["name"]);
        assert_eq!("Vacation", crumbs[1]["name"]);

        let response = send(&app, Method::GET, "/folders/404", None).await;
        assert_eq!(StatusCode::NOT_FOUND, response.status());
    }

    #[tokio::test]
    async fn folder_lifecycle() {
        let app = app();

        let response = send(
            &app,
            Method::POST,
            "/folders",
            Some(json!({"name": "Scans", "parentId": "1"})),
        )
        .await;
        assert_eq!(StatusCode::CREATED, response.status());
        let folder = json_body(response).await;
        assert_eq!("/Documents/Scans", folder["path"]);
        let id = folder["id"].as_str().unwrap().to_string();

        let response = send(
            &app,
            Method::PATCH,
            &format!("/folders/{id}"),
            Some(json!({"name": "Scanned"})),
        )
        .await;
        assert_eq!("Scanned", json_body(response).await["name"]);

        // Non empty folders are kept under the default policy
        let response = send(&app, Method::DELETE, "/folders/1", None).await;
        assert_eq!(StatusCode::BAD_REQUEST, response.status());

        let response = send(&app, Method::DELETE, &format!("/folders/{id}"), None).await;
        assert_eq!(StatusCode::OK, response.status());

        let response = send(&app, Method::GET, "/folders", None).await;
        let folders = json_body(response).await;
        assert!(folders.as_array().unwrap().iter().all(|f| f["id"] != id.as_str()));
    }
}
